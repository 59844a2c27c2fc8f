//! Connection state machine shared by all feeds

/// Connection status of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Inputs that move a feed between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Caller asked to open a connection
    Connect,
    /// Transport finished the handshake
    Opened,
    /// Transport closed or failed
    Closed,
    /// Caller tore the connection down
    Disconnect,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }

    /// Transition table. Inputs that make no sense in a state leave it as is.
    pub fn next(self, transition: Transition) -> Self {
        use ConnectionState::*;

        match (self, transition) {
            (Disconnected, Transition::Connect) => Connecting,
            (Connecting, Transition::Opened) => Connected,
            (Connecting | Connected, Transition::Closed) => Disconnected,
            (_, Transition::Disconnect) => Disconnected,
            (state, _) => state,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = ConnectionState::default()
            .next(Transition::Connect)
            .next(Transition::Opened);
        assert_eq!(state, ConnectionState::Connected);
        assert_eq!(state.next(Transition::Closed), ConnectionState::Disconnected);
    }

    #[test]
    fn test_failure_before_open() {
        let state = ConnectionState::Connecting.next(Transition::Closed);
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_ignored_inputs() {
        assert_eq!(
            ConnectionState::Connected.next(Transition::Connect),
            ConnectionState::Connected
        );
        assert_eq!(
            ConnectionState::Disconnected.next(Transition::Opened),
            ConnectionState::Disconnected
        );
        assert_eq!(
            ConnectionState::Disconnected.next(Transition::Closed),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_disconnect_from_any_state() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ] {
            assert_eq!(state.next(Transition::Disconnect), ConnectionState::Disconnected);
        }
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
