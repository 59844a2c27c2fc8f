//! Live feeds: components that own one streaming connection to the admin
//! backend and reconcile its messages into local state.
//!
//! Transport work runs on spawned tasks which post [`FeedEvent`]s into the
//! feed's queue. The owner pulls them with `next_event()` and applies them
//! with `handle()` on its own task, so feed state is only touched from one
//! place. Every event carries the id of the connection that produced it;
//! events from a connection the feed no longer holds are discarded.

mod settings;
mod state;
mod status;
mod transport;

pub use settings::{SettingsFeed, SettingsUpdate};
pub use state::{ConnectionState, Transition};
pub use status::{StatusFeed, StatusUpdate};
pub use transport::WsConnector;

use reqwest::Url;
use tokio::sync::{mpsc, oneshot};

/// Identifies one underlying connection of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// What the transport observed
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

/// A transport event tagged with its connection
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub connection: ConnectionId,
    pub event: TransportEvent,
}

pub type EventSender = mpsc::UnboundedSender<FeedEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<FeedEvent>;

/// Opens streaming connections on behalf of a feed
pub trait Connector {
    /// Start connecting to `url`. Lifecycle and messages are posted to
    /// `events`; the connection closes when the returned handle is closed
    /// or dropped.
    fn open(&self, url: &Url, connection: ConnectionId, events: EventSender) -> ConnectionHandle;
}

/// Owning handle of an open or opening connection
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    shutdown: oneshot::Sender<()>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, shutdown: oneshot::Sender<()>) -> Self {
        Self { id, shutdown }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Request the transport to close. Completion is reported later as a
    /// `Closed` event.
    pub fn close(self) {
        let _ = self.shutdown.send(());
    }
}

/// Result of passing an event through [`FeedLink::accept`]
#[derive(Debug, PartialEq)]
pub(crate) enum Accepted {
    /// Event belongs to a connection the feed no longer holds
    Stale,
    /// Connection state changed
    State(ConnectionState),
    /// Message payload from the current connection
    Message(String),
}

/// Connection bookkeeping shared by the feeds: at most one handle, the
/// state machine, and the event queue.
pub(crate) struct FeedLink<C> {
    connector: C,
    state: ConnectionState,
    connection: Option<ConnectionHandle>,
    next_id: u64,
    events_tx: EventSender,
    events_rx: EventReceiver,
}

impl<C: Connector> FeedLink<C> {
    pub fn new(connector: C) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            state: ConnectionState::Disconnected,
            connection: None,
            next_id: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Open a connection unless one is already held. Returns whether a new
    /// connection was started.
    pub fn open(&mut self, url: &Url) -> bool {
        if self.connection.is_some() {
            tracing::debug!("Feed already has a connection, not opening {}", url);
            return false;
        }

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.state = self.state.next(Transition::Connect);
        tracing::debug!("Opening feed connection {:?} to {}", id, url);
        self.connection = Some(self.connector.open(url, id, self.events_tx.clone()));
        true
    }

    /// Drop the current connection. Its later events are discarded.
    pub fn close(&mut self) {
        if let Some(handle) = self.connection.take() {
            tracing::debug!("Closing feed connection {:?}", handle.id());
            handle.close();
        }
        self.state = self.state.next(Transition::Disconnect);
    }

    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.events_rx.recv().await
    }

    /// Apply the lifecycle part of an event
    pub fn accept(&mut self, event: FeedEvent) -> Accepted {
        let current = self.connection.as_ref().map(ConnectionHandle::id);
        if current != Some(event.connection) {
            tracing::trace!("Discarding event from stale connection {:?}", event.connection);
            return Accepted::Stale;
        }

        match event.event {
            TransportEvent::Opened => {
                self.state = self.state.next(Transition::Opened);
                Accepted::State(self.state)
            }
            TransportEvent::Message(text) => Accepted::Message(text),
            TransportEvent::Closed => {
                tracing::debug!("Feed connection {:?} closed", event.connection);
                self.connection = None;
                self.state = self.state.next(Transition::Closed);
                Accepted::State(self.state)
            }
            TransportEvent::Error(error) => {
                tracing::warn!("Feed connection {:?} failed: {}", event.connection, error);
                self.connection = None;
                self.state = self.state.next(Transition::Closed);
                Accepted::State(self.state)
            }
        }
    }
}

/// `base` with `path` appended to its path, keeping any path prefix
pub fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_endpoint_keeps_prefix() {
        let base = Url::parse("ws://host:9000/admin/").unwrap();
        assert_eq!(
            endpoint(&base, "/settings/ws").as_str(),
            "ws://host:9000/admin/settings/ws"
        );
        assert_eq!(
            endpoint(&super::testing::base(), "/settings/ws").as_str(),
            "ws://127.0.0.1:8080/settings/ws"
        );
    }

    #[test]
    fn test_link_opens_once() {
        let connector = RecordingConnector::default();
        let mut link = FeedLink::new(connector.clone());
        let url = endpoint(&base(), "/settings/ws");

        assert!(link.open(&url));
        assert!(!link.open(&url));
        assert_eq!(connector.count(), 1);
        assert_eq!(link.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_link_close_signals_transport_and_ignores_late_events() {
        let connector = RecordingConnector::default();
        let mut link = FeedLink::new(connector.clone());
        link.open(&endpoint(&base(), "/settings/ws"));
        let id = connector.last_id();

        link.close();

        assert!(!link.is_open());
        assert_eq!(link.state(), ConnectionState::Disconnected);
        let mut opened = connector.opened.lock().unwrap();
        assert!(opened[0].shutdown.try_recv().is_ok());
        drop(opened);

        assert_eq!(link.accept(event(id, TransportEvent::Closed)), Accepted::Stale);
        assert_eq!(
            link.accept(event(id, TransportEvent::Message("{}".into()))),
            Accepted::Stale
        );
    }

    #[test]
    fn test_link_error_clears_handle() {
        let connector = RecordingConnector::default();
        let mut link = FeedLink::new(connector.clone());
        link.open(&endpoint(&base(), "/settings/ws"));
        let id = connector.last_id();

        let accepted = link.accept(event(id, TransportEvent::Error("refused".into())));

        assert_eq!(accepted, Accepted::State(ConnectionState::Disconnected));
        assert!(!link.is_open());
        assert!(link.open(&endpoint(&base(), "/settings/ws")));
        assert_eq!(connector.count(), 2);
    }
}
