//! Live view of the service's runtime settings

use super::{endpoint, Accepted, ConnectionState, Connector, FeedEvent, FeedLink, WsConnector};
use reqwest::Url;
use svcadmin_common::{paths, ProtocolError, SettingEvent, SettingsList};

/// What changed after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsUpdate {
    /// Nothing visible changed
    Ignored,
    State(ConnectionState),
    /// The settings collection changed
    Settings,
}

/// Mirrors the backend's settings into a sorted collection
pub struct SettingsFeed<C = WsConnector> {
    link: FeedLink<C>,
    url: Url,
    settings: SettingsList,
}

impl SettingsFeed<WsConnector> {
    pub fn new(ws_base: Url) -> Self {
        Self::with_connector(ws_base, WsConnector)
    }
}

impl<C: Connector> SettingsFeed<C> {
    pub fn with_connector(ws_base: Url, connector: C) -> Self {
        Self {
            link: FeedLink::new(connector),
            url: endpoint(&ws_base, paths::WS_SETTINGS),
            settings: SettingsList::new(),
        }
    }

    /// Open the settings stream. Does nothing while a connection is held;
    /// returns whether a connection was started.
    pub fn connect(&mut self) -> bool {
        self.link.open(&self.url)
    }

    /// Tear the connection down. Its close notification is suppressed: no
    /// event from it is applied afterwards.
    pub fn disconnect(&mut self) {
        self.link.close();
    }

    /// Drop the current connection, if any, and open a fresh one
    pub fn reconnect(&mut self) -> bool {
        self.disconnect();
        self.connect()
    }

    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.link.next_event().await
    }

    /// Apply a transport event.
    ///
    /// Messages with an unknown or missing type tag are ignored. Messages
    /// that are not JSON are dropped and the decode error returned.
    pub fn handle(&mut self, event: FeedEvent) -> Result<SettingsUpdate, ProtocolError> {
        match self.link.accept(event) {
            Accepted::Stale => Ok(SettingsUpdate::Ignored),
            Accepted::State(state) => Ok(SettingsUpdate::State(state)),
            Accepted::Message(text) => {
                let event = SettingEvent::decode(&text).inspect_err(|e| {
                    tracing::warn!("Dropping malformed settings message: {}", e);
                })?;
                if self.settings.apply(event) {
                    Ok(SettingsUpdate::Settings)
                } else {
                    tracing::debug!("Ignoring settings message with unknown type");
                    Ok(SettingsUpdate::Ignored)
                }
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    pub fn settings(&self) -> &SettingsList {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::*;
    use crate::feed::{ConnectionId, TransportEvent};

    fn connected() -> (SettingsFeed<RecordingConnector>, RecordingConnector) {
        let connector = RecordingConnector::default();
        let mut feed = SettingsFeed::with_connector(base(), connector.clone());
        feed.connect();
        let id = connector.last_id();
        feed.handle(event(id, TransportEvent::Opened)).unwrap();
        feed.handle(event(
            id,
            TransportEvent::Message(
                r#"{"type": "SETTINGS_LIST", "settings": [
                    {"key": "timeout", "value": "5s"},
                    {"key": "Batch-Size", "value": "100"},
                    {"key": "auto-profiling-type", "value": "all"}
                ]}"#
                .into(),
            ),
        ))
        .unwrap();
        (feed, connector)
    }

    fn keys<C: Connector>(feed: &SettingsFeed<C>) -> Vec<String> {
        feed.settings().iter().map(|s| s.key.clone()).collect()
    }

    fn message(
        feed: &mut SettingsFeed<RecordingConnector>,
        id: ConnectionId,
        text: &str,
    ) -> SettingsUpdate {
        feed.handle(event(id, TransportEvent::Message(text.into())))
            .unwrap()
    }

    #[test]
    fn test_stream_url() {
        let connector = RecordingConnector::default();
        let mut feed = SettingsFeed::with_connector(base(), connector.clone());
        feed.connect();
        assert_eq!(connector.last_url().as_str(), "ws://127.0.0.1:8080/settings/ws");
    }

    #[test]
    fn test_list_replaces_and_sorts() {
        let (feed, _) = connected();
        assert_eq!(feed.state(), ConnectionState::Connected);
        assert_eq!(keys(&feed), vec!["auto-profiling-type", "Batch-Size", "timeout"]);
    }

    #[test]
    fn test_change_for_existing_key() {
        let (mut feed, connector) = connected();
        let before = keys(&feed);

        let update = message(
            &mut feed,
            connector.last_id(),
            r#"{"type": "SETTING_CHANGE", "setting": {"key": "Batch-Size", "value": "500"}}"#,
        );

        assert_eq!(update, SettingsUpdate::Settings);
        assert_eq!(keys(&feed), before);
        assert_eq!(feed.settings().get("Batch-Size").unwrap().value, "500");
        assert_eq!(feed.settings().get("timeout").unwrap().value, "5s");
    }

    #[test]
    fn test_change_for_new_key() {
        let (mut feed, connector) = connected();

        message(
            &mut feed,
            connector.last_id(),
            r#"{"type": "SETTING_CHANGE", "setting": {"key": "cache-ttl", "value": "1m"}}"#,
        );

        assert_eq!(feed.settings().len(), 4);
        assert_eq!(
            keys(&feed),
            vec!["auto-profiling-type", "Batch-Size", "cache-ttl", "timeout"]
        );
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let (mut feed, connector) = connected();
        let before = feed.settings().clone();

        let update = message(
            &mut feed,
            connector.last_id(),
            r#"{"type": "SETTING_REMOVED", "key": "timeout"}"#,
        );
        assert_eq!(update, SettingsUpdate::Ignored);

        let update = message(&mut feed, connector.last_id(), r#"{"hello": "world"}"#);
        assert_eq!(update, SettingsUpdate::Ignored);

        assert_eq!(feed.settings(), &before);
    }

    #[test]
    fn test_malformed_message_is_dropped() {
        let (mut feed, connector) = connected();
        let result = feed.handle(event(
            connector.last_id(),
            TransportEvent::Message("not json".into()),
        ));
        assert!(result.is_err());
        assert_eq!(feed.settings().len(), 3);
        assert!(feed.is_open());
    }

    #[test]
    fn test_disconnect_suppresses_close() {
        let (mut feed, connector) = connected();
        let old = connector.last_id();

        feed.disconnect();
        assert_eq!(feed.state(), ConnectionState::Disconnected);

        assert!(feed.connect());
        assert_eq!(feed.state(), ConnectionState::Connecting);

        // Close and stray messages of the torn-down connection arrive late
        assert_eq!(
            feed.handle(event(old, TransportEvent::Closed)).unwrap(),
            SettingsUpdate::Ignored
        );
        assert_eq!(
            message(&mut feed, old, r#"{"type": "SETTINGS_LIST", "settings": []}"#),
            SettingsUpdate::Ignored
        );
        assert_eq!(feed.state(), ConnectionState::Connecting);
        assert_eq!(feed.settings().len(), 3);
    }

    #[test]
    fn test_unexpected_close_disconnects() {
        let (mut feed, connector) = connected();

        let update = feed
            .handle(event(connector.last_id(), TransportEvent::Closed))
            .unwrap();

        assert_eq!(update, SettingsUpdate::State(ConnectionState::Disconnected));
        assert!(!feed.is_open());
        assert_eq!(connector.count(), 1);
        // Settings stay visible until the next list arrives
        assert_eq!(feed.settings().len(), 3);
    }

    #[test]
    fn test_connect_while_open_is_noop_and_reconnect_replaces() {
        let (mut feed, connector) = connected();

        assert!(!feed.connect());
        assert_eq!(connector.count(), 1);

        assert!(feed.reconnect());
        assert_eq!(connector.count(), 2);
        assert_eq!(feed.state(), ConnectionState::Connecting);
        let mut opened = connector.opened.lock().unwrap();
        assert!(opened[0].shutdown.try_recv().is_ok());
    }
}
