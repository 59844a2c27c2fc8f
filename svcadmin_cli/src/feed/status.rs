//! Live status of the service itself or one of its resources

use super::{endpoint, Accepted, ConnectionState, Connector, FeedEvent, FeedLink, WsConnector};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use svcadmin_common::{decode_snapshot, paths, ProtocolError, StatusSnapshot, SELF_RESOURCE};

/// What changed after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Nothing visible changed
    Ignored,
    State(ConnectionState),
    /// A new snapshot replaced the previous one
    Snapshot,
}

/// Characters a URI component keeps as-is, the same set a browser's
/// `encodeURIComponent` leaves alone
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Stream URL for a status target
fn status_endpoint(ws_base: &Url, resource: &str) -> Url {
    if resource == SELF_RESOURCE {
        return endpoint(ws_base, paths::WS_SELF_STATUS);
    }
    let mut url = endpoint(ws_base, paths::WS_RESOURCE_STATUS);
    let query = format!("resource={}", utf8_percent_encode(resource, URI_COMPONENT));
    url.set_query(Some(&query));
    url
}

/// Keeps the latest status snapshot of one target
pub struct StatusFeed<C = WsConnector> {
    link: FeedLink<C>,
    ws_base: Url,
    resource: Option<String>,
    snapshot: Option<StatusSnapshot>,
}

impl StatusFeed<WsConnector> {
    pub fn new(ws_base: Url) -> Self {
        Self::with_connector(ws_base, WsConnector)
    }
}

impl<C: Connector> StatusFeed<C> {
    pub fn with_connector(ws_base: Url, connector: C) -> Self {
        Self {
            link: FeedLink::new(connector),
            ws_base,
            resource: None,
            snapshot: None,
        }
    }

    /// Open the stream for `resource`. Does nothing while a connection is
    /// held; returns whether a connection was started.
    pub fn connect(&mut self, resource: &str) -> bool {
        let url = status_endpoint(&self.ws_base, resource);
        if !self.link.open(&url) {
            return false;
        }
        if self.resource.as_deref() != Some(resource) {
            self.snapshot = None;
        }
        self.resource = Some(resource.to_string());
        true
    }

    /// Close the stream. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.link.close();
    }

    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.link.next_event().await
    }

    /// Apply a transport event.
    ///
    /// A message that is not valid JSON is dropped: the previous snapshot is
    /// kept, the connection stays open and the decode error is returned.
    pub fn handle(&mut self, event: FeedEvent) -> Result<StatusUpdate, ProtocolError> {
        match self.link.accept(event) {
            Accepted::Stale => Ok(StatusUpdate::Ignored),
            Accepted::State(state) => Ok(StatusUpdate::State(state)),
            Accepted::Message(text) => match decode_snapshot(&text) {
                Ok(snapshot) => {
                    self.snapshot = Some(snapshot);
                    Ok(StatusUpdate::Snapshot)
                }
                Err(e) => {
                    tracing::warn!(
                        "Dropping malformed status message for {}: {}",
                        self.resource.as_deref().unwrap_or(SELF_RESOURCE),
                        e
                    );
                    Err(e)
                }
            },
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    /// Target of the current or last connection
    #[cfg(test)]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.snapshot.as_ref()
    }
}
