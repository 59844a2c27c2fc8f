//! WebSocket transport for feeds

use super::{ConnectionHandle, ConnectionId, Connector, EventSender, FeedEvent, TransportEvent};
use futures_util::StreamExt;
use reqwest::Url;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Opens feed connections with tokio-tungstenite, one task per connection
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: &Url, connection: ConnectionId, events: EventSender) -> ConnectionHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(run_connection(
            url.to_string(),
            connection,
            events,
            shutdown_rx,
        ));
        ConnectionHandle::new(connection, shutdown_tx)
    }
}

/// Drive one connection until the peer closes, the transport fails, or the
/// handle is closed/dropped. Always ends by posting `Closed` or `Error`.
async fn run_connection(
    url: String,
    connection: ConnectionId,
    events: EventSender,
    mut shutdown: oneshot::Receiver<()>,
) {
    // The receiver may be gone if the feed itself was dropped
    let post = |event: TransportEvent| {
        let _ = events.send(FeedEvent { connection, event });
    };

    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = &mut shutdown => {
            tracing::debug!("Connection {:?} cancelled before open", connection);
            post(TransportEvent::Closed);
            return;
        }
    };

    let mut ws = match connected {
        Ok((ws, _)) => ws,
        Err(e) => {
            tracing::debug!("Failed to connect to {}: {}", url, e);
            post(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    tracing::debug!("Connected to {}", url);
    post(TransportEvent::Opened);

    loop {
        tokio::select! {
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    post(TransportEvent::Message(text.as_str().to_string()));
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => post(TransportEvent::Message(text)),
                    Err(_) => tracing::warn!("Dropping non UTF-8 binary frame from {}", url),
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!("Server closed {}", url);
                    post(TransportEvent::Closed);
                    return;
                }
                Some(Err(e)) => {
                    post(TransportEvent::Error(e.to_string()));
                    return;
                }
            },
            _ = &mut shutdown => {
                let _ = ws.close(None).await;
                post(TransportEvent::Closed);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::feed::{ConnectionState, SettingsFeed, SettingsUpdate, StatusFeed, StatusUpdate};
    use crate::testing::{serve, ws_base};
    use axum::{
        extract::{
            ws::{Message, WebSocket, WebSocketUpgrade},
            Query,
        },
        response::Response,
        routing::get,
        Router,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    async fn settings_ws(ws: WebSocketUpgrade) -> Response {
        ws.on_upgrade(|mut socket: WebSocket| async move {
            let _ = socket
                .send(Message::Text(
                    r#"{"type": "SETTINGS_LIST", "settings": [{"key": "timeout", "value": "5s"}, {"key": "Alpha", "value": "1"}]}"#.into(),
                ))
                .await;
            let _ = socket
                .send(Message::Text(r#"{"type": "HEARTBEAT"}"#.into()))
                .await;
            let _ = socket
                .send(Message::Text(
                    r#"{"type": "SETTING_CHANGE", "setting": {"key": "beta", "value": "2"}}"#.into(),
                ))
                .await;
            let _ = socket.send(Message::Close(None)).await;
        })
    }

    async fn resource_ws(
        ws: WebSocketUpgrade,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let resource = params.get("resource").cloned().unwrap_or_default();
        ws.on_upgrade(move |mut socket: WebSocket| async move {
            let body = serde_json::json!({ "resource": resource }).to_string();
            let _ = socket.send(Message::Text(body.into())).await;
            let _ = socket.send(Message::Close(None)).await;
        })
    }

    #[tokio::test]
    async fn test_settings_feed_over_websocket() {
        let addr = serve(Router::new().route("/settings/ws", get(settings_ws))).await;
        let mut feed = SettingsFeed::new(ws_base(addr));
        assert!(feed.connect());

        let states = tokio::time::timeout(Duration::from_secs(5), async {
            let mut states = Vec::new();
            while let Some(event) = feed.next_event().await {
                if let Ok(SettingsUpdate::State(state)) = feed.handle(event) {
                    states.push(state);
                    if state == ConnectionState::Disconnected {
                        break;
                    }
                }
            }
            states
        })
        .await
        .expect("feed did not finish");

        assert_eq!(
            states,
            vec![ConnectionState::Connected, ConnectionState::Disconnected]
        );
        let keys: Vec<&str> = feed.settings().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["Alpha", "beta", "timeout"]);
        assert!(!feed.is_open());
    }

    #[tokio::test]
    async fn test_status_feed_sends_encoded_resource() {
        let addr = serve(Router::new().route("/status/ws-resource", get(resource_ws))).await;
        let mut feed = StatusFeed::new(ws_base(addr));
        feed.connect("db/main & replica");

        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = feed.next_event().await {
                if let Ok(StatusUpdate::State(ConnectionState::Disconnected)) = feed.handle(event) {
                    break;
                }
            }
        })
        .await
        .expect("feed did not finish");

        assert_eq!(feed.snapshot().unwrap()["resource"], "db/main & replica");
    }

    #[tokio::test]
    async fn test_refused_connection_reports_disconnected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut feed = StatusFeed::new(ws_base(addr));
        feed.connect("self");
        assert_eq!(feed.state(), ConnectionState::Connecting);

        let event = tokio::time::timeout(Duration::from_secs(5), feed.next_event())
            .await
            .expect("no event")
            .unwrap();
        let update = feed.handle(event).unwrap();

        assert_eq!(update, StatusUpdate::State(ConnectionState::Disconnected));
        assert!(!feed.is_open());
        assert!(feed.snapshot().is_none());
    }
}
