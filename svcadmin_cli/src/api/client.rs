//! JSON client for the admin backend's HTTP endpoints

use crate::config::Config;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use svcadmin_common::{
    paths, EditResponse, ProtocolError, ResourceList, ServiceMeta, SessionTrace, StatusSnapshot,
};
use thiserror::Error;

/// Errors from admin HTTP requests
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response; `body` is the raw payload the server sent
    #[error("Server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Setting change rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ApiError {
    /// The raw error payload, as shown to the user
    pub fn payload(&self) -> String {
        match self {
            ApiError::Status { body, .. } if !body.trim().is_empty() => body.trim().to_string(),
            other => other.to_string(),
        }
    }
}

/// Client for the admin backend
#[derive(Clone)]
pub struct AdminClient {
    base_url: String,
    client: Client,
}

impl AdminClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.server_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET and return the body of a successful response
    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!("GET {} failed: {}", url, status);
            return Err(ApiError::Status { status, body });
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let body = self.get_text(path, query).await?;
        Ok(serde_json::from_str(&body).map_err(ProtocolError::from)?)
    }

    /// Resource names (sorted) and the service caption
    pub async fn resources(&self) -> Result<ResourceList, ApiError> {
        let list: ResourceList = self.get_json(paths::RESOURCES, &[]).await?;
        Ok(list.sorted())
    }

    pub async fn meta(&self) -> Result<ServiceMeta, ApiError> {
        self.get_json(paths::META, &[]).await
    }

    /// Session log file names, in server order
    pub async fn log_files(&self) -> Result<Vec<String>, ApiError> {
        let files: Option<Vec<String>> = self.get_json(paths::LOG_FILES, &[]).await?;
        Ok(files.unwrap_or_default())
    }

    /// Raw session trace, not yet shaped
    pub async fn session(&self, file: &str, id: &str) -> Result<SessionTrace, ApiError> {
        let body = self
            .get_text(paths::LOG_SESSION, &[("file", file), ("id", id)])
            .await?;
        Ok(SessionTrace::from_json(&body)?)
    }

    /// Current status of one resource, without subscribing
    pub async fn resource_status(&self, name: &str) -> Result<StatusSnapshot, ApiError> {
        self.get_json(paths::RESOURCE_STATUS, &[("name", name)]).await
    }

    /// Change a runtime setting
    pub async fn edit_setting(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let response: EditResponse = self
            .get_json(paths::SETTINGS_EDIT, &[("key", key), ("value", value)])
            .await?;

        if response.is_ok() {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                response.error.unwrap_or_else(|| response.result.clone()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{http_base, serve};
    use axum::{extract::Query, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn client(addr: std::net::SocketAddr) -> AdminClient {
        AdminClient::new(&http_base(addr), Duration::from_secs(5)).unwrap()
    }

    async fn backend() -> std::net::SocketAddr {
        let app = Router::new()
            .route(
                "/status/resources",
                get(|| async { Json(json!({"resources": ["redis", "mysql"], "caption": "orders"})) }),
            )
            .route(
                "/status/resource.json",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    match q.get("name").map(String::as_str) {
                        Some("mysql") => Ok(Json(json!({"open": 4}))),
                        _ => Err((AxumStatus::BAD_REQUEST, "resource wasn't found")),
                    }
                }),
            )
            .route(
                "/meta",
                get(|| async {
                    Json(json!({"service_id": "orders", "version": "3.1", "venture": "acme", "env": "live", "pprofEnabled": false}))
                }),
            )
            .route("/logs/files", get(|| async { Json(json!(null)) }))
            .route(
                "/logs/session",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    if q.get("id").map(String::is_empty).unwrap_or(true) {
                        return Err((AxumStatus::BAD_REQUEST, "Invalid trace id".to_string()));
                    }
                    Ok(Json(json!({
                        "caption": format!("{} #{}", q["file"], q["id"]),
                        "request_time": "2024-03-01T10:00:00Z",
                        "responses": [{"time": "2024-03-01T10:00:01Z", "raw_dump": "ok"}],
                        "errors": null,
                        "children": null
                    })))
                }),
            )
            .route(
                "/settings/edit",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    let body: Value = if q.get("key").map(String::as_str) == Some("timeout") {
                        json!({"result": "OK"})
                    } else {
                        json!({"result": "ERR", "error": "setting not registered"})
                    };
                    Json(body)
                }),
            );
        serve(app).await
    }

    #[tokio::test]
    async fn test_resources_are_sorted() {
        let client = client(backend().await);
        let list = client.resources().await.unwrap();
        assert_eq!(list.resources, vec!["mysql", "redis"]);
        assert_eq!(list.caption, "orders");
    }

    #[tokio::test]
    async fn test_meta() {
        let client = client(backend().await);
        assert_eq!(client.meta().await.unwrap().title(), "orders [acme - live]");
    }

    #[tokio::test]
    async fn test_null_file_list() {
        let client = client(backend().await);
        assert!(client.log_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_query_and_error_payload() {
        let client = client(backend().await);

        let session = client.session("api.log", "42").await.unwrap();
        assert_eq!(session.caption, "api.log #42");
        assert_eq!(session.responses.len(), 1);
        assert!(session.duration.is_none());

        let err = client.session("api.log", "").await.unwrap_err();
        match &err {
            ApiError::Status { status, body } => {
                assert_eq!(*status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "Invalid trace id");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.payload(), "Invalid trace id");
    }

    #[tokio::test]
    async fn test_resource_status() {
        let client = client(backend().await);
        assert_eq!(client.resource_status("mysql").await.unwrap()["open"], 4);
        assert!(matches!(
            client.resource_status("kafka").await,
            Err(ApiError::Status { .. })
        ));
    }

    #[tokio::test]
    async fn test_edit_setting() {
        let client = client(backend().await);
        client.edit_setting("timeout", "9s").await.unwrap();

        match client.edit_setting("nope", "1").await {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "setting not registered"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(matches!(client(addr).meta().await, Err(ApiError::Http(_))));
    }
}
