//! Svcadmin Common - Shared protocol library for the service admin client
//!
//! This crate contains the message shapes exchanged with a service's admin
//! backend (JSON over HTTP and WebSocket) and the pure state that the client
//! reconciles them into.

pub mod format;
pub mod settings;
pub mod trace;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use format::{format_duration, format_percentage, format_std_duration};
pub use settings::{Setting, SettingEvent, SettingSnapshot, SettingsList, Upsert};
pub use trace::{ResponseRecord, SessionTrace, TrustedHtml};

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
}

/// Live status pushed by the backend. Opaque: the whole value is replaced on
/// every message.
pub type StatusSnapshot = serde_json::Value;

/// Decode one status stream message
pub fn decode_snapshot(text: &str) -> Result<StatusSnapshot, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Resource name that always refers to the service itself
pub const SELF_RESOURCE: &str = "self";

/// Response of `GET status/resources`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceList {
    /// Names of the resources the service reports status for
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<String>,

    /// Display name of the service itself
    #[serde(default)]
    pub caption: String,
}

impl ResourceList {
    /// Sort resource names in place, the order tabs are shown in
    pub fn sorted(mut self) -> Self {
        self.resources.sort();
        self
    }

    /// Whether `name` can be selected as a status target
    pub fn contains(&self, name: &str) -> bool {
        name == SELF_RESOURCE || self.resources.iter().any(|r| r == name)
    }

    /// All selectable targets, `self` first
    pub fn targets(&self) -> Vec<String> {
        std::iter::once(SELF_RESOURCE.to_string())
            .chain(self.resources.iter().cloned())
            .collect()
    }
}

/// Response of `GET meta`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMeta {
    #[serde(default)]
    pub service_id: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub venture: String,

    #[serde(default)]
    pub env: String,

    #[serde(default, rename = "pprofEnabled")]
    pub pprof_enabled: bool,
}

impl ServiceMeta {
    /// Window title, e.g. `billing [acme - staging]`
    pub fn title(&self) -> String {
        format!("{} [{} - {}]", self.service_id, self.venture, self.env)
    }
}

/// Response of `GET settings/edit`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditResponse {
    #[serde(default)]
    pub result: String,

    #[serde(default)]
    pub error: Option<String>,
}

impl EditResponse {
    pub fn is_ok(&self) -> bool {
        self.result == "OK"
    }
}

/// Go encodes empty slices as `null`; read those as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Admin endpoint paths, relative to the backend base URL
pub mod paths {
    /// Resource names and service caption
    pub const RESOURCES: &str = "status/resources";

    /// One-shot status of a single resource (`?name=`)
    pub const RESOURCE_STATUS: &str = "status/resource.json";

    /// Service identification
    pub const META: &str = "meta";

    /// Session log file names
    pub const LOG_FILES: &str = "logs/files";

    /// Session trace (`?file=&id=`)
    pub const LOG_SESSION: &str = "logs/session";

    /// Setting edit (`?key=&value=`)
    pub const SETTINGS_EDIT: &str = "settings/edit";

    /// Self status stream
    pub const WS_SELF_STATUS: &str = "/status/ws-status";

    /// Per-resource status stream (`?resource=`)
    pub const WS_RESOURCE_STATUS: &str = "/status/ws-resource";

    /// Settings stream
    pub const WS_SETTINGS: &str = "/settings/ws";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_list_null_resources() {
        let list: ResourceList =
            serde_json::from_str(r#"{"resources": null, "caption": "billing"}"#).unwrap();
        assert!(list.resources.is_empty());
        assert_eq!(list.caption, "billing");
        assert!(list.contains("self"));
        assert!(!list.contains("mysql"));
    }

    #[test]
    fn test_resource_list_sorted_targets() {
        let list: ResourceList =
            serde_json::from_str(r#"{"resources": ["redis", "mysql"], "caption": "api"}"#)
                .unwrap();
        let list = list.sorted();
        assert_eq!(list.resources, vec!["mysql", "redis"]);
        assert_eq!(list.targets(), vec!["self", "mysql", "redis"]);
        assert!(list.contains("redis"));
    }

    #[test]
    fn test_service_meta_title() {
        let meta: ServiceMeta = serde_json::from_str(
            r#"{"service_id": "billing", "version": "1.2", "venture": "acme", "env": "staging", "pprofEnabled": true}"#,
        )
        .unwrap();
        assert_eq!(meta.title(), "billing [acme - staging]");
        assert!(meta.pprof_enabled);
    }

    #[test]
    fn test_edit_response() {
        let ok: EditResponse = serde_json::from_str(r#"{"result": "OK"}"#).unwrap();
        assert!(ok.is_ok());

        let err: EditResponse =
            serde_json::from_str(r#"{"result": "ERR", "error": "unknown setting"}"#).unwrap();
        assert!(!err.is_ok());
        assert_eq!(err.error.as_deref(), Some("unknown setting"));
    }

    #[test]
    fn test_decode_snapshot() {
        let snapshot = decode_snapshot(r#"{"rps": 12, "goroutines": 40}"#).unwrap();
        assert_eq!(snapshot["rps"], 12);

        assert!(matches!(
            decode_snapshot("{not json"),
            Err(ProtocolError::Decode(_))
        ));
    }
}
