//! Session traces: a logged request with its responses, errors and the
//! child requests it made

use crate::{null_as_default, ProtocolError};
use chrono::{DateTime, Utc};
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Markup that has been explicitly accepted for rendering as-is.
///
/// Only [`SessionTrace::shape`] creates these, from the raw dump fields of a
/// trace fetched from the admin backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    fn trust(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text content of the markup, for terminals. Only real tags are
    /// dropped; a stray `<` in a raw dump stays text, and every named or
    /// numeric character reference is decoded.
    pub fn to_plain_text(&self) -> String {
        Html::parse_fragment(&self.0)
            .root_element()
            .text()
            .collect()
    }
}

/// A response or error line of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub time: DateTime<Utc>,

    #[serde(default)]
    pub raw_dump: String,

    #[serde(default)]
    pub error_message: String,

    /// Trusted copy of `raw_dump`
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub dump: Option<TrustedHtml>,

    /// Trusted copy of `error_message`
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub error_html: Option<TrustedHtml>,
}

impl ResponseRecord {
    fn shape(&mut self) {
        if !self.raw_dump.is_empty() {
            self.dump = Some(TrustedHtml::trust(&self.raw_dump));
        }
        if !self.error_message.is_empty() {
            self.error_html = Some(TrustedHtml::trust(&self.error_message));
        }
    }
}

/// A logged request and everything it led to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrace {
    #[serde(default)]
    pub parent_id: u64,

    #[serde(default)]
    pub caption: String,

    pub request_time: DateTime<Utc>,

    #[serde(default)]
    pub raw_request_dump: String,

    #[serde(default)]
    pub error_message: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub responses: Vec<ResponseRecord>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<ResponseRecord>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<SessionTrace>,

    /// Trusted copy of `raw_request_dump`
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub request_dump: Option<TrustedHtml>,

    /// Seconds from `request_time` to the last response or error of this node
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl SessionTrace {
    /// Decode a trace payload without shaping it
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        if value.is_null() {
            return Err(ProtocolError::InvalidFormat("empty session".to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Trust the raw dumps and compute durations, over the whole tree
    pub fn shape(&mut self) {
        if !self.raw_request_dump.is_empty() {
            self.request_dump = Some(TrustedHtml::trust(&self.raw_request_dump));
        }

        for record in self.responses.iter_mut().chain(self.errors.iter_mut()) {
            record.shape();
        }

        self.duration = self.latest_activity().map(|latest| {
            (latest - self.request_time).num_milliseconds() as f64 / 1000.0
        });

        for child in &mut self.children {
            child.shape();
        }
    }

    /// Latest time among this node's own responses and errors
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        self.responses
            .iter()
            .chain(self.errors.iter())
            .map(|r| r.time)
            .max()
    }

    /// Depth-first list of every node with its depth (root is 0)
    pub fn walk(&self) -> Vec<(usize, &SessionTrace)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }

    /// Whether any response or error of this node carried an error message
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
            || !self.error_message.is_empty()
            || self.responses.iter().any(|r| !r.error_message.is_empty())
    }
}
