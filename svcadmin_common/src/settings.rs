//! Runtime settings messages and the sorted collection they are merged into

use crate::{null_as_default, ProtocolError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One past value of a setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingSnapshot {
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,

    /// Who made the change
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub value: String,
}

impl SettingSnapshot {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// `2024-03-01 12:00:00`, or `-` for an unusable timestamp
    pub fn time_label(&self) -> String {
        match self.time() {
            Some(time) if self.timestamp > 0 => time.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => "-".to_string(),
        }
    }
}

/// A single runtime setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,

    #[serde(default)]
    pub value: String,

    /// Earlier values, newest first once the setting is in a [`SettingsList`]
    #[serde(
        rename = "values",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub history: Vec<SettingSnapshot>,

    /// Any other fields the backend attaches, such as a description
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            history: Vec::new(),
            extra: Map::new(),
        }
    }

    fn sort_history(&mut self) {
        self.history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    /// Optional human description, if the backend sends one
    pub fn description(&self) -> Option<&str> {
        self.extra.get("description").and_then(Value::as_str)
    }
}

/// Messages on the settings stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SettingEvent {
    /// Full list, sent once right after connecting
    #[serde(rename = "SETTINGS_LIST")]
    List {
        #[serde(default, deserialize_with = "null_as_default")]
        settings: Vec<Setting>,
    },

    /// A single setting was created or changed
    #[serde(rename = "SETTING_CHANGE")]
    Change { setting: Setting },

    /// Any other or missing type tag
    #[serde(other)]
    Unknown,
}

impl SettingEvent {
    /// Decode a settings stream message.
    ///
    /// Messages without a string `type` field decode to [`SettingEvent::Unknown`]
    /// rather than failing; only non-JSON input and malformed known variants
    /// are errors.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        if value.get("type").and_then(Value::as_str).is_none() {
            return Ok(SettingEvent::Unknown);
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Outcome of [`SettingsList::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// An entry with the same key was overwritten in place
    Replaced,
    /// The setting was new and was inserted at its sorted position
    Inserted,
}

/// Settings ordered by case-insensitive key, with unique keys.
///
/// Every mutation goes through this type so the order and uniqueness hold
/// at rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsList {
    items: Vec<Setting>,
}

fn sort_key(key: &str) -> String {
    key.to_uppercase()
}

fn compare(a: &Setting, b: &Setting) -> Ordering {
    sort_key(&a.key).cmp(&sort_key(&b.key))
}

impl SettingsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: Vec<Setting>) -> Self {
        let mut list = Self::new();
        list.replace_all(settings);
        list
    }

    /// Replace the whole collection. Later duplicates of a key win.
    pub fn replace_all(&mut self, settings: Vec<Setting>) {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(settings.len());
        let mut items: Vec<Setting> = Vec::with_capacity(settings.len());
        for mut setting in settings {
            setting.sort_history();
            match index.get(&setting.key) {
                Some(&i) => items[i] = setting,
                None => {
                    index.insert(setting.key.clone(), items.len());
                    items.push(setting);
                }
            }
        }
        items.sort_by(compare);
        self.items = items;
    }

    /// Update the entry with the same key, or insert keeping the order
    pub fn upsert(&mut self, mut setting: Setting) -> Upsert {
        setting.sort_history();
        if let Some(existing) = self.items.iter_mut().find(|s| s.key == setting.key) {
            *existing = setting;
            return Upsert::Replaced;
        }

        // After any keys that compare equal, same as a stable re-sort would
        let key = sort_key(&setting.key);
        let pos = self.items.partition_point(|s| sort_key(&s.key) <= key);
        self.items.insert(pos, setting);
        Upsert::Inserted
    }

    /// Merge a stream event. Returns false for ignored events.
    pub fn apply(&mut self, event: SettingEvent) -> bool {
        match event {
            SettingEvent::List { settings } => {
                self.replace_all(settings);
                true
            }
            SettingEvent::Change { setting } => {
                self.upsert(setting);
                true
            }
            SettingEvent::Unknown => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.items.iter().find(|s| s.key == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Setting> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a SettingsList {
    type Item = &'a Setting;
    type IntoIter = std::slice::Iter<'a, Setting>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
