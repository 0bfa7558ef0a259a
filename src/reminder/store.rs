use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::weekly::DAYS_PER_PLAN;
use crate::reminder::platform::{NotificationId, ReminderKind};

pub const STORAGE_KEY: &str = "planNotificationIds";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to access key-value file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid key-value file {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unable to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key-value persistence, the device's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Key-value store kept as one JSON object on disk, rewritten on every change.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    // An unreadable file must not block writes; the next write replaces it.
    fn read_for_update(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match self.read_all() {
            Err(StoreError::Decode { path, source }) => {
                tracing::warn!(path = %path.display(), error = %source, "overwriting corrupt key-value file");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, format!("{text}\n")).map_err(io_err)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read_for_update()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReminderEntry {
    #[serde(default)]
    pub primary: Option<NotificationId>,
    #[serde(default)]
    pub nudge: Option<NotificationId>,
}

impl ReminderEntry {
    pub fn ids(&self) -> impl Iterator<Item = &NotificationId> {
        self.primary.iter().chain(self.nudge.iter())
    }
}

/// Notification ids per plan day, index 0 being the day the plan was scheduled.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ReminderMap {
    days: [Option<ReminderEntry>; DAYS_PER_PLAN],
}

impl ReminderMap {
    #[cfg(test)]
    pub fn get(&self, day_index: usize) -> Option<&ReminderEntry> {
        self.days.get(day_index)?.as_ref()
    }

    pub fn get_mut(&mut self, day_index: usize) -> Option<&mut ReminderEntry> {
        self.days.get_mut(day_index)?.as_mut()
    }

    /// Out-of-range indices are ignored.
    pub fn insert(&mut self, day_index: usize, entry: ReminderEntry) {
        if let Some(slot) = self.days.get_mut(day_index) {
            *slot = Some(entry);
        }
    }

    /// Sets one id of a day's entry, creating the entry when needed.
    pub fn record(&mut self, day_index: usize, kind: ReminderKind, id: NotificationId) {
        let Some(slot) = self.days.get_mut(day_index) else {
            return;
        };
        let entry = slot.get_or_insert_with(ReminderEntry::default);
        match kind {
            ReminderKind::Primary => entry.primary = Some(id),
            ReminderKind::Nudge => entry.nudge = Some(id),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &ReminderEntry)> {
        self.days
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|entry| (index, entry)))
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    pub fn primary_count(&self) -> usize {
        self.entries().filter(|(_, e)| e.primary.is_some()).count()
    }

    pub fn nudge_count(&self) -> usize {
        self.entries().filter(|(_, e)| e.nudge.is_some()).count()
    }

    /// JSON object keyed by day index, e.g. `{"0": {"primary": "...", "nudge": null}}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let keyed = self
            .entries()
            .map(|(index, entry)| (index.to_string(), entry))
            .collect::<BTreeMap<_, _>>();
        serde_json::to_string(&keyed)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let keyed = serde_json::from_str::<BTreeMap<String, ReminderEntry>>(text)?;
        let mut map = Self::default();
        for (key, entry) in keyed {
            match key.parse::<usize>() {
                Ok(index) if index < DAYS_PER_PLAN => map.insert(index, entry),
                _ => tracing::warn!(key = %key, "ignoring reminder entry with invalid day index"),
            }
        }
        Ok(map)
    }
}

/// Persists the [`ReminderMap`] under a single key.
pub struct ReminderStore<S> {
    kv: S,
    key: String,
}

impl<S: KeyValueStore> ReminderStore<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv,
            key: STORAGE_KEY.to_string(),
        }
    }

    /// Keeps each user's reminders under its own key.
    pub fn for_user(kv: S, user_id: &str) -> Self {
        Self {
            kv,
            key: format!("{STORAGE_KEY}:{user_id}"),
        }
    }

    #[cfg(test)]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn save(&mut self, map: &ReminderMap) -> Result<(), StoreError> {
        let text = map.to_json()?;
        self.kv.set(&self.key, &text)
    }

    /// Absent, unreadable or malformed state loads as an empty map.
    pub fn load(&self) -> ReminderMap {
        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ReminderMap::default(),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "unable to read stored reminders");
                return ReminderMap::default();
            }
        };
        ReminderMap::from_json(&raw).unwrap_or_else(|err| {
            tracing::warn!(key = %self.key, error = %err, "discarding malformed stored reminders");
            ReminderMap::default()
        })
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.kv.remove(&self.key)
    }

    #[cfg(test)]
    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub entries: std::collections::HashMap<String, String>,
    pub fail_set: bool,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_set {
            return Err(StoreError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("storage full"),
            });
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
