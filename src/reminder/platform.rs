use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier the platform hands back for a scheduled notification.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Primary,
    Nudge,
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderKind::Primary => f.write_str("primary"),
            ReminderKind::Nudge => f.write_str("nudge"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NotificationRequest {
    pub kind: ReminderKind,
    pub day_index: usize,
    pub title: String,
    pub body: String,
    pub trigger: DateTime<Local>,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("notification queue unavailable: {0}")]
    Unavailable(String),
}

/// Permission service plus the device's local notification queue.
pub trait NotificationPlatform {
    fn request_permission(&mut self) -> Result<PermissionStatus, PlatformError>;

    fn schedule(&mut self, request: &NotificationRequest) -> Result<NotificationId, PlatformError>;

    /// Unknown or already delivered ids are not an error.
    fn cancel(&mut self, id: &NotificationId) -> Result<(), PlatformError>;
}

#[cfg(test)]
#[derive(Debug)]
pub struct RecordingPlatform {
    pub permission: PermissionStatus,
    pub live: Vec<(NotificationId, NotificationRequest)>,
    pub cancelled: Vec<NotificationId>,
    pub fail_cancel: bool,
    /// Refuse every schedule call once this many have succeeded.
    pub schedule_limit: Option<u64>,
    next_id: u64,
}

#[cfg(test)]
impl Default for RecordingPlatform {
    fn default() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            live: Vec::new(),
            cancelled: Vec::new(),
            fail_cancel: false,
            schedule_limit: None,
            next_id: 0,
        }
    }
}

#[cfg(test)]
impl RecordingPlatform {
    pub fn live_of_kind(&self, kind: ReminderKind) -> usize {
        self.live.iter().filter(|(_, req)| req.kind == kind).count()
    }

    pub fn request(&self, id: &NotificationId) -> Option<&NotificationRequest> {
        self.live
            .iter()
            .find(|(live_id, _)| live_id == id)
            .map(|(_, req)| req)
    }
}

#[cfg(test)]
impl NotificationPlatform for RecordingPlatform {
    fn request_permission(&mut self) -> Result<PermissionStatus, PlatformError> {
        Ok(self.permission)
    }

    fn schedule(&mut self, request: &NotificationRequest) -> Result<NotificationId, PlatformError> {
        if self.schedule_limit.is_some_and(|limit| self.next_id >= limit) {
            return Err(PlatformError::Unavailable("queue full".to_string()));
        }
        self.next_id += 1;
        let id = NotificationId::new(format!("n{}", self.next_id));
        self.live.push((id.clone(), request.clone()));
        Ok(id)
    }

    fn cancel(&mut self, id: &NotificationId) -> Result<(), PlatformError> {
        if self.fail_cancel {
            return Err(PlatformError::Unavailable("cancel failed".to_string()));
        }
        self.cancelled.push(id.clone());
        self.live.retain(|(live_id, _)| live_id != id);
        Ok(())
    }
}
