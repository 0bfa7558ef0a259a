use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reminder::platform::{
    NotificationId, NotificationPlatform, NotificationRequest, PermissionStatus, PlatformError,
    ReminderKind,
};

const QUEUE_VERSION: u32 = 1;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PendingNotification {
    pub id: NotificationId,
    pub kind: ReminderKind,
    pub day_index: usize,
    pub title: String,
    pub body: String,
    pub trigger: DateTime<Local>,
}

/// File-backed stand-in for the OS notification queue.
///
/// The whole queue is reread on open and rewritten after every change.
pub struct DeviceQueue {
    path: PathBuf,
    permission: PermissionStatus,
    pending: Vec<PendingNotification>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueueFile {
    version: u32,
    #[serde(default = "default_permission")]
    permission: PermissionStatus,
    #[serde(default)]
    pending: Vec<PendingNotification>,
}

fn default_permission() -> PermissionStatus {
    PermissionStatus::Granted
}

impl DeviceQueue {
    pub fn open(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("unable to read notification queue {}", path.display()));
            }
        };
        if content.trim().is_empty() {
            return Ok(Self {
                path: path.to_path_buf(),
                permission: default_permission(),
                pending: Vec::new(),
            });
        }

        let raw = serde_json::from_str::<QueueFile>(&content).map_err(|err| {
            let line = err.line();
            let column = err.column();
            anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
        })?;
        if raw.version != QUEUE_VERSION {
            bail!(
                "unsupported notification queue version {}; expected version {QUEUE_VERSION}",
                raw.version
            );
        }

        Ok(Self {
            path: path.to_path_buf(),
            permission: raw.permission,
            pending: raw.pending,
        })
    }

    pub fn permission(&self) -> PermissionStatus {
        self.permission
    }

    pub fn set_permission(&mut self, permission: PermissionStatus) -> Result<()> {
        self.permission = permission;
        self.persist()
    }

    pub fn pending(&self) -> &[PendingNotification] {
        &self.pending
    }

    /// Removes and returns everything whose trigger is at or before `now`.
    pub fn deliver_due(&mut self, now: DateTime<Local>) -> Result<Vec<PendingNotification>> {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|notification| notification.trigger <= now);
        self.pending = waiting;
        if !due.is_empty() {
            self.persist()?;
        }
        Ok(due)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create {}", parent.display()))?;
        }
        let payload = QueueFile {
            version: QUEUE_VERSION,
            permission: self.permission,
            pending: self.pending.clone(),
        };
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.path, format!("{text}\n")).with_context(|| {
            format!("unable to write notification queue {}", self.path.display())
        })?;
        Ok(())
    }
}

impl NotificationPlatform for DeviceQueue {
    fn request_permission(&mut self) -> Result<PermissionStatus, PlatformError> {
        Ok(self.permission)
    }

    fn schedule(&mut self, request: &NotificationRequest) -> Result<NotificationId, PlatformError> {
        let id = NotificationId::new(Uuid::new_v4().to_string());
        self.pending.push(PendingNotification {
            id: id.clone(),
            kind: request.kind,
            day_index: request.day_index,
            title: request.title.clone(),
            body: request.body.clone(),
            trigger: request.trigger,
        });
        self.persist()
            .map_err(|err| PlatformError::Unavailable(format!("{err:#}")))?;
        Ok(id)
    }

    fn cancel(&mut self, id: &NotificationId) -> Result<(), PlatformError> {
        let before = self.pending.len();
        self.pending.retain(|notification| &notification.id != id);
        if self.pending.len() == before {
            tracing::debug!(id = %id, "cancel of unknown notification ignored");
            return Ok(());
        }
        self.persist()
            .map_err(|err| PlatformError::Unavailable(format!("{err:#}")))
    }
}
