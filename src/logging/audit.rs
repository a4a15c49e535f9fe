//! Audit trail for privileged mutations
//!
//! Every coordinator-gated write (passive profile creation, ID code
//! issue/removal, relationship authoring, coordinator schedules, role
//! grants/revocations) is appended to a JSONL file when configured.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Privileged operations recorded in the audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    PassiveProfileCreated,
    IdCodeCreated,
    IdCodeRemoved,
    IdCodeRegenerated,
    RelationshipAdded,
    CoordinatorScheduleSet,
    RoleGranted,
    RoleRevoked,
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub operation: AuditOperation,
    /// The acting user
    pub actor_id: ObjectId,
    /// Profile the operation targeted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<ObjectId>,
    /// Applet scope of the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applet_id: Option<ObjectId>,
    /// Free-form detail (relationship label, role name, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(operation: AuditOperation, actor_id: ObjectId) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            actor_id,
            target_profile: None,
            applet_id: None,
            detail: None,
        }
    }

    /// Set the target profile
    pub fn with_target(mut self, profile_id: ObjectId) -> Self {
        self.target_profile = Some(profile_id);
        self
    }

    /// Set the applet scope
    pub fn with_applet(mut self, applet_id: ObjectId) -> Self {
        self.applet_id = Some(applet_id);
        self
    }

    /// Attach free-form detail
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger that writes events to a JSONL file.
///
/// Disabled until a file is attached; logging never fails the operation that
/// produced the event.
#[derive(Clone, Default)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
}

#[derive(Default)]
struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLogger {
    /// Create a disabled audit logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));
        inner.path = Some(path.clone());

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    /// Append an audit event
    pub async fn log(&self, event: AuditEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write audit event: {}", e);
            }
            // Flush per event; the trail is the record of privileged writes
            if let Err(e) = writer.flush() {
                error!("Failed to flush audit log: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_jsonl_shape() {
        let actor = ObjectId::new();
        let event = AuditEvent::new(AuditOperation::RelationshipAdded, actor)
            .with_detail("parent-of");

        let line = event.to_jsonl().unwrap();
        assert!(line.contains("relationship_added"));
        assert!(line.contains("parent-of"));
        assert!(!line.contains("target_profile"));
    }

    #[tokio::test]
    async fn test_disabled_logger_is_a_noop() {
        let logger = AuditLogger::new();
        logger
            .log(AuditEvent::new(AuditOperation::IdCodeCreated, ObjectId::new()))
            .await;
    }
}
