//! Seams to excluded collaborators
//!
//! The engine never expands JSON-LD and never sends mail; it consumes these
//! capabilities through traits the embedding application implements.

use async_trait::async_trait;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::types::Result;

/// Display metadata for an applet, produced by the JSON-LD expansion cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayMeta {
    pub name: String,
    pub image: String,
    pub description: String,
}

/// Read-only view of the applet catalog owned by the surrounding platform
#[async_trait]
pub trait AppletDirectory: Send + Sync {
    /// Display metadata for an applet
    async fn display_meta(&self, applet_id: ObjectId) -> Result<DisplayMeta>;

    /// Whether the applet has been deleted from the catalog
    async fn is_deleted(&self, applet_id: ObjectId) -> Result<bool>;
}

/// Fire-and-forget notification hook. Implementations must not block the
/// calling operation; the engine spawns and never awaits delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A relationship was authored between two profiles
    async fn relationship_added(&self, subject: ObjectId, label: &str, object: ObjectId);
}

/// No-op notifier for embeddings without a delivery channel
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn relationship_added(&self, _subject: ObjectId, _label: &str, _object: ObjectId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier() {
        NoopNotifier
            .relationship_added(ObjectId::new(), "parent-of", ObjectId::new())
            .await;
    }
}
