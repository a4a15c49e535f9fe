//! Write-tracking metadata embedded in every engine document
//!
//! The engine never hard-deletes identity records (role revocation shrinks a
//! profile's role list, nothing more); `is_deleted` is the soft-delete flag
//! every collection read filters on.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Timestamps and the soft-delete flag carried by every document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    /// Soft-delete flag; reads treat a set flag as absence
    #[serde(default)]
    pub is_deleted: bool,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata for a document being created now
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_metadata_is_live() {
        let metadata = Metadata::new();
        assert!(!metadata.is_deleted);
        assert!(metadata.created_at.is_some());
    }

    // Documents written before the engine stamped metadata read as live
    #[test]
    fn test_empty_document_reads_as_live() {
        let metadata: Metadata = bson::from_document(bson::doc! {}).unwrap();
        assert!(!metadata.is_deleted);
        assert!(metadata.created_at.is_none());
    }
}
