//! ID code document schema
//!
//! An ID code is an account-scoped, human-memorable alias resolving to
//! exactly one Profile. A profile may carry several codes; the uniqueness
//! scope is (account_id, code).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for ID codes
pub const ID_CODE_COLLECTION: &str = "id_codes";

/// ID code document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct IdCodeDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// The human-memorable alias, unique within its account
    pub code: String,

    /// Profile the code resolves to
    pub profile_id: ObjectId,

    /// Account scoping the code's uniqueness
    pub account_id: ObjectId,
}

impl IdCodeDoc {
    /// Create a new ID code document
    pub fn new(code: String, profile_id: ObjectId, account_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            code,
            profile_id,
            account_id,
        }
    }
}

impl IntoIndexes for IdCodeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "account_id": 1, "code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("account_code_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "profile_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("profile_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for IdCodeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
