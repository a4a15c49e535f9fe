//! User document schema
//!
//! An authenticated human. Authentication itself (passwords, OTP, tokens)
//! is handled outside this engine; the engine only needs the identity record
//! and its home account.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Home/default account; set at registration, never null
    pub account_id: ObjectId,

    /// Display name shown to other members
    #[serde(default)]
    pub display_name: String,

    /// Group memberships
    #[serde(default)]
    pub group_ids: Vec<ObjectId>,

    /// Pending group invitations
    #[serde(default)]
    pub group_invites: Vec<ObjectId>,

    /// Declined group invitations
    #[serde(default)]
    pub declined_invites: Vec<ObjectId>,

    /// Device token for push delivery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Timezone offset reported by the user's device
    #[serde(default)]
    pub timezone: f64,
}

impl UserDoc {
    /// Create a new user document
    pub fn new(account_id: ObjectId, display_name: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            account_id,
            display_name,
            group_ids: Vec::new(),
            group_invites: Vec::new(),
            declined_invites: Vec::new(),
            device_id: None,
            timezone: 0.0,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "account_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("account_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
