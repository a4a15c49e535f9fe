//! Account profile document schema
//!
//! Join entity between a User and an Account they can act within, carrying a
//! denormalized role -> applet-ids index for fast listing. The index MUST
//! stay consistent with the underlying Profile records; the only code that
//! writes either is `accounts::AccountService`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::roles::Role;

/// Collection name for account profiles
pub const ACCOUNT_PROFILE_COLLECTION: &str = "account_profiles";

/// Account profile document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AccountProfileDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// The account; its identity is the owning user's id
    pub account_id: ObjectId,

    /// The member user
    pub user_id: ObjectId,

    /// Display name of the account
    #[serde(default)]
    pub account_name: String,

    /// Role name -> ordered applet ids the user holds in that role.
    /// An applet id appears here iff a non-deleted Profile exists for
    /// (user_id, applet_id) carrying that role.
    #[serde(default)]
    pub applets: HashMap<String, Vec<ObjectId>>,
}

impl AccountProfileDoc {
    /// Create a membership record for a user within an account
    pub fn new(account_id: ObjectId, user_id: ObjectId, account_name: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            account_id,
            user_id,
            account_name,
            applets: HashMap::new(),
        }
    }

    /// The account is owned by the user whose id it carries
    pub fn is_owner(&self) -> bool {
        self.account_id == self.user_id
    }

    /// Applet ids the user holds in the given role
    pub fn applets_for(&self, role: Role) -> &[ObjectId] {
        self.applets
            .get(role.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

}

impl IntoIndexes for AccountProfileDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "account_id": 1, "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("account_user_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AccountProfileDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applets_for_keyed_by_role_name() {
        let mut ap = AccountProfileDoc::new(ObjectId::new(), ObjectId::new(), "Lab".into());
        let applet = ObjectId::new();
        ap.applets
            .insert(Role::User.as_str().to_string(), vec![applet]);

        assert_eq!(ap.applets_for(Role::User), &[applet]);
        assert!(ap.applets_for(Role::Manager).is_empty());
    }

    #[test]
    fn test_owner_is_user_whose_id_the_account_carries() {
        let user = ObjectId::new();
        assert!(AccountProfileDoc::new(user, user, "Own".into()).is_owner());
        assert!(!AccountProfileDoc::new(ObjectId::new(), user, "Other".into()).is_owner());
    }
}
