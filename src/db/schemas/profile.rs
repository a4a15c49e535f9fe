//! Profile document schema
//!
//! A Profile is the unit of role-scoped identity for one (person, applet)
//! pair. Passive subjects — people who never log in but are referenced by an
//! active user — are Profiles with `user_id` unset. Role revocation shrinks
//! the role list; the document itself is never hard-deleted, preserving
//! relationship and schedule history.

use bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::roles::Role;

/// Collection name for profiles
pub const PROFILE_COLLECTION: &str = "profiles";

/// Profile document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProfileDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Applet this profile is scoped to
    pub applet_id: ObjectId,

    /// Account owning the applet
    pub account_id: ObjectId,

    /// Owning user login; None for passive subjects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ObjectId>,

    /// Roles held within the applet
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Distinguishes a full profile from a lightweight reference.
    /// At most one active (user_id, applet_id, profile=true) record exists
    /// per user per applet; passive subjects are always `false`.
    #[serde(default)]
    pub profile: bool,

    /// Cached display name, refreshed by the owner or a manager
    #[serde(default)]
    pub display_name: String,

    /// Cached avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Self-authored override map; `schedule` lives under here
    #[serde(default)]
    pub user_defined: Document,

    /// Coordinator-authored override map, never merged with user_defined
    #[serde(default)]
    pub coordinator_defined: Document,

    /// Directed typed relationship edges: label -> related profile ids
    #[serde(default)]
    pub knows: HashMap<String, Vec<ObjectId>>,

    /// Device token for push delivery, fanned out at login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Timezone offset of the owning user's device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<f64>,
}

impl ProfileDoc {
    /// Create a profile for an authenticated user with one initial role
    pub fn new_for_user(
        applet_id: ObjectId,
        account_id: ObjectId,
        user_id: ObjectId,
        role: Role,
        display_name: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            applet_id,
            account_id,
            user_id: Some(user_id),
            roles: vec![role],
            profile: true,
            display_name,
            avatar_url: None,
            user_defined: Document::new(),
            coordinator_defined: Document::new(),
            knows: HashMap::new(),
            device_id: None,
            timezone: None,
        }
    }

    /// Create a passive subject profile: no login, addressed only by ID code
    pub fn new_passive(applet_id: ObjectId, account_id: ObjectId, display_name: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            applet_id,
            account_id,
            user_id: None,
            roles: Vec::new(),
            profile: false,
            display_name,
            avatar_url: None,
            user_defined: Document::new(),
            coordinator_defined: Document::new(),
            knows: HashMap::new(),
            device_id: None,
            timezone: None,
        }
    }

    /// A passive subject has no login behind it
    pub fn is_passive(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether the given user owns this profile
    pub fn is_owned_by(&self, user_id: ObjectId) -> bool {
        self.user_id == Some(user_id)
    }

    /// Append a relationship edge, set-like: duplicate adds are no-ops.
    /// Returns true when the edge was actually added.
    pub fn add_known(&mut self, label: &str, other: ObjectId) -> bool {
        let entries = self.knows.entry(label.to_string()).or_default();
        if entries.contains(&other) {
            false
        } else {
            entries.push(other);
            true
        }
    }

    /// Whether an edge with this label to the given profile exists
    pub fn knows_of(&self, label: &str, other: ObjectId) -> bool {
        self.knows
            .get(label)
            .map(|ids| ids.contains(&other))
            .unwrap_or(false)
    }

    /// Grant a role; returns false when already held
    pub fn grant_role(&mut self, role: Role) -> bool {
        if self.roles.contains(&role) {
            false
        } else {
            self.roles.push(role);
            true
        }
    }

    /// Write the self-authored schedule layer
    pub fn set_user_schedule(&mut self, schedule: Bson) {
        self.user_defined.insert("schedule", schedule);
    }

    /// Write the coordinator-authored schedule layer
    pub fn set_coordinator_schedule(&mut self, schedule: Bson) {
        self.coordinator_defined.insert("schedule", schedule);
    }
}

impl IntoIndexes for ProfileDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One active full profile per (user, applet); passive subjects
            // and lightweight references (profile=false) are exempt.
            (
                doc! { "user_id": 1, "applet_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! {
                            "profile": true,
                            "user_id": { "$exists": true },
                        })
                        .name("user_applet_profile_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "applet_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("applet_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "account_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("account_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProfileDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProfileDoc {
        ProfileDoc::new_for_user(
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            Role::User,
            "Alex".to_string(),
        )
    }

    #[test]
    fn test_add_known_is_set_like() {
        let mut profile = sample();
        let other = ObjectId::new();

        assert!(profile.add_known("parent-of", other));
        assert!(!profile.add_known("parent-of", other));
        assert_eq!(profile.knows["parent-of"], vec![other]);
    }

    #[test]
    fn test_add_known_separate_labels() {
        let mut profile = sample();
        let other = ObjectId::new();

        assert!(profile.add_known("parent-of", other));
        assert!(profile.add_known("caregiver-of", other));
        assert!(profile.knows_of("parent-of", other));
        assert!(profile.knows_of("caregiver-of", other));
    }

    #[test]
    fn test_grant_role_set_like() {
        let mut profile = sample();

        assert!(profile.grant_role(Role::Reviewer));
        assert!(!profile.grant_role(Role::Reviewer));
        assert_eq!(profile.roles, vec![Role::User, Role::Reviewer]);
    }

    #[test]
    fn test_schedule_layers_independent() {
        let mut profile = sample();
        profile.set_user_schedule(Bson::String("mine".into()));
        profile.set_coordinator_schedule(Bson::String("theirs".into()));

        assert_eq!(
            profile.user_defined.get("schedule"),
            Some(&Bson::String("mine".into()))
        );
        assert_eq!(
            profile.coordinator_defined.get("schedule"),
            Some(&Bson::String("theirs".into()))
        );

        profile.set_user_schedule(Bson::String("updated".into()));
        assert_eq!(
            profile.coordinator_defined.get("schedule"),
            Some(&Bson::String("theirs".into()))
        );
    }

    #[test]
    fn test_passive_profile_shape() {
        let profile =
            ProfileDoc::new_passive(ObjectId::new(), ObjectId::new(), "Sam".to_string());
        assert!(profile.is_passive());
        assert!(!profile.profile);
        assert!(profile.roles.is_empty());
    }
}
