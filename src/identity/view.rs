//! Role-filtered profile projections
//!
//! What a viewer gets back when resolving someone else's identity depends on
//! their authority: coordinators of the applet (and the profile's owner) see
//! relationship edges and schedule layers, everyone else only display fields.

use bson::{oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::schemas::ProfileDoc;
use crate::roles::Role;

/// Projection of a Profile returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub profile_id: ObjectId,
    pub applet_id: ObjectId,
    pub display_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Whether this is a passive subject (no login behind it)
    pub passive: bool,

    /// Present only in the full (coordinator/owner) view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,

    /// Relationship edges; present only in the full view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knows: Option<HashMap<String, Vec<ObjectId>>>,

    /// Self-authored overrides; present only in the full view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_defined: Option<Document>,

    /// Coordinator-authored overrides; present only in the full view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator_defined: Option<Document>,
}

impl ProfileView {
    /// Display-only projection for non-coordinator viewers
    pub fn display_only(profile: &ProfileDoc) -> Self {
        Self {
            profile_id: profile._id.unwrap_or_default(),
            applet_id: profile.applet_id,
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
            passive: profile.is_passive(),
            roles: None,
            knows: None,
            user_defined: None,
            coordinator_defined: None,
        }
    }

    /// Full projection for the profile's owner or an applet coordinator
    pub fn full(profile: &ProfileDoc) -> Self {
        Self {
            roles: Some(profile.roles.clone()),
            knows: Some(profile.knows.clone()),
            user_defined: Some(profile.user_defined.clone()),
            coordinator_defined: Some(profile.coordinator_defined.clone()),
            ..Self::display_only(profile)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_only_hides_edges() {
        let mut profile = ProfileDoc::new_for_user(
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            Role::User,
            "Alex".to_string(),
        );
        profile._id = Some(ObjectId::new());
        profile.add_known("parent-of", ObjectId::new());

        let view = ProfileView::display_only(&profile);
        assert!(view.knows.is_none());
        assert!(view.user_defined.is_none());
        assert_eq!(view.display_name, "Alex");

        let full = ProfileView::full(&profile);
        assert_eq!(
            full.knows.as_ref().map(|k| k.len()),
            Some(1),
            "full view carries relationship edges"
        );
    }
}
