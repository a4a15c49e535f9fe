//! Role model and resolution
//!
//! A user may hold several roles within one applet; each role lives on the
//! user's Profile for that applet. `is_coordinator` is the single predicate
//! gating every privileged mutation in the engine.

use bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::schemas::{ProfileDoc, PROFILE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{CohortError, Result};

/// Roles a profile can hold within an applet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Reviewer,
    Coordinator,
    Manager,
    Editor,
}

impl Role {
    /// All roles, in the order the account index lists them
    pub const ALL: [Role; 5] = [
        Role::User,
        Role::Reviewer,
        Role::Coordinator,
        Role::Manager,
        Role::Editor,
    ];

    /// String form used as a BSON map key
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Reviewer => "reviewer",
            Role::Coordinator => "coordinator",
            Role::Manager => "manager",
            Role::Editor => "editor",
        }
    }

    /// Whether this role may mutate other users' profiles in its applet
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Coordinator | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "reviewer" => Ok(Role::Reviewer),
            "coordinator" => Ok(Role::Coordinator),
            "manager" => Ok(Role::Manager),
            "editor" => Ok(Role::Editor),
            other => Err(CohortError::InvalidInput(format!(
                "Unknown role: {}",
                other
            ))),
        }
    }
}

/// The set of roles a user holds within one applet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_roles(roles: &[Role]) -> Self {
        let mut set = Self::new();
        for role in roles {
            set.insert(*role);
        }
        set
    }

    /// Add a role, preserving set semantics
    pub fn insert(&mut self, role: Role) {
        if !self.0.contains(&role) {
            self.0.push(role);
        }
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Manager or coordinator — authority over other profiles in the applet
    pub fn is_coordinator(&self) -> bool {
        self.0.iter().any(Role::is_privileged)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }
}

/// Role resolver backed by the profile collection
pub struct RoleResolver {
    profiles: MongoCollection<ProfileDoc>,
}

impl RoleResolver {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        Ok(Self { profiles })
    }

    pub fn with_collection(profiles: MongoCollection<ProfileDoc>) -> Self {
        Self { profiles }
    }

    /// All roles the user holds within the applet
    pub async fn roles_of(&self, applet_id: ObjectId, user_id: ObjectId) -> Result<RoleSet> {
        let profiles = self
            .profiles
            .find_many(doc! { "applet_id": applet_id, "user_id": user_id })
            .await?;

        let mut set = RoleSet::new();
        for profile in &profiles {
            for role in &profile.roles {
                set.insert(*role);
            }
        }
        Ok(set)
    }

    /// Whether the user is a coordinator or manager of the applet.
    ///
    /// Every privileged mutation in the engine is gated on this predicate.
    pub async fn is_coordinator(&self, applet_id: ObjectId, user_id: ObjectId) -> Result<bool> {
        Ok(self.roles_of(applet_id, user_id).await?.is_coordinator())
    }

    /// Fail with Forbidden unless the user coordinates the applet
    pub async fn require_coordinator(&self, applet_id: ObjectId, user_id: ObjectId) -> Result<()> {
        if self.is_coordinator(applet_id, user_id).await? {
            Ok(())
        } else {
            Err(CohortError::Forbidden(
                "You aren't a coordinator or manager of this applet".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("owner").is_err());
    }

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!(Role::from_str("Manager").unwrap(), Role::Manager);
    }

    #[test]
    fn test_coordinator_predicate() {
        assert!(RoleSet::from_roles(&[Role::Coordinator]).is_coordinator());
        assert!(RoleSet::from_roles(&[Role::Manager]).is_coordinator());
        assert!(RoleSet::from_roles(&[Role::User, Role::Manager]).is_coordinator());
        assert!(!RoleSet::from_roles(&[Role::User]).is_coordinator());
        assert!(!RoleSet::from_roles(&[Role::Reviewer, Role::Editor]).is_coordinator());
        assert!(!RoleSet::new().is_coordinator());
    }

    #[test]
    fn test_role_set_no_duplicates() {
        let set = RoleSet::from_roles(&[Role::User, Role::User, Role::Reviewer]);
        assert_eq!(set.iter().count(), 2);
    }
}
