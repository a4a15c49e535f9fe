//! Identity resolution
//!
//! An opaque addressor string names a profile either by its canonical id or
//! by an account-scoped ID code. The two schemes form a tagged union resolved
//! by one dispatcher; read visibility is role-gated, not public.

mod view;

pub use view::ProfileView;

use bson::{doc, oid::ObjectId};
use std::str::FromStr;
use tracing::debug;

use crate::db::schemas::{IdCodeDoc, ProfileDoc, ID_CODE_COLLECTION, PROFILE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::roles::RoleResolver;
use crate::types::{Actor, CohortError, Result};

/// The addressing schemes a profile can be named by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressor {
    /// Canonical profile document id
    ProfileId(ObjectId),
    /// Account-scoped human-memorable alias
    Code(String),
}

impl Addressor {
    /// Classify an opaque addressor string. A 24-hex string is a profile id;
    /// anything else non-empty is treated as an ID code.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CohortError::InvalidInput("Empty addressor".into()));
        }
        match ObjectId::parse_str(trimmed) {
            Ok(oid) => Ok(Addressor::ProfileId(oid)),
            Err(_) => Ok(Addressor::Code(trimmed.to_string())),
        }
    }
}

impl FromStr for Addressor {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self> {
        Addressor::parse(s)
    }
}

impl From<ObjectId> for Addressor {
    fn from(id: ObjectId) -> Self {
        Addressor::ProfileId(id)
    }
}

/// Resolves addressors to canonical Profile records
pub struct IdentityRegistry {
    profiles: MongoCollection<ProfileDoc>,
    codes: MongoCollection<IdCodeDoc>,
    roles: RoleResolver,
}

impl IdentityRegistry {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        let codes = mongo.collection::<IdCodeDoc>(ID_CODE_COLLECTION).await?;
        let roles = RoleResolver::with_collection(profiles.clone());
        Ok(Self {
            profiles,
            codes,
            roles,
        })
    }

    /// Resolve an addressor to a Profile the viewer is allowed to see.
    ///
    /// ID codes are scoped to the viewer's current account. `NotFound` when
    /// nothing resolves; `Forbidden` when the profile belongs to an applet
    /// the viewer holds no role in and is not the viewer's own.
    pub async fn resolve(&self, addressor: &Addressor, viewer: &Actor) -> Result<ProfileDoc> {
        let profile = self.lookup(addressor, viewer).await?;
        self.check_visibility(&profile, viewer).await?;
        Ok(profile)
    }

    /// Resolve without the visibility gate. For engine-internal callers that
    /// apply their own (stricter) authorization.
    pub async fn lookup(&self, addressor: &Addressor, viewer: &Actor) -> Result<ProfileDoc> {
        match addressor {
            Addressor::ProfileId(id) => self
                .profiles
                .find_one(doc! { "_id": id })
                .await?
                .ok_or_else(|| CohortError::NotFound(format!("No profile with id {}", id))),
            Addressor::Code(code) => {
                let code_doc = self
                    .codes
                    .find_one(doc! { "code": code, "account_id": viewer.account_id })
                    .await?
                    .ok_or_else(|| {
                        CohortError::NotFound(format!("No ID code '{}' in this account", code))
                    })?;

                debug!("Resolved ID code '{}' to profile {}", code, code_doc.profile_id);

                self.profiles
                    .find_one(doc! { "_id": code_doc.profile_id })
                    .await?
                    .ok_or_else(|| {
                        CohortError::NotFound(format!(
                            "ID code '{}' points at a missing profile",
                            code
                        ))
                    })
            }
        }
    }

    /// Role-filtered projection of a resolved profile.
    ///
    /// A non-coordinator viewer sees only display fields of a profile that is
    /// not their own — never raw relationship edges.
    pub async fn get_profile(&self, addressor: &Addressor, viewer: &Actor) -> Result<ProfileView> {
        let profile = self.resolve(addressor, viewer).await?;
        self.view_of(&profile, viewer).await
    }

    /// Project an already-loaded profile for the viewer
    pub async fn view_of(&self, profile: &ProfileDoc, viewer: &Actor) -> Result<ProfileView> {
        if profile.is_owned_by(viewer.user_id)
            || self
                .roles
                .is_coordinator(profile.applet_id, viewer.user_id)
                .await?
        {
            Ok(ProfileView::full(profile))
        } else {
            Ok(ProfileView::display_only(profile))
        }
    }

    async fn check_visibility(&self, profile: &ProfileDoc, viewer: &Actor) -> Result<()> {
        if profile.is_owned_by(viewer.user_id) {
            return Ok(());
        }
        let roles = self
            .roles
            .roles_of(profile.applet_id, viewer.user_id)
            .await?;
        if roles.is_empty() {
            Err(CohortError::Forbidden(
                "You do not have permission to see this user".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// The profile collection, shared with sibling services
    pub fn profiles(&self) -> &MongoCollection<ProfileDoc> {
        &self.profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_as_profile_id() {
        let oid = ObjectId::new();
        let parsed = Addressor::parse(&oid.to_hex()).unwrap();
        assert_eq!(parsed, Addressor::ProfileId(oid));
    }

    #[test]
    fn test_parse_non_hex_as_code() {
        assert_eq!(
            Addressor::parse("ABC123").unwrap(),
            Addressor::Code("ABC123".into())
        );
        // 24 chars but not hex
        assert_eq!(
            Addressor::parse("ZZZZZZZZZZZZZZZZZZZZZZZZ").unwrap(),
            Addressor::Code("ZZZZZZZZZZZZZZZZZZZZZZZZ".into())
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(
            Addressor::parse("  ABC123 ").unwrap(),
            Addressor::Code("ABC123".into())
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            Addressor::parse("   "),
            Err(CohortError::InvalidInput(_))
        ));
    }
}
