//! ID code issuance and removal
//!
//! Codes are account-scoped aliases for profiles. A profile must always stay
//! addressable: removing its last code auto-generates a replacement rather
//! than silently losing addressability.

use bson::{doc, oid::ObjectId};
use rand::Rng;
use tracing::info;

use crate::db::schemas::{IdCodeDoc, ProfileDoc, ID_CODE_COLLECTION, PROFILE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::logging::{AuditEvent, AuditLogger, AuditOperation};
use crate::roles::RoleResolver;
use crate::types::{Actor, CohortError, Result};

/// Code alphabet: uppercase alphanumerics minus the ambiguous 0/O/1/I
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Attempts before giving up on minting a unique random code
const MAX_MINT_ATTEMPTS: usize = 8;

/// ID code service
pub struct IdCodeService {
    codes: MongoCollection<IdCodeDoc>,
    profiles: MongoCollection<ProfileDoc>,
    roles: RoleResolver,
    audit: AuditLogger,
    code_length: usize,
}

impl IdCodeService {
    pub async fn new(mongo: &MongoClient, audit: AuditLogger, code_length: usize) -> Result<Self> {
        let codes = mongo.collection::<IdCodeDoc>(ID_CODE_COLLECTION).await?;
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        let roles = RoleResolver::with_collection(profiles.clone());
        Ok(Self {
            codes,
            profiles,
            roles,
            audit,
            code_length,
        })
    }

    /// Generate a random code from the unambiguous alphabet
    pub fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.code_length)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// Add a caller-chosen code to a profile. Coordinator gated; a duplicate
    /// code within the account scope is a Conflict.
    pub async fn create(&self, profile_id: ObjectId, code: &str, actor: &Actor) -> Result<ProfileDoc> {
        let profile = self.load_profile(profile_id).await?;
        self.roles
            .require_coordinator(profile.applet_id, actor.user_id)
            .await?;

        let trimmed = validate_code(code)?;

        // Unique index on (account_id, code) turns races into Conflict
        if self
            .codes
            .find_one(doc! { "account_id": profile.account_id, "code": trimmed })
            .await?
            .is_some()
        {
            return Err(CohortError::Conflict(format!(
                "ID code '{}' already exists in this account",
                trimmed
            )));
        }

        self.codes
            .insert_one(IdCodeDoc::new(
                trimmed.to_string(),
                profile_id,
                profile.account_id,
            ))
            .await?;

        self.audit
            .log(
                AuditEvent::new(AuditOperation::IdCodeCreated, actor.user_id)
                    .with_target(profile_id)
                    .with_applet(profile.applet_id),
            )
            .await;

        Ok(profile)
    }

    /// Remove a code from a profile. Coordinator gated and idempotent on a
    /// missing code. When the last code goes, a replacement is minted so the
    /// profile is never left unaddressable.
    pub async fn remove(&self, profile_id: ObjectId, code: &str, actor: &Actor) -> Result<ProfileDoc> {
        let profile = self.load_profile(profile_id).await?;
        self.roles
            .require_coordinator(profile.applet_id, actor.user_id)
            .await?;

        self.codes
            .delete_one(doc! {
                "profile_id": profile_id,
                "account_id": profile.account_id,
                "code": code.trim(),
            })
            .await?;

        self.audit
            .log(
                AuditEvent::new(AuditOperation::IdCodeRemoved, actor.user_id)
                    .with_target(profile_id)
                    .with_applet(profile.applet_id),
            )
            .await;

        let remaining = self.codes_for(profile_id).await?;
        if should_mint_replacement(&remaining) {
            let minted = self.mint(&profile).await?;
            info!(
                "Auto-generated replacement ID code for profile {}",
                profile_id
            );
            self.audit
                .log(
                    AuditEvent::new(AuditOperation::IdCodeRegenerated, actor.user_id)
                        .with_target(profile_id)
                        .with_applet(profile.applet_id)
                        .with_detail(minted.code),
                )
                .await;
        }

        Ok(profile)
    }

    /// All codes currently addressing a profile
    pub async fn codes_for(&self, profile_id: ObjectId) -> Result<Vec<String>> {
        let docs = self
            .codes
            .find_many(doc! { "profile_id": profile_id })
            .await?;
        Ok(docs.into_iter().map(|d| d.code).collect())
    }

    /// Mint a fresh auto-generated code for a profile, retrying on collision
    pub async fn mint(&self, profile: &ProfileDoc) -> Result<IdCodeDoc> {
        let profile_id = profile
            ._id
            .ok_or_else(|| CohortError::InvalidInput("Profile has no id".into()))?;

        for _ in 0..MAX_MINT_ATTEMPTS {
            let code = self.generate_code();
            // A 24-character draw from the code alphabet can be all hex
            // characters, which the addressor dispatch would classify as a
            // profile id; draw again.
            if ObjectId::parse_str(&code).is_ok() {
                continue;
            }
            let candidate = IdCodeDoc::new(code, profile_id, profile.account_id);
            match self.codes.insert_one(candidate.clone()).await {
                Ok(_) => return Ok(candidate),
                Err(CohortError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(CohortError::Database(
            "Could not mint a unique ID code".into(),
        ))
    }

    async fn load_profile(&self, profile_id: ObjectId) -> Result<ProfileDoc> {
        self.profiles
            .find_one(doc! { "_id": profile_id })
            .await?
            .ok_or_else(|| CohortError::NotFound(format!("No profile with id {}", profile_id)))
    }
}

/// A caller-chosen code must be non-empty and must not itself parse as a
/// profile id, or the addressor dispatch would never reach the code path and
/// the alias could not be resolved.
fn validate_code(code: &str) -> Result<&str> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(CohortError::InvalidInput("Empty ID code".into()));
    }
    if ObjectId::parse_str(trimmed).is_ok() {
        return Err(CohortError::InvalidInput(
            "An ID code must not have the form of a profile id".into(),
        ));
    }
    Ok(trimmed)
}

/// A profile must stay addressable: a removal that leaves no codes behind
/// triggers a replacement mint.
fn should_mint_replacement(remaining: &[String]) -> bool {
    remaining.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_code(len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    #[test]
    fn test_caller_code_must_not_look_like_profile_id() {
        assert!(matches!(
            validate_code("  "),
            Err(CohortError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_code(&ObjectId::new().to_hex()),
            Err(CohortError::InvalidInput(_))
        ));
        assert_eq!(validate_code(" AB23 ").unwrap(), "AB23");
    }

    #[test]
    fn test_replacement_minted_only_when_no_codes_remain() {
        assert!(should_mint_replacement(&[]));
        assert!(!should_mint_replacement(&["AB23CD45".to_string()]));
    }

    #[test]
    fn test_generated_code_alphabet() {
        for _ in 0..50 {
            let code = service_code(8);
            assert_eq!(code.len(), 8);
            for c in code.bytes() {
                assert!(CODE_ALPHABET.contains(&c));
                assert!(!b"0O1I".contains(&c), "ambiguous character in code");
            }
        }
    }
}
