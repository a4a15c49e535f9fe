//! Passive subject profiles
//!
//! A passive subject never logs in: a coordinator records them (a caregiver's
//! child, a patient's relative) and they are addressed only via ID code. A
//! passive profile is addressable by at least one code from the moment it is
//! created.

use bson::{doc, oid::ObjectId};
use tracing::{error, info};

use crate::db::schemas::{ProfileDoc, PROFILE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::idcodes::IdCodeService;
use crate::logging::{AuditEvent, AuditLogger, AuditOperation};
use crate::roles::RoleResolver;
use crate::types::{Actor, CohortError, Result};

/// Creates and addresses login-less subject profiles
pub struct PassiveBinder {
    profiles: MongoCollection<ProfileDoc>,
    roles: RoleResolver,
    codes: IdCodeService,
    audit: AuditLogger,
}

impl PassiveBinder {
    pub async fn new(mongo: &MongoClient, audit: AuditLogger, code_length: usize) -> Result<Self> {
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        let roles = RoleResolver::with_collection(profiles.clone());
        let codes = IdCodeService::new(mongo, audit.clone(), code_length).await?;
        Ok(Self {
            profiles,
            roles,
            codes,
            audit,
        })
    }

    /// Create a passive subject profile within an applet and mint its first
    /// ID code. Coordinator gated.
    ///
    /// Returns the stored profile and the code it is addressable by.
    pub async fn create_passive(
        &self,
        applet_id: ObjectId,
        account_id: ObjectId,
        display_name: &str,
        actor: &Actor,
    ) -> Result<(ProfileDoc, String)> {
        self.roles
            .require_coordinator(applet_id, actor.user_id)
            .await?;

        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(CohortError::InvalidInput(
                "A passive subject needs a display name".into(),
            ));
        }

        let mut profile = ProfileDoc::new_passive(applet_id, account_id, trimmed.to_string());
        let id = self.profiles.insert_one(profile.clone()).await?;
        profile._id = Some(id);

        // Must be addressable from creation; a profile whose first code
        // cannot be minted is rolled back rather than left unreachable
        let code = match self.codes.mint(&profile).await {
            Ok(code) => code,
            Err(e) => {
                if let Err(rollback) = self.profiles.soft_delete(doc! { "_id": id }).await {
                    error!(
                        "Failed to roll back codeless passive profile {}: {}",
                        id, rollback
                    );
                }
                return Err(e);
            }
        };

        info!(
            "Created passive subject profile {} in applet {}",
            id, applet_id
        );
        self.audit
            .log(
                AuditEvent::new(AuditOperation::PassiveProfileCreated, actor.user_id)
                    .with_target(id)
                    .with_applet(applet_id),
            )
            .await;

        Ok((profile, code.code))
    }
}
