//! Account membership and the role index
//!
//! AccountProfile denormalizes role -> applet-ids from Profile records for
//! fast listing. To keep the two consistent, this service is the only write
//! path for either side of a role grant: both documents change here or not
//! at all.

use bson::{doc, oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::schemas::{
    AccountProfileDoc, ProfileDoc, ACCOUNT_PROFILE_COLLECTION, PROFILE_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::external::AppletDirectory;
use crate::logging::{AuditEvent, AuditLogger, AuditOperation};
use crate::roles::{Role, RoleResolver};
use crate::types::{Actor, CohortError, Result};

/// One account a user can act within
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_id: ObjectId,
    pub account_name: String,
    /// The account identified by the user's own id is the one they own
    pub owned: bool,
}

/// An applet listing decorated with display metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppletListing {
    pub applet_id: ObjectId,
    pub name: String,
    pub image: String,
    pub description: String,
}

/// Account membership service
pub struct AccountService {
    profiles: MongoCollection<ProfileDoc>,
    account_profiles: MongoCollection<AccountProfileDoc>,
    roles: RoleResolver,
    audit: AuditLogger,
}

impl AccountService {
    pub async fn new(mongo: &MongoClient, audit: AuditLogger) -> Result<Self> {
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        let account_profiles = mongo
            .collection::<AccountProfileDoc>(ACCOUNT_PROFILE_COLLECTION)
            .await?;
        let roles = RoleResolver::with_collection(profiles.clone());
        Ok(Self {
            profiles,
            account_profiles,
            roles,
            audit,
        })
    }

    /// Grant a role on an applet to a user, updating the Profile and the
    /// AccountProfile index in one code path.
    ///
    /// Authorized for coordinators of the applet and for the account owner
    /// (who bootstraps the first roles of a fresh applet).
    pub async fn grant_role(
        &self,
        applet_id: ObjectId,
        account_id: ObjectId,
        account_name: &str,
        user_id: ObjectId,
        display_name: &str,
        role: Role,
        actor: &Actor,
    ) -> Result<ProfileDoc> {
        self.require_account_authority(applet_id, account_id, actor)
            .await?;

        let profile = match self
            .profiles
            .find_one(doc! {
                "applet_id": applet_id,
                "user_id": user_id,
                "profile": true,
            })
            .await?
        {
            Some(mut existing) => {
                if existing.grant_role(role) {
                    self.profiles
                        .update_one(
                            doc! { "_id": existing._id },
                            doc! {
                                "$addToSet": { "roles": role.as_str() },
                                "$set": { "metadata.updated_at": DateTime::now() },
                            },
                        )
                        .await?;
                }
                existing
            }
            None => {
                let mut created = ProfileDoc::new_for_user(
                    applet_id,
                    account_id,
                    user_id,
                    role,
                    display_name.to_string(),
                );
                // The unique (user_id, applet_id, profile=true) index turns a
                // concurrent double-create into Conflict.
                let id = self.profiles.insert_one(created.clone()).await?;
                created._id = Some(id);
                created
            }
        };

        self.index_applet(account_id, account_name, user_id, role, applet_id)
            .await?;

        info!(
            "Granted {} on applet {} to user {}",
            role, applet_id, user_id
        );
        self.audit
            .log(
                AuditEvent::new(AuditOperation::RoleGranted, actor.user_id)
                    .with_target(profile._id.unwrap_or_default())
                    .with_applet(applet_id)
                    .with_detail(role.as_str()),
            )
            .await;

        Ok(profile)
    }

    /// Revoke a role. The Profile survives with a shrunk role list so its
    /// relationship and schedule history is preserved; the AccountProfile
    /// index drops the applet from that role's list.
    pub async fn revoke_role(
        &self,
        applet_id: ObjectId,
        account_id: ObjectId,
        user_id: ObjectId,
        role: Role,
        actor: &Actor,
    ) -> Result<()> {
        self.require_account_authority(applet_id, account_id, actor)
            .await?;

        self.profiles
            .update_one(
                doc! {
                    "applet_id": applet_id,
                    "user_id": user_id,
                    "profile": true,
                },
                doc! {
                    "$pull": { "roles": role.as_str() },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        self.account_profiles
            .update_one(
                doc! { "account_id": account_id, "user_id": user_id },
                doc! {
                    "$pull": { format!("applets.{}", role.as_str()): applet_id },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        self.audit
            .log(
                AuditEvent::new(AuditOperation::RoleRevoked, actor.user_id)
                    .with_applet(applet_id)
                    .with_detail(role.as_str()),
            )
            .await;
        Ok(())
    }

    /// All accounts the user can act within
    pub async fn get_accounts(&self, user_id: ObjectId) -> Result<Vec<AccountSummary>> {
        let memberships = self
            .account_profiles
            .find_many(doc! { "user_id": user_id })
            .await?;

        Ok(memberships
            .into_iter()
            .map(|m| AccountSummary {
                account_id: m.account_id,
                account_name: m.account_name.clone(),
                owned: m.is_owner(),
            })
            .collect())
    }

    /// Applet ids the actor holds in a role within their current account
    pub async fn applet_ids_for_role(&self, actor: &Actor, role: Role) -> Result<Vec<ObjectId>> {
        let membership = self
            .account_profiles
            .find_one(doc! { "account_id": actor.account_id, "user_id": actor.user_id })
            .await?
            .ok_or_else(|| {
                CohortError::Forbidden("You are not a member of this account".into())
            })?;

        Ok(membership.applets_for(role).to_vec())
    }

    /// Applets the actor holds in a role, decorated with display metadata
    /// from the (external) applet directory. Deleted applets are filtered.
    pub async fn applets_for_role(
        &self,
        actor: &Actor,
        role: Role,
        directory: &dyn AppletDirectory,
    ) -> Result<Vec<AppletListing>> {
        let ids = self.applet_ids_for_role(actor, role).await?;

        let mut listings = Vec::with_capacity(ids.len());
        for applet_id in ids {
            if directory.is_deleted(applet_id).await? {
                continue;
            }
            let meta = directory.display_meta(applet_id).await?;
            listings.push(AppletListing {
                applet_id,
                name: meta.name,
                image: meta.image,
                description: meta.description,
            });
        }
        Ok(listings)
    }

    /// Rename an account. Only its owner may; the name is denormalized onto
    /// every membership record.
    pub async fn update_account_name(
        &self,
        account_id: ObjectId,
        actor: &Actor,
        account_name: &str,
    ) -> Result<()> {
        if actor.user_id != account_id {
            return Err(CohortError::Forbidden(
                "You are not authorized to change this account's name".into(),
            ));
        }

        self.account_profiles
            .inner()
            .update_many(
                doc! { "account_id": account_id },
                doc! {
                    "$set": {
                        "account_name": account_name,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
            .map_err(|e| CohortError::Database(format!("Account rename failed: {}", e)))?;
        Ok(())
    }

    /// Upsert the membership record and index the applet under the role
    async fn index_applet(
        &self,
        account_id: ObjectId,
        account_name: &str,
        user_id: ObjectId,
        role: Role,
        applet_id: ObjectId,
    ) -> Result<()> {
        if self
            .account_profiles
            .find_one(doc! { "account_id": account_id, "user_id": user_id })
            .await?
            .is_none()
        {
            let membership =
                AccountProfileDoc::new(account_id, user_id, account_name.to_string());
            match self.account_profiles.insert_one(membership).await {
                Ok(_) => {}
                // Concurrent creation; the $addToSet below still applies
                Err(CohortError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.account_profiles
            .add_to_set(
                doc! { "account_id": account_id, "user_id": user_id },
                &format!("applets.{}", role.as_str()),
                bson::Bson::ObjectId(applet_id),
            )
            .await?;
        Ok(())
    }

    /// Coordinators of the applet and the account owner may manage roles
    async fn require_account_authority(
        &self,
        applet_id: ObjectId,
        account_id: ObjectId,
        actor: &Actor,
    ) -> Result<()> {
        if actor.user_id == account_id {
            return Ok(());
        }
        self.roles
            .require_coordinator(applet_id, actor.user_id)
            .await
    }
}
