//! Schedule overrides
//!
//! Two independent layers per profile: `user_defined.schedule` written by
//! the profile's owner, and `coordinator_defined.schedule` written by applet
//! coordination staff for someone else's profile. The layers never overwrite
//! each other; the engine hands both back and the reader picks a precedence.

use bson::{doc, oid::ObjectId, Bson, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{ProfileDoc, PROFILE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::logging::{AuditEvent, AuditLogger, AuditOperation};
use crate::roles::{Role, RoleResolver, RoleSet};
use crate::types::{Actor, CohortError, Result};

/// Both schedule layers of one profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleLayers {
    /// Self-authored schedule, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_defined: Option<Bson>,

    /// Coordinator-authored schedule, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator_defined: Option<Bson>,
}

/// Schedule override service
pub struct ScheduleService {
    profiles: MongoCollection<ProfileDoc>,
    roles: RoleResolver,
    audit: AuditLogger,
}

impl ScheduleService {
    pub async fn new(mongo: &MongoClient, audit: AuditLogger) -> Result<Self> {
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        let roles = RoleResolver::with_collection(profiles.clone());
        Ok(Self {
            profiles,
            roles,
            audit,
        })
    }

    /// Write the acting user's own schedule layer for an applet.
    ///
    /// Requires holding role `user` on the applet — deliberately not
    /// coordinator gated; a user always edits their own schedule.
    pub async fn set_self(
        &self,
        applet_id: ObjectId,
        actor: &Actor,
        schedule: Bson,
    ) -> Result<()> {
        let roles = self.roles.roles_of(applet_id, actor.user_id).await?;
        if !roles.contains(Role::User) {
            return Err(CohortError::Forbidden(
                "You aren't a user of this applet".into(),
            ));
        }

        let result = self
            .profiles
            .update_one(
                doc! {
                    "applet_id": applet_id,
                    "user_id": actor.user_id,
                    "profile": true,
                },
                doc! {
                    "$set": {
                        "user_defined.schedule": schedule,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(CohortError::Forbidden(
                "You aren't a user of this applet".into(),
            ));
        }
        Ok(())
    }

    /// Write the coordinator layer on another user's profile.
    ///
    /// Requires coordinating the applet AND that the target profile belongs
    /// to that same applet — coordinating some other applet is not enough.
    pub async fn set_other(
        &self,
        profile_id: ObjectId,
        applet_id: ObjectId,
        actor: &Actor,
        schedule: Bson,
    ) -> Result<()> {
        let roles = self.roles.roles_of(applet_id, actor.user_id).await?;
        let profile = self.load(profile_id).await?;
        authorize_coordinator_write(&roles, &profile, applet_id)?;

        self.profiles
            .update_one(
                doc! { "_id": profile_id },
                doc! {
                    "$set": {
                        "coordinator_defined.schedule": schedule,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        self.audit
            .log(
                AuditEvent::new(AuditOperation::CoordinatorScheduleSet, actor.user_id)
                    .with_target(profile_id)
                    .with_applet(applet_id),
            )
            .await;
        Ok(())
    }

    /// Both layers of a profile's schedule. Visible to the profile's owner
    /// and to coordinators of its applet.
    pub async fn get(&self, profile_id: ObjectId, actor: &Actor) -> Result<ScheduleLayers> {
        let profile = self.load(profile_id).await?;

        let allowed = profile.is_owned_by(actor.user_id)
            || self
                .roles
                .is_coordinator(profile.applet_id, actor.user_id)
                .await?;
        if !allowed {
            return Err(CohortError::Forbidden(
                "You do not have permission to see this schedule".into(),
            ));
        }

        Ok(ScheduleLayers {
            user_defined: profile.user_defined.get("schedule").cloned(),
            coordinator_defined: profile.coordinator_defined.get("schedule").cloned(),
        })
    }

    async fn load(&self, profile_id: ObjectId) -> Result<ProfileDoc> {
        self.profiles
            .find_one(doc! { "_id": profile_id })
            .await?
            .ok_or_else(|| CohortError::NotFound(format!("No profile with id {}", profile_id)))
    }
}

/// The coordinator-layer write gate: the actor must coordinate the applet AND
/// the target profile must belong to that same applet. Coordinating some
/// other applet is not enough.
fn authorize_coordinator_write(
    roles: &RoleSet,
    profile: &ProfileDoc,
    applet_id: ObjectId,
) -> Result<()> {
    if !roles.is_coordinator() {
        return Err(CohortError::Forbidden(
            "You aren't a coordinator or manager of this applet".into(),
        ));
    }
    if profile.applet_id != applet_id {
        return Err(CohortError::Forbidden(
            "That profile is not a user of this applet".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_in(applet_id: ObjectId) -> ProfileDoc {
        ProfileDoc::new_for_user(
            applet_id,
            ObjectId::new(),
            ObjectId::new(),
            Role::User,
            "Sam".to_string(),
        )
    }

    #[test]
    fn test_non_coordinator_cannot_write_other_schedule() {
        let applet = ObjectId::new();
        let roles = RoleSet::from_roles(&[Role::User, Role::Reviewer]);
        assert!(matches!(
            authorize_coordinator_write(&roles, &profile_in(applet), applet),
            Err(CohortError::Forbidden(_))
        ));
    }

    #[test]
    fn test_coordinator_of_other_applet_rejected() {
        let roles = RoleSet::from_roles(&[Role::Coordinator]);
        let profile = profile_in(ObjectId::new());
        assert!(matches!(
            authorize_coordinator_write(&roles, &profile, ObjectId::new()),
            Err(CohortError::Forbidden(_))
        ));
    }

    #[test]
    fn test_coordinator_writes_within_own_applet() {
        let applet = ObjectId::new();
        let roles = RoleSet::from_roles(&[Role::Manager]);
        assert!(authorize_coordinator_write(&roles, &profile_in(applet), applet).is_ok());
    }
}
