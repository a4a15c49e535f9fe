//! Relationship graph
//!
//! Directed, typed edges between profiles, stored inside the subject's
//! `knows` map. Authoring is coordinator gated. Each addition triggers at
//! most one reciprocal edge on the object profile, from a fixed label table;
//! inference never cascades and never removes a manually authored edge.

mod labels;

pub use labels::{is_known_label, reciprocal_of, KNOWN_LABELS};

use bson::{doc, oid::ObjectId, Bson};
use std::sync::Arc;
use tracing::debug;

use crate::db::schemas::{ProfileDoc, PROFILE_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::external::Notifier;
use crate::identity::{Addressor, IdentityRegistry, ProfileView};
use crate::logging::{AuditEvent, AuditLogger, AuditOperation};
use crate::passive::PassiveBinder;
use crate::roles::RoleResolver;
use crate::types::{Actor, CohortError, Result};

/// Relationship graph service
pub struct RelationshipGraph {
    profiles: MongoCollection<ProfileDoc>,
    identity: IdentityRegistry,
    roles: RoleResolver,
    passive: PassiveBinder,
    audit: AuditLogger,
    notifier: Arc<dyn Notifier>,
}

impl RelationshipGraph {
    pub async fn new(
        mongo: &MongoClient,
        audit: AuditLogger,
        code_length: usize,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        let identity = IdentityRegistry::new(mongo).await?;
        let roles = RoleResolver::with_collection(profiles.clone());
        let passive = PassiveBinder::new(mongo, audit.clone(), code_length).await?;
        Ok(Self {
            profiles,
            identity,
            roles,
            passive,
            audit,
            notifier,
        })
    }

    /// Add a directed edge subject -[label]-> object.
    ///
    /// The object addressor that resolves to nothing names a new passive
    /// subject, created in the subject's applet and stamped with
    /// `object_display_name`. Duplicate adds are no-ops. The configured
    /// reciprocal label, when one exists, yields exactly one reverse edge on
    /// the object.
    pub async fn add_relationship(
        &self,
        subject: &Addressor,
        label: &str,
        object_addressor: &str,
        object_display_name: &str,
        actor: &Actor,
    ) -> Result<ProfileView> {
        if !is_known_label(label) {
            return Err(CohortError::InvalidInput(format!(
                "Unknown relationship label: {}",
                label
            )));
        }

        let subject_profile = self.identity.lookup(subject, actor).await?;
        let subject_id = subject_profile
            ._id
            .ok_or_else(|| CohortError::InvalidInput("Subject profile has no id".into()))?;

        self.roles
            .require_coordinator(subject_profile.applet_id, actor.user_id)
            .await?;

        let object_profile = self
            .resolve_or_create_object(&subject_profile, object_addressor, object_display_name, actor)
            .await?;
        let object_id = object_profile
            ._id
            .ok_or_else(|| CohortError::InvalidInput("Object profile has no id".into()))?;

        // Atomic set-add: concurrent coordinators cannot lose each other's
        // edges the way load-then-save would.
        self.profiles
            .add_to_set(
                doc! { "_id": subject_id },
                &format!("knows.{}", label),
                Bson::ObjectId(object_id),
            )
            .await?;

        self.infer_reciprocal(label, subject_id, object_id).await?;

        // Fire-and-forget; delivery is never awaited on the request path
        let notifier = Arc::clone(&self.notifier);
        let notify_label = label.to_string();
        tokio::spawn(async move {
            notifier
                .relationship_added(subject_id, &notify_label, object_id)
                .await;
        });

        self.audit
            .log(
                AuditEvent::new(AuditOperation::RelationshipAdded, actor.user_id)
                    .with_target(subject_id)
                    .with_applet(subject_profile.applet_id)
                    .with_detail(label),
            )
            .await;

        let updated = self
            .identity
            .lookup(&Addressor::ProfileId(subject_id), actor)
            .await?;
        self.identity.view_of(&updated, actor).await
    }

    /// One level of inference only: the configured reciprocal edge on the
    /// object, nothing further.
    async fn infer_reciprocal(
        &self,
        label: &str,
        subject_id: ObjectId,
        object_id: ObjectId,
    ) -> Result<()> {
        if let Some(reciprocal) = reciprocal_of(label) {
            debug!(
                "Inferring reciprocal edge {} -[{}]-> {}",
                object_id, reciprocal, subject_id
            );
            self.profiles
                .add_to_set(
                    doc! { "_id": object_id },
                    &format!("knows.{}", reciprocal),
                    Bson::ObjectId(subject_id),
                )
                .await?;
        }
        Ok(())
    }

    async fn resolve_or_create_object(
        &self,
        subject: &ProfileDoc,
        object_addressor: &str,
        object_display_name: &str,
        actor: &Actor,
    ) -> Result<ProfileDoc> {
        let addressor = Addressor::parse(object_addressor)?;
        match self.identity.resolve(&addressor, actor).await {
            Ok(profile) => {
                ensure_same_applet(subject, &profile)?;
                Ok(profile)
            }
            Err(CohortError::NotFound(_)) => {
                let (profile, _code) = self
                    .passive
                    .create_passive(
                        subject.applet_id,
                        subject.account_id,
                        object_display_name,
                        actor,
                    )
                    .await?;
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }
}

/// Both endpoints of an edge live in the applet the actor coordinates; a
/// foreign profile id is not a valid object even when it resolves, since the
/// reciprocal write lands on the object document.
fn ensure_same_applet(subject: &ProfileDoc, object: &ProfileDoc) -> Result<()> {
    if subject.applet_id == object.applet_id {
        Ok(())
    } else {
        Err(CohortError::Forbidden(
            "That profile does not belong to this applet".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;

    // Edge bookkeeping at the document level: one authored edge plus its
    // configured reciprocal, idempotent under repeats.
    #[test]
    fn test_edge_and_reciprocal_bookkeeping() {
        let applet = ObjectId::new();
        let account = ObjectId::new();
        let coordinator = ObjectId::new();

        let mut subject = ProfileDoc::new_for_user(
            applet,
            account,
            coordinator,
            Role::Coordinator,
            "Dana".to_string(),
        );
        let mut object = ProfileDoc::new_passive(applet, account, "Morgan".to_string());
        let subject_id = ObjectId::new();
        let object_id = ObjectId::new();
        subject._id = Some(subject_id);
        object._id = Some(object_id);

        let label = "caregiver-of";
        assert!(is_known_label(label));

        for _ in 0..2 {
            subject.add_known(label, object_id);
            if let Some(reciprocal) = reciprocal_of(label) {
                object.add_known(reciprocal, subject_id);
            }
        }

        assert_eq!(subject.knows["caregiver-of"], vec![object_id]);
        assert_eq!(object.knows["cared-for-by"], vec![subject_id]);
        // Inference stays one hop: nothing landed back on the subject
        assert!(!subject.knows.contains_key("cared-for-by"));
    }

    #[test]
    fn test_cross_applet_object_rejected() {
        let account = ObjectId::new();
        let subject = ProfileDoc::new_for_user(
            ObjectId::new(),
            account,
            ObjectId::new(),
            Role::Coordinator,
            "Dana".to_string(),
        );

        let foreign = ProfileDoc::new_passive(ObjectId::new(), account, "Far".to_string());
        assert!(matches!(
            ensure_same_applet(&subject, &foreign),
            Err(CohortError::Forbidden(_))
        ));

        let local = ProfileDoc::new_passive(subject.applet_id, account, "Near".to_string());
        assert!(ensure_same_applet(&subject, &local).is_ok());
    }

    #[test]
    fn test_unlabeled_knows_gets_no_reciprocal() {
        assert!(is_known_label("knows"));
        assert!(reciprocal_of("knows").is_none());
    }
}
