//! Engine assembly
//!
//! Wires the resolution services over one MongoDB connection and exposes the
//! operation surface the routing layer consumes. Every operation takes an
//! explicit `Actor`; the engine holds no per-request state.

use bson::oid::ObjectId;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::accounts::AccountService;
use crate::basket::BasketStore;
use crate::config::Args;
use crate::db::MongoClient;
use crate::external::{NoopNotifier, Notifier};
use crate::identity::{Addressor, IdentityRegistry, ProfileView};
use crate::idcodes::IdCodeService;
use crate::logging::AuditLogger;
use crate::passive::PassiveBinder;
use crate::relations::RelationshipGraph;
use crate::roles::RoleResolver;
use crate::schedule::ScheduleService;
use crate::types::{Actor, CohortError, Result};
use crate::users::UserService;

/// The assembled resolution engine
pub struct Engine {
    pub identity: IdentityRegistry,
    pub relations: RelationshipGraph,
    pub passive: PassiveBinder,
    pub idcodes: IdCodeService,
    pub basket: BasketStore,
    pub schedule: ScheduleService,
    pub accounts: AccountService,
    pub users: UserService,
    pub roles: RoleResolver,
}

impl Engine {
    /// Connect to MongoDB and assemble the engine
    pub async fn connect(args: &Args) -> Result<Self> {
        let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
        Self::with_client(&mongo, args, Arc::new(NoopNotifier)).await
    }

    /// Assemble over an existing client, with a notification sink
    pub async fn with_client(
        mongo: &MongoClient,
        args: &Args,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        args.validate().map_err(CohortError::InvalidInput)?;

        let audit = AuditLogger::new();
        if let Some(path) = &args.audit_log_path {
            audit
                .init_file(PathBuf::from(path))
                .await
                .map_err(|e| CohortError::Database(format!("Audit log init failed: {}", e)))?;
        }

        let engine = Self {
            identity: IdentityRegistry::new(mongo).await?,
            relations: RelationshipGraph::new(
                mongo,
                audit.clone(),
                args.id_code_length,
                notifier,
            )
            .await?,
            passive: PassiveBinder::new(mongo, audit.clone(), args.id_code_length).await?,
            idcodes: IdCodeService::new(mongo, audit.clone(), args.id_code_length).await?,
            basket: BasketStore::new(mongo).await?,
            schedule: ScheduleService::new(mongo, audit.clone()).await?,
            accounts: AccountService::new(mongo, audit.clone()).await?,
            users: UserService::new(mongo).await?,
            roles: RoleResolver::new(mongo).await?,
        };

        info!("Cohort engine assembled over database '{}'", mongo.db_name());
        Ok(engine)
    }

    /// Resolve an opaque addressor string to a role-filtered profile view
    pub async fn resolve_identity(&self, addressor: &str, viewer: &Actor) -> Result<ProfileView> {
        let addressor = Addressor::parse(addressor)?;
        self.identity.get_profile(&addressor, viewer).await
    }

    /// Add a directed relationship; see `relations::RelationshipGraph`
    pub async fn add_relationship(
        &self,
        subject: &str,
        label: &str,
        object_addressor: &str,
        object_display_name: &str,
        actor: &Actor,
    ) -> Result<ProfileView> {
        let subject = Addressor::parse(subject)?;
        self.relations
            .add_relationship(&subject, label, object_addressor, object_display_name, actor)
            .await
    }

    /// Add an ID code to a profile, returning the updated view
    pub async fn create_id_code(
        &self,
        profile_id: ObjectId,
        code: &str,
        actor: &Actor,
    ) -> Result<ProfileView> {
        let profile = self.idcodes.create(profile_id, code, actor).await?;
        self.identity.view_of(&profile, actor).await
    }

    /// Remove an ID code, auto-regenerating when it was the last one
    pub async fn remove_id_code(
        &self,
        profile_id: ObjectId,
        code: &str,
        actor: &Actor,
    ) -> Result<ProfileView> {
        let profile = self.idcodes.remove(profile_id, code, actor).await?;
        self.identity.view_of(&profile, actor).await
    }
}
