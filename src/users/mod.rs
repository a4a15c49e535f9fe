//! User device registration
//!
//! The device token and timezone a client reports at login are stored on the
//! user record and fanned out to every Profile the user holds, so push
//! delivery scoped to an applet never joins back to the user record. Logout
//! clears the token everywhere.

use bson::{doc, oid::ObjectId, DateTime};
use tracing::debug;

use crate::db::schemas::{ProfileDoc, UserDoc, PROFILE_COLLECTION, USER_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{CohortError, Result};

/// User record maintenance service
pub struct UserService {
    users: MongoCollection<UserDoc>,
    profiles: MongoCollection<ProfileDoc>,
}

impl UserService {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        let profiles = mongo.collection::<ProfileDoc>(PROFILE_COLLECTION).await?;
        Ok(Self { users, profiles })
    }

    /// Load a user record
    pub async fn get(&self, user_id: ObjectId) -> Result<UserDoc> {
        self.users
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or_else(|| CohortError::NotFound(format!("No user with id {}", user_id)))
    }

    /// Record the device token and timezone reported at login and fan them
    /// out to all of the user's profiles.
    pub async fn set_device(
        &self,
        user_id: ObjectId,
        device_id: &str,
        timezone: f64,
    ) -> Result<()> {
        self.users
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": {
                        "device_id": device_id,
                        "timezone": timezone,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;

        let result = self
            .profiles
            .inner()
            .update_many(
                doc! { "user_id": user_id },
                doc! {
                    "$set": {
                        "device_id": device_id,
                        "timezone": timezone,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await
            .map_err(|e| CohortError::Database(format!("Device fan-out failed: {}", e)))?;

        debug!(
            "Fanned device registration out to {} profiles of user {}",
            result.modified_count, user_id
        );
        Ok(())
    }

    /// Drop the device token at logout, on the user record and every profile
    pub async fn clear_device(&self, user_id: ObjectId) -> Result<()> {
        self.users
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$unset": { "device_id": "" },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await?;

        self.profiles
            .inner()
            .update_many(
                doc! { "user_id": user_id },
                doc! {
                    "$unset": { "device_id": "" },
                    "$set": { "metadata.updated_at": DateTime::now() },
                },
            )
            .await
            .map_err(|e| CohortError::Database(format!("Device clear failed: {}", e)))?;
        Ok(())
    }
}
