//! Basket store
//!
//! Per-(user, applet) selection documents forming the user's pre-submission
//! basket. Updates merge at activity granularity: an item list replaces that
//! activity's picks wholesale and leaves sibling activities alone. Reads of
//! an absent basket return an empty structure, never an error.

use bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::schemas::{ActivitySelection, BasketEntryDoc, BASKET_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{CohortError, Result};

/// A user's whole basket across applets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Basket {
    pub applets: Vec<AppletSelections>,
}

/// Selections for one applet inside a basket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppletSelections {
    pub applet_id: ObjectId,
    /// Applet-level flag, independent of item-level picks
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub activities: Vec<ActivitySelection>,
}

/// Basket store service
pub struct BasketStore {
    entries: MongoCollection<BasketEntryDoc>,
}

impl BasketStore {
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let entries = mongo.collection::<BasketEntryDoc>(BASKET_COLLECTION).await?;
        Ok(Self { entries })
    }

    /// Full overwrite of the user's basket, used once to sync a pre-login
    /// local basket at first login. Idempotent: identical input yields
    /// identical state.
    pub async fn set_basket(&self, user_id: ObjectId, basket: &Basket) -> Result<()> {
        // The rewrite spans one document per applet, so a concurrent read can
        // observe a partially synced basket. Only the one-shot login sync
        // takes this path; steady-state writes go through update_selection.
        self.entries
            .inner()
            .delete_many(doc! { "user_id": user_id })
            .await
            .map_err(|e| CohortError::Database(format!("Basket clear failed: {}", e)))?;

        for applet in &basket.applets {
            let mut entry = BasketEntryDoc::new(user_id, applet.applet_id);
            entry.selected = applet.selected;
            entry.activities = applet.activities.clone();
            self.entries
                .replace_upsert(
                    doc! { "user_id": user_id, "applet_id": applet.applet_id },
                    entry,
                )
                .await?;
        }

        debug!(
            "Set basket for user {} with {} applets",
            user_id,
            basket.applets.len()
        );
        Ok(())
    }

    /// Merge one selection update at activity granularity.
    ///
    /// `items == None` marks the applet selected without touching item
    /// lists; `items == Some(list)` replaces exactly that activity's items.
    /// The entry is created lazily on first write.
    pub async fn update_selection(
        &self,
        user_id: ObjectId,
        applet_id: ObjectId,
        activity_id: ObjectId,
        items: Option<Vec<ObjectId>>,
    ) -> Result<()> {
        let mut entry = self
            .entries
            .find_one(doc! { "user_id": user_id, "applet_id": applet_id })
            .await?
            .unwrap_or_else(|| BasketEntryDoc::new(user_id, applet_id));

        entry.apply_selection(activity_id, items);

        self.entries
            .replace_upsert(doc! { "user_id": user_id, "applet_id": applet_id }, entry)
            .await?;
        Ok(())
    }

    /// Remove an applet's whole subtree from the basket. Missing subtree is
    /// not an error.
    pub async fn delete_selection(&self, user_id: ObjectId, applet_id: ObjectId) -> Result<()> {
        let removed = self
            .entries
            .delete_one(doc! { "user_id": user_id, "applet_id": applet_id })
            .await?;
        if !removed {
            debug!(
                "delete_selection: no basket entry for user {} applet {}",
                user_id, applet_id
            );
        }
        Ok(())
    }

    /// The user's full current basket; absent entries read as empty
    pub async fn get_basket(&self, user_id: ObjectId) -> Result<Basket> {
        let entries = self.entries.find_many(doc! { "user_id": user_id }).await?;

        Ok(Basket {
            applets: entries
                .into_iter()
                .map(|entry| AppletSelections {
                    applet_id: entry.applet_id,
                    selected: entry.selected,
                    activities: entry.activities,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_basket_default() {
        let basket = Basket::default();
        assert!(basket.applets.is_empty());
    }

    // Clients may send an applet node with only the id; the flag and the
    // activity list must default rather than reject.
    #[test]
    fn test_sparse_applet_node_deserializes() {
        let applet_id = ObjectId::new();
        let json = format!(r#"{{ "applet_id": {{ "$oid": "{}" }} }}"#, applet_id.to_hex());

        let parsed: AppletSelections = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.applet_id, applet_id);
        assert!(!parsed.selected);
        assert!(parsed.activities.is_empty());
    }
}
