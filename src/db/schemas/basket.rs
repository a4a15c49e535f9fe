//! Basket entry document schema
//!
//! One document per (user, applet): a pre-submission staging area of
//! selected activities and items. The document never needs to pre-exist for
//! reads; an absent entry is an empty selection.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for basket entries
pub const BASKET_COLLECTION: &str = "basket_entries";

/// Item picks for one activity within a basket entry
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivitySelection {
    /// The selected activity
    pub activity_id: ObjectId,

    /// Item picks within the activity. The list is atomic: an update
    /// replaces it wholesale, never unions into it.
    #[serde(default)]
    pub items: Vec<ObjectId>,
}

/// Basket entry document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BasketEntryDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user
    pub user_id: ObjectId,

    /// Applet this entry's selections belong to
    pub applet_id: ObjectId,

    /// Applet-level selection flag, independent of item-level picks
    #[serde(default)]
    pub selected: bool,

    /// Per-activity item picks
    #[serde(default)]
    pub activities: Vec<ActivitySelection>,
}

impl BasketEntryDoc {
    /// Create an empty entry for a (user, applet) pair
    pub fn new(user_id: ObjectId, applet_id: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            user_id,
            applet_id,
            selected: false,
            activities: Vec::new(),
        }
    }

    /// Merge one selection update at activity granularity.
    ///
    /// `items == None` marks the applet selected without altering any item
    /// list. `items == Some(list)` replaces exactly that activity's items,
    /// leaving sibling activities untouched. Applying the same update twice
    /// yields the same state as applying it once.
    pub fn apply_selection(&mut self, activity_id: ObjectId, items: Option<Vec<ObjectId>>) {
        match items {
            None => {
                self.selected = true;
            }
            Some(items) => {
                match self
                    .activities
                    .iter_mut()
                    .find(|a| a.activity_id == activity_id)
                {
                    Some(existing) => existing.items = items,
                    None => self.activities.push(ActivitySelection { activity_id, items }),
                }
            }
        }
    }

    /// Item picks for one activity, if any
    pub fn items_for(&self, activity_id: ObjectId) -> Option<&[ObjectId]> {
        self.activities
            .iter()
            .find(|a| a.activity_id == activity_id)
            .map(|a| a.items.as_slice())
    }
}

impl IntoIndexes for BasketEntryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1, "applet_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_applet_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for BasketEntryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_selection_idempotent() {
        let mut entry = BasketEntryDoc::new(ObjectId::new(), ObjectId::new());
        let activity = ObjectId::new();
        let items = vec![ObjectId::new(), ObjectId::new()];

        entry.apply_selection(activity, Some(items.clone()));
        let once = entry.clone();
        entry.apply_selection(activity, Some(items));

        assert_eq!(entry.activities, once.activities);
        assert_eq!(entry.selected, once.selected);
    }

    #[test]
    fn test_apply_selection_cross_activity_isolation() {
        let mut entry = BasketEntryDoc::new(ObjectId::new(), ObjectId::new());
        let a = ObjectId::new();
        let b = ObjectId::new();
        let x = ObjectId::new();
        let y = ObjectId::new();

        entry.apply_selection(a, Some(vec![x]));
        entry.apply_selection(b, Some(vec![y]));

        assert_eq!(entry.items_for(a), Some(&[x][..]));
        assert_eq!(entry.items_for(b), Some(&[y][..]));
    }

    #[test]
    fn test_item_list_replaced_not_unioned() {
        let mut entry = BasketEntryDoc::new(ObjectId::new(), ObjectId::new());
        let activity = ObjectId::new();
        let x = ObjectId::new();
        let y = ObjectId::new();

        entry.apply_selection(activity, Some(vec![x]));
        entry.apply_selection(activity, Some(vec![y]));

        assert_eq!(entry.items_for(activity), Some(&[y][..]));
    }

    #[test]
    fn test_null_items_only_sets_applet_flag() {
        let mut entry = BasketEntryDoc::new(ObjectId::new(), ObjectId::new());
        let activity = ObjectId::new();
        let x = ObjectId::new();

        entry.apply_selection(activity, Some(vec![x]));
        entry.apply_selection(activity, None);

        assert!(entry.selected);
        assert_eq!(entry.items_for(activity), Some(&[x][..]));
    }
}
