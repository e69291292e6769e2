//! Content graph ("database") over all parsed item sets
//!
//! The graph is built once by a single-writer fold over the sets in the
//! order they are given. The first item registered under an id is
//! authoritative; later items with the same id are skipped and recorded as
//! collisions for the diagnostics report.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use templar_items::{Item, ItemId, ItemSet, ItemSetId};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ROOT_ITEM_ID;

/// Name reported for items that are not owned by any set
pub const BUILT_IN_SET_NAME: &str = "<built-in>";

/// A duplicate item id that was skipped during graph construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCollision {
    /// The colliding id
    pub id: ItemId,
    /// Path of the item that was kept
    pub kept_path: String,
    /// Name of the set owning the kept item
    pub kept_set: String,
    /// Path of the item that was skipped
    pub skipped_path: String,
    /// Name of the set owning the skipped item
    pub skipped_set: String,
    /// File the skipped item came from
    pub skipped_origin: PathBuf,
}

impl std::fmt::Display for ItemCollision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "duplicate item id {}: kept {} from '{}', skipped {} from '{}'",
            self.id, self.kept_path, self.kept_set, self.skipped_path, self.skipped_set
        )
    }
}

/// Indexed graph of every item across all sets
#[derive(Debug, Default)]
pub struct ContentDatabase {
    items: HashMap<ItemId, Arc<Item>>,
    order: Vec<ItemId>,
    children: HashMap<ItemId, Vec<ItemId>>,
    owners: HashMap<ItemId, ItemSetId>,
    sets: HashMap<ItemSetId, Arc<ItemSet>>,
    set_order: Vec<ItemSetId>,
    sets_by_name: HashMap<String, ItemSetId>,
    collisions: Vec<ItemCollision>,
}

impl ContentDatabase {
    /// Build the graph from all sets, in order
    pub fn build(sets: Vec<ItemSet>) -> Self {
        let mut db = Self::default();
        db.register(Arc::new(root_item()), None);

        for set in sets {
            let set = Arc::new(set);
            db.sets_by_name.insert(set.name.to_lowercase(), set.id);
            if db.sets.insert(set.id, set.clone()).is_none() {
                db.set_order.push(set.id);
            }
            for item in set.items() {
                db.register(item.clone(), Some(&set));
            }
        }

        debug!(
            items = db.items.len(),
            sets = db.set_order.len(),
            collisions = db.collisions.len(),
            "Built content database"
        );
        db
    }

    fn register(&mut self, item: Arc<Item>, set: Option<&Arc<ItemSet>>) {
        if let Some(existing) = self.items.get(&item.id) {
            let kept_set = self
                .owners
                .get(&item.id)
                .and_then(|id| self.sets.get(id))
                .map(|s| s.name.clone())
                .unwrap_or_else(|| BUILT_IN_SET_NAME.to_string());
            let collision = ItemCollision {
                id: item.id,
                kept_path: existing.path.clone(),
                kept_set,
                skipped_path: item.path.clone(),
                skipped_set: set
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| BUILT_IN_SET_NAME.to_string()),
                skipped_origin: item.origin.clone(),
            };
            warn!(%collision, "Item id collision");
            self.collisions.push(collision);
            return;
        }

        // The root anchors the tree and has no parent link of its own.
        if item.id != ROOT_ITEM_ID {
            self.children.entry(item.parent_id).or_default().push(item.id);
        }
        if let Some(set) = set {
            self.owners.insert(item.id, set.id);
        }
        self.order.push(item.id);
        self.items.insert(item.id, item);
    }

    /// Look up an item by id
    pub fn get(&self, id: &ItemId) -> Option<&Arc<Item>> {
        self.items.get(id)
    }

    /// The synthetic root item
    pub fn root(&self) -> Option<&Arc<Item>> {
        self.items.get(&ROOT_ITEM_ID)
    }

    /// Children of an item in registration order (empty if none)
    pub fn children(&self, id: &ItemId) -> Vec<&Arc<Item>> {
        self.children
            .get(id)
            .map(|ids| ids.iter().filter_map(|c| self.items.get(c)).collect())
            .unwrap_or_default()
    }

    /// Parent of an item, if it is part of the graph
    pub fn parent(&self, item: &Item) -> Option<&Arc<Item>> {
        if item.id == ROOT_ITEM_ID {
            return None;
        }
        self.items.get(&item.parent_id)
    }

    /// Ancestors of an item, nearest first
    pub fn ancestors(&self, item: &Item) -> Vec<&Arc<Item>> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(item);
        while let Some(node) = current {
            // Guard against malformed parent links looping back.
            if ancestors.iter().any(|a: &&Arc<Item>| a.id == node.id) || node.id == item.id {
                break;
            }
            ancestors.push(node);
            current = self.parent(node);
        }
        ancestors
    }

    /// Set owning an item
    pub fn owning_set(&self, item_id: &ItemId) -> Option<&Arc<ItemSet>> {
        self.owners.get(item_id).and_then(|id| self.sets.get(id))
    }

    /// Look up a set by name (case-insensitive)
    pub fn set_by_name(&self, name: &str) -> Option<&Arc<ItemSet>> {
        self.sets_by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.sets.get(id))
    }

    /// Look up a set by id
    pub fn set(&self, id: &ItemSetId) -> Option<&Arc<ItemSet>> {
        self.sets.get(id)
    }

    /// Sets in registration order
    pub fn sets(&self) -> impl Iterator<Item = &Arc<ItemSet>> {
        self.set_order.iter().filter_map(|id| self.sets.get(id))
    }

    /// Items matching a predicate, in registration order
    pub fn items_matching<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a Arc<Item>> + 'a
    where
        P: Fn(&Item) -> bool + 'a,
    {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter(move |item| predicate(item))
    }

    /// Number of registered items, including the root
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether only the root is registered
    pub fn is_empty(&self) -> bool {
        self.items.len() <= 1
    }

    /// Collisions recorded during construction
    pub fn collisions(&self) -> &[ItemCollision] {
        &self.collisions
    }
}

fn root_item() -> Item {
    Item {
        id: ROOT_ITEM_ID,
        name: "sitecore".to_string(),
        parent_id: Uuid::nil(),
        path: "/sitecore".to_string(),
        origin: PathBuf::new(),
        set_id: Uuid::nil(),
        shared_fields: Vec::new(),
        template_id: Uuid::nil(),
        template_name: "Root".to_string(),
        versions: Vec::new(),
        hints: HashMap::new(),
    }
}
