use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::models::Item;
use super::storage::KvStore;

pub const FAVORITES_KEY: &str = "favorites-v1";

/// Favorite items keyed by `mal_id`, serialized as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FavoritesMap {
    items: BTreeMap<u32, Item>,
}

impl FavoritesMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.items.contains_key(&id)
    }

    /// Adds the snapshot when absent, removes it otherwise.
    /// Returns `true` if the item is a favorite afterwards.
    pub fn toggle(&mut self, item: &Item) -> bool {
        match self.items.remove(&item.mal_id) {
            Some(_) => false,
            None => {
                self.items.insert(item.mal_id, item.clone());
                true
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Mirrors the in-memory [`FavoritesMap`] to durable storage.
#[derive(Debug, Clone)]
pub struct FavoritesStore {
    kv: KvStore,
}

impl FavoritesStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Reads the stored map once at startup. Absent or corrupt data yields an
    /// empty map.
    pub fn load(&self) -> FavoritesMap {
        let Some(raw) = self.kv.get(FAVORITES_KEY) else {
            info!("No stored favorites, starting empty");
            return FavoritesMap::new();
        };
        match serde_json::from_str::<FavoritesMap>(&raw) {
            Ok(map) => {
                info!(count = map.len(), "Loaded favorites");
                map
            }
            Err(e) => {
                warn!(error = %e, "Stored favorites are corrupt, starting empty");
                FavoritesMap::new()
            }
        }
    }

    /// Overwrites the stored map. Failures are logged and otherwise ignored;
    /// the in-memory map stays authoritative for the session.
    pub fn save(&self, map: &FavoritesMap) {
        match serde_json::to_string(map) {
            Ok(content) => {
                self.kv.set(FAVORITES_KEY, &content);
                info!(count = map.len(), "Saved favorites");
            }
            Err(e) => warn!(error = %e, "Failed to serialize favorites"),
        }
    }
}
