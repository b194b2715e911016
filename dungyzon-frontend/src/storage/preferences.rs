use chrono::{DateTime, Utc};
use dungyzon_common::SearchResultItem;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;

use super::{KeyValueStore, StorageError};

const DARK_MODE_KEY: &str = "dungyzon_dark_mode";
const HISTORY_KEY: &str = "dungyzon_search_history";
const LAST_SEARCH_KEY: &str = "dungyzon_last_search";
const FAVORITES_KEY: &str = "dungyzon_favorites";

/// Most recent searches kept in history
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

/// Typed view over the persisted front-end entries.
///
/// Values are stored as JSON strings. Unreadable entries fall back to their
/// default and failed writes are logged, never returned.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Error reading stored key \"{}\": {}", key, e);
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(key, raw));
        if let Err(e) = result {
            tracing::warn!("Error setting stored key \"{}\": {}", key, e);
        }
    }

    pub fn dark_mode(&self) -> bool {
        self.read(DARK_MODE_KEY).unwrap_or(true)
    }

    pub fn set_dark_mode(&self, enabled: bool) {
        self.write(DARK_MODE_KEY, &enabled);
    }

    /// Flips the theme flag and returns the new value
    pub fn toggle_dark_mode(&self) -> bool {
        let enabled = !self.dark_mode();
        self.set_dark_mode(enabled);
        enabled
    }

    /// Newest first
    pub fn search_history(&self) -> Vec<String> {
        self.read(HISTORY_KEY).unwrap_or_default()
    }

    /// Puts `term` at the front of the history, dropping an older copy
    /// (case-insensitive) and anything past [`HISTORY_LIMIT`].
    pub fn record_search(&self, term: &str) -> Vec<String> {
        let term = term.trim();
        let mut history = self.search_history();
        if term.is_empty() {
            return history;
        }

        history.retain(|existing| !existing.eq_ignore_ascii_case(term));
        history.insert(0, term.to_string());
        history.truncate(HISTORY_LIMIT);
        self.write(HISTORY_KEY, &history);
        history
    }

    pub fn clear_history(&self) {
        if let Err(e) = self.store.remove(HISTORY_KEY) {
            tracing::warn!("Error clearing search history: {}", e);
        }
    }

    pub fn last_search(&self) -> Option<String> {
        self.read::<String>(LAST_SEARCH_KEY).filter(|s| !s.trim().is_empty())
    }

    pub fn set_last_search(&self, term: &str) {
        self.write(LAST_SEARCH_KEY, &term.trim());
    }

    pub fn favorites(&self) -> Vec<FavoriteEntry> {
        self.read(FAVORITES_KEY).unwrap_or_default()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites().iter().any(|fav| fav.id == id)
    }

    /// Adds or removes `item` by its ASIN. Returns whether it is now a
    /// favorite, or `None` for items without an ASIN.
    pub fn toggle_favorite(&self, item: &SearchResultItem) -> Option<bool> {
        let id = item.asin()?;
        let mut favorites = self.favorites();

        let now_favorite = if favorites.iter().any(|fav| fav.id == id) {
            favorites.retain(|fav| fav.id != id);
            false
        } else {
            favorites.push(FavoriteEntry {
                id: id.to_string(),
                name: item.name().map(String::from),
                image: item.image().map(String::from),
                price: item.price_string().map(String::from),
                added_at: Utc::now(),
            });
            true
        };

        self.write(FAVORITES_KEY, &favorites);
        Some(now_favorite)
    }

    pub fn remove_favorite(&self, id: &str) -> bool {
        let mut favorites = self.favorites();
        let before = favorites.len();
        favorites.retain(|fav| fav.id != id);
        let removed = favorites.len() != before;
        if removed {
            self.write(FAVORITES_KEY, &favorites);
        }
        removed
    }
}
