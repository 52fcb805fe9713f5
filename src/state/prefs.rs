//! UI-local preferences (favorites, alert settings) behind a small key-value
//! interface, so a persistent backing store can replace the in-memory one
//! without touching any view code.

use std::collections::BTreeSet;

use dashmap::DashMap;

use crate::detector::alerts::AlertSettings;
use crate::error::Result;

pub trait PrefStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    /// Keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

/// Default backing: lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    entries: DashMap<String, String>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefStore for MemoryPrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

const FAVORITE_PREFIX: &str = "favorite:";

pub struct Favorites<S: PrefStore> {
    store: S,
}

impl<S: PrefStore> Favorites<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn contains(&self, contest_id: &str) -> bool {
        self.store.get(&favorite_key(contest_id)).is_some()
    }

    /// Add if absent, remove if present. Returns the new membership.
    pub fn toggle(&self, contest_id: &str) -> bool {
        let key = favorite_key(contest_id);
        if self.store.get(&key).is_some() {
            self.store.remove(&key);
            false
        } else {
            self.store.set(&key, String::new());
            true
        }
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.store
            .keys_with_prefix(FAVORITE_PREFIX)
            .into_iter()
            .filter_map(|k| k.strip_prefix(FAVORITE_PREFIX).map(str::to_string))
            .collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn favorite_key(contest_id: &str) -> String {
    format!("{FAVORITE_PREFIX}{contest_id}")
}

// ---------------------------------------------------------------------------
// Alert settings: serialized as JSON values
// ---------------------------------------------------------------------------

const ALERT_PREFIX: &str = "alerts:";

pub fn load_alerts<S: PrefStore + ?Sized>(store: &S, contest_id: &str) -> AlertSettings {
    store
        .get(&format!("{ALERT_PREFIX}{contest_id}"))
        .and_then(|raw| match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(contest_id, "discarding unreadable alert settings: {e}");
                None
            }
        })
        .unwrap_or_default()
}

pub fn save_alerts<S: PrefStore + ?Sized>(
    store: &S,
    contest_id: &str,
    settings: &AlertSettings,
) -> Result<()> {
    store.set(&format!("{ALERT_PREFIX}{contest_id}"), serde_json::to_string(settings)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::alerts::AlertKind;

    #[test]
    fn toggle_is_set_add_remove() {
        let favorites = Favorites::new(MemoryPrefs::new());
        assert!(favorites.toggle("2"));
        assert!(favorites.toggle("1"));
        assert!(favorites.contains("1"));
        assert_eq!(favorites.ids().into_iter().collect::<Vec<_>>(), vec!["1", "2"]);

        assert!(!favorites.toggle("1"));
        assert!(!favorites.contains("1"));
        assert_eq!(favorites.ids().len(), 1);
    }

    #[test]
    fn alert_settings_round_trip_through_store() {
        let prefs = MemoryPrefs::new();
        assert_eq!(load_alerts(&prefs, "1"), AlertSettings::default());

        let mut settings = AlertSettings::default();
        settings.toggle(AlertKind::GameStart);
        save_alerts(&prefs, "1", &settings).unwrap();
        assert!(load_alerts(&prefs, "1").game_start);
        assert!(!load_alerts(&prefs, "2").game_start);
    }

    #[test]
    fn unreadable_alert_settings_fall_back_to_default() {
        let prefs = MemoryPrefs::new();
        prefs.set("alerts:1", "{not json".to_string());
        assert_eq!(load_alerts(&prefs, "1"), AlertSettings::default());
    }
}
