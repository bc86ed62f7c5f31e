//! Named levels saved in a preference store

use super::{PreferenceStore, PreferencesError};
use bevy::log::{error, info};
use tilecraft_core::ExportMap;

const LEVEL_PREFIX: &str = "level_";

/// Saved levels in export form, stored under `level_<name>` keys
pub struct LevelLibrary<'a> {
    store: &'a mut dyn PreferenceStore,
}

impl<'a> LevelLibrary<'a> {
    pub fn new(store: &'a mut dyn PreferenceStore) -> Self {
        Self { store }
    }

    pub fn save(&mut self, name: &str, level: &ExportMap) -> Result<(), PreferencesError> {
        self.store
            .set(&format!("{}{}", LEVEL_PREFIX, name), serde_json::to_string(level)?)?;
        info!("Saved level '{}' to library", name);
        Ok(())
    }

    /// Load a saved level. Unreadable entries are logged and treated as missing.
    pub fn load(&self, name: &str) -> Option<ExportMap> {
        let raw = self.store.get(&format!("{}{}", LEVEL_PREFIX, name))?;
        match ExportMap::from_json(&raw) {
            Ok(level) => Some(level),
            Err(e) => {
                error!("Error loading level '{}' from library: {}", name, e);
                None
            }
        }
    }

    /// Names of all saved levels
    pub fn list(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(LEVEL_PREFIX).map(str::to_string))
            .collect()
    }

    pub fn remove(&mut self, name: &str) -> Result<bool, PreferencesError> {
        self.store.remove(&format!("{}{}", LEVEL_PREFIX, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryStore;
    use tilecraft_core::LevelGrid;

    fn export(name: &str) -> ExportMap {
        let mut level = LevelGrid::new(name, 12, 12, 32);
        level.place_tile(1, 2, Some("grass"));
        ExportMap::from_level(&level, None)
    }

    #[test]
    fn test_save_load_list_remove() {
        let mut store = MemoryStore::new();
        store.set("levelEditor_selectedTileset", "null".to_string()).unwrap();
        let mut library = LevelLibrary::new(&mut store);

        library.save("crash_site", &export("Crash Site")).unwrap();
        library.save("beach", &export("Beach")).unwrap();

        assert_eq!(library.list(), vec!["beach".to_string(), "crash_site".to_string()]);
        let loaded = library.load("crash_site").unwrap();
        assert_eq!(loaded.metadata.name, "Crash Site");
        assert_eq!(loaded.tiles, export("Crash Site").tiles);

        assert!(library.remove("beach").unwrap());
        assert!(library.load("beach").is_none());
        assert_eq!(library.list(), vec!["crash_site".to_string()]);
    }

    #[test]
    fn test_corrupt_entry_is_missing() {
        let mut store = MemoryStore::new();
        store.set("level_broken", "{\"mapWidth\":".to_string()).unwrap();
        let library = LevelLibrary::new(&mut store);
        assert!(library.load("broken").is_none());
        assert_eq!(library.list(), vec!["broken".to_string()]);
    }
}
