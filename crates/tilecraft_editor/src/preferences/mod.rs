//! Persistent editor preferences over an injected key/value store

mod file;
mod library;

pub use file::{FileStore, PreferencesError};
pub use library::LevelLibrary;

use bevy::log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use tilecraft_core::{default_entity_definitions, EntityDefinition, EntityLayer, TilesetDefinition};

const SELECTED_TILESET_KEY: &str = "levelEditor_selectedTileset";
const CUSTOM_TILESETS_KEY: &str = "levelEditor_customTilesets";
const ENTITY_DEFINITIONS_KEY: &str = "levelEditor_entityDefinitions";
const ENTITY_LAYERS_KEY: &str = "levelEditor_entityLayers";

/// String key/value storage for preferences and saved levels
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), PreferencesError>;
    /// Returns whether the key existed
    fn remove(&mut self, key: &str) -> Result<bool, PreferencesError>;
    fn keys(&self) -> Vec<String>;
}

/// In-memory store, for tests and sessions that should not persist
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PreferencesError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, PreferencesError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// Read a JSON value; unparseable data is logged and treated as absent
pub(crate) fn read_json<T: DeserializeOwned>(store: &dyn PreferenceStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable preference '{}': {}", key, e);
            None
        }
    }
}

pub(crate) fn write_json<T: Serialize>(
    store: &mut dyn PreferenceStore,
    key: &str,
    value: &T,
) -> Result<(), PreferencesError> {
    store.set(key, serde_json::to_string(value)?)
}

/// What the editor remembers between sessions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorPreferences {
    pub selected_tileset: Option<String>,
    pub custom_tilesets: Vec<TilesetDefinition>,
    /// User-made definitions only; built-ins are never stored
    pub custom_entity_definitions: Vec<EntityDefinition>,
    pub entity_layers: Vec<EntityLayer>,
}

impl EditorPreferences {
    /// Load preferences, falling back to defaults for anything missing or unreadable
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let builtin: Vec<String> = default_entity_definitions()
            .into_iter()
            .map(|d| d.id)
            .collect();
        let custom_entity_definitions: Vec<EntityDefinition> =
            read_json(store, ENTITY_DEFINITIONS_KEY).unwrap_or_default();

        Self {
            selected_tileset: read_json(store, SELECTED_TILESET_KEY).unwrap_or_default(),
            custom_tilesets: read_json(store, CUSTOM_TILESETS_KEY).unwrap_or_default(),
            custom_entity_definitions: custom_entity_definitions
                .into_iter()
                .filter(|d| !builtin.contains(&d.id))
                .collect(),
            entity_layers: read_json(store, ENTITY_LAYERS_KEY).unwrap_or_default(),
        }
    }

    pub fn save(&self, store: &mut dyn PreferenceStore) -> Result<(), PreferencesError> {
        write_json(store, SELECTED_TILESET_KEY, &self.selected_tileset)?;
        write_json(store, CUSTOM_TILESETS_KEY, &self.custom_tilesets)?;
        write_json(store, ENTITY_DEFINITIONS_KEY, &self.custom_entity_definitions)?;
        write_json(store, ENTITY_LAYERS_KEY, &self.entity_layers)?;
        Ok(())
    }

    /// Built-in definitions followed by the custom ones
    pub fn merged_definitions(&self) -> Vec<EntityDefinition> {
        let mut definitions = default_entity_definitions();
        definitions.extend(self.custom_entity_definitions.iter().cloned());
        definitions
    }

    /// Remember a tileset, replacing any earlier entry for the same image
    pub fn add_custom_tileset(&mut self, tileset: TilesetDefinition) {
        self.custom_tilesets
            .retain(|t| t.image_path != tileset.image_path);
        self.custom_tilesets.push(tileset);
    }

    pub fn remove_custom_tileset(&mut self, image_path: &str) -> bool {
        let before = self.custom_tilesets.len();
        self.custom_tilesets.retain(|t| t.image_path != image_path);
        if self.selected_tileset.as_deref() == Some(image_path) {
            self.selected_tileset = None;
        }
        self.custom_tilesets.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_store() {
        let mut store = MemoryStore::new();
        let mut prefs = EditorPreferences {
            selected_tileset: Some("tiles/woods.png".to_string()),
            ..Default::default()
        };
        prefs.add_custom_tileset(
            TilesetDefinition::from_dimensions("tiles/woods.png", 64, 48, 16).unwrap(),
        );
        prefs
            .custom_entity_definitions
            .push(EntityDefinition::new("npc", "NPC", "#aa00aa"));
        prefs.save(&mut store).unwrap();

        assert_eq!(EditorPreferences::load(&store), prefs);
    }

    #[test]
    fn test_builtin_definitions_not_overridden() {
        let mut store = MemoryStore::new();
        let mut fake = EntityDefinition::new("player_spawn", "Impostor", "#000000");
        fake.max_count = None;
        let custom = vec![fake, EntityDefinition::new("npc", "NPC", "#aa00aa")];
        store
            .set(ENTITY_DEFINITIONS_KEY, serde_json::to_string(&custom).unwrap())
            .unwrap();

        let prefs = EditorPreferences::load(&store);
        assert_eq!(prefs.custom_entity_definitions.len(), 1);

        let merged = prefs.merged_definitions();
        assert_eq!(merged.len(), 5);
        assert_eq!(merged[0].name, "Player Spawn");
        assert_eq!(merged[4].id, "npc");
    }

    #[test]
    fn test_unreadable_values_fall_back() {
        let mut store = MemoryStore::new();
        store.set(CUSTOM_TILESETS_KEY, "{not json".to_string()).unwrap();
        let prefs = EditorPreferences::load(&store);
        assert!(prefs.custom_tilesets.is_empty());
        assert_eq!(prefs.selected_tileset, None);
    }

    #[test]
    fn test_remove_custom_tileset_clears_selection() {
        let mut prefs = EditorPreferences::default();
        prefs.add_custom_tileset(TilesetDefinition::from_dimensions("a.png", 32, 32, 16).unwrap());
        prefs.add_custom_tileset(TilesetDefinition::from_dimensions("a.png", 64, 64, 16).unwrap());
        assert_eq!(prefs.custom_tilesets.len(), 1);

        prefs.selected_tileset = Some("a.png".to_string());
        assert!(prefs.remove_custom_tileset("a.png"));
        assert_eq!(prefs.selected_tileset, None);
        assert!(!prefs.remove_custom_tileset("a.png"));
    }
}
