//! Tile id to game sprite resolution

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tilecraft_core::{SourceRect, TilesetDefinition};

/// How the game treats a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    /// Walkable ground
    Terrain,
    /// Blocks movement
    Water,
    /// Blocks movement
    Object,
}

impl TileKind {
    pub fn is_solid(&self) -> bool {
        matches!(self, TileKind::Water | TileKind::Object)
    }
}

/// A loaded sprite the game can draw for a tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteEntry {
    /// Texture key in the game's asset table
    pub key: String,
    /// Region of the texture, for sheet-sliced tiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRect>,
    pub kind: TileKind,
}

/// Lookup table from tile ids to sprites
#[derive(Debug, Clone, Default, Resource)]
pub struct SpriteRegistry {
    entries: HashMap<String, SpriteEntry>,
}

impl SpriteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sprites for the editor's built-in tiles
    pub fn builtin() -> Self {
        use TileKind::*;
        let mut registry = Self::new();
        for (id, key, kind) in [
            ("grass", "grass", Terrain),
            ("sand", "sand", Terrain),
            ("dirt", "dirt", Terrain),
            ("water1", "water", Water),
            ("water2", "water2", Water),
            ("water3", "water3", Water),
            ("chest", "chest", Object),
            ("rock", "rock_in_water", Object),
            ("fence", "fence", Object),
        ] {
            registry.register(id, key, kind);
        }
        registry
    }

    /// Add or replace the sprite for a tile id
    pub fn register(&mut self, id: impl Into<String>, key: impl Into<String>, kind: TileKind) {
        self.entries.insert(
            id.into(),
            SpriteEntry {
                key: key.into(),
                source: None,
                kind,
            },
        );
    }

    /// Register every tile of a sliced sheet, keyed by the sheet's image path
    pub fn register_tileset(&mut self, tileset: &TilesetDefinition, kind: TileKind) -> usize {
        let mut added = 0;
        for index in 0..tileset.tile_count() {
            self.entries.insert(
                tileset.tile_id(index),
                SpriteEntry {
                    key: tileset.image_path.clone(),
                    source: tileset.source_rect(index),
                    kind,
                },
            );
            added += 1;
        }
        added
    }

    pub fn get(&self, id: &str) -> Option<&SpriteEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sprites() {
        let registry = SpriteRegistry::builtin();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.get("water1").unwrap().key, "water");
        assert_eq!(registry.get("rock").unwrap().key, "rock_in_water");
        assert_eq!(registry.get("rock").unwrap().kind, TileKind::Object);
        assert!(!registry.get("grass").unwrap().kind.is_solid());
        assert!(registry.get("lava").is_none());
    }

    #[test]
    fn test_register_tileset() {
        let mut registry = SpriteRegistry::new();
        let sheet = TilesetDefinition::from_dimensions("tiles/woods.png", 48, 32, 16).unwrap();
        assert_eq!(registry.register_tileset(&sheet, TileKind::Terrain), 6);

        let entry = registry.get("tiles/woods.png#4").unwrap();
        assert_eq!(entry.key, "tiles/woods.png");
        assert_eq!(entry.source, Some(SourceRect::new(16, 16, 16, 16)));
    }
}
