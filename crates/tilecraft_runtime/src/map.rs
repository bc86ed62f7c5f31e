//! A level export resolved into game-ready tiles, colliders and spawn points

use crate::registry::{SpriteRegistry, TileKind};
use bevy::log::{info, warn};
use bevy::prelude::Resource;
use std::collections::BTreeMap;
use tilecraft_core::schema::FieldValue;
use tilecraft_core::{
    DrawCommand, ExportMap, FormatError, GridPos, Positionable, Rect, Renderable, SourceRect,
};

/// A tile placed at its pixel position
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedTile {
    pub cell: GridPos,
    pub tile_id: String,
    pub sprite: String,
    pub source: Option<SourceRect>,
    pub kind: TileKind,
    rect: Rect,
}

impl Renderable for PlacedTile {
    fn draw(&self, out: &mut Vec<DrawCommand>) {
        out.push(DrawCommand::Sprite {
            image: self.sprite.clone(),
            source: self.source,
            dest: self.rect,
            opacity: 1.0,
        });
    }
}

impl Positionable for PlacedTile {
    fn position(&self) -> (f32, f32) {
        (self.rect.x, self.rect.y)
    }

    fn size(&self) -> (f32, f32) {
        (self.rect.width, self.rect.height)
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.rect.x = x;
        self.rect.y = y;
    }
}

/// Immovable blocking area covering one solid tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub rect: Rect,
    pub kind: TileKind,
}

/// An exported entity, by definition id
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPoint {
    pub definition_id: String,
    pub layer: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fields: BTreeMap<String, FieldValue>,
}

impl SpawnPoint {
    /// Center of the spawn box
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Everything the game needs from a level
#[derive(Debug, Clone, Default, Resource)]
pub struct RuntimeMap {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub tiles: Vec<PlacedTile>,
    pub colliders: Vec<Collider>,
    pub spawn_points: Vec<SpawnPoint>,
    /// Ids that had no sprite and were left out
    pub skipped: Vec<String>,
}

impl RuntimeMap {
    /// Resolve an export against a sprite registry.
    ///
    /// Tiles with unknown ids are logged and skipped.
    pub fn from_export(map: &ExportMap, registry: &SpriteRegistry) -> Self {
        let size = map.tile_size as f32;
        let mut runtime = Self {
            name: map.metadata.name.clone(),
            width: map.map_width,
            height: map.map_height,
            tile_size: map.tile_size,
            ..Default::default()
        };

        for (pos, tile_id) in &map.tiles {
            let Some(entry) = registry.get(tile_id) else {
                warn!("Unknown tile ID: {}", tile_id);
                runtime.skipped.push(tile_id.clone());
                continue;
            };

            let rect = Rect::new(pos.x as f32 * size, pos.y as f32 * size, size, size);
            if entry.kind.is_solid() {
                runtime.colliders.push(Collider {
                    rect,
                    kind: entry.kind,
                });
            }
            runtime.tiles.push(PlacedTile {
                cell: *pos,
                tile_id: tile_id.clone(),
                sprite: entry.key.clone(),
                source: entry.source,
                kind: entry.kind,
                rect,
            });
        }

        for layer in map.entity_layers.iter().flatten() {
            for entity in &layer.entities {
                runtime.spawn_points.push(SpawnPoint {
                    definition_id: entity.definition_id.clone(),
                    layer: layer.name.clone(),
                    x: entity.x,
                    y: entity.y,
                    width: entity.width,
                    height: entity.height,
                    fields: entity.fields.clone(),
                });
            }
        }

        info!(
            "Loaded level '{}': {} tiles, {} colliders, {} spawn points",
            runtime.name,
            runtime.tiles.len(),
            runtime.colliders.len(),
            runtime.spawn_points.len()
        );
        runtime
    }

    /// Parse an export and resolve it
    pub fn from_json(json: &str, registry: &SpriteRegistry) -> Result<Self, FormatError> {
        Ok(Self::from_export(&ExportMap::from_json(json)?, registry))
    }

    /// Size of the level in pixels
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_size),
            self.height.saturating_mul(self.tile_size),
        )
    }

    pub fn spawns<'a>(&'a self, definition_id: &'a str) -> impl Iterator<Item = &'a SpawnPoint> {
        self.spawn_points
            .iter()
            .filter(move |s| s.definition_id == definition_id)
    }

    pub fn player_spawn(&self) -> Option<&SpawnPoint> {
        self.spawns("player_spawn").next()
    }

    pub fn water_tiles(&self) -> impl Iterator<Item = &PlacedTile> {
        self.tiles.iter().filter(|t| t.kind == TileKind::Water)
    }

    /// Whether a pixel lies inside any collider
    pub fn is_blocked(&self, x: f32, y: f32) -> bool {
        self.colliders.iter().any(|c| c.rect.contains(x, y))
    }
}

impl Renderable for RuntimeMap {
    fn draw(&self, out: &mut Vec<DrawCommand>) {
        for tile in &self.tiles {
            tile.draw(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecraft_core::{EntityInstance, EntityLayer, LevelGrid};

    fn export() -> ExportMap {
        let mut level = LevelGrid::new("Crash Site", 10, 10, 32);
        level.place_tile(0, 0, Some("grass"));
        level.place_tile(1, 0, Some("water2"));
        level.place_tile(2, 0, Some("chest"));
        level.place_tile(3, 0, Some("lava"));
        ExportMap::from_level(&level, None)
    }

    #[test]
    fn test_unknown_tiles_skipped() {
        let map = RuntimeMap::from_export(&export(), &SpriteRegistry::builtin());
        assert_eq!(map.tiles.len(), 3);
        assert_eq!(map.skipped, vec!["lava".to_string()]);
        assert_eq!(map.pixel_size(), (320, 320));
    }

    #[test]
    fn test_colliders_for_solid_tiles() {
        let map = RuntimeMap::from_export(&export(), &SpriteRegistry::builtin());
        assert_eq!(map.colliders.len(), 2);
        assert_eq!(map.colliders[0].rect, Rect::new(32.0, 0.0, 32.0, 32.0));
        assert_eq!(map.water_tiles().count(), 1);
        assert!(map.is_blocked(80.0, 10.0));
        assert!(!map.is_blocked(10.0, 10.0));
    }

    #[test]
    fn test_placed_tile_draws_at_cell() {
        let map = RuntimeMap::from_export(&export(), &SpriteRegistry::builtin());
        let mut out = Vec::new();
        map.draw(&mut out);
        assert_eq!(out.len(), 3);
        assert!(matches!(
            &out[1],
            DrawCommand::Sprite { image, dest, .. } if image == "water2" && dest.x == 32.0
        ));

        let mut tile = map.tiles[0].clone();
        tile.set_position(64.0, 64.0);
        assert_eq!(tile.bounds(), Rect::new(64.0, 64.0, 32.0, 32.0));
    }

    #[test]
    fn test_spawn_points_by_definition() {
        let defs = tilecraft_core::default_entity_definitions();
        let mut layer = EntityLayer::new("Spawns", None);
        layer
            .entities
            .push(EntityInstance::from_definition(&defs[0], 48.0, 48.0));
        layer
            .entities
            .push(EntityInstance::from_definition(&defs[1], 96.0, 48.0));
        let level = LevelGrid::new("Spawns", 10, 10, 32);
        let export = ExportMap::from_level(&level, Some(&[layer][..]));

        let map = RuntimeMap::from_export(&export, &SpriteRegistry::builtin());
        let player = map.player_spawn().unwrap();
        assert_eq!(player.center(), (56.0, 56.0));
        assert_eq!(player.layer, "Spawns");
        assert_eq!(map.spawns("enemy_spawn").count(), 1);
        assert_eq!(
            map.spawns("enemy_spawn").next().unwrap().fields.get("health"),
            Some(&FieldValue::Int(100))
        );
    }
}
