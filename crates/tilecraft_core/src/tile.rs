//! Paintable tiles and the catalog that indexes them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Palette grouping for tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileCategory {
    Terrain,
    Objects,
    Water,
    Decorations,
    Characters,
    Tilesets,
}

impl TileCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            TileCategory::Terrain => "Terrain",
            TileCategory::Objects => "Objects",
            TileCategory::Water => "Water",
            TileCategory::Decorations => "Decorations",
            TileCategory::Characters => "Characters",
            TileCategory::Tilesets => "Tilesets",
        }
    }

    /// Fallback swatch color for tiles of this category
    pub fn default_color(&self) -> &'static str {
        match self {
            TileCategory::Terrain => "#32CD32",
            TileCategory::Water => "#4682B4",
            TileCategory::Objects => "#8B4513",
            TileCategory::Decorations => "#228B22",
            TileCategory::Characters => "#FFA500",
            TileCategory::Tilesets => "#9932CC",
        }
    }

    pub fn all() -> &'static [TileCategory] {
        &[
            TileCategory::Terrain,
            TileCategory::Objects,
            TileCategory::Water,
            TileCategory::Decorations,
            TileCategory::Characters,
            TileCategory::Tilesets,
        ]
    }
}

/// A pixel rectangle inside a source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Where a tile's pixels come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteRef {
    pub path: String,
    /// Sub-rectangle for sheet-sliced tiles; `None` uses the whole image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<SourceRect>,
}

impl SpriteRef {
    pub fn image(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            frame: None,
        }
    }
}

/// Frame geometry of a tile sliced from a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileFrame {
    pub width: u32,
    pub height: u32,
    pub index: u32,
}

/// A paintable tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: String,
    pub name: String,
    pub sprite: SpriteRef,
    pub category: TileCategory,
    /// Hex color used when the sprite cannot be drawn
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<TileFrame>,
}

impl Tile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        sprite: impl Into<String>,
        category: TileCategory,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sprite: SpriteRef::image(sprite),
            category,
            color: color.into(),
            frame: None,
        }
    }
}

/// The tiles shipped with the editor
pub fn builtin_tiles() -> Vec<Tile> {
    use TileCategory::*;
    vec![
        Tile::new("grass", "Grass", "sprites/tilesets/grass.png", Terrain, "#32CD32"),
        Tile::new("sand", "Sand", "sprites/tilesets/floors/flooring.png", Terrain, "#F4A460"),
        Tile::new("dirt", "Dirt", "sprites/tilesets/floors/flooring.png", Terrain, "#8B4513"),
        Tile::new("water1", "Water 1", "sprites/tilesets/water1.png", Water, "#4682B4"),
        Tile::new("water2", "Water 2", "sprites/tilesets/water2.png", Water, "#5F9EA0"),
        Tile::new("water3", "Water 3", "sprites/tilesets/water3.png", Water, "#6495ED"),
        Tile::new("chest", "Chest", "sprites/objects/chest_01.png", Objects, "#8B4513"),
        Tile::new("rock", "Rock", "sprites/objects/rock_in_water_01.png", Objects, "#696969"),
        Tile::new("fence", "Fence", "sprites/tilesets/fences.png", Decorations, "#8B4513"),
    ]
}

/// Ordered tile collection with O(1) lookup by id
#[derive(Debug, Clone, Default)]
pub struct TileCatalog {
    tiles: Vec<Tile>,
    index: HashMap<String, usize>,
}

impl TileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with [`builtin_tiles`]
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        catalog.extend(builtin_tiles());
        catalog
    }

    /// Insert a tile, replacing any tile with the same id in place
    pub fn insert(&mut self, tile: Tile) {
        if let Some(&idx) = self.index.get(&tile.id) {
            self.tiles[idx] = tile;
        } else {
            self.index.insert(tile.id.clone(), self.tiles.len());
            self.tiles.push(tile);
        }
    }

    pub fn extend(&mut self, tiles: impl IntoIterator<Item = Tile>) {
        for tile in tiles {
            self.insert(tile);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Tile> {
        self.index.get(id).map(|&idx| &self.tiles[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Remove every tile sliced from the given sprite path
    pub fn remove_by_sprite(&mut self, path: &str) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|t| t.sprite.path != path);
        self.rebuild_index();
        before - self.tiles.len()
    }

    pub fn by_category(&self, category: TileCategory) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(move |t| t.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
    }
}
