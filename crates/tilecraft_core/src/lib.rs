//! Core data structures for tilecraft
//!
//! This crate provides the fundamental types for representing tile-based levels:
//! - `LevelGrid` - A bounded grid with a sparse tile map and metadata
//! - `Tile` / `TileCatalog` - Paintable tiles and their sprite references
//! - `EntityDefinition` - Schema for placeable entities
//! - `EntityInstance` / `EntityLayer` - Placed entities and their ordered layers
//! - `TilesetDefinition` - Slicing geometry of a tile-sheet image
//! - `LevelFile` / `ExportMap` - Editor and game-facing serialization formats
//! - `DrawCommand` - Renderer-agnostic drawing primitives

mod draw;
mod entity;
mod format;
mod grid;
mod tile;
mod tileset;

pub use draw::{parse_hex_color, DrawCommand, Positionable, Rect, Renderable, Rgba, ShapeKind};
pub use entity::{
    default_entity_definitions, EntityDefinition, EntityInstance, EntityLayer, Pivot, RenderMode,
};
pub use format::{EntityData, ExportEntity, ExportLayer, ExportMap, FormatError, LevelFile};
pub use grid::{
    now_millis, GridLimits, GridPos, LevelGrid, LevelMetadata, DEFAULT_LEVEL_HEIGHT,
    DEFAULT_LEVEL_WIDTH, DEFAULT_TILE_SIZE, MAX_TILE_SIZE,
};
pub use tile::{builtin_tiles, SourceRect, SpriteRef, Tile, TileCatalog, TileCategory, TileFrame};
pub use tileset::{TilesetDefinition, TilesetError};

pub use tilecraft_schema as schema;
