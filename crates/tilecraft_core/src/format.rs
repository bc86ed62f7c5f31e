//! Editor level files and the game-facing export format

use crate::{
    EntityDefinition, EntityLayer, GridLimits, GridPos, LevelGrid, LevelMetadata, MAX_TILE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tilecraft_schema::FieldValue;
use uuid::Uuid;

/// Errors raised while reading or checking level data
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("level size {width}x{height} is outside [{min}, {max}]")]
    InvalidDimensions {
        width: u32,
        height: u32,
        min: u32,
        max: u32,
    },
    #[error("tile size {0} is outside [1, {max}]", max = crate::MAX_TILE_SIZE)]
    InvalidTileSize(u32),
    #[error("invalid tile key '{0}', expected \"x,y\"")]
    InvalidKey(String),
    #[error("tile at {0} lies outside the level")]
    TileOutOfBounds(String),
    #[error("tile at {0} has an empty id")]
    EmptyTileId(String),
    #[error("layer id {0} appears more than once")]
    DuplicateLayer(Uuid),
}

/// Entity definitions and layers stored with a level
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityData {
    pub definitions: Vec<EntityDefinition>,
    pub layers: Vec<EntityLayer>,
}

/// The editor's on-disk level: grid fields at the top level, entities optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(flatten)]
    pub level: LevelGrid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<EntityData>,
}

impl LevelFile {
    pub fn new(level: LevelGrid, entities: Option<EntityData>) -> Self {
        Self { level, entities }
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and check a level file.
    ///
    /// Any structural problem rejects the whole file.
    pub fn from_json(json: &str, limits: GridLimits) -> Result<Self, FormatError> {
        let file: LevelFile = serde_json::from_str(json)?;
        file.level.validate(limits)?;
        if let Some(entities) = &file.entities {
            let mut seen = HashSet::new();
            for layer in &entities.layers {
                if !seen.insert(layer.id) {
                    return Err(FormatError::DuplicateLayer(layer.id));
                }
            }
        }
        Ok(file)
    }
}

/// An entity as the game sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntity {
    pub definition_id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportLayer {
    pub name: String,
    pub entities: Vec<ExportEntity>,
}

impl From<&EntityLayer> for ExportLayer {
    fn from(layer: &EntityLayer) -> Self {
        Self {
            name: layer.name.clone(),
            entities: layer
                .entities
                .iter()
                .map(|e| ExportEntity {
                    definition_id: e.definition_id.clone(),
                    x: e.x,
                    y: e.y,
                    width: e.width,
                    height: e.height,
                    fields: e.field_values.clone(),
                })
                .collect(),
        }
    }
}

/// Reduced map format consumed by the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMap {
    pub map_width: u32,
    pub map_height: u32,
    pub tile_size: u32,
    pub tiles: BTreeMap<GridPos, String>,
    pub metadata: LevelMetadata,
    /// Present only when entities are exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_layers: Option<Vec<ExportLayer>>,
}

impl ExportMap {
    /// Build the export form of a level; `layers` in export order
    pub fn from_level(level: &LevelGrid, layers: Option<&[EntityLayer]>) -> Self {
        Self {
            map_width: level.width,
            map_height: level.height,
            tile_size: level.tile_size,
            tiles: level.tiles.clone(),
            metadata: level.metadata.clone(),
            entity_layers: layers.map(|layers| layers.iter().map(ExportLayer::from).collect()),
        }
    }

    /// Rebuild the editable grid. Entity layers are not part of the grid.
    pub fn to_level(&self) -> LevelGrid {
        LevelGrid {
            width: self.map_width,
            height: self.map_height,
            tile_size: self.tile_size,
            tiles: self.tiles.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Suggested file name, e.g. `My_Level_game.json`
    pub fn file_name(&self) -> String {
        let stem: Vec<&str> = self.metadata.name.split_whitespace().collect();
        format!("{}_game.json", stem.join("_"))
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        let map: ExportMap = serde_json::from_str(json)?;
        if !(1..=MAX_TILE_SIZE).contains(&map.tile_size) {
            return Err(FormatError::InvalidTileSize(map.tile_size));
        }
        for pos in map.tiles.keys() {
            if pos.x >= map.map_width || pos.y >= map.map_height {
                return Err(FormatError::TileOutOfBounds(pos.to_string()));
            }
        }
        Ok(map)
    }
}
