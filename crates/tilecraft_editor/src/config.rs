//! Editor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tilecraft_core::{
    GridLimits, DEFAULT_LEVEL_HEIGHT, DEFAULT_LEVEL_WIDTH, DEFAULT_TILE_SIZE, MAX_TILE_SIZE,
};

/// Tunables for an [`EditorSession`](crate::EditorSession).
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Allowed level width and height, in tiles
    pub limits: GridLimits,
    pub default_width: u32,
    pub default_height: u32,
    pub tile_size: u32,
    /// Snapshots kept by the undo history
    pub max_history: usize,
    /// Tile size assumed when slicing a newly probed sheet
    pub probe_tile_size: u32,
    pub probe_timeout_ms: u64,
    /// Snap placed entities to the layer grid
    pub snap_to_grid: bool,
    /// Include entity layers in the game export
    pub export_entities: bool,
    pub show_grid: bool,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub initial_zoom: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            limits: GridLimits::default(),
            default_width: DEFAULT_LEVEL_WIDTH,
            default_height: DEFAULT_LEVEL_HEIGHT,
            tile_size: DEFAULT_TILE_SIZE,
            max_history: 50,
            probe_tile_size: 16,
            probe_timeout_ms: 10_000,
            snap_to_grid: false,
            export_entities: true,
            show_grid: true,
            min_zoom: 0.25,
            max_zoom: 4.0,
            initial_zoom: 1.0,
        }
    }
}

impl EditorConfig {
    /// Parse a config, filling missing keys with defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Tile size for new levels, kept within what a level file may hold
    pub fn level_tile_size(&self) -> u32 {
        self.tile_size.clamp(1, MAX_TILE_SIZE)
    }

    /// Clamp a zoom factor into the configured bounds
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom.max(self.min_zoom))
    }
}
