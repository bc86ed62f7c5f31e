//! Tile-sheet slicing geometry

use crate::{SourceRect, SpriteRef, Tile, TileCategory, TileFrame};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TilesetError {
    #[error("tile size must be greater than zero")]
    ZeroTileSize,
}

/// Slicing geometry derived from a probed tile-sheet image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetDefinition {
    pub image_path: String,
    pub image_width: u32,
    pub image_height: u32,
    pub tile_size: u32,
    pub columns: u32,
    pub rows: u32,
    /// Border around the whole sheet, in pixels
    #[serde(default)]
    pub padding: u32,
    /// Gap between adjacent tiles, in pixels
    #[serde(default)]
    pub spacing: u32,
}

impl TilesetDefinition {
    /// Derive the grid of a sheet with no padding or spacing.
    ///
    /// Trailing partial rows and columns are left out of the grid.
    pub fn from_dimensions(
        image_path: impl Into<String>,
        image_width: u32,
        image_height: u32,
        tile_size: u32,
    ) -> Result<Self, TilesetError> {
        Self::with_layout(image_path, image_width, image_height, tile_size, 0, 0)
    }

    /// Derive the grid of a sheet with a border and inter-tile gaps
    pub fn with_layout(
        image_path: impl Into<String>,
        image_width: u32,
        image_height: u32,
        tile_size: u32,
        padding: u32,
        spacing: u32,
    ) -> Result<Self, TilesetError> {
        if tile_size == 0 {
            return Err(TilesetError::ZeroTileSize);
        }
        let fit = |extent: u32| (extent.saturating_sub(padding) + spacing) / (tile_size + spacing);
        Ok(Self {
            image_path: image_path.into(),
            image_width,
            image_height,
            tile_size,
            columns: fit(image_width),
            rows: fit(image_height),
            padding,
            spacing,
        })
    }

    /// Number of whole tiles on the sheet
    pub fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Row-major frame index of a cell
    pub fn frame_index(&self, row: u32, col: u32) -> Option<u32> {
        (row < self.rows && col < self.columns).then(|| row * self.columns + col)
    }

    /// `(row, col)` of a frame index
    pub fn frame_position(&self, index: u32) -> Option<(u32, u32)> {
        if index >= self.tile_count() {
            return None;
        }
        Some((index / self.columns, index % self.columns))
    }

    /// Pixel rectangle of a frame on the sheet
    pub fn source_rect(&self, index: u32) -> Option<SourceRect> {
        let (row, col) = self.frame_position(index)?;
        let stride = self.tile_size + self.spacing;
        Some(SourceRect::new(
            self.padding + col * stride,
            self.padding + row * stride,
            self.tile_size,
            self.tile_size,
        ))
    }

    /// Catalog id of a frame on this sheet
    pub fn tile_id(&self, index: u32) -> String {
        format!("{}#{}", self.image_path, index)
    }

    /// One catalog entry per whole tile, in row-major order
    pub fn generate_catalog(&self) -> Vec<Tile> {
        (0..self.tile_count())
            .filter_map(|index| {
                let (row, col) = self.frame_position(index)?;
                let rect = self.source_rect(index)?;
                Some(Tile {
                    id: self.tile_id(index),
                    name: format!("Tile {}-{}", row, col),
                    sprite: SpriteRef {
                        path: self.image_path.clone(),
                        frame: Some(rect),
                    },
                    category: TileCategory::Tilesets,
                    color: "#808080".to_string(),
                    frame: Some(TileFrame {
                        width: self.tile_size,
                        height: self.tile_size,
                        index,
                    }),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> TilesetDefinition {
        TilesetDefinition::from_dimensions("tiles/woods.png", 64, 48, 16).unwrap()
    }

    #[test]
    fn test_grid_derivation() {
        let def = sheet();
        assert_eq!(def.columns, 4);
        assert_eq!(def.rows, 3);
        assert_eq!(def.tile_count(), 12);
    }

    #[test]
    fn test_partial_tiles_excluded() {
        let def = TilesetDefinition::from_dimensions("odd.png", 70, 40, 16).unwrap();
        assert_eq!(def.columns, 4);
        assert_eq!(def.rows, 2);
    }

    #[test]
    fn test_zero_tile_size() {
        assert_eq!(
            TilesetDefinition::from_dimensions("x.png", 64, 64, 0),
            Err(TilesetError::ZeroTileSize)
        );
    }

    #[test]
    fn test_frame_mapping() {
        let def = sheet();
        assert_eq!(def.frame_position(5), Some((1, 1)));
        assert_eq!(def.source_rect(5), Some(SourceRect::new(16, 16, 16, 16)));
        assert_eq!(def.frame_position(12), None);

        for index in 0..def.tile_count() {
            let (row, col) = def.frame_position(index).unwrap();
            assert_eq!(def.frame_index(row, col), Some(index));
        }
    }

    #[test]
    fn test_generate_catalog() {
        let def = sheet();
        let tiles = def.generate_catalog();
        assert_eq!(tiles.len(), 12);

        let tile = &tiles[5];
        assert_eq!(tile.id, "tiles/woods.png#5");
        assert_eq!(tile.name, "Tile 1-1");
        assert_eq!(tile.sprite.frame, Some(SourceRect::new(16, 16, 16, 16)));
        assert_eq!(tile.frame.map(|f| f.index), Some(5));
        assert_eq!(tile.category, TileCategory::Tilesets);
    }

    #[test]
    fn test_padding_and_spacing() {
        // 2px border, 1px gaps: 2 + 16 + 1 + 16 + 2 = 37
        let def = TilesetDefinition::with_layout("spaced.png", 37, 37, 16, 2, 1).unwrap();
        assert_eq!(def.columns, 2);
        assert_eq!(def.rows, 2);
        assert_eq!(def.source_rect(3), Some(SourceRect::new(19, 19, 16, 16)));
    }
}
