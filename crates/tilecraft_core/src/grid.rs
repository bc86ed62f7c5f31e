//! Bounded level grid with a sparse tile map

use crate::FormatError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_LEVEL_WIDTH: u32 = 25;
pub const DEFAULT_LEVEL_HEIGHT: u32 = 19;
pub const DEFAULT_TILE_SIZE: u32 = 32;
/// Largest tile edge, in pixels, a level may use
pub const MAX_TILE_SIZE: u32 = 256;

/// Current wall-clock time in milliseconds since the UNIX epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A cell position on the grid, written as `"x,y"` on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

// Row-major so serialized tile maps read top to bottom
impl Ord for GridPos {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for GridPos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for GridPos {
    type Err = FormatError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = || FormatError::InvalidKey(key.to_string());
        let (x, y) = key.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok(Self { x, y })
    }
}

impl Serialize for GridPos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GridPos {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

/// Allowed range for level width and height, in tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLimits {
    pub min: u32,
    pub max: u32,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self { min: 10, max: 50 }
    }
}

impl GridLimits {
    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max.max(self.min))
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Reads a timestamp written as epoch milliseconds or as an RFC 3339 string
mod timestamp {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Millis(ms) => Ok(ms),
            Raw::Float(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms as u64),
            Raw::Float(ms) => Err(de::Error::custom(format!("invalid timestamp {}", ms))),
            Raw::Text(text) => chrono::DateTime::parse_from_rfc3339(&text)
                .map(|t| t.timestamp_millis().max(0) as u64)
                .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", text, e))),
        }
    }
}

/// Descriptive data stored alongside a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelMetadata {
    pub name: String,
    pub description: String,
    /// Creation time, milliseconds since the UNIX epoch
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created: u64,
    /// Last mutation time, milliseconds since the UNIX epoch
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub modified: u64,
}

impl LevelMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            name: name.into(),
            description: description.into(),
            created: now,
            modified: now,
        }
    }
}

/// A bounded rectangular level with a sparse map of painted tiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelGrid {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    /// Occupied cells only; an absent key is an empty cell
    pub tiles: BTreeMap<GridPos, String>,
    pub metadata: LevelMetadata,
}

impl Default for LevelGrid {
    fn default() -> Self {
        Self::new(
            "Untitled Level",
            DEFAULT_LEVEL_WIDTH,
            DEFAULT_LEVEL_HEIGHT,
            DEFAULT_TILE_SIZE,
        )
    }
}

impl LevelGrid {
    /// Create a new empty level
    pub fn new(name: impl Into<String>, width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            tile_size,
            tiles: BTreeMap::new(),
            metadata: LevelMetadata::new(name, "A new level"),
        }
    }

    /// Whether a signed cell coordinate lies inside the grid
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Size of the level in pixels, saturating for unchecked dimensions
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_size),
            self.height.saturating_mul(self.tile_size),
        )
    }

    /// Mark the level as modified now
    pub fn touch(&mut self) {
        self.metadata.modified = now_millis();
    }

    /// Paint or erase a single cell.
    ///
    /// `None` erases. Returns `false` without touching anything when the cell
    /// is outside the grid.
    pub fn place_tile(&mut self, x: i64, y: i64, tile: Option<&str>) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let pos = GridPos::new(x as u32, y as u32);
        match tile {
            Some(id) => {
                self.tiles.insert(pos, id.to_string());
            }
            None => {
                self.tiles.remove(&pos);
            }
        }
        self.touch();
        true
    }

    /// Get the tile id painted at a cell
    pub fn tile_at(&self, x: u32, y: u32) -> Option<&str> {
        self.tiles.get(&GridPos::new(x, y)).map(String::as_str)
    }

    /// Number of occupied cells
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Iterate occupied cells in row-major order
    pub fn iter_tiles(&self) -> impl Iterator<Item = (GridPos, &str)> {
        self.tiles.iter().map(|(pos, id)| (*pos, id.as_str()))
    }

    /// Resize within `limits`, dropping tiles that fall outside the new bounds.
    ///
    /// Returns `true` if the dimensions or tile map changed.
    pub fn resize(&mut self, width: u32, height: u32, limits: GridLimits) -> bool {
        let width = limits.clamp(width);
        let height = limits.clamp(height);
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.tiles.retain(|pos, _| pos.x < width && pos.y < height);
        self.touch();
        true
    }

    /// Remove every tile. Confirmation is the caller's job.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.touch();
    }

    /// Check the structural invariants of a level read from outside
    pub fn validate(&self, limits: GridLimits) -> Result<(), FormatError> {
        if !limits.contains(self.width) || !limits.contains(self.height) {
            return Err(FormatError::InvalidDimensions {
                width: self.width,
                height: self.height,
                min: limits.min,
                max: limits.max,
            });
        }
        if !(1..=MAX_TILE_SIZE).contains(&self.tile_size) {
            return Err(FormatError::InvalidTileSize(self.tile_size));
        }
        for (pos, id) in &self.tiles {
            if pos.x >= self.width || pos.y >= self.height {
                return Err(FormatError::TileOutOfBounds(pos.to_string()));
            }
            if id.is_empty() {
                return Err(FormatError::EmptyTileId(pos.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_level() {
        let level = LevelGrid::default();
        assert_eq!(level.width, 25);
        assert_eq!(level.height, 19);
        assert_eq!(level.tile_size, 32);
        assert_eq!(level.metadata.name, "Untitled Level");
        assert_eq!(level.tile_count(), 0);
    }

    #[test]
    fn test_tile_operations() {
        let mut level = LevelGrid::new("Test", 10, 10, 32);
        let before = level.tiles.clone();

        assert!(level.place_tile(5, 5, Some("grass")));
        assert_eq!(level.tile_at(5, 5), Some("grass"));

        assert!(level.place_tile(5, 5, Some("sand")));
        assert_eq!(level.tile_at(5, 5), Some("sand"));

        assert!(level.place_tile(5, 5, None));
        assert_eq!(level.tile_at(5, 5), None);
        assert_eq!(level.tiles, before);
    }

    #[test]
    fn test_out_of_bounds_is_noop() {
        let mut level = LevelGrid::new("Test", 10, 10, 32);
        let modified = level.metadata.modified;

        assert!(!level.place_tile(-1, 0, Some("grass")));
        assert!(!level.place_tile(10, 0, Some("grass")));
        assert!(!level.place_tile(0, 10, Some("grass")));
        assert_eq!(level.tile_count(), 0);
        assert_eq!(level.metadata.modified, modified);
    }

    #[test]
    fn test_modified_updates() {
        let mut level = LevelGrid::new("Test", 10, 10, 32);
        level.metadata.modified = 0;
        level.place_tile(1, 1, Some("dirt"));
        assert!(level.metadata.modified > 0);
    }

    #[test]
    fn test_resize_clamps_and_prunes() {
        let mut level = LevelGrid::new("Test", 20, 20, 32);
        level.place_tile(2, 2, Some("grass"));
        level.place_tile(15, 3, Some("sand"));

        assert!(level.resize(5, 100, GridLimits::default()));
        assert_eq!(level.width, 10);
        assert_eq!(level.height, 50);
        assert_eq!(level.tile_at(2, 2), Some("grass"));
        assert_eq!(level.tile_count(), 1);

        assert!(!level.resize(10, 50, GridLimits::default()));
    }

    #[test]
    fn test_validate_bounds_tile_size() {
        let limits = GridLimits::default();
        let mut level = LevelGrid::new("Huge", 50, 50, 100_000_000);
        assert!(matches!(
            level.validate(limits),
            Err(FormatError::InvalidTileSize(100_000_000))
        ));
        assert_eq!(level.pixel_size(), (u32::MAX, u32::MAX));

        level.tile_size = 0;
        assert!(level.validate(limits).is_err());
        level.tile_size = MAX_TILE_SIZE;
        assert!(level.validate(limits).is_ok());
    }

    #[test]
    fn test_metadata_timestamps() {
        let metadata: LevelMetadata = serde_json::from_str(
            r#"{"name":"Dock","description":"","created":"2024-05-01T10:00:00.000Z",
                "modified":"2024-05-01T12:00:00+02:00"}"#,
        )
        .unwrap();
        assert_eq!(metadata.created, 1_714_557_600_000);
        assert_eq!(metadata.modified, 1_714_557_600_000);

        let metadata: LevelMetadata = serde_json::from_str(
            r#"{"name":"Dock","description":"","created":1700000000000,"modified":1700000000000.0}"#,
        )
        .unwrap();
        assert_eq!(metadata.modified, 1_700_000_000_000);
        assert!(serde_json::to_string(&metadata)
            .unwrap()
            .contains("\"created\":1700000000000"));

        assert!(serde_json::from_str::<LevelMetadata>(
            r#"{"name":"Dock","description":"","created":"yesterday","modified":0}"#
        )
        .is_err());
    }

    #[test]
    fn test_grid_pos_keys() {
        let pos: GridPos = "3,7".parse().unwrap();
        assert_eq!(pos, GridPos::new(3, 7));
        assert_eq!(pos.to_string(), "3,7");
        assert!("3".parse::<GridPos>().is_err());
        assert!("-1,2".parse::<GridPos>().is_err());
        assert!("a,b".parse::<GridPos>().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_bounds_keys() {
        let mut level = LevelGrid::new("Test", 10, 10, 32);
        level.tiles.insert(GridPos::new(12, 0), "grass".to_string());
        assert!(matches!(
            level.validate(GridLimits::default()),
            Err(FormatError::TileOutOfBounds(_))
        ));

        let level = LevelGrid::new("Tiny", 4, 4, 32);
        assert!(matches!(
            level.validate(GridLimits::default()),
            Err(FormatError::InvalidDimensions { .. })
        ));
    }
}
