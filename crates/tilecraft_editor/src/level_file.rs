//! Level file save/load operations

use bevy::log::info;
use std::path::Path;
use thiserror::Error;
use tilecraft_core::{ExportMap, FormatError, GridLimits, LevelFile};

#[derive(Debug, Error)]
pub enum LevelFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("no file path set")]
    NoPath,
}

/// Read and check a level file
pub fn read_level_file(path: &Path, limits: GridLimits) -> Result<LevelFile, LevelFileError> {
    let content = std::fs::read_to_string(path)?;
    let file = LevelFile::from_json(&content, limits)?;
    info!("Loaded level '{}' from {:?}", file.level.metadata.name, path);
    Ok(file)
}

pub fn write_level_file(path: &Path, file: &LevelFile) -> Result<(), LevelFileError> {
    std::fs::write(path, file.to_json()?)?;
    info!("Saved level '{}' to {:?}", file.level.metadata.name, path);
    Ok(())
}

pub fn write_export(path: &Path, map: &ExportMap) -> Result<(), LevelFileError> {
    std::fs::write(path, map.to_json()?)?;
    info!("Exported level '{}' to {:?}", map.metadata.name, path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecraft_core::LevelGrid;

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        let mut level = LevelGrid::default();
        level.place_tile(4, 4, Some("rock"));

        write_level_file(&path, &LevelFile::new(level.clone(), None)).unwrap();
        let file = read_level_file(&path, GridLimits::default()).unwrap();
        assert_eq!(file.level, level);
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            read_level_file(&missing, GridLimits::default()),
            Err(LevelFileError::Io(_))
        ));

        let invalid = dir.path().join("invalid.json");
        std::fs::write(&invalid, "{\"width\": 10}").unwrap();
        assert!(matches!(
            read_level_file(&invalid, GridLimits::default()),
            Err(LevelFileError::Format(FormatError::Json(_)))
        ));
    }
}
