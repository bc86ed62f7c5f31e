//! # tilecraft
//!
//! 2D tile and entity level editing, from the editor engine to the game loader.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tilecraft::prelude::*;
//!
//! let mut session = EditorSession::new(
//!     EditorConfig::default(),
//!     Box::new(MemoryStore::new()),
//!     Arc::new(FileImageSource::new("assets")),
//! );
//! session.place_tile(3, 4, Some("grass"));
//!
//! let map = RuntimeMap::from_export(&session.export_map(), &SpriteRegistry::builtin());
//! ```
//!
//! ## Features
//!
//! - `editor` (default) - The editor session, history, probing and persistence
//! - `runtime` (default) - Loading exported levels into a game
//!
//! ## Crate Structure
//!
//! - [`core`] - Levels, tiles, entities, tilesets and file formats
//! - [`schema`] - Entity field types and validation
//! - [`editor`] - The editor engine (requires `editor` feature)
//! - [`runtime`] - The game-side loader (requires `runtime` feature)

// =============================================================================
// Core module - data model and formats
// =============================================================================

/// Levels, tiles, entities, tilesets and the serialized formats.
pub mod core {
    pub use tilecraft_core::*;
}

pub use tilecraft_core::{
    DrawCommand, EntityDefinition, EntityInstance, EntityLayer, ExportMap, LevelFile, LevelGrid,
    Positionable, Renderable, Tile, TileCatalog, TilesetDefinition,
};

// =============================================================================
// Schema module - entity fields
// =============================================================================

/// Entity field schema and typed values.
pub mod schema {
    pub use tilecraft_schema::*;
}

pub use tilecraft_schema::{EntityField, FieldError, FieldType, FieldValue};

// =============================================================================
// Editor module
// =============================================================================

/// The headless editor engine.
#[cfg(feature = "editor")]
pub mod editor {
    pub use tilecraft_editor::*;
}

#[cfg(feature = "editor")]
pub use tilecraft_editor::{
    EditMode, EditorConfig, EditorSession, EntitySystem, FileImageSource, FileStore, History,
    MemoryStore, PointerEvent, TilesetProber, Viewport,
};

// =============================================================================
// Runtime module
// =============================================================================

/// Loading exported levels into a game.
#[cfg(feature = "runtime")]
pub mod runtime {
    pub use tilecraft_runtime::*;
}

#[cfg(feature = "runtime")]
pub use tilecraft_runtime::{RuntimeMap, SpriteRegistry, TilecraftRuntimePlugin};

/// Common imports.
///
/// ```rust,ignore
/// use tilecraft::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        DrawCommand, EntityDefinition, EntityField, EntityInstance, EntityLayer, ExportMap,
        FieldType, FieldValue, LevelFile, LevelGrid, Positionable, Renderable, Tile, TileCatalog,
        TilesetDefinition,
    };

    #[cfg(feature = "editor")]
    pub use crate::{
        EditMode, EditorConfig, EditorSession, FileImageSource, FileStore, MemoryStore,
        PointerEvent, Viewport,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{RuntimeMap, SpriteRegistry, TilecraftRuntimePlugin};
}
