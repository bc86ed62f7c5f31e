//! tilecraft_editor - Headless level editor engine
//!
//! This crate provides everything a level editor front end drives:
//! - Tile painting on a bounded grid
//! - Entity definitions, layers and placement
//! - Tileset probing and slicing on the IO task pool
//! - Undo/redo over full document snapshots
//! - Pointer hit-testing and tool dispatch
//! - Display lists for any renderer
//! - Level files, game export and a saved-level library
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tilecraft_editor::{EditorConfig, EditorSession, FileImageSource, FileStore, PointerEvent};
//!
//! let mut session = EditorSession::new(
//!     EditorConfig::default(),
//!     Box::new(FileStore::open_or_empty()),
//!     Arc::new(FileImageSource::new("assets")),
//! );
//! session.select_tile(Some("grass"));
//! session.handle_pointer(PointerEvent::down((48.0, 48.0)));
//! let commands = tilecraft_editor::render::build_display_list(&session);
//! session.close()?;
//! ```

pub mod config;
pub mod entities;
pub mod history;
pub mod level_file;
pub mod preferences;
pub mod probe;
pub mod render;
pub mod session;
pub mod viewport;

pub use tilecraft_core;
pub use tilecraft_schema;

pub use config::EditorConfig;
pub use entities::{EntityError, EntityStore, EntitySystem, LayerEdit, Selection};
pub use history::History;
pub use level_file::{read_level_file, write_export, write_level_file, LevelFileError};
pub use preferences::{
    EditorPreferences, FileStore, LevelLibrary, MemoryStore, PreferenceStore, PreferencesError,
};
pub use probe::{
    probe_tileset, FileImageSource, ImageSource, ProbeError, ProbeEvent, ProbeStatus,
    TilesetProber,
};
pub use render::{build_display_list, EntityView, TileView};
pub use session::{
    Document, EditorSession, EntityTool, PointerAction, PointerButton, PointerEffect,
    PointerEvent, PointerOutcome, TileTool,
};
pub use viewport::{EditMode, HitTarget, PointerKind, Viewport};
