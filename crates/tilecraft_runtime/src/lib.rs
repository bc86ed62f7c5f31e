//! tilecraft_runtime - Load tilecraft levels into a game
//!
//! Consumes the game export written by the editor. Tile ids are resolved to
//! sprite keys through a [`SpriteRegistry`]; unknown ids are logged and skipped.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use tilecraft_runtime::{RuntimeMap, SpriteRegistry, TilecraftRuntimePlugin};
//!
//! fn load_level(mut commands: Commands, registry: Res<SpriteRegistry>) {
//!     let json = include_str!("../assets/levels/crash_site_game.json");
//!     match RuntimeMap::from_json(json, &registry) {
//!         Ok(map) => commands.insert_resource(map),
//!         Err(e) => error!("Failed to load level: {}", e),
//!     }
//! }
//!
//! App::new()
//!     .add_plugins(TilecraftRuntimePlugin)
//!     .add_systems(Startup, load_level)
//!     .run();
//! ```

mod map;
mod registry;

pub use map::{Collider, PlacedTile, RuntimeMap, SpawnPoint};
pub use registry::{SpriteEntry, SpriteRegistry, TileKind};

use bevy::prelude::*;

/// Registers the built-in sprite table as a resource
pub struct TilecraftRuntimePlugin;

impl Plugin for TilecraftRuntimePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SpriteRegistry::builtin());
    }
}
