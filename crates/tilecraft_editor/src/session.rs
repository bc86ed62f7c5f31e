//! The editor session: one document, its history and the tools acting on it

use crate::config::EditorConfig;
use crate::entities::{EntityError, EntityStore, EntitySystem, LayerEdit, Selection};
use crate::history::History;
use crate::level_file::{read_level_file, write_export, write_level_file, LevelFileError};
use crate::preferences::{EditorPreferences, LevelLibrary, PreferenceStore, PreferencesError};
use crate::probe::{ImageSource, ProbeEvent, ProbeStatus, TilesetProber};
use crate::viewport::{EditMode, PointerKind, Viewport};
use bevy::log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tilecraft_core::{
    default_entity_definitions, EntityDefinition, EntityInstance, EntityLayer, ExportMap,
    GridPos, LevelFile, LevelGrid, Pivot, TileCatalog,
};
use tilecraft_schema::FieldValue;
use uuid::Uuid;

/// Everything undo/redo restores
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub level: LevelGrid,
    pub entities: EntityStore,
}

/// Tool used by the primary button in tile mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileTool {
    #[default]
    Paint,
    Erase,
}

/// Tool used by the primary button in entity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityTool {
    #[default]
    Place,
    Select,
    Move,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Move,
    Up,
}

/// A mouse or touch event in display space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: (f32, f32),
    pub action: PointerAction,
    pub button: PointerButton,
    pub kind: PointerKind,
}

impl PointerEvent {
    pub fn new(action: PointerAction, position: (f32, f32)) -> Self {
        Self {
            position,
            action,
            button: PointerButton::Primary,
            kind: PointerKind::Mouse,
        }
    }

    pub fn down(position: (f32, f32)) -> Self {
        Self::new(PointerAction::Down, position)
    }

    pub fn moved(position: (f32, f32)) -> Self {
        Self::new(PointerAction::Move, position)
    }

    pub fn up(position: (f32, f32)) -> Self {
        Self::new(PointerAction::Up, position)
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_kind(mut self, kind: PointerKind) -> Self {
        self.kind = kind;
        self
    }
}

/// What a pointer event did to the document or selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerEffect {
    #[default]
    None,
    Painted(GridPos),
    Erased(GridPos),
    Placed(Uuid),
    Selected(Option<Uuid>),
    Moved(Uuid),
    Deleted(Uuid),
    Hovered(Option<Uuid>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerOutcome {
    pub effect: PointerEffect,
    /// The front end should suppress default touch gestures
    pub prevent_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Gesture {
    #[default]
    Idle,
    Painting,
    Dragging {
        id: Uuid,
        offset: (f32, f32),
        moved: bool,
    },
}

/// Editor controller owning the level, entities, history and tool state
pub struct EditorSession {
    config: EditorConfig,
    level: LevelGrid,
    entities: EntitySystem,
    history: History<Document>,
    catalog: TileCatalog,
    prober: TilesetProber,
    failed_tilesets: HashSet<String>,
    preferences: EditorPreferences,
    store: Box<dyn PreferenceStore>,
    viewport: Viewport,
    mode: EditMode,
    tile_tool: TileTool,
    entity_tool: EntityTool,
    selected_tile: Option<String>,
    show_grid: bool,
    gesture: Gesture,
    needs_redraw: bool,
    dirty: bool,
    path: Option<PathBuf>,
}

impl EditorSession {
    /// Start a session with a fresh level, restoring preferences from `store`
    pub fn new(
        config: EditorConfig,
        store: Box<dyn PreferenceStore>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        let preferences = EditorPreferences::load(store.as_ref());
        let level = LevelGrid::new(
            "Untitled Level",
            config.limits.clamp(config.default_width),
            config.limits.clamp(config.default_height),
            config.level_tile_size(),
        );

        let layers = if preferences.entity_layers.is_empty() {
            vec![EntityLayer::default()]
        } else {
            preferences.entity_layers.clone()
        };
        let mut entities = EntitySystem::new(EntityStore {
            definitions: preferences.merged_definitions(),
            layers,
        });
        let unresolved = entities.sanitize_loaded();
        if unresolved > 0 {
            warn!("{} stored entities reference unknown definitions", unresolved);
        }

        let mut catalog = TileCatalog::with_builtin();
        for tileset in &preferences.custom_tilesets {
            catalog.extend(tileset.generate_catalog());
        }

        let history = History::new(
            Document {
                level: level.clone(),
                entities: entities.store().clone(),
            },
            config.max_history,
        );
        let prober = TilesetProber::new(images, config.probe_timeout());
        let mut viewport = Viewport::new(
            (level.pixel_size().0 as f32, level.pixel_size().1 as f32),
            config.initial_zoom,
            config.min_zoom,
            config.max_zoom,
        );
        viewport.sync(&level);

        info!(
            "Editor session started: {}x{} level, {} tiles in catalog",
            level.width,
            level.height,
            catalog.len()
        );

        Self {
            show_grid: config.show_grid,
            config,
            level,
            entities,
            history,
            catalog,
            prober,
            failed_tilesets: HashSet::new(),
            preferences,
            store,
            viewport,
            mode: EditMode::default(),
            tile_tool: TileTool::default(),
            entity_tool: EntityTool::default(),
            selected_tile: None,
            gesture: Gesture::Idle,
            needs_redraw: true,
            dirty: false,
            path: None,
        }
    }

    /// End the session, persisting preferences.
    ///
    /// Custom entity definitions and the current entity layers are stored.
    pub fn close(mut self) -> Result<(), PreferencesError> {
        self.sync_preferences();
        self.preferences.save(self.store.as_mut())?;
        info!("Editor session closed");
        Ok(())
    }

    fn sync_preferences(&mut self) {
        let builtin: Vec<String> = default_entity_definitions()
            .into_iter()
            .map(|d| d.id)
            .collect();
        self.preferences.custom_entity_definitions = self
            .entities
            .definitions()
            .iter()
            .filter(|d| !builtin.contains(&d.id))
            .cloned()
            .collect();
        self.preferences.entity_layers = self.entities.layers().to_vec();
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn level(&self) -> &LevelGrid {
        &self.level
    }

    pub fn entities(&self) -> &EntitySystem {
        &self.entities
    }

    pub fn selection(&self) -> &Selection {
        self.entities.selection()
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn preferences(&self) -> &EditorPreferences {
        &self.preferences
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn history(&self) -> &History<Document> {
        &self.history
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditMode) {
        if self.mode != mode {
            self.finish_gesture();
            self.mode = mode;
            self.entities.set_hovered(None);
            self.needs_redraw = true;
        }
    }

    pub fn tile_tool(&self) -> TileTool {
        self.tile_tool
    }

    pub fn set_tile_tool(&mut self, tool: TileTool) {
        self.tile_tool = tool;
    }

    pub fn entity_tool(&self) -> EntityTool {
        self.entity_tool
    }

    pub fn set_entity_tool(&mut self, tool: EntityTool) {
        self.finish_gesture();
        self.entity_tool = tool;
    }

    pub fn selected_tile(&self) -> Option<&str> {
        self.selected_tile.as_deref()
    }

    /// Choose the tile to paint with. Unknown ids are refused.
    pub fn select_tile(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if !self.catalog.contains(id) => false,
            _ => {
                self.selected_tile = id.map(str::to_string);
                true
            }
        }
    }

    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn toggle_grid(&mut self) -> bool {
        self.show_grid = !self.show_grid;
        self.needs_redraw = true;
        self.show_grid
    }

    /// Set the zoom factor, clamped to the configured range
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        let applied = self.viewport.set_zoom(self.config.clamp_zoom(zoom));
        self.viewport.sync(&self.level);
        self.needs_redraw = true;
        applied
    }

    /// Whether a tileset image could not be read
    pub fn is_tileset_failed(&self, path: &str) -> bool {
        self.failed_tilesets.contains(path)
    }

    /// Read and reset the redraw flag
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Whether there are changes since the last save or load
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ========================================================================
    // History
    // ========================================================================

    fn snapshot(&self) -> Document {
        Document {
            level: self.level.clone(),
            entities: self.entities.store().clone(),
        }
    }

    /// Record the live state after a successful mutation
    fn commit(&mut self) {
        let snapshot = self.snapshot();
        self.history.record(&snapshot);
        self.viewport.sync(&self.level);
        self.dirty = true;
        self.needs_redraw = true;
    }

    fn restore(&mut self, document: Document) {
        self.level = document.level;
        self.entities.restore_store(document.entities);
        self.viewport.sync(&self.level);
        self.dirty = true;
        self.needs_redraw = true;
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.finish_gesture();
        match self.history.undo().cloned() {
            Some(document) => {
                self.restore(document);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.finish_gesture();
        match self.history.redo().cloned() {
            Some(document) => {
                self.restore(document);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Level operations
    // ========================================================================

    /// Paint (`Some`) or erase (`None`) a cell.
    ///
    /// Out-of-bounds cells and writes that change nothing are not recorded.
    pub fn place_tile(&mut self, x: i64, y: i64, tile: Option<&str>) -> bool {
        if !self.level.in_bounds(x, y) {
            return false;
        }
        if self.level.tile_at(x as u32, y as u32) == tile {
            return false;
        }
        self.level.place_tile(x, y, tile);
        self.commit();
        true
    }

    pub fn resize_level(&mut self, width: u32, height: u32) -> bool {
        if !self.level.resize(width, height, self.config.limits) {
            return false;
        }
        info!("Resized level to {}x{}", self.level.width, self.level.height);
        self.commit();
        true
    }

    /// Remove every tile. Confirmation is the caller's job.
    pub fn clear_level(&mut self) -> bool {
        if self.level.tile_count() == 0 {
            return false;
        }
        self.level.clear();
        self.commit();
        true
    }

    pub fn set_metadata(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.level.metadata.name = name.into();
        self.level.metadata.description = description.into();
        self.level.touch();
        self.commit();
    }

    /// Replace the document with an empty level. History starts over.
    pub fn new_level(&mut self, name: impl Into<String>, width: u32, height: u32) {
        self.finish_gesture();
        self.level = LevelGrid::new(
            name,
            self.config.limits.clamp(width),
            self.config.limits.clamp(height),
            self.config.level_tile_size(),
        );
        self.entities.clear_instances();
        self.viewport.sync(&self.level);
        let snapshot = self.snapshot();
        self.history.reset(snapshot);
        self.path = None;
        self.dirty = false;
        self.needs_redraw = true;
    }

    // ========================================================================
    // Entity operations
    // ========================================================================

    pub fn select_entity(&mut self, id: Option<Uuid>) {
        self.entities.select_entity(id);
        self.needs_redraw = true;
    }

    pub fn select_definition(&mut self, id: Option<&str>) -> Result<(), EntityError> {
        self.entities.select_definition(id)
    }

    pub fn select_layer(&mut self, id: Uuid) -> Result<(), EntityError> {
        self.entities.select_layer(id)
    }

    pub fn add_definition(&mut self, definition: EntityDefinition) -> Result<(), EntityError> {
        self.entities.add_definition(definition)?;
        self.commit();
        Ok(())
    }

    pub fn edit_definition(&mut self, definition: EntityDefinition) -> Result<(), EntityError> {
        self.entities.edit_definition(definition)?;
        self.commit();
        Ok(())
    }

    pub fn duplicate_definition(&mut self, id: &str) -> Result<String, EntityError> {
        let copy = self.entities.duplicate_definition(id)?;
        self.commit();
        Ok(copy)
    }

    /// Delete a definition and every instance of it
    pub fn delete_definition(&mut self, id: &str) -> Result<usize, EntityError> {
        let removed = self.entities.delete_definition(id)?;
        self.commit();
        Ok(removed)
    }

    pub fn add_layer(&mut self, name: impl Into<String>, grid_size: Option<u32>) -> Uuid {
        let id = self.entities.add_layer(name, grid_size);
        self.commit();
        id
    }

    pub fn edit_layer(&mut self, id: Uuid, edit: LayerEdit) -> Result<(), EntityError> {
        self.entities.edit_layer(id, edit)?;
        self.commit();
        Ok(())
    }

    pub fn delete_layer(&mut self, id: Uuid) -> Result<EntityLayer, EntityError> {
        let layer = self.entities.delete_layer(id)?;
        self.commit();
        Ok(layer)
    }

    pub fn toggle_layer_visibility(&mut self, id: Uuid) -> Result<bool, EntityError> {
        let visible = self.entities.toggle_visibility(id)?;
        self.commit();
        Ok(visible)
    }

    pub fn toggle_layer_lock(&mut self, id: Uuid) -> Result<bool, EntityError> {
        let locked = self.entities.toggle_lock(id)?;
        self.commit();
        Ok(locked)
    }

    pub fn reorder_layers(&mut self, from: usize, to: usize) -> bool {
        if !self.entities.reorder_layers(from, to) {
            return false;
        }
        self.commit();
        true
    }

    pub fn add_instance(
        &mut self,
        x: f32,
        y: f32,
        definition_id: &str,
        layer_id: Option<Uuid>,
    ) -> Option<EntityInstance> {
        let instance = self.entities.add_instance(x, y, definition_id, layer_id)?;
        self.commit();
        Some(instance)
    }

    pub fn delete_instance(&mut self, id: Uuid) -> Option<EntityInstance> {
        let instance = self.entities.delete_instance(id)?;
        self.commit();
        Some(instance)
    }

    pub fn clear_instances(&mut self) -> usize {
        let removed = self.entities.clear_instances();
        if removed > 0 {
            self.commit();
        }
        removed
    }

    pub fn move_instance(&mut self, id: Uuid, x: f32, y: f32) -> bool {
        if !self.entities.move_instance(id, x, y) {
            return false;
        }
        self.commit();
        true
    }

    pub fn resize_instance(&mut self, id: Uuid, width: f32, height: f32) -> bool {
        if !self.entities.resize_instance(id, width, height) {
            return false;
        }
        self.commit();
        true
    }

    pub fn set_field_value(
        &mut self,
        instance_id: Uuid,
        field_id: &str,
        value: FieldValue,
    ) -> Result<(), EntityError> {
        self.entities.set_field_value(instance_id, field_id, value)?;
        self.commit();
        Ok(())
    }

    // ========================================================================
    // Tilesets
    // ========================================================================

    /// Ask for a tileset to be sliced. `None` uses the configured probe tile size.
    ///
    /// A cached result is applied to the catalog immediately.
    pub fn request_tileset(&mut self, path: &str, tile_size: Option<u32>) -> ProbeStatus {
        let tile_size = tile_size.unwrap_or(self.config.probe_tile_size);
        let status = self.prober.request(path, tile_size);
        match &status {
            ProbeStatus::Ready(def) => self.apply_probe(ProbeEvent::Ready(def.clone())),
            ProbeStatus::Failed(error) => self.apply_probe(ProbeEvent::Failed {
                path: path.to_string(),
                error: error.clone(),
            }),
            ProbeStatus::Pending => {}
        }
        status
    }

    /// Apply finished probes to the catalog. Call once per frame.
    pub fn poll_probes(&mut self) -> Vec<ProbeEvent> {
        let events = self.prober.poll();
        for event in &events {
            self.apply_probe(event.clone());
        }
        events
    }

    /// Block until a pending probe settles, then apply it
    pub fn wait_for_tileset(&mut self, path: &str) -> Option<ProbeStatus> {
        let status = self.prober.wait(path);
        self.poll_probes();
        status
    }

    fn apply_probe(&mut self, event: ProbeEvent) {
        match event {
            ProbeEvent::Ready(def) => {
                self.failed_tilesets.remove(&def.image_path);
                self.catalog.remove_by_sprite(&def.image_path);
                self.catalog.extend(def.generate_catalog());
                if self.preferences.selected_tileset.is_none() {
                    self.preferences.selected_tileset = Some(def.image_path.clone());
                }
                self.preferences.add_custom_tileset(def);
            }
            ProbeEvent::Failed { path, .. } => {
                self.failed_tilesets.insert(path);
            }
        }
        self.needs_redraw = true;
    }

    pub fn select_tileset(&mut self, path: Option<&str>) {
        self.preferences.selected_tileset = path.map(str::to_string);
    }

    /// Forget a tileset and drop its tiles from the catalog
    pub fn remove_tileset(&mut self, path: &str) -> usize {
        self.prober.forget(path);
        self.failed_tilesets.remove(path);
        self.preferences.remove_custom_tileset(path);
        let removed = self.catalog.remove_by_sprite(path);
        if self
            .selected_tile
            .as_deref()
            .is_some_and(|id| !self.catalog.contains(id))
        {
            self.selected_tile = None;
        }
        self.needs_redraw = true;
        removed
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    /// Route a pointer event to the active mode's tool
    pub fn handle_pointer(&mut self, event: PointerEvent) -> PointerOutcome {
        let effect = match self.mode {
            EditMode::Tile => self.tile_pointer(event),
            EditMode::Entity => self.entity_pointer(event),
        };
        PointerOutcome {
            effect,
            prevent_default: event.kind.prevent_default(),
        }
    }

    fn tile_pointer(&mut self, event: PointerEvent) -> PointerEffect {
        match event.action {
            PointerAction::Up => {
                self.gesture = Gesture::Idle;
                return PointerEffect::None;
            }
            PointerAction::Move if self.gesture != Gesture::Painting => {
                return PointerEffect::None;
            }
            PointerAction::Down => self.gesture = Gesture::Painting,
            PointerAction::Move => {}
        }

        let Some(pos) = self.viewport.cell_at(event.position, &self.level) else {
            return PointerEffect::None;
        };
        let (x, y) = (pos.x as i64, pos.y as i64);
        if event.button == PointerButton::Secondary || self.tile_tool == TileTool::Erase {
            if self.place_tile(x, y, None) {
                return PointerEffect::Erased(pos);
            }
        } else if let Some(tile) = self.selected_tile.clone() {
            if self.place_tile(x, y, Some(&tile)) {
                return PointerEffect::Painted(pos);
            }
        }
        PointerEffect::None
    }

    fn entity_pointer(&mut self, event: PointerEvent) -> PointerEffect {
        let pixel = self
            .viewport
            .pixel_at(event.position, &self.level)
            .map(|(x, y)| (x as f32, y as f32));

        match event.action {
            PointerAction::Up => self.finish_gesture(),
            PointerAction::Move => {
                if let Gesture::Dragging { id, offset, .. } = self.gesture {
                    let Some((x, y)) = pixel else {
                        return PointerEffect::None;
                    };
                    if self.entities.move_instance(id, x - offset.0, y - offset.1) {
                        self.gesture = Gesture::Dragging {
                            id,
                            offset,
                            moved: true,
                        };
                        self.needs_redraw = true;
                        return PointerEffect::Moved(id);
                    }
                    return PointerEffect::None;
                }
                let hovered = pixel.and_then(|(x, y)| self.entities.entity_at(x, y).map(|e| e.id));
                if hovered == self.entities.selection().hovered {
                    return PointerEffect::None;
                }
                self.entities.set_hovered(hovered);
                self.needs_redraw = true;
                PointerEffect::Hovered(hovered)
            }
            PointerAction::Down => {
                let Some((x, y)) = pixel else {
                    return PointerEffect::None;
                };
                match self.entity_tool {
                    EntityTool::Place => self.place_at(x, y),
                    EntityTool::Select => {
                        let hit = self.editable_entity_at(x, y).map(|e| e.id);
                        self.select_entity(hit);
                        PointerEffect::Selected(hit)
                    }
                    EntityTool::Move => {
                        let hit = self.editable_entity_at(x, y).map(|e| (e.id, e.x, e.y));
                        self.select_entity(hit.map(|(id, _, _)| id));
                        if let Some((id, ex, ey)) = hit {
                            self.gesture = Gesture::Dragging {
                                id,
                                offset: (x - ex, y - ey),
                                moved: false,
                            };
                        }
                        PointerEffect::Selected(hit.map(|(id, _, _)| id))
                    }
                    EntityTool::Delete => match self.editable_entity_at(x, y).map(|e| e.id) {
                        Some(id) => {
                            self.delete_instance(id);
                            PointerEffect::Deleted(id)
                        }
                        None => PointerEffect::None,
                    },
                }
            }
        }
    }

    fn place_at(&mut self, x: f32, y: f32) -> PointerEffect {
        let Some(definition_id) = self.entities.selection().definition.clone() else {
            return PointerEffect::None;
        };
        let Some(layer) = self.entities.selected_layer() else {
            return PointerEffect::None;
        };
        if layer.locked {
            debug!("Not placing '{}': layer '{}' is locked", definition_id, layer.name);
            return PointerEffect::None;
        }
        let (x, y) = if self.config.snap_to_grid {
            layer.snap(x, y)
        } else {
            (x, y)
        };
        match self.add_instance(x, y, &definition_id, None) {
            Some(instance) => PointerEffect::Placed(instance.id),
            None => PointerEffect::None,
        }
    }

    /// Topmost visible entity under a point whose layer is not locked
    fn editable_entity_at(&self, x: f32, y: f32) -> Option<&EntityInstance> {
        let instance = self.entities.entity_at(x, y)?;
        let layer = self.entities.layer_of(instance.id)?;
        (!layer.locked).then_some(instance)
    }

    /// End a paint stroke or drag, recording a drag that moved
    fn finish_gesture(&mut self) -> PointerEffect {
        match std::mem::take(&mut self.gesture) {
            Gesture::Dragging {
                id, moved: true, ..
            } => {
                self.commit();
                PointerEffect::Moved(id)
            }
            _ => PointerEffect::None,
        }
    }

    // ========================================================================
    // Files and library
    // ========================================================================

    /// The level file for the current document
    pub fn level_file(&self) -> LevelFile {
        LevelFile::new(self.level.clone(), Some(self.entities.store().clone().into()))
    }

    /// The game export for the current document
    pub fn export_map(&self) -> ExportMap {
        let layers = self
            .config
            .export_entities
            .then(|| self.entities.layers());
        ExportMap::from_level(&self.level, layers)
    }

    pub fn save_to(&mut self, path: impl Into<PathBuf>) -> Result<(), LevelFileError> {
        let path = path.into();
        write_level_file(&path, &self.level_file())?;
        self.path = Some(path);
        self.dirty = false;
        Ok(())
    }

    /// Save to the path the level was last loaded from or saved to
    pub fn save(&mut self) -> Result<(), LevelFileError> {
        let path = self.path.clone().ok_or(LevelFileError::NoPath)?;
        self.save_to(path)
    }

    /// Load a level file. On any error the current document is kept.
    pub fn load_from(&mut self, path: impl Into<PathBuf>) -> Result<(), LevelFileError> {
        let path = path.into();
        let file = read_level_file(&path, self.config.limits)?;
        let store = match file.entities {
            Some(data) => EntityStore::from(data),
            None => EntityStore {
                definitions: self.entities.definitions().to_vec(),
                layers: vec![EntityLayer::default()],
            },
        };
        self.replace_document(file.level, store);
        self.path = Some(path);
        Ok(())
    }

    /// Write the game export to `path`
    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<ExportMap, LevelFileError> {
        let map = self.export_map();
        write_export(path.as_ref(), &map)?;
        Ok(map)
    }

    fn replace_document(&mut self, level: LevelGrid, store: EntityStore) {
        self.finish_gesture();
        self.level = level;
        self.entities.restore_store(store);
        let unresolved = self.entities.sanitize_loaded();
        if unresolved > 0 {
            warn!(
                "Level '{}' has {} entities with unknown definitions",
                self.level.metadata.name, unresolved
            );
        }
        self.viewport.sync(&self.level);
        let snapshot = self.snapshot();
        self.history.reset(snapshot);
        self.dirty = false;
        self.needs_redraw = true;
    }

    pub fn save_to_library(&mut self, name: &str) -> Result<(), PreferencesError> {
        let map = self.export_map();
        LevelLibrary::new(self.store.as_mut()).save(name, &map)
    }

    /// Load a level saved in the library. Missing or unreadable entries return `false`.
    ///
    /// Exported entities are placed again with fresh ids on layers of the same name.
    pub fn load_from_library(&mut self, name: &str) -> bool {
        let Some(map) = LevelLibrary::new(self.store.as_mut()).load(name) else {
            return false;
        };
        let level = map.to_level();
        if let Err(e) = level.validate(self.config.limits) {
            warn!("Ignoring library level '{}': {}", name, e);
            return false;
        }

        let mut layers: Vec<EntityLayer> = map
            .entity_layers
            .unwrap_or_default()
            .into_iter()
            .map(|exported| {
                let mut layer = EntityLayer::new(exported.name, Some(16));
                layer.entities = exported
                    .entities
                    .into_iter()
                    .map(|entity| EntityInstance {
                        id: Uuid::new_v4(),
                        definition_id: entity.definition_id,
                        x: entity.x,
                        y: entity.y,
                        width: entity.width,
                        height: entity.height,
                        field_values: entity.fields,
                        pivot: Pivot::default(),
                    })
                    .collect();
                layer
            })
            .collect();
        if layers.is_empty() {
            layers.push(EntityLayer::default());
        }

        let store = EntityStore {
            definitions: self.entities.definitions().to_vec(),
            layers,
        };
        self.replace_document(level, store);
        self.path = None;
        true
    }

    pub fn library_levels(&mut self) -> Vec<String> {
        LevelLibrary::new(self.store.as_mut()).list()
    }

    pub fn remove_from_library(&mut self, name: &str) -> Result<bool, PreferencesError> {
        LevelLibrary::new(self.store.as_mut()).remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{FileStore, MemoryStore};
    use crate::probe::ProbeError;

    struct FixedSource;

    impl ImageSource for FixedSource {
        fn dimensions(&self, path: &str) -> Result<(u32, u32), ProbeError> {
            if path.ends_with(".png") {
                Ok((64, 32))
            } else {
                Err(ProbeError::Decode {
                    path: path.to_string(),
                    message: "unsupported".to_string(),
                })
            }
        }
    }

    fn new_session() -> EditorSession {
        EditorSession::new(
            EditorConfig::default(),
            Box::new(MemoryStore::new()),
            Arc::new(FixedSource),
        )
    }

    /// Display point at the center of a cell, with an unscaled viewport
    fn cell_point(x: u32, y: u32) -> (f32, f32) {
        (x as f32 * 32.0 + 16.0, y as f32 * 32.0 + 16.0)
    }

    #[test]
    fn test_new_session_defaults() {
        let session = new_session();
        assert_eq!((session.level().width, session.level().height), (25, 19));
        assert_eq!(session.entities().definitions().len(), 4);
        assert_eq!(session.entities().layers().len(), 1);
        assert!(session.selection().layer.is_some());
        assert_eq!(session.catalog().len(), 9);
        assert!(!session.can_undo());
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_place_tile_records_history() {
        let mut session = new_session();
        assert!(session.place_tile(3, 4, Some("grass")));
        assert!(!session.place_tile(3, 4, Some("grass")));
        assert!(!session.place_tile(-1, 0, Some("grass")));
        assert_eq!(session.history().len(), 2);
        assert!(session.is_dirty());

        assert!(session.undo());
        assert_eq!(session.level().tile_at(3, 4), None);
        assert!(session.redo());
        assert_eq!(session.level().tile_at(3, 4), Some("grass"));
    }

    #[test]
    fn test_tile_pointer_paints_and_erases() {
        let mut session = new_session();
        assert!(session.select_tile(Some("sand")));
        assert!(!session.select_tile(Some("lava")));

        let out = session.handle_pointer(PointerEvent::down(cell_point(2, 2)));
        assert_eq!(out.effect, PointerEffect::Painted(GridPos::new(2, 2)));
        assert!(!out.prevent_default);

        let out = session.handle_pointer(PointerEvent::moved(cell_point(3, 2)));
        assert_eq!(out.effect, PointerEffect::Painted(GridPos::new(3, 2)));
        session.handle_pointer(PointerEvent::up(cell_point(3, 2)));

        let out = session.handle_pointer(PointerEvent::moved(cell_point(4, 2)));
        assert_eq!(out.effect, PointerEffect::None);

        let out = session.handle_pointer(
            PointerEvent::down(cell_point(2, 2))
                .with_button(PointerButton::Secondary)
                .with_kind(PointerKind::Touch),
        );
        assert_eq!(out.effect, PointerEffect::Erased(GridPos::new(2, 2)));
        assert!(out.prevent_default);
        assert_eq!(session.level().tile_count(), 1);
    }

    #[test]
    fn test_entity_place_respects_lock_and_snap() {
        let mut session = EditorSession::new(
            EditorConfig {
                snap_to_grid: true,
                ..Default::default()
            },
            Box::new(MemoryStore::new()),
            Arc::new(FixedSource),
        );
        session.set_mode(EditMode::Entity);
        session.select_definition(Some("enemy_spawn")).unwrap();

        let out = session.handle_pointer(PointerEvent::down((37.0, 21.0)));
        let PointerEffect::Placed(id) = out.effect else {
            panic!("expected a placement, got {:?}", out.effect);
        };
        let placed = session.entities().instance(id).unwrap();
        assert_eq!((placed.x, placed.y), (32.0, 16.0));

        let layer = session.selection().layer.unwrap();
        session.toggle_layer_lock(layer).unwrap();
        let out = session.handle_pointer(PointerEvent::down((100.0, 100.0)));
        assert_eq!(out.effect, PointerEffect::None);
    }

    #[test]
    fn test_move_tool_drag_records_once() {
        let mut session = new_session();
        session.set_mode(EditMode::Entity);
        let id = session.add_instance(40.0, 40.0, "item_pickup", None).unwrap().id;
        let before = session.history().len();

        session.set_entity_tool(EntityTool::Move);
        let out = session.handle_pointer(PointerEvent::down((45.0, 45.0)));
        assert_eq!(out.effect, PointerEffect::Selected(Some(id)));
        session.handle_pointer(PointerEvent::moved((60.0, 50.0)));
        session.handle_pointer(PointerEvent::moved((105.0, 85.0)));
        let out = session.handle_pointer(PointerEvent::up((105.0, 85.0)));
        assert_eq!(out.effect, PointerEffect::Moved(id));

        let moved = session.entities().instance(id).unwrap();
        assert_eq!((moved.x, moved.y), (100.0, 80.0));
        assert_eq!(session.history().len(), before + 1);

        session.undo();
        let back = session.entities().instance(id).unwrap();
        assert_eq!((back.x, back.y), (40.0, 40.0));
    }

    #[test]
    fn test_select_hover_and_delete_tools() {
        let mut session = new_session();
        session.set_mode(EditMode::Entity);
        let id = session.add_instance(40.0, 40.0, "trigger_zone", None).unwrap().id;

        let out = session.handle_pointer(PointerEvent::moved((50.0, 50.0)));
        assert_eq!(out.effect, PointerEffect::Hovered(Some(id)));
        let out = session.handle_pointer(PointerEvent::moved((51.0, 50.0)));
        assert_eq!(out.effect, PointerEffect::None);

        session.set_entity_tool(EntityTool::Select);
        let out = session.handle_pointer(PointerEvent::down((50.0, 50.0)));
        assert_eq!(out.effect, PointerEffect::Selected(Some(id)));
        assert_eq!(session.selection().entity, Some(id));

        session.set_entity_tool(EntityTool::Delete);
        let out = session.handle_pointer(PointerEvent::down((50.0, 50.0)));
        assert_eq!(out.effect, PointerEffect::Deleted(id));
        assert_eq!(session.selection().entity, None);
        assert_eq!(session.selection().hovered, None);
    }

    #[test]
    fn test_tileset_probe_extends_catalog() {
        let mut session = new_session();
        let status = session.request_tileset("sheets/dungeon.png", None);
        assert_eq!(status, ProbeStatus::Pending);

        let status = session.wait_for_tileset("sheets/dungeon.png");
        assert!(matches!(status, Some(ProbeStatus::Ready(_))));
        assert!(session.catalog().contains("sheets/dungeon.png#7"));
        assert_eq!(session.catalog().len(), 9 + 8);
        assert_eq!(
            session.preferences().selected_tileset.as_deref(),
            Some("sheets/dungeon.png")
        );

        session.request_tileset("sheets/broken.tga", None);
        session.wait_for_tileset("sheets/broken.tga");
        assert!(session.is_tileset_failed("sheets/broken.tga"));

        assert_eq!(session.remove_tileset("sheets/dungeon.png"), 8);
        assert_eq!(session.catalog().len(), 9);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");

        let mut session = new_session();
        assert!(matches!(session.save(), Err(LevelFileError::NoPath)));
        session.place_tile(1, 1, Some("rock"));
        session.add_instance(10.0, 10.0, "player_spawn", None);
        session.save_to(&path).unwrap();
        assert!(!session.is_dirty());
        let saved = session.level().clone();

        let mut other = new_session();
        other.load_from(&path).unwrap();
        assert_eq!(other.level(), &saved);
        assert_eq!(other.entities().count_instances("player_spawn"), 1);
        assert!(!other.can_undo());
        assert_eq!(other.path(), Some(path.as_path()));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{\"width\": 500}").unwrap();
        assert!(other.load_from(&bad).is_err());
        assert_eq!(other.level(), &saved);
    }

    #[test]
    fn test_export_honors_config() {
        let mut session = new_session();
        session.add_instance(0.0, 0.0, "item_pickup", None);
        assert_eq!(session.export_map().entity_layers.map(|l| l.len()), Some(1));

        let quiet = EditorSession::new(
            EditorConfig {
                export_entities: false,
                ..Default::default()
            },
            Box::new(MemoryStore::new()),
            Arc::new(FixedSource),
        );
        assert!(quiet.export_map().entity_layers.is_none());
    }

    #[test]
    fn test_library_round_trip() {
        let mut session = new_session();
        session.set_metadata("Beach", "sandy");
        session.place_tile(5, 5, Some("sand"));
        session.add_instance(64.0, 64.0, "enemy_spawn", None);
        session.save_to_library("beach").unwrap();
        assert_eq!(session.library_levels(), vec!["beach".to_string()]);

        session.new_level("Blank", 20, 20);
        assert_eq!(session.level().tile_count(), 0);
        assert!(session.load_from_library("beach"));
        assert_eq!(session.level().tile_at(5, 5), Some("sand"));
        assert_eq!(session.entities().count_instances("enemy_spawn"), 1);
        assert!(!session.load_from_library("missing"));
    }

    #[test]
    fn test_close_persists_custom_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let open = || -> Box<dyn PreferenceStore> { Box::new(FileStore::open(&path).unwrap()) };

        let mut session = EditorSession::new(EditorConfig::default(), open(), Arc::new(FixedSource));
        session
            .add_definition(EntityDefinition::new("npc", "NPC", "#aa00aa"))
            .unwrap();
        session.add_layer("Pickups", None);
        session.close().unwrap();

        let prefs = EditorPreferences::load(open().as_ref());
        assert_eq!(prefs.custom_entity_definitions.len(), 1);
        assert_eq!(prefs.entity_layers.len(), 2);

        let reopened = EditorSession::new(EditorConfig::default(), open(), Arc::new(FixedSource));
        assert!(reopened.entities().definition("npc").is_some());
        assert_eq!(reopened.entities().definitions().len(), 5);
        assert_eq!(reopened.entities().layers()[1].name, "Pickups");
    }
}
