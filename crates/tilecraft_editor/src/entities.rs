//! Entity definitions, layers, instances and selection state

use bevy::log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilecraft_core::{
    default_entity_definitions, EntityData, EntityDefinition, EntityInstance, EntityLayer,
};
use tilecraft_schema::{FieldError, FieldValue};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error("unknown entity definition '{0}'")]
    UnknownDefinition(String),
    #[error("entity definition '{0}' already exists")]
    DuplicateDefinition(String),
    #[error("unknown entity layer {0}")]
    UnknownLayer(Uuid),
    #[error("unknown entity {0}")]
    UnknownInstance(Uuid),
    #[error("definition '{definition}' has no field '{field}'")]
    UnknownField { definition: String, field: String },
    #[error("cannot delete the last entity layer")]
    LastLayer,
    #[error(transparent)]
    InvalidField(#[from] FieldError),
}

/// Everything about entities that undo/redo and level files capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStore {
    pub definitions: Vec<EntityDefinition>,
    pub layers: Vec<EntityLayer>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self {
            definitions: default_entity_definitions(),
            layers: vec![EntityLayer::default()],
        }
    }
}

impl From<EntityData> for EntityStore {
    fn from(data: EntityData) -> Self {
        Self {
            definitions: data.definitions,
            layers: data.layers,
        }
    }
}

impl From<EntityStore> for EntityData {
    fn from(store: EntityStore) -> Self {
        Self {
            definitions: store.definitions,
            layers: store.layers,
        }
    }
}

/// Current entity selection. Each part is independent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub entity: Option<Uuid>,
    pub hovered: Option<Uuid>,
    pub definition: Option<String>,
    pub layer: Option<Uuid>,
}

/// Partial update for [`EntitySystem::edit_layer`]
#[derive(Debug, Clone, Default)]
pub struct LayerEdit {
    pub name: Option<String>,
    /// `Some(None)` turns snapping off
    pub grid_size: Option<Option<u32>>,
    pub opacity: Option<f32>,
}

/// Owner of entity data and selection
#[derive(Debug, Clone)]
pub struct EntitySystem {
    store: EntityStore,
    selection: Selection,
}

impl Default for EntitySystem {
    fn default() -> Self {
        Self::new(EntityStore::default())
    }
}

impl EntitySystem {
    pub fn new(store: EntityStore) -> Self {
        let mut system = Self {
            store: EntityStore {
                definitions: Vec::new(),
                layers: Vec::new(),
            },
            selection: Selection::default(),
        };
        system.restore_store(store);
        system
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn definitions(&self) -> &[EntityDefinition] {
        &self.store.definitions
    }

    pub fn layers(&self) -> &[EntityLayer] {
        &self.store.layers
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn definition(&self, id: &str) -> Option<&EntityDefinition> {
        self.store.definitions.iter().find(|d| d.id == id)
    }

    pub fn layer(&self, id: Uuid) -> Option<&EntityLayer> {
        self.store.layers.iter().find(|l| l.id == id)
    }

    fn layer_mut(&mut self, id: Uuid) -> Option<&mut EntityLayer> {
        self.store.layers.iter_mut().find(|l| l.id == id)
    }

    /// The selected layer, if any
    pub fn selected_layer(&self) -> Option<&EntityLayer> {
        self.selection.layer.and_then(|id| self.layer(id))
    }

    pub fn instance(&self, id: Uuid) -> Option<&EntityInstance> {
        self.store.layers.iter().find_map(|l| l.find(id))
    }

    fn instance_mut(&mut self, id: Uuid) -> Option<&mut EntityInstance> {
        self.store.layers.iter_mut().find_map(|l| l.find_mut(id))
    }

    /// Layer that owns an instance
    pub fn layer_of(&self, instance_id: Uuid) -> Option<&EntityLayer> {
        self.store
            .layers
            .iter()
            .find(|l| l.find(instance_id).is_some())
    }

    /// Instances of a definition across all layers
    pub fn count_instances(&self, definition_id: &str) -> usize {
        self.store
            .layers
            .iter()
            .map(|l| l.count_of(definition_id))
            .sum()
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Select an instance; `None` or an unknown id clears the selection
    pub fn select_entity(&mut self, id: Option<Uuid>) {
        self.selection.entity = id.filter(|id| self.instance(*id).is_some());
    }

    pub fn set_hovered(&mut self, id: Option<Uuid>) {
        self.selection.hovered = id.filter(|id| self.instance(*id).is_some());
    }

    /// Select the definition used for placement
    pub fn select_definition(&mut self, id: Option<&str>) -> Result<(), EntityError> {
        match id {
            Some(id) if self.definition(id).is_none() => {
                Err(EntityError::UnknownDefinition(id.to_string()))
            }
            _ => {
                self.selection.definition = id.map(str::to_string);
                Ok(())
            }
        }
    }

    pub fn select_layer(&mut self, id: Uuid) -> Result<(), EntityError> {
        if self.layer(id).is_none() {
            return Err(EntityError::UnknownLayer(id));
        }
        self.selection.layer = Some(id);
        Ok(())
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    pub fn add_definition(&mut self, definition: EntityDefinition) -> Result<(), EntityError> {
        if self.definition(&definition.id).is_some() {
            return Err(EntityError::DuplicateDefinition(definition.id));
        }
        definition.validate()?;
        self.store.definitions.push(definition);
        Ok(())
    }

    /// Replace a definition by id and bring its instances in line with the new fields
    pub fn edit_definition(&mut self, definition: EntityDefinition) -> Result<(), EntityError> {
        definition.validate()?;
        let slot = self
            .store
            .definitions
            .iter_mut()
            .find(|d| d.id == definition.id)
            .ok_or_else(|| EntityError::UnknownDefinition(definition.id.clone()))?;
        *slot = definition.clone();

        for layer in &mut self.store.layers {
            for instance in &mut layer.entities {
                if instance.definition_id == definition.id {
                    conform_fields(instance, &definition);
                }
            }
        }
        Ok(())
    }

    /// Copy a definition under a fresh id, returning the new id
    pub fn duplicate_definition(&mut self, id: &str) -> Result<String, EntityError> {
        let source = self
            .definition(id)
            .ok_or_else(|| EntityError::UnknownDefinition(id.to_string()))?;

        let mut copy = source.clone();
        copy.id = self.unique_copy_id(id);
        copy.name = format!("{} (Copy)", source.name);
        let new_id = copy.id.clone();
        self.store.definitions.push(copy);
        Ok(new_id)
    }

    fn unique_copy_id(&self, id: &str) -> String {
        let base = format!("{}_copy", id);
        if self.definition(&base).is_none() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}{}", base, n);
            if self.definition(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Delete a definition and every instance of it, returning the number of
    /// instances removed
    pub fn delete_definition(&mut self, id: &str) -> Result<usize, EntityError> {
        let before = self.store.definitions.len();
        self.store.definitions.retain(|d| d.id != id);
        if self.store.definitions.len() == before {
            return Err(EntityError::UnknownDefinition(id.to_string()));
        }

        let mut removed = 0;
        for layer in &mut self.store.layers {
            let count = layer.entities.len();
            layer.entities.retain(|e| e.definition_id != id);
            removed += count - layer.entities.len();
        }

        if self.selection.definition.as_deref() == Some(id) {
            self.selection.definition = None;
        }
        self.revalidate_selection();
        info!("Deleted entity definition '{}' and {} instance(s)", id, removed);
        Ok(removed)
    }

    /// Merge definitions over the current set: same id replaces, new ids append.
    ///
    /// Definitions that fail validation are skipped.
    pub fn merge_definitions(&mut self, definitions: impl IntoIterator<Item = EntityDefinition>) {
        for definition in definitions {
            if let Err(e) = definition.validate() {
                warn!("Skipping entity definition '{}': {}", definition.id, e);
                continue;
            }
            match self
                .store
                .definitions
                .iter_mut()
                .find(|d| d.id == definition.id)
            {
                Some(existing) => *existing = definition,
                None => self.store.definitions.push(definition),
            }
        }
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Append a new layer and select it
    pub fn add_layer(&mut self, name: impl Into<String>, grid_size: Option<u32>) -> Uuid {
        let layer = EntityLayer::new(name, grid_size);
        let id = layer.id;
        self.store.layers.push(layer);
        self.selection.layer = Some(id);
        id
    }

    pub fn edit_layer(&mut self, id: Uuid, edit: LayerEdit) -> Result<(), EntityError> {
        let layer = self.layer_mut(id).ok_or(EntityError::UnknownLayer(id))?;
        if let Some(name) = edit.name {
            layer.name = name;
        }
        if let Some(grid_size) = edit.grid_size {
            layer.grid_size = grid_size;
        }
        if let Some(opacity) = edit.opacity {
            layer.opacity = opacity.clamp(0.0, 1.0);
        }
        Ok(())
    }

    /// Delete a layer and its instances. The last layer cannot be deleted.
    pub fn delete_layer(&mut self, id: Uuid) -> Result<EntityLayer, EntityError> {
        let index = self
            .store
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(EntityError::UnknownLayer(id))?;
        if self.store.layers.len() == 1 {
            return Err(EntityError::LastLayer);
        }

        let layer = self.store.layers.remove(index);
        self.revalidate_selection();
        Ok(layer)
    }

    /// Flip a layer's visibility, returning the new value
    pub fn toggle_visibility(&mut self, id: Uuid) -> Result<bool, EntityError> {
        let layer = self.layer_mut(id).ok_or(EntityError::UnknownLayer(id))?;
        layer.visible = !layer.visible;
        Ok(layer.visible)
    }

    /// Flip a layer's lock, returning the new value
    pub fn toggle_lock(&mut self, id: Uuid) -> Result<bool, EntityError> {
        let layer = self.layer_mut(id).ok_or(EntityError::UnknownLayer(id))?;
        layer.locked = !layer.locked;
        Ok(layer.locked)
    }

    /// Move the layer at `from` to index `to`, keeping the others in order
    pub fn reorder_layers(&mut self, from: usize, to: usize) -> bool {
        let len = self.store.layers.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        let layer = self.store.layers.remove(from);
        self.store.layers.insert(to, layer);
        true
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Place an instance of a definition.
    ///
    /// An explicit layer wins over the selected one. Returns `None` when no
    /// layer or definition resolves, or when the definition's `maxCount` is
    /// already reached.
    pub fn add_instance(
        &mut self,
        x: f32,
        y: f32,
        definition_id: &str,
        layer_id: Option<Uuid>,
    ) -> Option<EntityInstance> {
        let layer_id = layer_id.or(self.selection.layer)?;
        self.layer(layer_id)?;
        let definition = self.definition(definition_id)?;

        if let Some(max) = definition.max_count {
            let count = self.count_instances(definition_id);
            if count >= max as usize {
                debug!(
                    "Not placing '{}': {} of {} allowed already placed",
                    definition_id, count, max
                );
                return None;
            }
        }

        let instance = EntityInstance::from_definition(definition, x, y);
        let layer = self.layer_mut(layer_id)?;
        layer.entities.push(instance.clone());
        Some(instance)
    }

    pub fn delete_instance(&mut self, id: Uuid) -> Option<EntityInstance> {
        let removed = self.store.layers.iter_mut().find_map(|l| l.remove(id))?;
        if self.selection.entity == Some(id) {
            self.selection.entity = None;
        }
        if self.selection.hovered == Some(id) {
            self.selection.hovered = None;
        }
        Some(removed)
    }

    /// Remove every instance from every layer, returning how many were removed
    pub fn clear_instances(&mut self) -> usize {
        let mut removed = 0;
        for layer in &mut self.store.layers {
            removed += layer.entities.len();
            layer.entities.clear();
        }
        self.selection.entity = None;
        self.selection.hovered = None;
        removed
    }

    pub fn move_instance(&mut self, id: Uuid, x: f32, y: f32) -> bool {
        match self.instance_mut(id) {
            Some(instance) => {
                instance.x = x;
                instance.y = y;
                true
            }
            None => false,
        }
    }

    pub fn resize_instance(&mut self, id: Uuid, width: f32, height: f32) -> bool {
        match self.instance_mut(id) {
            Some(instance) => {
                instance.width = width;
                instance.height = height;
                true
            }
            None => false,
        }
    }

    /// Set one field on an instance after checking it against the definition's schema
    pub fn set_field_value(
        &mut self,
        instance_id: Uuid,
        field_id: &str,
        value: FieldValue,
    ) -> Result<(), EntityError> {
        let instance = self
            .instance(instance_id)
            .ok_or(EntityError::UnknownInstance(instance_id))?;
        let definition = self
            .definition(&instance.definition_id)
            .ok_or_else(|| EntityError::UnknownDefinition(instance.definition_id.clone()))?;
        let field = definition
            .field(field_id)
            .ok_or_else(|| EntityError::UnknownField {
                definition: definition.id.clone(),
                field: field_id.to_string(),
            })?;
        field.validate(&value)?;

        if let Some(instance) = self.instance_mut(instance_id) {
            instance.field_values.insert(field_id.to_string(), value);
        }
        Ok(())
    }

    /// Topmost visible instance whose box contains the point
    pub fn entity_at(&self, x: f32, y: f32) -> Option<&EntityInstance> {
        self.store
            .layers
            .iter()
            .rev()
            .filter(|l| l.visible)
            .find_map(|l| l.entity_at(x, y))
    }

    // ========================================================================
    // Whole-store operations
    // ========================================================================

    /// Swap in a stored state (undo, redo, load) and drop dangling selection
    pub fn restore_store(&mut self, store: EntityStore) {
        self.store = store;
        if self.store.layers.is_empty() {
            self.store.layers.push(EntityLayer::default());
        }
        if self
            .selection
            .definition
            .as_deref()
            .is_some_and(|id| self.definition(id).is_none())
        {
            self.selection.definition = None;
        }
        self.revalidate_selection();
    }

    /// Repair entity data that came from outside the editor.
    ///
    /// Instances whose definition is missing are kept as-is. Unknown field ids
    /// are dropped and missing or invalid values reset to their defaults.
    /// Returns the number of instances left without a definition.
    pub fn sanitize_loaded(&mut self) -> usize {
        let EntityStore {
            definitions,
            layers,
        } = &mut self.store;

        let mut unresolved = 0;
        for layer in layers.iter_mut() {
            for instance in &mut layer.entities {
                match definitions.iter().find(|d| d.id == instance.definition_id) {
                    Some(definition) => {
                        if conform_fields(instance, definition) {
                            debug!("Reset invalid field values on entity {}", instance.id);
                        }
                    }
                    None => {
                        unresolved += 1;
                        warn!(
                            "Entity {} on layer '{}' references unknown definition '{}'",
                            instance.id, layer.name, instance.definition_id
                        );
                    }
                }
            }
        }
        unresolved
    }

    fn revalidate_selection(&mut self) {
        if self.selection.entity.is_some_and(|id| self.instance(id).is_none()) {
            self.selection.entity = None;
        }
        if self.selection.hovered.is_some_and(|id| self.instance(id).is_none()) {
            self.selection.hovered = None;
        }
        if self.selection.layer.and_then(|id| self.layer(id)).is_none() {
            self.selection.layer = self.store.layers.first().map(|l| l.id);
        }
    }
}

/// Drop unknown fields and reset missing or invalid ones. Returns whether anything changed.
fn conform_fields(instance: &mut EntityInstance, definition: &EntityDefinition) -> bool {
    let before = instance.field_values.len();
    instance
        .field_values
        .retain(|id, _| definition.field(id).is_some());
    let mut changed = instance.field_values.len() != before;

    for field in &definition.fields {
        let valid = instance
            .field_values
            .get(&field.id)
            .is_some_and(|value| field.validate(value).is_ok());
        if !valid {
            instance
                .field_values
                .insert(field.id.clone(), field.initial_value());
            changed = true;
        }
    }
    changed
}
