//! Entity definitions, placed instances and the layers that own them

use crate::{Positionable, Rect, SourceRect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tilecraft_schema::{EntityField, FieldError, FieldType, FieldValue};
use uuid::Uuid;

/// How instances of a definition are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    Rectangle,
    Ellipse,
    Cross,
    Tile,
}

/// Schema for a kind of placeable entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub id: String,
    pub name: String,
    /// Hex color for fill and outline
    pub color: String,
    pub fill_opacity: f32,
    pub line_opacity: f32,
    pub tile_opacity: f32,
    pub hollow: bool,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub keep_aspect_ratio: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub fields: Vec<EntityField>,
    /// Maximum number of instances across all layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
    pub show_name: bool,
    #[serde(default)]
    pub render_mode: RenderMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_rect: Option<SourceRect>,
}

impl EntityDefinition {
    /// A 16x16 opaque rectangle with no fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            fill_opacity: 1.0,
            line_opacity: 1.0,
            tile_opacity: 1.0,
            hollow: false,
            width: 16,
            height: 16,
            resizable: false,
            keep_aspect_ratio: true,
            tags: BTreeSet::new(),
            fields: Vec::new(),
            max_count: None,
            show_name: true,
            render_mode: RenderMode::Rectangle,
            tile_path: None,
            tile_rect: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_field(mut self, field: EntityField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn field(&self, id: &str) -> Option<&EntityField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Check that every declared default satisfies its own field's rules
    pub fn validate(&self) -> Result<(), FieldError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                return Err(FieldError::DuplicateField {
                    field: field.id.clone(),
                });
            }
            field.validate(&field.initial_value())?;
        }
        Ok(())
    }

    /// Field values a freshly placed instance starts with
    pub fn initial_field_values(&self) -> BTreeMap<String, FieldValue> {
        self.fields
            .iter()
            .map(|f| (f.id.clone(), f.initial_value()))
            .collect()
    }
}

/// The definitions every new project starts with
pub fn default_entity_definitions() -> Vec<EntityDefinition> {
    let text = |v: &str| FieldValue::String(v.to_string());
    let choice = |v: &str| FieldValue::Enum(v.to_string());

    let mut player = EntityDefinition::new("player_spawn", "Player Spawn", "#00ff00")
        .with_tags(["spawn", "player"])
        .with_field(
            EntityField::new("facing_direction", "Facing Direction", FieldType::Enum)
                .with_enum_values(["left", "right", "up", "down"])
                .with_default(choice("right"))
                .required(),
        );
    player.max_count = Some(1);

    let mut enemy = EntityDefinition::new("enemy_spawn", "Enemy Spawn", "#ff0000")
        .with_tags(["spawn", "enemy"])
        .with_field(
            EntityField::new("enemy_type", "Enemy Type", FieldType::Enum)
                .with_enum_values(["goblin", "orc", "skeleton", "dragon"])
                .with_default(choice("goblin"))
                .required(),
        )
        .with_field(
            EntityField::new("health", "Health", FieldType::Int)
                .with_range(1.0, 1000.0)
                .with_default(FieldValue::Int(100))
                .required(),
        )
        .with_field(
            EntityField::new("patrol_distance", "Patrol Distance", FieldType::Float)
                .with_range(0.0, 200.0)
                .with_default(FieldValue::Float(50.0)),
        );
    enemy.fill_opacity = 0.7;

    let mut item = EntityDefinition::new("item_pickup", "Item Pickup", "#ffff00")
        .with_size(12, 12)
        .with_tags(["item", "pickup"])
        .with_field(
            EntityField::new("item_type", "Item Type", FieldType::Enum)
                .with_enum_values(["coin", "health_potion", "key", "weapon", "armor"])
                .with_default(choice("coin"))
                .required(),
        )
        .with_field(
            EntityField::new("value", "Value", FieldType::Int)
                .with_range(1.0, 9999.0)
                .with_default(FieldValue::Int(10))
                .required(),
        )
        .with_field(
            EntityField::new("respawns", "Respawns", FieldType::Bool)
                .with_default(FieldValue::Bool(false)),
        );
    item.fill_opacity = 0.8;
    item.render_mode = RenderMode::Ellipse;

    let mut trigger = EntityDefinition::new("trigger_zone", "Trigger Zone", "#0080ff")
        .with_size(32, 32)
        .with_tags(["trigger", "zone"])
        .with_field(
            EntityField::new("trigger_type", "Trigger Type", FieldType::Enum)
                .with_enum_values(["level_exit", "cutscene", "dialogue", "save_point"])
                .with_default(choice("level_exit"))
                .required(),
        )
        .with_field(
            EntityField::new("target_level", "Target Level", FieldType::String)
                .with_default(text("")),
        )
        .with_field(EntityField::new("message", "Message", FieldType::String).with_default(text("")));
    trigger.resizable = true;
    trigger.keep_aspect_ratio = false;
    trigger.tile_opacity = 0.3;
    trigger.fill_opacity = 0.3;
    trigger.hollow = true;

    vec![player, enemy, item, trigger]
}

/// Normalized anchor point inside an instance's box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub x: f32,
    pub y: f32,
}

impl Default for Pivot {
    fn default() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

/// A placed entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInstance {
    pub id: Uuid,
    pub definition_id: String,
    /// Top-left corner in level pixels
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub field_values: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub pivot: Pivot,
}

impl EntityInstance {
    /// Create an instance sized and seeded from its definition
    pub fn from_definition(definition: &EntityDefinition, x: f32, y: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            definition_id: definition.id.clone(),
            x,
            y,
            width: definition.width as f32,
            height: definition.height as f32,
            field_values: definition.initial_field_values(),
            pivot: Pivot::default(),
        }
    }

    /// Whether a pixel lies inside the instance's box, edges included
    pub fn contains(&self, px: f32, py: f32) -> bool {
        self.bounds().contains(px, py)
    }

    pub fn field(&self, id: &str) -> Option<&FieldValue> {
        self.field_values.get(id)
    }
}

impl Positionable for EntityInstance {
    fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// An ordered stack of instances drawn together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLayer {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub opacity: f32,
    /// Snap increment in pixels; `None` places freely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<u32>,
    #[serde(default)]
    pub entities: Vec<EntityInstance>,
}

impl Default for EntityLayer {
    fn default() -> Self {
        Self::new("Entities", Some(16))
    }
}

impl EntityLayer {
    pub fn new(name: impl Into<String>, grid_size: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 1.0,
            grid_size,
            entities: Vec::new(),
        }
    }

    /// Snap a pixel coordinate down to this layer's grid
    pub fn snap(&self, x: f32, y: f32) -> (f32, f32) {
        match self.grid_size {
            Some(g) if g > 0 => {
                let g = g as f32;
                ((x / g).floor() * g, (y / g).floor() * g)
            }
            _ => (x, y),
        }
    }

    pub fn find(&self, id: Uuid) -> Option<&EntityInstance> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut EntityInstance> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<EntityInstance> {
        let pos = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(pos))
    }

    /// First instance in insertion order whose box contains the point
    pub fn entity_at(&self, x: f32, y: f32) -> Option<&EntityInstance> {
        self.entities.iter().find(|e| e.contains(x, y))
    }

    /// Number of instances of a definition on this layer
    pub fn count_of(&self, definition_id: &str) -> usize {
        self.entities
            .iter()
            .filter(|e| e.definition_id == definition_id)
            .count()
    }
}
