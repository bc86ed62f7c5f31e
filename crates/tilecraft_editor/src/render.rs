//! Display list generation for the level canvas
//!
//! Everything is emitted in level pixel space; the front end applies zoom.

use crate::session::EditorSession;
use tilecraft_core::{
    parse_hex_color, DrawCommand, EntityDefinition, EntityInstance, GridPos, LevelGrid,
    Positionable, Rect, RenderMode, Renderable, Rgba, ShapeKind, Tile,
};

/// Opacity multiplier for entity layers that are switched off
pub const HIDDEN_LAYER_DIM: f32 = 0.3;
/// Names are drawn only at or above this zoom
pub const LABEL_MIN_ZOOM: f32 = 0.5;

const UNRESOLVED: Rgba = Rgba::new(1.0, 0.0, 1.0, 0.6);

/// A painted cell, resolved against the catalog
#[derive(Debug, Clone)]
pub struct TileView<'a> {
    pub pos: GridPos,
    rect: Rect,
    id: &'a str,
    tile: Option<&'a Tile>,
    failed: bool,
}

impl<'a> TileView<'a> {
    /// `failed` marks a tile whose sheet could not be loaded
    pub fn new(pos: GridPos, tile_size: u32, id: &'a str, tile: Option<&'a Tile>, failed: bool) -> Self {
        let size = tile_size as f32;
        Self {
            pos,
            rect: Rect::new(pos.x as f32 * size, pos.y as f32 * size, size, size),
            id,
            tile,
            failed,
        }
    }
}

impl Renderable for TileView<'_> {
    fn draw(&self, out: &mut Vec<DrawCommand>) {
        match self.tile {
            Some(tile) if !self.failed => out.push(DrawCommand::Sprite {
                image: tile.sprite.path.clone(),
                source: tile.sprite.frame,
                dest: self.rect,
                opacity: 1.0,
            }),
            Some(tile) => out.push(DrawCommand::Placeholder {
                rect: self.rect,
                color: parse_hex_color(&tile.color),
                label: tile.name.clone(),
            }),
            None => out.push(DrawCommand::Placeholder {
                rect: self.rect,
                color: UNRESOLVED,
                label: self.id.to_string(),
            }),
        }
    }
}

impl Positionable for TileView<'_> {
    fn position(&self) -> (f32, f32) {
        (self.rect.x, self.rect.y)
    }

    fn size(&self) -> (f32, f32) {
        (self.rect.width, self.rect.height)
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.rect.x = x;
        self.rect.y = y;
    }
}

/// A placed entity with everything needed to draw it
#[derive(Debug, Clone)]
pub struct EntityView<'a> {
    instance: &'a EntityInstance,
    definition: Option<&'a EntityDefinition>,
    rect: Rect,
    /// Layer opacity, already dimmed for hidden layers
    pub opacity: f32,
    pub selected: bool,
    pub hovered: bool,
    pub show_label: bool,
}

impl<'a> EntityView<'a> {
    pub fn new(instance: &'a EntityInstance, definition: Option<&'a EntityDefinition>) -> Self {
        Self {
            instance,
            definition,
            rect: instance.bounds(),
            opacity: 1.0,
            selected: false,
            hovered: false,
            show_label: true,
        }
    }

    fn draw_body(&self, definition: &EntityDefinition, out: &mut Vec<DrawCommand>) {
        let base = parse_hex_color(&definition.color);
        let fill = (!definition.hollow).then(|| base.fade(definition.fill_opacity * self.opacity));
        let line = base.fade(definition.line_opacity * self.opacity);

        match definition.render_mode {
            RenderMode::Rectangle => out.push(DrawCommand::Shape {
                shape: ShapeKind::Rectangle,
                rect: self.rect,
                fill,
                outline: Some(line),
            }),
            RenderMode::Ellipse => out.push(DrawCommand::Shape {
                shape: ShapeKind::Ellipse,
                rect: self.rect,
                fill,
                outline: Some(line),
            }),
            RenderMode::Cross => {
                let r = self.rect;
                out.push(DrawCommand::Line {
                    from: (r.x, r.y),
                    to: (r.right(), r.bottom()),
                    color: line,
                });
                out.push(DrawCommand::Line {
                    from: (r.right(), r.y),
                    to: (r.x, r.bottom()),
                    color: line,
                });
            }
            RenderMode::Tile => match &definition.tile_path {
                Some(path) => out.push(DrawCommand::Sprite {
                    image: path.clone(),
                    source: definition.tile_rect,
                    dest: self.rect,
                    opacity: definition.tile_opacity * self.opacity,
                }),
                None => out.push(DrawCommand::Shape {
                    shape: ShapeKind::Rectangle,
                    rect: self.rect,
                    fill: Some(base.fade(definition.fill_opacity * self.opacity)),
                    outline: None,
                }),
            },
        }

        if definition.show_name && self.show_label {
            out.push(DrawCommand::Text {
                position: (self.rect.x, self.rect.y - 2.0),
                text: definition.name.clone(),
                color: Rgba::WHITE.fade(self.opacity),
            });
        }
    }
}

impl Renderable for EntityView<'_> {
    fn draw(&self, out: &mut Vec<DrawCommand>) {
        match self.definition {
            Some(definition) => self.draw_body(definition, out),
            None => out.push(DrawCommand::Placeholder {
                rect: self.rect,
                color: UNRESOLVED.fade(self.opacity),
                label: self.instance.definition_id.clone(),
            }),
        }

        let highlight = if self.selected {
            Some(Rgba::SELECTED)
        } else if self.hovered {
            Some(Rgba::HOVERED)
        } else {
            None
        };
        if let Some(color) = highlight {
            out.push(DrawCommand::Shape {
                shape: ShapeKind::Rectangle,
                rect: self.rect,
                fill: None,
                outline: Some(color),
            });
        }
    }
}

impl Positionable for EntityView<'_> {
    fn position(&self) -> (f32, f32) {
        (self.rect.x, self.rect.y)
    }

    fn size(&self) -> (f32, f32) {
        (self.rect.width, self.rect.height)
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.rect.x = x;
        self.rect.y = y;
    }
}

/// Cell boundaries across the whole level
pub fn grid_lines(level: &LevelGrid, out: &mut Vec<DrawCommand>) {
    let size = level.tile_size as f32;
    let (width, height) = level.pixel_size();
    let (width, height) = (width as f32, height as f32);

    for x in 0..=level.width {
        let x = x as f32 * size;
        out.push(DrawCommand::Line {
            from: (x, 0.0),
            to: (x, height),
            color: Rgba::GRID,
        });
    }
    for y in 0..=level.height {
        let y = y as f32 * size;
        out.push(DrawCommand::Line {
            from: (0.0, y),
            to: (width, y),
            color: Rgba::GRID,
        });
    }
}

/// Everything on the canvas, back to front: grid, tiles, then entity layers
pub fn build_display_list(session: &EditorSession) -> Vec<DrawCommand> {
    let level = session.level();
    let mut out = Vec::new();

    if session.show_grid() {
        grid_lines(level, &mut out);
    }

    for (pos, id) in level.iter_tiles() {
        let tile = session.catalog().get(id);
        let failed = tile.is_some_and(|t| session.is_tileset_failed(&t.sprite.path));
        TileView::new(pos, level.tile_size, id, tile, failed).draw(&mut out);
    }

    let entities = session.entities();
    let selection = entities.selection();
    let show_label = session.viewport().zoom() >= LABEL_MIN_ZOOM;
    for layer in entities.layers() {
        let opacity = if layer.visible {
            layer.opacity
        } else {
            layer.opacity * HIDDEN_LAYER_DIM
        };
        for instance in &layer.entities {
            let mut view = EntityView::new(instance, entities.definition(&instance.definition_id));
            view.opacity = opacity;
            view.selected = selection.entity == Some(instance.id);
            view.hovered = selection.hovered == Some(instance.id);
            view.show_label = show_label;
            view.draw(&mut out);
        }
    }

    out
}
