//! Renderer-agnostic draw commands and the capability traits that produce them

use crate::SourceRect;
use serde::{Deserialize, Serialize};

/// Linear RGBA color, components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    /// Outline of the selected entity
    pub const SELECTED: Rgba = Rgba::new(0.0, 1.0, 0.0, 1.0);
    /// Outline of the hovered entity
    pub const HOVERED: Rgba = Rgba::new(1.0, 1.0, 0.0, 1.0);
    pub const GRID: Rgba = Rgba::new(1.0, 1.0, 1.0, 0.15);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Multiply the alpha channel by `factor`
    pub fn fade(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` hex string.
///
/// Anything unparseable falls back to a translucent green.
pub fn parse_hex_color(color_str: &str) -> Rgba {
    let hex = color_str.trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);

    let parsed = match hex.len() {
        3 if hex.is_ascii() => {
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            match (expand(0), expand(1), expand(2)) {
                (Some(r), Some(g), Some(b)) => Some(Rgba::new(r, g, b, 1.0)),
                _ => None,
            }
        }
        6 | 8 if hex.is_ascii() => {
            let a = if hex.len() == 8 { channel(&hex[6..8]) } else { Some(1.0) };
            match (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6]), a) {
                (Some(r), Some(g), Some(b), Some(a)) => Some(Rgba::new(r, g, b, a)),
                _ => None,
            }
        }
        _ => None,
    };

    // Default fallback color (green)
    parsed.unwrap_or(Rgba::new(0.4, 0.8, 0.4, 0.8))
}

/// Axis-aligned rectangle in level pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Inclusive containment on all four edges
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Primitive shapes an entity can be drawn as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Cross,
}

/// A single drawing primitive, in level pixel space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgba,
    },
    Sprite {
        image: String,
        source: Option<SourceRect>,
        dest: Rect,
        opacity: f32,
    },
    Shape {
        shape: ShapeKind,
        rect: Rect,
        fill: Option<Rgba>,
        outline: Option<Rgba>,
    },
    /// Stand-in for something that could not be resolved
    Placeholder {
        rect: Rect,
        color: Rgba,
        label: String,
    },
    Text {
        position: (f32, f32),
        text: String,
        color: Rgba,
    },
}

/// Anything that can append itself to a display list
pub trait Renderable {
    fn draw(&self, out: &mut Vec<DrawCommand>);
}

/// Anything with a pixel position and size in the level
pub trait Positionable {
    fn position(&self) -> (f32, f32);
    fn size(&self) -> (f32, f32);
    fn set_position(&mut self, x: f32, y: f32);

    fn bounds(&self) -> Rect {
        let (x, y) = self.position();
        let (w, h) = self.size();
        Rect::new(x, y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000"), Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(parse_hex_color("#fff"), Rgba::WHITE);
        assert_eq!(parse_hex_color("00ff00").g, 1.0);
        assert_eq!(parse_hex_color("#00000000").a, 0.0);
    }

    #[test]
    fn test_parse_hex_color_fallback() {
        let fallback = Rgba::new(0.4, 0.8, 0.4, 0.8);
        assert_eq!(parse_hex_color("red"), fallback);
        assert_eq!(parse_hex_color("#gg0000"), fallback);
        assert_eq!(parse_hex_color(""), fallback);
    }

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::new(10.0, 10.0, 16.0, 16.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(26.0, 26.0));
        assert!(!rect.contains(26.5, 20.0));
        assert_eq!(rect.center(), (18.0, 18.0));
    }

    #[test]
    fn test_fade() {
        let c = Rgba::WHITE.fade(0.3);
        assert!((c.a - 0.3).abs() < f32::EPSILON);
        assert_eq!(Rgba::WHITE.fade(2.0).a, 1.0);
    }
}
