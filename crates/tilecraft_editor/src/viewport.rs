//! Pointer-to-level coordinate transform and zoom

use tilecraft_core::{GridPos, LevelGrid};

/// Which layer of the level pointer input edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Tile,
    Entity,
}

/// Input device that produced a pointer position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
}

impl PointerKind {
    /// Whether the front end should suppress the platform's default gesture
    /// handling (scroll, pinch zoom) for this input
    pub fn prevent_default(&self) -> bool {
        matches!(self, PointerKind::Touch)
    }
}

/// Result of resolving a pointer against the level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// A grid cell, in tile mode
    Cell(GridPos),
    /// A level pixel, in entity mode
    Pixel { x: u32, y: u32 },
}

/// Geometry of the drawing surface and its zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Top-left of the surface in display space
    pub origin: (f32, f32),
    /// Resolution the surface renders at
    pub internal_size: (f32, f32),
    /// Size the surface is shown at
    pub display_size: (f32, f32),
    /// Set once the front end reports where the surface is shown
    display_reported: bool,
    zoom: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new((800.0, 600.0), 1.0, 0.25, 4.0)
    }
}

impl Viewport {
    /// A surface shown at its internal resolution at the display origin
    pub fn new(size: (f32, f32), zoom: f32, min_zoom: f32, max_zoom: f32) -> Self {
        Self {
            origin: (0.0, 0.0),
            internal_size: size,
            display_size: size,
            display_reported: false,
            zoom: zoom.clamp(min_zoom, max_zoom.max(min_zoom)),
            min_zoom,
            max_zoom: max_zoom.max(min_zoom),
        }
    }

    /// Update the surface's on-screen placement
    pub fn set_display(&mut self, origin: (f32, f32), display_size: (f32, f32)) {
        self.origin = origin;
        self.display_size = display_size;
        self.display_reported = true;
    }

    /// Match the internal resolution to `level` at the current zoom.
    ///
    /// Until a display size is reported the surface is assumed to be shown 1:1.
    pub fn sync(&mut self, level: &LevelGrid) {
        let (width, height) = level.pixel_size();
        self.internal_size = (width as f32 * self.zoom, height as f32 * self.zoom);
        if !self.display_reported {
            self.display_size = self.internal_size;
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom factor, clamped to the allowed range. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.zoom
    }

    /// Display-to-internal scale on each axis, `None` for a collapsed surface
    pub fn scale(&self) -> Option<(f32, f32)> {
        let (dw, dh) = self.display_size;
        if dw <= 0.0 || dh <= 0.0 {
            return None;
        }
        Some((self.internal_size.0 / dw, self.internal_size.1 / dh))
    }

    /// Map a display-space point into the surface's internal resolution
    pub fn to_internal(&self, point: (f32, f32)) -> Option<(f32, f32)> {
        let (sx, sy) = self.scale()?;
        Some((
            (point.0 - self.origin.0) * sx,
            (point.1 - self.origin.1) * sy,
        ))
    }

    /// Grid cell under a display-space point, `None` outside the level
    pub fn cell_at(&self, point: (f32, f32), level: &LevelGrid) -> Option<GridPos> {
        let (ix, iy) = self.to_internal(point)?;
        let cell = level.tile_size as f32 * self.zoom;
        if cell <= 0.0 {
            return None;
        }
        let x = (ix / cell).floor() as i64;
        let y = (iy / cell).floor() as i64;
        level
            .in_bounds(x, y)
            .then(|| GridPos::new(x as u32, y as u32))
    }

    /// Level pixel under a display-space point, `None` outside the level
    pub fn pixel_at(&self, point: (f32, f32), level: &LevelGrid) -> Option<(u32, u32)> {
        let (ix, iy) = self.to_internal(point)?;
        let x = (ix / self.zoom).floor();
        let y = (iy / self.zoom).floor();
        let (width, height) = level.pixel_size();
        if x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32 {
            return None;
        }
        Some((x as u32, y as u32))
    }

    /// Resolve a point for the given edit mode
    pub fn hit(&self, point: (f32, f32), mode: EditMode, level: &LevelGrid) -> Option<HitTarget> {
        match mode {
            EditMode::Tile => self.cell_at(point, level).map(HitTarget::Cell),
            EditMode::Entity => self
                .pixel_at(point, level)
                .map(|(x, y)| HitTarget::Pixel { x, y }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaled_viewport() -> Viewport {
        let mut viewport = Viewport::new((800.0, 600.0), 1.0, 0.25, 4.0);
        viewport.set_display((0.0, 0.0), (400.0, 300.0));
        viewport
    }

    #[test]
    fn test_scaled_surface_maps_to_cell() {
        let level = LevelGrid::default();
        let viewport = scaled_viewport();

        assert_eq!(viewport.to_internal((40.0, 40.0)), Some((80.0, 80.0)));
        assert_eq!(
            viewport.hit((40.0, 40.0), EditMode::Tile, &level),
            Some(HitTarget::Cell(GridPos::new(2, 2)))
        );
        assert_eq!(
            viewport.hit((40.0, 40.0), EditMode::Entity, &level),
            Some(HitTarget::Pixel { x: 80, y: 80 })
        );
    }

    #[test]
    fn test_origin_offset_and_zoom() {
        let level = LevelGrid::default();
        let mut viewport = Viewport::default();
        viewport.set_display((100.0, 50.0), (800.0, 600.0));
        viewport.set_zoom(2.0);

        assert_eq!(viewport.cell_at((164.0, 114.0), &level), Some(GridPos::new(1, 1)));
        assert_eq!(viewport.pixel_at((164.0, 114.0), &level), Some((32, 32)));
        assert_eq!(viewport.cell_at((90.0, 60.0), &level), None);
    }

    #[test]
    fn test_sync_follows_level_and_zoom() {
        let level = LevelGrid::new("Wide", 50, 20, 32);
        let mut viewport = Viewport::default();
        viewport.set_zoom(2.0);
        viewport.sync(&level);
        assert_eq!(viewport.internal_size, (3200.0, 1280.0));
        assert_eq!(viewport.display_size, (3200.0, 1280.0));
        assert_eq!(viewport.cell_at((100.0, 70.0), &level), Some(GridPos::new(1, 1)));

        viewport.set_display((0.0, 0.0), (1600.0, 640.0));
        viewport.set_zoom(1.0);
        viewport.sync(&level);
        assert_eq!(viewport.internal_size, (1600.0, 640.0));
        assert_eq!(viewport.display_size, (1600.0, 640.0));
        assert_eq!(viewport.cell_at((1590.0, 10.0), &level), Some(GridPos::new(49, 0)));
    }

    #[test]
    fn test_outside_grid_rejected() {
        let level = LevelGrid::new("Small", 10, 10, 32);
        let viewport = Viewport::default();
        assert_eq!(viewport.cell_at((319.0, 10.0), &level), Some(GridPos::new(9, 0)));
        assert_eq!(viewport.cell_at((320.0, 10.0), &level), None);
        assert_eq!(viewport.pixel_at((320.0, 10.0), &level), None);
        assert_eq!(viewport.pixel_at((-1.0, 10.0), &level), None);
    }

    #[test]
    fn test_collapsed_surface() {
        let level = LevelGrid::default();
        let mut viewport = Viewport::default();
        viewport.set_display((0.0, 0.0), (0.0, 300.0));
        assert_eq!(viewport.to_internal((10.0, 10.0)), None);
        assert_eq!(viewport.hit((10.0, 10.0), EditMode::Tile, &level), None);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut viewport = Viewport::default();
        assert_eq!(viewport.set_zoom(8.0), 4.0);
        assert_eq!(viewport.set_zoom(0.01), 0.25);
        assert_eq!(viewport.set_zoom(1.5), 1.5);
        assert_eq!(viewport.zoom(), 1.5);
    }

    #[test]
    fn test_touch_prevents_default() {
        assert!(PointerKind::Touch.prevent_default());
        assert!(!PointerKind::Mouse.prevent_default());
    }
}
