//! Plain value types shared with the native layer.

use serde::{Deserialize, Serialize};

/// Integer rectangle, layout-compatible with `SDL_Rect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle anchored at the origin.
    pub const fn sized(w: i32, h: i32) -> Self {
        Self::new(0, 0, w, h)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Overlap of two rectangles, `None` when they do not intersect.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > i64::from(left) && bottom > i64::from(top) {
            Some(Rect::new(
                left,
                top,
                clamp_extent(right - i64::from(left)),
                clamp_extent(bottom - i64::from(top)),
            ))
        } else {
            None
        }
    }

    // Edges are computed in i64; x + w may not fit an i32.
    fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.w)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.h)
    }
}

fn clamp_extent(extent: i64) -> i32 {
    i32::try_from(extent).unwrap_or(i32::MAX)
}

/// Integer point, layout-compatible with `SDL_Point`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// RGBA colour, layout-compatible with `SDL_Color`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Packs the colour as `0xAARRGGBB`, the layout used by 32-bit ARGB
    /// surfaces.
    pub const fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersects_overlapping_rects() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        assert_eq!(a.intersection(&b), Some(Rect::new(50, 50, 50, 50)));
    }

    #[test]
    fn disjoint_rects_do_not_intersect() {
        let a = Rect::sized(10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn off_screen_rects_do_not_overflow() {
        let screen = Rect::sized(640, 480);
        assert_eq!(Rect::new(i32::MAX - 5, 0, 10, 10).intersection(&screen), None);
        assert_eq!(
            Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX).intersection(&screen),
            None
        );
    }

    #[test]
    fn huge_rect_clips_to_the_other() {
        let screen = Rect::sized(640, 480);
        let huge = Rect::new(-10, -10, i32::MAX, i32::MAX);
        assert_eq!(huge.intersection(&screen), Some(screen));
    }

    #[test]
    fn packs_argb() {
        assert_eq!(Color::rgba(0, 255, 0, 255).to_argb(), 0xff00ff00);
        assert_eq!(Color::WHITE.to_argb(), 0xffffffff);
    }
}
