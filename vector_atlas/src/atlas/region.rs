// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Atlas regions and cache results.

/// A rectangle of atlas pixels.
///
/// Only valid for the [`Atlas::generation`](super::Atlas::generation) it was allocated in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    /// X position in atlas (pixels).
    pub x: u16,
    /// Y position in atlas (pixels).
    pub y: u16,
    /// Width (pixels).
    pub width: u16,
    /// Height (pixels).
    pub height: u16,
}

impl Region {
    /// The region of a blank glyph or icon, which occupies no atlas space.
    pub const EMPTY: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Creates a region.
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the region covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the rightmost column.
    pub const fn right(&self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// One past the bottom row.
    pub const fn bottom(&self) -> u32 {
        self.y as u32 + self.height as u32
    }

    /// The smallest region containing both.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "both inputs end within u16 coordinates plus a u16 extent"
    )]
    pub(crate) fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self {
            x,
            y,
            width: (right - u32::from(x)) as u16,
            height: (bottom - u32::from(y)) as u16,
        }
    }
}

/// Texture coordinates of a region, normalized to `0..=1`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UvRect {
    /// Left.
    pub u0: f32,
    /// Top.
    pub v0: f32,
    /// Right.
    pub u1: f32,
    /// Bottom.
    pub v1: f32,
}

/// What the caches hand back for a key: where the pixels live and how to place them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CachedResult {
    /// The atlas pixels.
    pub region: Region,
    /// Horizontal offset, in device pixels, from the drawing anchor to the left edge of
    /// `region`'s content.
    pub offset_x: i16,
    /// Vertical offset, in device pixels (y down), from the drawing anchor to the top edge of
    /// `region`'s content.
    pub offset_y: i16,
}
