// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Measuring where a rendered bitmap actually has ink.
//!
//! Rasterized glyphs sit in cells padded for the typical anti-aliasing footprint. The real
//! footprint varies with the glyph and the backend, so placing glyphs by the assumed padding
//! lets baselines drift by a pixel. Scanning the finished cell for its ink gives offsets that
//! match what was drawn.

use crate::raster::TargetFormat;

/// The rectangle of pixels with nonzero coverage, in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InkBounds {
    /// First column with ink.
    pub left: u16,
    /// First row with ink.
    pub top: u16,
    /// One past the last column with ink.
    pub right: u16,
    /// One past the last row with ink.
    pub bottom: u16,
}

impl InkBounds {
    /// Width in pixels.
    pub fn width(&self) -> u16 {
        self.right - self.left
    }

    /// Height in pixels.
    pub fn height(&self) -> u16 {
        self.bottom - self.top
    }
}

/// Finds the [`InkBounds`] of a bitmap by scanning inward from each edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InkBoundsScanner {
    bytes_per_pixel: usize,
    /// Which byte of a pixel holds its coverage.
    alpha_offset: usize,
}

impl InkBoundsScanner {
    /// A scanner for bitmaps in `format`.
    pub const fn new(format: TargetFormat) -> Self {
        Self {
            bytes_per_pixel: format.bytes_per_pixel(),
            alpha_offset: format.alpha_channel(),
        }
    }

    #[inline]
    fn alpha(&self, pixels: &[u8], stride: usize, x: usize, y: usize) -> u8 {
        pixels[y * stride + x * self.bytes_per_pixel + self.alpha_offset]
    }

    fn row_has_ink(&self, pixels: &[u8], stride: usize, width: usize, y: usize) -> bool {
        (0..width).any(|x| self.alpha(pixels, stride, x, y) != 0)
    }

    fn column_has_ink(&self, pixels: &[u8], stride: usize, rows: (usize, usize), x: usize) -> bool {
        (rows.0..rows.1).any(|y| self.alpha(pixels, stride, x, y) != 0)
    }

    /// Scans a `width × height` bitmap whose rows are `stride` bytes apart.
    ///
    /// Returns `None` for a bitmap without any ink. The buffer must hold the whole bitmap.
    pub fn scan(&self, pixels: &[u8], stride: usize, width: u16, height: u16) -> Option<InkBounds> {
        let (w, h) = (usize::from(width), usize::from(height));
        if w == 0 || h == 0 {
            return None;
        }
        debug_assert!(
            pixels.len() >= stride * (h - 1) + w * self.bytes_per_pixel,
            "bitmap does not fit the buffer"
        );

        let top = (0..h).find(|&y| self.row_has_ink(pixels, stride, w, y))?;
        // Some row has ink, so these searches succeed.
        let bottom = (top..h).rfind(|&y| self.row_has_ink(pixels, stride, w, y))? + 1;
        let left = (0..w).find(|&x| self.column_has_ink(pixels, stride, (top, bottom), x))?;
        let right = (left..w).rfind(|&x| self.column_has_ink(pixels, stride, (top, bottom), x))? + 1;

        Some(InkBounds {
            left: u16::try_from(left).ok()?,
            top: u16::try_from(top).ok()?,
            right: u16::try_from(right).ok()?,
            bottom: u16::try_from(bottom).ok()?,
        })
    }
}
