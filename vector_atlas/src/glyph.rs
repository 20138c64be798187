// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterizing font glyphs.
//!
//! Glyph ids come from whatever shaped the text; this module only turns an id at a size and
//! fractional offset into coverage. [`GlyphRasterizer`] is the seam for font backends, and
//! [`OutlineGlyphRasterizer`] implements it for outline fonts via skrifa.

#![allow(
    clippy::cast_possible_truncation,
    reason = "cell coordinates are range-checked through u16::try_from before narrowing"
)]

use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::{FontRef, GlyphId, MetadataProvider, OutlineGlyphCollection};

use crate::RasterizeError;
use crate::kurbo::Affine;
use crate::path::SvgPath;
use crate::peniko::Fill;
use crate::raster::{Backend, RasterOptions, RasterTarget, Rasterizer, TargetFormat};

#[cfg(feature = "libm")]
#[allow(unused_imports, reason = "only needed without std")]
use core_maths::CoreFloat;

/// Padding in pixels added to each side of a glyph cell for anti-aliasing.
pub const GLYPH_PADDING: u16 = 1;

/// Metrics of a glyph rendered into a [`GlyphCanvas`] (no pixel data).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterizedGlyph {
    /// Width of the cell in pixels.
    pub width: u16,
    /// Height of the cell in pixels.
    pub height: u16,
    /// Horizontal offset from the glyph origin to the left edge of the cell.
    pub bearing_x: i16,
    /// Vertical offset (y down) from the glyph origin to the top edge of the cell.
    pub bearing_y: i16,
}

/// Scratch space a glyph is rendered into: one coverage byte per pixel, rows packed.
#[derive(Debug)]
pub struct GlyphCanvas<'a> {
    buffer: &'a mut [u8],
    width: u16,
    height: u16,
}

impl<'a> GlyphCanvas<'a> {
    /// Wraps a scratch buffer.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            width: 0,
            height: 0,
        }
    }

    /// Number of pixels the canvas can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Zeroes a `width × height` cell and returns it as a render target.
    ///
    /// Fails with [`RasterizeError::BufferTooSmall`] if the cell exceeds the capacity.
    pub fn target(&mut self, width: u16, height: u16) -> Result<RasterTarget<'_>, RasterizeError> {
        let len = usize::from(width) * usize::from(height);
        if len > self.buffer.len() {
            return Err(RasterizeError::BufferTooSmall);
        }
        self.width = width;
        self.height = height;
        let pixels = &mut self.buffer[..len];
        pixels.fill(0);
        RasterTarget::new(pixels, usize::from(width), width, height, TargetFormat::Alpha8)
    }

    /// The cell handed out by the last [`GlyphCanvas::target`] call.
    pub fn pixels(&self) -> &[u8] {
        &self.buffer[..usize::from(self.width) * usize::from(self.height)]
    }
}

/// A font backend able to rasterize glyphs by id.
pub trait GlyphRasterizer {
    /// Renders `glyph_id` at `scale` pixels per em, shifted right by `subpixel_x` and down by
    /// `subpixel_y` pixels (both in `0..1`), into `canvas`.
    ///
    /// The cell must be obtained through [`GlyphCanvas::target`]. A glyph without an outline
    /// (such as a space) is reported with a zero-sized cell.
    fn render_glyph_subpixel(
        &mut self,
        glyph_id: u32,
        scale: f32,
        subpixel_x: f32,
        subpixel_y: f32,
        canvas: &mut GlyphCanvas<'_>,
    ) -> Result<RasterizedGlyph, RasterizeError>;
}

/// Renders the outlines of a font through a [`Rasterizer`].
pub struct OutlineGlyphRasterizer<'a> {
    outlines: OutlineGlyphCollection<'a>,
    rasterizer: Rasterizer,
    path: SvgPath,
}

impl core::fmt::Debug for OutlineGlyphRasterizer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutlineGlyphRasterizer")
            .field("rasterizer", &self.rasterizer)
            .finish_non_exhaustive()
    }
}

impl<'a> OutlineGlyphRasterizer<'a> {
    /// Creates a rasterizer for the outlines of `font`, drawn with `backend`.
    pub fn new(font: &FontRef<'a>, backend: Backend) -> Self {
        Self {
            outlines: font.outline_glyphs(),
            rasterizer: Rasterizer::new(backend),
            path: SvgPath::new(),
        }
    }
}

impl GlyphRasterizer for OutlineGlyphRasterizer<'_> {
    fn render_glyph_subpixel(
        &mut self,
        glyph_id: u32,
        scale: f32,
        subpixel_x: f32,
        subpixel_y: f32,
        canvas: &mut GlyphCanvas<'_>,
    ) -> Result<RasterizedGlyph, RasterizeError> {
        let outline = self
            .outlines
            .get(GlyphId::new(glyph_id))
            .ok_or(RasterizeError::EmptyPath)?;

        self.path.clear();
        let mut pen = FlippedPen {
            path: &mut self.path,
            dx: subpixel_x,
            dy: subpixel_y,
        };
        let settings = DrawSettings::unhinted(Size::new(scale), LocationRef::default());
        outline
            .draw(settings, &mut pen)
            .map_err(|_| RasterizeError::GraphicsError)?;

        let Some(bounds) = self.path.control_bounds() else {
            return Ok(RasterizedGlyph::default());
        };
        let padding = f64::from(GLYPH_PADDING);
        let left = bounds.x0.floor() - padding;
        let top = bounds.y0.floor() - padding;
        let right = bounds.x1.ceil() + padding;
        let bottom = bounds.y1.ceil() + padding;

        let too_large = |_| RasterizeError::IconTooLarge;
        let width = u16::try_from((right - left) as i64).map_err(too_large)?;
        let height = u16::try_from((bottom - top) as i64).map_err(too_large)?;
        let bearing_x = i16::try_from(left as i64).map_err(too_large)?;
        let bearing_y = i16::try_from(top as i64).map_err(too_large)?;

        let mut target = canvas.target(width, height)?;
        self.rasterizer.rasterize_path(
            &self.path,
            Affine::translate((-left, -top)),
            &RasterOptions::fill().with_fill_rule(Fill::NonZero),
            &mut target,
        )?;

        Ok(RasterizedGlyph {
            width,
            height,
            bearing_x,
            bearing_y,
        })
    }
}

/// Builds an [`SvgPath`] from font outlines, flipping y to point down.
struct FlippedPen<'a> {
    path: &'a mut SvgPath,
    dx: f32,
    dy: f32,
}

impl FlippedPen<'_> {
    #[inline]
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.dx, self.dy - y)
    }
}

impl OutlinePen for FlippedPen<'_> {
    #[inline]
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.path.move_to(x, y);
    }

    #[inline]
    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.path.line_to(x, y);
    }

    #[inline]
    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let (cx, cy) = self.map(cx, cy);
        let (x, y) = self.map(x, y);
        self.path.quad_to(cx, cy, x, y);
    }

    #[inline]
    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let (cx0, cy0) = self.map(cx0, cy0);
        let (cx1, cy1) = self.map(cx1, cy1);
        let (x, y) = self.map(x, y);
        self.path.curve_to(cx0, cy0, cx1, cy1, x, y);
    }

    #[inline]
    fn close(&mut self) {
        self.path.close();
    }
}
