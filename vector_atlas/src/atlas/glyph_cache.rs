// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph bitmap cache with atlas storage.

use super::cache::{CacheStats, RasterCache};
use super::key::subpixel_offset;
use super::{Atlas, AtlasConfig, AtlasFormat, CachedResult, GlyphCacheKey, Region};
use crate::RasterizeError;
use crate::glyph::{GLYPH_PADDING, GlyphCanvas, GlyphRasterizer};
use crate::ink::InkBoundsScanner;
use crate::raster::TargetFormat;

/// Maximum glyph dimension that will be cached.
pub const MAX_GLYPH_SIZE: u16 = 128;

/// Configuration for a [`GlyphAtlas`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphAtlasConfig {
    /// The atlas texture.
    pub atlas: AtlasConfig,
    /// Largest glyph edge, in pixels, not counting [`GLYPH_PADDING`].
    pub max_glyph_size: u16,
}

impl Default for GlyphAtlasConfig {
    fn default() -> Self {
        Self {
            atlas: AtlasConfig::default(),
            max_glyph_size: MAX_GLYPH_SIZE,
        }
    }
}

/// A cache of rasterized glyphs packed into one coverage atlas.
///
/// Only the ink of each glyph is stored; [`CachedResult::offset_x`] and
/// [`CachedResult::offset_y`] lead from the glyph origin (on the baseline, at the pen
/// position) to the top-left of the stored ink.
#[derive(Debug)]
pub struct GlyphAtlas {
    cache: RasterCache<GlyphCacheKey>,
    scanner: InkBoundsScanner,
}

impl GlyphAtlas {
    /// Creates an empty cache.
    pub fn new(config: GlyphAtlasConfig) -> Self {
        let cell = usize::from(config.max_glyph_size) + 2 * usize::from(GLYPH_PADDING);
        Self {
            cache: RasterCache::new(config.atlas, AtlasFormat::Alpha8, cell * cell),
            scanner: InkBoundsScanner::new(TargetFormat::Alpha8),
        }
    }

    /// The atlas texture.
    pub fn atlas(&self) -> &Atlas {
        &self.cache.atlas
    }

    /// The atlas texture, for taking its dirty region.
    pub fn atlas_mut(&mut self) -> &mut Atlas {
        &mut self.cache.atlas
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of cached glyphs.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no glyph is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.len() == 0
    }

    /// Looks a key up without rendering or touching the counters.
    pub fn peek(&self, key: &GlyphCacheKey) -> Option<CachedResult> {
        self.cache.peek(key)
    }

    /// Drops every cached glyph and bumps the atlas generation.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Returns the atlas region of a glyph, rendering it with `rasterizer` on first use.
    ///
    /// `font_id` must identify the font `rasterizer` draws from. The fractional pen position
    /// is quantized to a quarter pixel on each axis.
    pub fn get_or_render<R: GlyphRasterizer + ?Sized>(
        &mut self,
        rasterizer: &mut R,
        font_id: u64,
        glyph_id: u32,
        size: f32,
        subpixel_x: f32,
        subpixel_y: f32,
    ) -> Result<CachedResult, RasterizeError> {
        let key = GlyphCacheKey::new(font_id, glyph_id, size, subpixel_x, subpixel_y);
        if let Some(result) = self.cache.lookup(&key) {
            return Ok(result);
        }
        self.render_miss(rasterizer, key).inspect_err(|err| {
            log::warn!("dropping glyph {glyph_id} at {size}px: {err}");
        })
    }

    fn render_miss<R: GlyphRasterizer + ?Sized>(
        &mut self,
        rasterizer: &mut R,
        key: GlyphCacheKey,
    ) -> Result<CachedResult, RasterizeError> {
        let mut canvas = GlyphCanvas::new(&mut self.cache.scratch);
        let glyph = rasterizer.render_glyph_subpixel(
            key.glyph_id,
            key.size(),
            subpixel_offset(key.subpixel_x),
            subpixel_offset(key.subpixel_y),
            &mut canvas,
        )?;
        self.cache.stats.rasterizations += 1;
        if usize::from(glyph.width) * usize::from(glyph.height) > self.cache.scratch.len() {
            return Err(RasterizeError::BufferTooSmall);
        }

        let Some(ink) = self.scanner.scan(
            &self.cache.scratch,
            usize::from(glyph.width),
            glyph.width,
            glyph.height,
        ) else {
            // Nothing to draw, but remember that.
            let result = CachedResult {
                region: Region::EMPTY,
                offset_x: glyph.bearing_x,
                offset_y: glyph.bearing_y,
            };
            self.cache.insert(key, result);
            return Ok(result);
        };

        let offset_x = ink_offset(glyph.bearing_x, ink.left)?;
        let offset_y = ink_offset(glyph.bearing_y, ink.top)?;

        let region = self.cache.reserve_with_eviction(ink.width(), ink.height())?;
        let stride = usize::from(glyph.width);
        let offset = usize::from(ink.top) * stride + usize::from(ink.left);
        self.cache.commit(region, stride, offset);

        let result = CachedResult {
            region,
            offset_x,
            offset_y,
        };
        log::debug!(
            "cached glyph {} of font {:x} at {:?}",
            key.glyph_id,
            key.font_id,
            result.region
        );
        self.cache.insert(key, result);
        Ok(result)
    }
}

/// Moves a cell bearing to the first inked pixel.
fn ink_offset(bearing: i16, ink_start: u16) -> Result<i16, RasterizeError> {
    i16::try_from(i32::from(bearing) + i32::from(ink_start)).map_err(|_| RasterizeError::IconTooLarge)
}
