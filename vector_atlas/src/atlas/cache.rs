// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Icon cache with atlas storage and whole-atlas eviction.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};
use core::hash::Hash;

use hashbrown::HashMap;

use super::{Atlas, AtlasConfig, AtlasFormat, CachedResult, RasterizeKey, Region};
use crate::RasterizeError;
use crate::peniko::Fill;
use crate::raster::{Backend, RasterOptions, Rasterizer, StrokeOptions};

#[cfg(feature = "libm")]
#[allow(unused_imports, reason = "only needed without std")]
use core_maths::CoreFloat;

/// Counters describing cache behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that were not.
    pub misses: u64,
    /// Images rendered by the rasterizer.
    pub rasterizations: u64,
    /// Times the whole cache was dropped because the atlas was full.
    pub evictions: u64,
    /// Entries currently cached.
    pub entries: usize,
}

/// Key to region map, atlas, and scratch buffer, shared by the icon and glyph caches.
pub(crate) struct RasterCache<K> {
    entries: HashMap<K, CachedResult>,
    pub(crate) atlas: Atlas,
    /// Rendering happens here before the pixels are copied into the atlas. Its contents are
    /// meaningless outside a single miss.
    pub(crate) scratch: Vec<u8>,
    pub(crate) stats: CacheStats,
}

impl<K: Hash + Eq> RasterCache<K> {
    pub(crate) fn new(config: AtlasConfig, format: AtlasFormat, scratch_len: usize) -> Self {
        Self {
            entries: HashMap::new(),
            atlas: Atlas::new(config, format),
            scratch: vec![0; scratch_len],
            stats: CacheStats::default(),
        }
    }

    /// Looks a key up, counting the hit or miss.
    pub(crate) fn lookup(&mut self, key: &K) -> Option<CachedResult> {
        match self.entries.get(key) {
            Some(result) => {
                self.stats.hits += 1;
                Some(*result)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub(crate) fn peek(&self, key: &K) -> Option<CachedResult> {
        self.entries.get(key).copied()
    }

    pub(crate) fn insert(&mut self, key: K, result: CachedResult) {
        self.entries.insert(key, result);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    /// Drops all entries and atlas regions.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.atlas.clear();
    }

    /// Finds room for a `width × height` image: reserve, else grow and retry, else drop the
    /// whole cache and retry once.
    pub(crate) fn reserve_with_eviction(
        &mut self,
        width: u16,
        height: u16,
    ) -> Result<Region, RasterizeError> {
        loop {
            if let Some(region) = self.atlas.reserve(width, height) {
                return Ok(region);
            }
            if self.atlas.grow().is_err() {
                break;
            }
        }

        log::debug!(
            "atlas full, evicting {} entries for a {width}x{height} image",
            self.entries.len()
        );
        self.clear();
        self.stats.evictions += 1;
        self.atlas.reserve(width, height).ok_or_else(|| {
            log::warn!("{width}x{height} image does not fit an empty atlas");
            RasterizeError::IconTooLarge
        })
    }

    /// Copies a rendered image from the scratch buffer into `region`.
    pub(crate) fn commit(&mut self, region: Region, stride: usize, offset: usize) {
        let Self { atlas, scratch, .. } = self;
        atlas.write(region, &scratch[offset..], stride);
    }
}

impl<K> Debug for RasterCache<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RasterCache")
            .field("entries", &self.entries.len())
            .field("atlas", &self.atlas)
            .field("scratch", &self.scratch.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Configuration for an [`SvgAtlas`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SvgAtlasConfig {
    /// The atlas texture.
    pub atlas: AtlasConfig,
    /// Largest icon edge, in device pixels. Sizes the scratch buffer.
    pub max_icon_size: u16,
    /// Device pixels per logical pixel.
    pub scale_factor: f32,
    /// Which rasterizer renders cache misses.
    pub backend: Backend,
}

impl Default for SvgAtlasConfig {
    fn default() -> Self {
        Self {
            atlas: AtlasConfig::default(),
            max_icon_size: 256,
            scale_factor: 1.0,
            backend: Backend::Software,
        }
    }
}

/// A cache of rasterized vector icons packed into one RGBA atlas.
///
/// Pixels follow the two-channel layout: red is fill coverage, green is stroke coverage and
/// alpha is their maximum.
///
/// All state lives in `&mut self`; share it between threads with
/// [`SharedAtlas`](crate::sync::SharedAtlas).
#[derive(Debug)]
pub struct SvgAtlas {
    cache: RasterCache<RasterizeKey>,
    rasterizer: Rasterizer,
    max_icon_size: u16,
    scale_factor: f32,
}

impl SvgAtlas {
    /// Creates an empty cache.
    pub fn new(config: SvgAtlasConfig) -> Self {
        let max = usize::from(config.max_icon_size);
        Self {
            cache: RasterCache::new(config.atlas, AtlasFormat::Rgba8, max * max * 4),
            rasterizer: Rasterizer::new(config.backend),
            max_icon_size: config.max_icon_size,
            scale_factor: config.scale_factor,
        }
    }

    /// The rasterizer backend in use.
    pub fn backend(&self) -> Backend {
        self.rasterizer.backend()
    }

    /// Device pixels per logical pixel.
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Changes the scale factor. Existing entries stay valid; new requests get keys for the
    /// new device sizes.
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        self.scale_factor = scale_factor;
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

    /// Number of cached icons.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no icon is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.len() == 0
    }

    /// Drops every cached icon and bumps the atlas generation.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Edge length in device pixels for `logical_size`.
    fn device_size(&self, logical_size: f32) -> Result<u16, RasterizeError> {
        let size = (logical_size * self.scale_factor).ceil();
        if !(size.is_finite() && size >= 1.0) {
            return Err(RasterizeError::EmptyPath);
        }
        if size > f32::from(self.max_icon_size) {
            return Err(RasterizeError::IconTooLarge);
        }
        #[expect(clippy::cast_possible_truncation, reason = "bounded by max_icon_size")]
        let size = size as u16;
        Ok(size)
    }

    /// The cache key a request would use.
    pub fn key_for(
        &self,
        path_data: &[u8],
        viewbox: f32,
        logical_size: f32,
        fill: bool,
        stroke: StrokeOptions,
    ) -> Result<RasterizeKey, RasterizeError> {
        let device_size = self.device_size(logical_size)?;
        Ok(RasterizeKey::new(
            path_data,
            viewbox,
            device_size,
            &RasterOptions {
                fill,
                fill_rule: Fill::EvenOdd,
                stroke,
            },
        ))
    }

    /// Looks a key up without rasterizing or touching the counters.
    pub fn peek(&self, key: &RasterizeKey) -> Option<CachedResult> {
        self.cache.peek(key)
    }

    /// Returns the atlas region of an icon, rasterizing it on first use.
    ///
    /// `path_data` is authored in a `viewbox × viewbox` square and drawn at
    /// `ceil(logical_size × scale_factor)` device pixels. A failed call leaves the cache as it
    /// was, apart from evictions.
    pub fn get_or_rasterize(
        &mut self,
        path_data: &[u8],
        viewbox: f32,
        logical_size: f32,
        fill: bool,
        stroke: StrokeOptions,
    ) -> Result<CachedResult, RasterizeError> {
        let key = self
            .key_for(path_data, viewbox, logical_size, fill, stroke)
            .inspect_err(|err| report(*err, logical_size))?;
        if let Some(result) = self.cache.lookup(&key) {
            return Ok(result);
        }
        self.rasterize_miss(&key, path_data, viewbox)
            .inspect_err(|err| report(*err, logical_size))
    }

    fn rasterize_miss(
        &mut self,
        key: &RasterizeKey,
        path_data: &[u8],
        viewbox: f32,
    ) -> Result<CachedResult, RasterizeError> {
        let size = key.device_size;
        log::debug!("rasterizing {size}px icon {:016x}", key.path_hash);

        let len = usize::from(size) * usize::from(size) * 4;
        let scratch = &mut self.cache.scratch[..len];
        self.rasterizer.rasterize_with_options(
            path_data,
            viewbox,
            u32::from(size),
            &key.options(viewbox),
            scratch,
        )?;
        self.cache.stats.rasterizations += 1;

        let region = self.cache.reserve_with_eviction(size, size)?;
        self.cache.commit(region, usize::from(size) * 4, 0);
        let result = CachedResult {
            region,
            offset_x: 0,
            offset_y: 0,
        };
        self.cache.insert(*key, result);
        Ok(result)
    }
}

fn report(err: RasterizeError, logical_size: f32) {
    match err {
        RasterizeError::EmptyPath => log::debug!("skipping empty icon"),
        _ => log::warn!("dropping {logical_size}px icon: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas(max: u16) -> SvgAtlas {
        SvgAtlas::new(SvgAtlasConfig {
            atlas: AtlasConfig {
                initial_size: (max, max),
                max_size: max,
                padding: 1,
            },
            max_icon_size: 64,
            ..SvgAtlasConfig::default()
        })
    }

    const SQUARE: &[u8] = b"M0 0 H10 V10 H0 Z";

    #[test]
    fn device_size_rounds_up() {
        let mut cache = atlas(256);
        cache.set_scale_factor(1.5);
        let key = cache
            .key_for(SQUARE, 10.0, 15.0, true, StrokeOptions::disabled())
            .unwrap();
        assert_eq!(key.device_size, 23);
        let key = cache
            .key_for(SQUARE, 10.0, 14.9, true, StrokeOptions::disabled())
            .unwrap();
        assert_eq!(key.device_size, 23, "22.35 rounds up");
    }

    #[test]
    fn oversized_icons_are_rejected_before_rasterizing() {
        let mut cache = atlas(256);
        assert_eq!(
            cache.get_or_rasterize(SQUARE, 10.0, 65.0, true, StrokeOptions::disabled()),
            Err(RasterizeError::IconTooLarge)
        );
        assert_eq!(cache.stats().rasterizations, 0);
    }

    #[test]
    fn zero_size_is_empty() {
        let mut cache = atlas(256);
        assert_eq!(
            cache.get_or_rasterize(SQUARE, 10.0, 0.0, true, StrokeOptions::disabled()),
            Err(RasterizeError::EmptyPath)
        );
    }

    #[test]
    fn failed_rasterization_caches_nothing() {
        let mut cache = atlas(256);
        assert_eq!(
            cache.get_or_rasterize(b"L1 1", 10.0, 16.0, true, StrokeOptions::disabled()),
            Err(RasterizeError::EmptyPath)
        );
        assert!(cache.is_empty());
        assert_eq!(cache.atlas_mut().take_dirty_region(), None);
    }

    #[test]
    fn hit_returns_same_region() {
        let mut cache = atlas(256);
        let first = cache
            .get_or_rasterize(SQUARE, 10.0, 16.0, true, StrokeOptions::disabled())
            .unwrap();
        let second = cache
            .get_or_rasterize(SQUARE, 10.0, 16.0, true, StrokeOptions::disabled())
            .unwrap();
        assert_eq!(first, second);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.rasterizations), (1, 1, 1));
    }

    #[test]
    fn pixels_land_in_region() {
        let mut cache = atlas(256);
        let result = cache
            .get_or_rasterize(SQUARE, 10.0, 4.0, true, StrokeOptions::disabled())
            .unwrap();
        assert_eq!(result.region, Region::new(1, 1, 4, 4));
        for row in cache.atlas().region_rows(result.region) {
            assert!(row.chunks_exact(4).all(|px| px == [255, 0, 0, 255]));
        }
    }

    #[test]
    fn full_atlas_evicts_everything_once() {
        let mut cache = atlas(64);
        let first = cache
            .get_or_rasterize(SQUARE, 10.0, 32.0, true, StrokeOptions::disabled())
            .unwrap();
        let key = cache
            .key_for(SQUARE, 10.0, 32.0, true, StrokeOptions::disabled())
            .unwrap();
        cache
            .get_or_rasterize(b"M0 0 H5 V5 Z", 10.0, 32.0, true, StrokeOptions::disabled())
            .unwrap();
        assert_eq!(cache.atlas().generation(), 1);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.peek(&key), None);
        assert_eq!(first.region, Region::new(1, 1, 32, 32));
    }

    #[test]
    fn unit_viewbox_stroke_matches_direct_render() {
        const LINE: &[u8] = b"M0.1 0.5 L0.9 0.5";
        let mut cache = SvgAtlas::new(SvgAtlasConfig {
            backend: Backend::Software,
            ..SvgAtlasConfig::default()
        });
        let result = cache
            .get_or_rasterize(LINE, 1.0, 64.0, false, StrokeOptions::new(0.05))
            .unwrap();
        assert_eq!(result.region.width, 64);

        let mut direct = vec![0_u8; 64 * 64 * 4];
        Rasterizer::new(Backend::Software)
            .rasterize_with_options(LINE, 1.0, 64, &RasterOptions::stroke(0.05), &mut direct)
            .unwrap();
        let cached_rows = cache
            .atlas()
            .region_rows(result.region)
            .filter(|row| row[32 * 4 + 1] > 0)
            .count();
        let direct_rows = direct
            .chunks_exact(64 * 4)
            .filter(|row| row[32 * 4 + 1] > 0)
            .count();
        // 3.2px asked for, 3.25px drawn.
        assert!((4..=5).contains(&cached_rows), "{cached_rows} rows stroked");
        assert_eq!(cached_rows, direct_rows);
    }
}
