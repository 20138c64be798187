// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Texture atlases and the caches that fill them.
//!
//! - [`Atlas`] owns a texture's pixels, packs regions into it with a [`ShelfAllocator`] and
//!   tracks what a GPU copy needs to re-upload.
//! - [`SvgAtlas`] caches icons rasterized from SVG path data, keyed by [`RasterizeKey`].
//! - [`GlyphAtlas`] caches glyphs from a [`GlyphRasterizer`](crate::GlyphRasterizer), keyed by
//!   [`GlyphCacheKey`].
//!
//! When a reservation does not fit, the atlas grows; once it is at its maximum size the whole
//! cache is dropped and the reservation retried once.

mod allocator;
mod cache;
mod glyph_cache;
mod key;
mod region;
mod texture;

pub use allocator::ShelfAllocator;
pub use cache::{CacheStats, SvgAtlas, SvgAtlasConfig};
pub use glyph_cache::{GlyphAtlas, GlyphAtlasConfig, MAX_GLYPH_SIZE};
pub use key::{GlyphCacheKey, RasterizeKey};
pub use region::{CachedResult, Region, UvRect};
pub use texture::{Atlas, AtlasConfig, AtlasFormat, AtlasFull};
