// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vector Atlas rasterizes vector icons and font glyphs into device-pixel bitmaps and packs them
//! into GPU-uploadable texture atlases.
//!
//! The entry points are [`SvgAtlas`] for icon paths (SVG path data) and [`GlyphAtlas`] for
//! glyphs. Both look up a content-addressed key first, and only on a miss flatten, rasterize
//! into a reusable scratch buffer, reserve space in their [`Atlas`] and copy the pixels over.
//!
//! Icons use a two-channel layout so that the consuming shader does not need to know which
//! backend produced them: red holds fill coverage, green holds stroke coverage and alpha holds
//! the maximum of the two.
//!
//! ## Features
//!
//! - `std` (enabled by default): Get floating point functions from the standard library
//!   (likely using your target's libc). Also enables [`sync::SharedAtlas`].
//! - `libm`: Use floating point implementations from [libm].
//! - `vello_cpu` (enabled by default): Compiles the native vector backend on top of Vello CPU.
//!   Without it, [`Backend::Native`] degrades to the unsupported backend.
//! - `png`: Enables [`Atlas::save_png`] for inspecting atlas contents.
//!
//! At least one of `std` and `libm` is required; `std` overrides `libm`.
//!
//! [libm]: https://crates.io/crates/libm

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("vector_atlas requires either the `std` or `libm` feature to be enabled");

// Suppress the unused_crate_dependencies lint when both std and libm are specified.
#[cfg(all(feature = "std", feature = "libm"))]
use core_maths as _;

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub use vello_common::{kurbo, peniko};

mod arc;
mod error;
mod flatten;
mod glyph;
mod ink;
mod math;
mod path;

pub mod atlas;
pub mod raster;
#[cfg(feature = "std")]
pub mod sync;

pub use arc::{ArcApprox, SvgArc};
pub use atlas::{
    Atlas, AtlasConfig, AtlasFormat, AtlasFull, CacheStats, CachedResult, GlyphAtlas,
    GlyphAtlasConfig, GlyphCacheKey, RasterizeKey, Region, SvgAtlas, SvgAtlasConfig, UvRect,
};
pub use error::RasterizeError;
pub use flatten::{Polylines, Subpath, flatten, tolerance_for};
pub use glyph::{
    GLYPH_PADDING, GlyphCanvas, GlyphRasterizer, OutlineGlyphRasterizer, RasterizedGlyph,
};
pub use ink::{InkBounds, InkBoundsScanner};
pub use path::{CommandKind, PathCommand, Segment, Segments, SvgPath};
pub use raster::{
    Backend, RasterOptions, RasterTarget, RasterizedResult, Rasterizer, StrokeOptions,
    TargetFormat,
};
