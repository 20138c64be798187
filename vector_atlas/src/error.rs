// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors shared by every rasterizer backend and cache.

use core::fmt;

/// Error returned when a path or glyph could not be rasterized.
///
/// Errors are terminal for the call that produced them: no partially rasterized bitmap is
/// returned and no cache entry is inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RasterizeError {
    /// The path data could not be parsed, or contains nothing to draw.
    EmptyPath,
    /// The caller-provided output buffer cannot hold the requested device size.
    BufferTooSmall,
    /// The requested device size exceeds the scratch buffer or the atlas, even after the atlas
    /// was grown and cleared.
    IconTooLarge,
    /// The native graphics backend failed to build a path or context.
    GraphicsError,
    /// The selected backend does not exist on this platform or build.
    PlatformNotSupported,
}

impl fmt::Display for RasterizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::EmptyPath => "path data is empty or malformed",
            Self::BufferTooSmall => "output buffer is too small for the requested size",
            Self::IconTooLarge => "requested size does not fit the scratch buffer or atlas",
            Self::GraphicsError => "native graphics backend failure",
            Self::PlatformNotSupported => "no native rasterizer on this platform",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for RasterizeError {}
