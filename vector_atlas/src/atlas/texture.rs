// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The CPU mirror of an atlas texture.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use super::{Region, ShelfAllocator, UvRect};

/// Configuration for an [`Atlas`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Texture size when the atlas is created.
    pub initial_size: (u16, u16),
    /// Largest width and height the texture may grow to.
    pub max_size: u16,
    /// Gutter, in pixels, kept free on every side of each region.
    pub padding: u16,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            initial_size: (256, 256),
            max_size: 4096,
            padding: 1,
        }
    }
}

/// Pixel layout of an atlas texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtlasFormat {
    /// One coverage byte per pixel.
    Alpha8,
    /// Four bytes per pixel.
    Rgba8,
}

impl AtlasFormat {
    /// Bytes per pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha8 => 1,
            Self::Rgba8 => 4,
        }
    }
}

/// The atlas cannot grow any further.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtlasFull;

impl fmt::Display for AtlasFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("atlas is at its maximum size")
    }
}

impl core::error::Error for AtlasFull {}

/// A texture atlas: pixels, the packer that hands out their regions, and the bookkeeping a
/// GPU mirror needs to stay in sync.
///
/// The GPU side should re-upload the whole texture whenever [`Atlas::generation`] changes and
/// otherwise only the area returned by [`Atlas::take_dirty_region`].
pub struct Atlas {
    format: AtlasFormat,
    width: u16,
    height: u16,
    max_size: u16,
    pixels: Vec<u8>,
    allocator: ShelfAllocator,
    generation: u64,
    dirty: Option<Region>,
}

impl fmt::Debug for Atlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atlas")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("max_size", &self.max_size)
            .field("generation", &self.generation)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl Atlas {
    /// Creates an empty atlas.
    pub fn new(config: AtlasConfig, format: AtlasFormat) -> Self {
        let max_size = config.max_size.max(1);
        let width = config.initial_size.0.clamp(1, max_size);
        let height = config.initial_size.1.clamp(1, max_size);
        Self {
            format,
            width,
            height,
            max_size,
            pixels: vec![0; usize::from(width) * usize::from(height) * format.bytes_per_pixel()],
            allocator: ShelfAllocator::new(width, height, config.padding),
            generation: 0,
            dirty: None,
        }
    }

    /// Pixel layout.
    pub fn format(&self) -> AtlasFormat {
        self.format
    }

    /// Texture width.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Texture height.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Bytes per row of [`Atlas::pixels`].
    pub fn stride(&self) -> usize {
        usize::from(self.width) * self.format.bytes_per_pixel()
    }

    /// The whole texture, row by row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Counter bumped whenever previously returned regions become invalid or the texture is
    /// reallocated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reserves space for a `width × height` image.
    ///
    /// `None` means it does not fit right now; [`Atlas::grow`] or [`Atlas::clear`] may help.
    pub fn reserve(&mut self, width: u16, height: u16) -> Option<Region> {
        self.allocator.reserve(width, height)
    }

    /// Doubles both dimensions, up to the configured maximum.
    ///
    /// Regions and pixels survive, but the texture has a new size, so the generation changes.
    pub fn grow(&mut self) -> Result<(), AtlasFull> {
        if self.width >= self.max_size && self.height >= self.max_size {
            return Err(AtlasFull);
        }
        let width = self.width.saturating_mul(2).min(self.max_size);
        let height = self.height.saturating_mul(2).min(self.max_size);

        let old_stride = self.stride();
        let bpp = self.format.bytes_per_pixel();
        let new_stride = usize::from(width) * bpp;
        let mut pixels = vec![0; new_stride * usize::from(height)];
        for (src, dst) in self
            .pixels
            .chunks_exact(old_stride)
            .zip(pixels.chunks_exact_mut(new_stride))
        {
            dst[..old_stride].copy_from_slice(src);
        }

        log::debug!(
            "growing atlas from {}x{} to {width}x{height}",
            self.width,
            self.height
        );
        self.pixels = pixels;
        self.width = width;
        self.height = height;
        self.allocator.grow_to(width, height);
        self.generation += 1;
        self.dirty = None;
        Ok(())
    }

    /// Drops every region and zeroes the texture.
    pub fn clear(&mut self) {
        self.allocator.clear();
        self.pixels.fill(0);
        self.generation += 1;
        self.dirty = None;
    }

    /// Copies an image into `region`. `src` holds `region.height` rows of `src_stride` bytes
    /// in this atlas's format.
    pub(crate) fn write(&mut self, region: Region, src: &[u8], src_stride: usize) {
        if region.is_empty() {
            return;
        }
        debug_assert!(
            region.right() <= u32::from(self.width) && region.bottom() <= u32::from(self.height),
            "region outside the atlas"
        );
        let row_bytes = usize::from(region.width) * self.format.bytes_per_pixel();
        let stride = self.stride();
        let x_offset = usize::from(region.x) * self.format.bytes_per_pixel();
        for (row, src_row) in src
            .chunks(src_stride)
            .take(usize::from(region.height))
            .enumerate()
        {
            let start = (usize::from(region.y) + row) * stride + x_offset;
            self.pixels[start..start + row_bytes].copy_from_slice(&src_row[..row_bytes]);
        }
        self.dirty = Some(self.dirty.map_or(region, |dirty| dirty.union(region)));
    }

    /// The rows of `region`, each `region.width * bytes_per_pixel` bytes long.
    pub fn region_rows(&self, region: Region) -> impl Iterator<Item = &[u8]> + '_ {
        let bpp = self.format.bytes_per_pixel();
        let stride = self.stride();
        let x_offset = usize::from(region.x) * bpp;
        let row_bytes = usize::from(region.width) * bpp;
        let rows = if region.is_empty() {
            0..0
        } else {
            usize::from(region.y)..usize::from(region.y) + usize::from(region.height)
        };
        rows.map(move |y| {
            let start = y * stride + x_offset;
            &self.pixels[start..start + row_bytes]
        })
    }

    /// The area written since the last call, if any.
    ///
    /// Only meaningful while the generation is unchanged: after a grow or clear the whole
    /// texture must be uploaded.
    pub fn take_dirty_region(&mut self) -> Option<Region> {
        self.dirty.take()
    }

    /// Normalized texture coordinates of `region`.
    pub fn uv_rect(&self, region: Region) -> UvRect {
        let width = f32::from(self.width);
        let height = f32::from(self.height);
        UvRect {
            u0: f32::from(region.x) / width,
            v0: f32::from(region.y) / height,
            u1: (f32::from(region.x) + f32::from(region.width)) / width,
            v1: (f32::from(region.y) + f32::from(region.height)) / height,
        }
    }

    /// Writes the texture to a PNG file, for debugging.
    #[cfg(feature = "png")]
    pub fn save_png(&self, path: &std::path::Path) -> std::io::Result<()> {
        use std::fs::File;
        use std::io::BufWriter;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let w = BufWriter::new(file);

        let mut encoder = png::Encoder::new(w, u32::from(self.width), u32::from(self.height));
        encoder.set_color(match self.format {
            AtlasFormat::Alpha8 => png::ColorType::Grayscale,
            AtlasFormat::Rgba8 => png::ColorType::Rgba,
        });
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().map_err(std::io::Error::other)?;
        writer
            .write_image_data(&self.pixels)
            .map_err(std::io::Error::other)?;
        Ok(())
    }
}
