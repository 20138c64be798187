// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use skrifa::{FontRef, MetadataProvider};
use vector_atlas::{Backend, RasterOptions, RasterizeError, Rasterizer};

/// A square covering the whole of a 10 unit viewbox.
pub(crate) const SQUARE: &[u8] = b"M0,0 L10,0 L10,10 L0,10 Z";

/// A rounded badge with a curved notch, mixing every segment kind.
pub(crate) const BADGE: &[u8] =
    b"M4 2h12a2 2 0 0 1 2 2v8c0 3-3 6-8 6s-8-3-8-6V4q0-2 2-2zM7 8l3 3 4-5";

/// Hack Regular, see `assets/fonts/Hack-Regular.txt` for its license.
const HACK_REGULAR: &[u8] = include_bytes!("../assets/fonts/Hack-Regular.ttf");

/// The test font.
pub(crate) fn hack() -> FontRef<'static> {
    FontRef::new(HACK_REGULAR).unwrap()
}

/// The glyph the test font maps `ch` to.
pub(crate) fn glyph_id(font: &FontRef<'_>, ch: char) -> u32 {
    font.charmap()
        .map(ch)
        .unwrap_or_else(|| panic!("{ch:?} is not in the test font"))
        .to_u32()
}

/// The backends compiled into this build.
pub(crate) fn backends() -> Vec<Backend> {
    let mut backends = vec![Backend::Software];
    if cfg!(feature = "vello_cpu") {
        backends.push(Backend::Native);
    }
    backends
}

/// Rasterizes into a fresh RGBA buffer.
pub(crate) fn render(
    backend: Backend,
    path_data: &[u8],
    viewbox: f32,
    device_size: u32,
    options: &RasterOptions,
) -> Result<Vec<u8>, RasterizeError> {
    let size = device_size as usize;
    let mut pixels = vec![0; size * size * 4];
    Rasterizer::new(backend).rasterize_with_options(
        path_data,
        viewbox,
        device_size,
        options,
        &mut pixels,
    )?;
    Ok(pixels)
}

/// The RGBA pixel at `(x, y)` of a `width` pixel wide buffer.
pub(crate) fn pixel(pixels: &[u8], width: usize, x: usize, y: usize) -> [u8; 4] {
    let start = (y * width + x) * 4;
    [
        pixels[start],
        pixels[start + 1],
        pixels[start + 2],
        pixels[start + 3],
    ]
}
