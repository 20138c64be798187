// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterizer backends.
//!
//! The backend is chosen once, when a [`Rasterizer`] is built from a [`Backend`]. All backends
//! share the same inputs, outputs and errors, so callers never need to know which one they
//! are talking to:
//!
//! - [`Backend::Software`] flattens curves and scan-converts them with exact horizontal
//!   coverage and 4× vertical supersampling; strokes use a distance field.
//! - [`Backend::Native`] hands the unflattened curves to Vello CPU (requires the `vello_cpu`
//!   feature).
//! - [`Backend::Unsupported`] fails every call with
//!   [`RasterizeError::PlatformNotSupported`].

#[cfg(feature = "vello_cpu")]
mod native;
mod scanline;

#[cfg(feature = "vello_cpu")]
pub use native::NativeRasterizer;
pub use scanline::SoftwareRasterizer;

use crate::RasterizeError;
use crate::kurbo::Affine;
use crate::path::SvgPath;
use crate::peniko::Fill;

#[cfg(feature = "libm")]
#[allow(unused_imports, reason = "only needed without std")]
use core_maths::CoreFloat;

/// Curve flattening tolerance in device pixels.
pub(crate) const DEVICE_TOLERANCE: f64 = 0.5;

/// Which rasterizer implementation to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// The built-in scanline rasterizer.
    #[default]
    Software,
    /// The platform's vector engine.
    Native,
    /// A placeholder for platforms without a native engine.
    Unsupported,
}

impl Backend {
    /// The native backend if this build has one, [`Backend::Unsupported`] otherwise.
    pub const fn platform() -> Self {
        if cfg!(feature = "vello_cpu") {
            Self::Native
        } else {
            Self::Unsupported
        }
    }
}

/// Stroke parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeOptions {
    /// Whether to stroke at all.
    pub enabled: bool,
    /// Stroke width in path (viewbox) units.
    pub width: f32,
}

impl StrokeOptions {
    /// An enabled stroke of the given width.
    pub const fn new(width: f32) -> Self {
        Self {
            enabled: true,
            width,
        }
    }

    /// No stroke.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            width: 0.0,
        }
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.enabled && self.width > 0.0 && self.width.is_finite()
    }
}

impl Default for StrokeOptions {
    fn default() -> Self {
        Self::disabled()
    }
}

/// What to draw for a path.
///
/// The constructors fill with [`Fill::EvenOdd`], the rule icon sets are authored for. Font
/// outlines expect [`Fill::NonZero`]; see [`Self::with_fill_rule`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterOptions {
    /// Fill the path.
    pub fill: bool,
    /// Which points are inside the path when filling.
    pub fill_rule: Fill,
    /// Stroke the path.
    pub stroke: StrokeOptions,
}

impl RasterOptions {
    /// Fill only.
    pub const fn fill() -> Self {
        Self {
            fill: true,
            fill_rule: Fill::EvenOdd,
            stroke: StrokeOptions::disabled(),
        }
    }

    /// Stroke only.
    pub const fn stroke(width: f32) -> Self {
        Self {
            fill: false,
            fill_rule: Fill::EvenOdd,
            stroke: StrokeOptions::new(width),
        }
    }

    /// Fill and stroke.
    pub const fn fill_and_stroke(width: f32) -> Self {
        Self {
            fill: true,
            fill_rule: Fill::EvenOdd,
            stroke: StrokeOptions::new(width),
        }
    }

    /// The same options with a different fill rule.
    #[must_use]
    pub const fn with_fill_rule(self, fill_rule: Fill) -> Self {
        Self { fill_rule, ..self }
    }
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self::fill()
    }
}

/// Pixel layout of a [`RasterTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// Four bytes per pixel: red is fill coverage, green is stroke coverage, blue is unused and
    /// alpha is `max(red, green)`.
    Rgba8,
    /// One coverage byte per pixel, the maximum of fill and stroke coverage.
    Alpha8,
}

impl TargetFormat {
    /// Bytes per pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Alpha8 => 1,
        }
    }

    pub(crate) const fn fill_channel(self) -> usize {
        0
    }

    pub(crate) const fn stroke_channel(self) -> usize {
        match self {
            Self::Rgba8 => 1,
            Self::Alpha8 => 0,
        }
    }

    /// Offset of the byte holding combined coverage.
    pub const fn alpha_channel(self) -> usize {
        match self {
            Self::Rgba8 => 3,
            Self::Alpha8 => 0,
        }
    }
}

/// A borrowed pixel buffer that rasterizers draw into.
///
/// Rasterizers merge coverage with `max`, so the buffer should be cleared (see
/// [`RasterTarget::clear`]) before the first path is drawn into it.
#[derive(Debug)]
pub struct RasterTarget<'a> {
    pixels: &'a mut [u8],
    stride: usize,
    width: u16,
    height: u16,
    format: TargetFormat,
}

impl<'a> RasterTarget<'a> {
    /// Wraps `pixels`, whose rows are `stride` bytes apart.
    ///
    /// Fails with [`RasterizeError::BufferTooSmall`] if the buffer cannot hold
    /// `width × height` pixels at that stride.
    pub fn new(
        pixels: &'a mut [u8],
        stride: usize,
        width: u16,
        height: u16,
        format: TargetFormat,
    ) -> Result<Self, RasterizeError> {
        let row_bytes = usize::from(width) * format.bytes_per_pixel();
        let required = match height {
            0 => Some(0),
            h => stride
                .checked_mul(usize::from(h) - 1)
                .and_then(|rows| rows.checked_add(row_bytes)),
        };
        if stride < row_bytes || required.is_none_or(|required| pixels.len() < required) {
            return Err(RasterizeError::BufferTooSmall);
        }
        Ok(Self {
            pixels,
            stride,
            width,
            height,
            format,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel layout.
    pub fn format(&self) -> TargetFormat {
        self.format
    }

    /// The underlying bytes.
    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }

    /// The underlying bytes, for backends that write pixels directly.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        self.pixels
    }

    /// Zeroes the `width × height` area.
    pub fn clear(&mut self) {
        let row_bytes = usize::from(self.width) * self.format.bytes_per_pixel();
        for y in 0..usize::from(self.height) {
            let start = y * self.stride;
            self.pixels[start..start + row_bytes].fill(0);
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize, channel: usize) -> usize {
        y * self.stride + x * self.format.bytes_per_pixel() + channel
    }

    /// Raises one channel of a pixel to at least `value`.
    #[inline]
    pub(crate) fn merge(&mut self, x: usize, y: usize, channel: usize, value: u8) {
        let index = self.index(x, y, channel);
        let byte = &mut self.pixels[index];
        *byte = (*byte).max(value);
    }

    /// Re-derives the combined alpha channel of [`TargetFormat::Rgba8`] targets.
    pub(crate) fn finish(&mut self) {
        if self.format != TargetFormat::Rgba8 {
            return;
        }
        let row_bytes = usize::from(self.width) * 4;
        for y in 0..usize::from(self.height) {
            let start = y * self.stride;
            for pixel in self.pixels[start..start + row_bytes].chunks_exact_mut(4) {
                pixel[2] = 0;
                pixel[3] = pixel[0].max(pixel[1]);
            }
        }
    }
}

/// Size of a rasterized icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RasterizedResult {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
}

/// A rasterizer for one [`Backend`].
///
/// Holds the backend's reusable state (flattening buffers, parsed path, render context), so a
/// single instance should be kept and reused across calls.
#[derive(Debug)]
pub struct Rasterizer {
    engine: Engine,
    path: SvgPath,
}

#[derive(Debug)]
enum Engine {
    Software(SoftwareRasterizer),
    #[cfg(feature = "vello_cpu")]
    Native(NativeRasterizer),
    Unsupported,
}

impl Rasterizer {
    /// Creates a rasterizer for `backend`.
    ///
    /// Requesting [`Backend::Native`] in a build without a native engine yields the
    /// unsupported backend.
    pub fn new(backend: Backend) -> Self {
        let engine = match backend {
            Backend::Software => Engine::Software(SoftwareRasterizer::new()),
            #[cfg(feature = "vello_cpu")]
            Backend::Native => Engine::Native(NativeRasterizer::new()),
            #[cfg(not(feature = "vello_cpu"))]
            Backend::Native => {
                log::warn!("native rasterizer requested but not compiled in");
                Engine::Unsupported
            }
            Backend::Unsupported => Engine::Unsupported,
        };
        Self {
            engine,
            path: SvgPath::new(),
        }
    }

    /// The backend actually in use.
    pub fn backend(&self) -> Backend {
        match self.engine {
            Engine::Software(_) => Backend::Software,
            #[cfg(feature = "vello_cpu")]
            Engine::Native(_) => Backend::Native,
            Engine::Unsupported => Backend::Unsupported,
        }
    }

    /// Fills SVG path data authored in a `viewbox × viewbox` space into a
    /// `device_size × device_size` RGBA buffer (tightly packed rows).
    pub fn rasterize(
        &mut self,
        path_data: &[u8],
        viewbox: f32,
        device_size: u32,
        out: &mut [u8],
    ) -> Result<RasterizedResult, RasterizeError> {
        self.rasterize_with_options(path_data, viewbox, device_size, &RasterOptions::fill(), out)
    }

    /// Like [`Self::rasterize`], with explicit fill and stroke settings.
    ///
    /// The output follows the two-channel layout of [`TargetFormat::Rgba8`].
    pub fn rasterize_with_options(
        &mut self,
        path_data: &[u8],
        viewbox: f32,
        device_size: u32,
        options: &RasterOptions,
        out: &mut [u8],
    ) -> Result<RasterizedResult, RasterizeError> {
        if matches!(self.engine, Engine::Unsupported) {
            return Err(RasterizeError::PlatformNotSupported);
        }
        let transform = viewbox_transform(viewbox, device_size)?;
        let size = u16::try_from(device_size).map_err(|_| RasterizeError::IconTooLarge)?;
        let stride = usize::from(size) * TargetFormat::Rgba8.bytes_per_pixel();
        let mut target = RasterTarget::new(out, stride, size, size, TargetFormat::Rgba8)?;
        self.path.parse_into(path_data)?;

        target.clear();
        let Self { engine, path } = self;
        draw(engine, path, transform, options, &mut target)?;
        Ok(RasterizedResult {
            width: size,
            height: size,
        })
    }

    /// Draws an already parsed path, mapped to device pixels by `transform`, into `target`.
    ///
    /// Coverage is merged into the existing contents of the target.
    pub fn rasterize_path(
        &mut self,
        path: &SvgPath,
        transform: Affine,
        options: &RasterOptions,
        target: &mut RasterTarget<'_>,
    ) -> Result<(), RasterizeError> {
        draw(&mut self.engine, path, transform, options, target)
    }
}

fn draw(
    engine: &mut Engine,
    path: &SvgPath,
    transform: Affine,
    options: &RasterOptions,
    target: &mut RasterTarget<'_>,
) -> Result<(), RasterizeError> {
    match engine {
        Engine::Software(software) => software.rasterize(path, transform, options, target),
        #[cfg(feature = "vello_cpu")]
        Engine::Native(native) => native.rasterize(path, transform, options, target),
        Engine::Unsupported => Err(RasterizeError::PlatformNotSupported),
    }
}

/// Maps a `viewbox`-sized square onto a `device_size` pixel square.
pub(crate) fn viewbox_transform(viewbox: f32, device_size: u32) -> Result<Affine, RasterizeError> {
    if !(viewbox.is_finite() && viewbox > 0.0) || device_size == 0 {
        return Err(RasterizeError::EmptyPath);
    }
    Ok(Affine::scale(f64::from(device_size) / f64::from(viewbox)))
}

/// Uniform scale factor of a transform, used to convert stroke widths to device pixels.
pub(crate) fn transform_scale(transform: Affine) -> f64 {
    transform.determinant().abs().sqrt()
}
