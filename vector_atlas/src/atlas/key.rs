// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cache keys.

use core::hash::BuildHasher;

use foldhash::quality::FixedState;

use crate::peniko::Fill;
use crate::raster::{RasterOptions, StrokeOptions};

#[cfg(feature = "libm")]
#[allow(unused_imports, reason = "only needed without std")]
use core_maths::CoreFloat;

/// Seed of the path content hash. Fixed, so keys are stable across runs.
const PATH_HASH_SEED: u64 = 0x5f0e_a7c1_a5e5_d00d;

/// Stroke widths are quantized to this many steps per device pixel.
const STROKE_WIDTH_STEPS: f32 = 4.0;

/// Number of subpixel quantization buckets (1-255).
/// More buckets = better quality but more cache entries.
pub(crate) const SUBPIXEL_BUCKETS: u8 = 4;

/// Identifies one rasterized icon.
///
/// Two requests with equal keys produce identical pixels, so they share an atlas region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RasterizeKey {
    /// Content hash of the path data (and its viewbox).
    pub path_hash: u64,
    /// Edge length in device pixels.
    pub device_size: u16,
    /// Whether the path is filled.
    pub has_fill: bool,
    /// Whether the fill uses the nonzero winding rule rather than even-odd.
    pub nonzero_fill: bool,
    /// Whether the path is stroked.
    pub has_stroke: bool,
    /// Stroke width in quarter device pixels; zero without a stroke.
    pub stroke_width_quantized: u16,
}

impl RasterizeKey {
    /// Creates the key for drawing `path_data`, authored in a `viewbox`-sized square, at
    /// `device_size` pixels.
    pub fn new(path_data: &[u8], viewbox: f32, device_size: u16, options: &RasterOptions) -> Self {
        let has_stroke = options.stroke.is_visible();
        let scale = f32::from(device_size) / viewbox;
        Self {
            path_hash: hash_path(path_data, viewbox),
            device_size,
            has_fill: options.fill,
            nonzero_fill: options.fill && options.fill_rule == Fill::NonZero,
            has_stroke,
            stroke_width_quantized: if has_stroke {
                quantize_stroke_width(options.stroke.width * scale)
            } else {
                0
            },
        }
    }

    /// The drawing options this key stands for, for a path authored in a `viewbox`-sized
    /// square.
    ///
    /// The stroke width is the quantized device width mapped back to viewbox units. Rendering
    /// with these rather than the requested options keeps the cached pixels a pure function
    /// of the key.
    pub fn options(&self, viewbox: f32) -> RasterOptions {
        let width = if self.device_size == 0 {
            0.0
        } else {
            f32::from(self.stroke_width_quantized) / STROKE_WIDTH_STEPS * viewbox
                / f32::from(self.device_size)
        };
        RasterOptions {
            fill: self.has_fill,
            fill_rule: if self.nonzero_fill {
                Fill::NonZero
            } else {
                Fill::EvenOdd
            },
            stroke: StrokeOptions {
                enabled: self.has_stroke,
                width,
            },
        }
    }

    /// The stroke width in device pixels, after quantization.
    pub fn stroke_width_px(&self) -> f32 {
        f32::from(self.stroke_width_quantized) / STROKE_WIDTH_STEPS
    }
}

/// Hashes path bytes together with the space they are authored in, so the same data under
/// two viewboxes gets two entries.
fn hash_path(path_data: &[u8], viewbox: f32) -> u64 {
    FixedState::with_seed(PATH_HASH_SEED).hash_one((path_data, viewbox.to_bits()))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "clamped to the u16 range"
)]
fn quantize_stroke_width(width_px: f32) -> u16 {
    // Visible strokes never round down to nothing.
    (width_px * STROKE_WIDTH_STEPS)
        .round()
        .clamp(1.0, f32::from(u16::MAX)) as u16
}

/// Identifies one rasterized glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphCacheKey {
    /// Caller-assigned identifier of the font.
    pub font_id: u64,
    /// Glyph index within the font.
    pub glyph_id: u32,
    /// Font size as f32 bits (exact match, no quantization).
    pub size_bits: u32,
    /// Horizontal subpixel position (0 to `SUBPIXEL_BUCKETS - 1`).
    pub subpixel_x: u8,
    /// Vertical subpixel position (0 to `SUBPIXEL_BUCKETS - 1`).
    pub subpixel_y: u8,
}

impl GlyphCacheKey {
    /// Creates a key; the fractional positions are quantized.
    #[inline]
    pub fn new(font_id: u64, glyph_id: u32, size: f32, fractional_x: f32, fractional_y: f32) -> Self {
        Self {
            font_id,
            glyph_id,
            size_bits: size.to_bits(),
            subpixel_x: quantize_subpixel(fractional_x),
            subpixel_y: quantize_subpixel(fractional_y),
        }
    }

    /// The font size.
    pub fn size(&self) -> f32 {
        f32::from_bits(self.size_bits)
    }
}

/// Quantize fractional position to [`SUBPIXEL_BUCKETS`] buckets.
#[expect(
    clippy::cast_possible_truncation,
    reason = "result is clamped to SUBPIXEL_BUCKETS-1 which fits in u8"
)]
#[inline]
fn quantize_subpixel(frac: f32) -> u8 {
    let normalized = frac.fract();
    let normalized = if normalized < 0.0 {
        normalized + 1.0
    } else {
        normalized
    };
    ((normalized * f32::from(SUBPIXEL_BUCKETS)).round() as u8).min(SUBPIXEL_BUCKETS - 1)
}

/// Returns the subpixel offset value for a quantized bucket.
#[inline]
pub(crate) fn subpixel_offset(quantized: u8) -> f32 {
    f32::from(quantized) / f32::from(SUBPIXEL_BUCKETS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroked(width: f32) -> RasterizeKey {
        // One viewbox unit per device pixel.
        RasterizeKey::new(b"M0 0 L1 1", 32.0, 32, &RasterOptions::stroke(width))
    }

    #[test]
    fn stroke_widths_share_quarter_steps() {
        assert_eq!(stroked(1.01), stroked(1.12));
        assert_ne!(stroked(1.01), stroked(1.30));
        assert_eq!(stroked(1.01).stroke_width_quantized, 4);
        assert_eq!(stroked(1.30).stroke_width_quantized, 5);
    }

    #[test]
    fn stroke_width_is_quantized_in_device_pixels() {
        // 0.05 units of a unit viewbox at 64px is 3.2px, which rounds to 3.25px.
        let key = RasterizeKey::new(b"M0 0 L1 1", 1.0, 64, &RasterOptions::stroke(0.05));
        assert_eq!(key.stroke_width_quantized, 13);
        assert_eq!(key.stroke_width_px(), 3.25);
        let width = key.options(1.0).stroke.width;
        assert!((width - 3.25 / 64.0).abs() < 1e-6, "got {width}");
    }

    #[test]
    fn wide_strokes_in_large_viewboxes_stay_distinct() {
        let key = |width| RasterizeKey::new(b"M0 0 L1 1", 1000.0, 64, &RasterOptions::stroke(width));
        assert_ne!(key(80.0), key(200.0));
        assert_eq!(key(200.0).stroke_width_px(), 12.75);
        let huge = RasterizeKey::new(b"M0 0 L1 1", 1.0, 64, &RasterOptions::stroke(1.0e9));
        assert_eq!(huge.stroke_width_quantized, u16::MAX, "saturates");
    }

    #[test]
    fn options_round_trip_through_quantization() {
        let key = stroked(1.12);
        assert_eq!(key.options(32.0), RasterOptions::stroke(1.0));
        let fill = RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &RasterOptions::fill());
        assert_eq!(fill.options(24.0), RasterOptions::fill());
    }

    #[test]
    fn fill_rule_splits_fills_only() {
        let even_odd = RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &RasterOptions::fill());
        let nonzero = RasterOptions::fill().with_fill_rule(Fill::NonZero);
        let nonzero_key = RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &nonzero);
        assert_ne!(even_odd, nonzero_key);
        assert_eq!(nonzero_key.options(24.0), nonzero);

        let stroke = RasterOptions::stroke(1.0);
        assert_eq!(
            RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &stroke),
            RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &stroke.with_fill_rule(Fill::NonZero)),
            "the rule is irrelevant without a fill"
        );
    }

    #[test]
    fn disabled_stroke_ignores_width() {
        let mut options = RasterOptions::fill();
        options.stroke.width = 3.0;
        assert_eq!(
            RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &options),
            RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &RasterOptions::fill())
        );
    }

    #[test]
    fn path_and_viewbox_feed_the_hash() {
        let options = RasterOptions::fill();
        let base = RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &options);
        assert_eq!(base, RasterizeKey::new(b"M0 0 L1 1", 24.0, 32, &options));
        assert_ne!(base, RasterizeKey::new(b"M0 0 L1 2", 24.0, 32, &options));
        assert_ne!(base, RasterizeKey::new(b"M0 0 L1 1", 16.0, 32, &options));
        assert_ne!(base, RasterizeKey::new(b"M0 0 L1 1", 24.0, 33, &options));
    }

    #[test]
    fn test_quantize_subpixel() {
        // Test bucket boundaries
        assert_eq!(quantize_subpixel(0.0), 0);
        assert_eq!(quantize_subpixel(0.1), 0);
        assert_eq!(quantize_subpixel(0.2), 1);
        assert_eq!(quantize_subpixel(0.25), 1);
        assert_eq!(quantize_subpixel(0.5), 2);
        assert_eq!(quantize_subpixel(0.7), 3);
        assert_eq!(quantize_subpixel(0.9), 3);
        assert_eq!(quantize_subpixel(1.0), 0);
        assert_eq!(quantize_subpixel(-0.25), 3, "negative positions wrap");
    }

    #[test]
    fn test_subpixel_offset() {
        assert_eq!(subpixel_offset(0), 0.0);
        assert_eq!(subpixel_offset(1), 0.25);
        assert_eq!(subpixel_offset(3), 0.75);
    }

    #[test]
    fn glyph_keys_split_on_both_axes() {
        let a = GlyphCacheKey::new(1, 42, 16.0, 0.3, 0.0);
        assert_eq!(a, GlyphCacheKey::new(1, 42, 16.0, 0.26, 0.1));
        assert_ne!(a, GlyphCacheKey::new(1, 42, 16.0, 0.3, 0.5));
        assert_ne!(a, GlyphCacheKey::new(1, 42, 16.5, 0.3, 0.0));
    }
}
