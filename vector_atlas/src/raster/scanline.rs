// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The software rasterizer.
//!
//! Fills are scan-converted at four sample lines per pixel row. On each sample line the
//! crossings of the active edges are sorted and walked with a winding count, and every span
//! the fill rule puts inside contributes its exact horizontal overlap with each pixel it touches. Strokes
//! are drawn as a distance field around each flattened segment.

#![allow(
    clippy::cast_possible_truncation,
    reason = "every float to integer cast here is clamped to the target bounds or to 0..=255"
)]

use alloc::vec::Vec;

use super::{DEVICE_TOLERANCE, RasterOptions, RasterTarget, transform_scale};
use crate::RasterizeError;
use crate::flatten::Polylines;
use crate::kurbo::{Affine, Point};
use crate::math::distance_to_segment;
use crate::path::SvgPath;
use crate::peniko::Fill;

#[cfg(feature = "libm")]
#[allow(unused_imports, reason = "only needed without std")]
use core_maths::CoreFloat;

/// Sample lines per pixel row.
const SUPERSAMPLES: usize = 4;
const SAMPLE_WEIGHT: f32 = 1.0 / SUPERSAMPLES as f32;

/// A non-horizontal polygon edge, oriented top to bottom.
#[derive(Clone, Copy, Debug)]
struct Edge {
    /// Topmost y; the edge covers sample lines in `y_top..y_bottom`.
    y_top: f64,
    y_bottom: f64,
    /// x at `y_top`.
    x_top: f64,
    /// Change in x per unit of y.
    slope: f64,
    /// +1 for edges drawn downwards, -1 for edges drawn upwards.
    winding: i32,
}

impl Edge {
    fn new(a: Point, b: Point) -> Option<Self> {
        if a.y == b.y {
            return None;
        }
        let (top, bottom, winding) = if a.y < b.y { (a, b, 1) } else { (b, a, -1) };
        Some(Self {
            y_top: top.y,
            y_bottom: bottom.y,
            x_top: top.x,
            slope: (bottom.x - top.x) / (bottom.y - top.y),
            winding,
        })
    }

    #[inline]
    fn x_at(&self, y: f64) -> f64 {
        self.x_top + (y - self.y_top) * self.slope
    }
}

/// Scanline fill and distance-field stroke over flattened paths.
///
/// All buffers are kept between calls.
#[derive(Debug, Default)]
pub struct SoftwareRasterizer {
    polylines: Polylines,
    edges: Vec<Edge>,
    /// Indices into `edges` crossing the current sample line.
    active: Vec<usize>,
    /// x and winding direction of each crossing on the current sample line, sorted by x.
    crossings: Vec<(f64, i32)>,
    /// Accumulated fill coverage of the current row.
    coverage: Vec<f32>,
}

impl SoftwareRasterizer {
    /// Creates a rasterizer with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws `path`, mapped to device pixels by `transform`, into `target`.
    pub fn rasterize(
        &mut self,
        path: &SvgPath,
        transform: Affine,
        options: &RasterOptions,
        target: &mut RasterTarget<'_>,
    ) -> Result<(), RasterizeError> {
        self.polylines
            .flatten_path(path, transform, DEVICE_TOLERANCE)?;

        if options.fill {
            self.fill(options.fill_rule, target);
        }
        if options.stroke.is_visible() {
            let width = f64::from(options.stroke.width) * transform_scale(transform);
            self.stroke(width * 0.5, target);
        }
        target.finish();
        Ok(())
    }

    fn build_edges(&mut self) {
        self.edges.clear();
        // Fills close every sub-path, whether or not the path said so.
        for (_, points) in self.polylines.iter() {
            let closing = points.last().copied().zip(points.first().copied());
            let edges = points
                .windows(2)
                .map(|pair| (pair[0], pair[1]))
                .chain(closing)
                .filter_map(|(a, b)| Edge::new(a, b));
            self.edges.extend(edges);
        }
        self.edges.sort_by(|a, b| a.y_top.total_cmp(&b.y_top));
    }

    fn fill(&mut self, fill_rule: Fill, target: &mut RasterTarget<'_>) {
        self.build_edges();
        let Some(first) = self.edges.first() else {
            return;
        };
        let max_y = self
            .edges
            .iter()
            .map(|edge| edge.y_bottom)
            .fold(f64::NEG_INFINITY, f64::max);

        let width = usize::from(target.width());
        let height = usize::from(target.height());
        let (row_start, row_end) = (
            first.y_top.floor().clamp(0.0, height as f64) as usize,
            max_y.ceil().clamp(0.0, height as f64) as usize,
        );

        self.coverage.clear();
        self.coverage.resize(width, 0.0);
        self.active.clear();
        let mut next_edge = 0;
        let channel = target.format().fill_channel();

        for row in row_start..row_end {
            self.coverage.fill(0.0);
            for sample in 0..SUPERSAMPLES {
                let y = row as f64 + (sample as f64 + 0.5) / SUPERSAMPLES as f64;

                while next_edge < self.edges.len() && self.edges[next_edge].y_top <= y {
                    self.active.push(next_edge);
                    next_edge += 1;
                }
                let edges = &self.edges;
                self.active.retain(|&i| edges[i].y_bottom > y);

                // Keep the active list ordered by x on this sample line.
                self.active
                    .sort_by(|&a, &b| edges[a].x_at(y).total_cmp(&edges[b].x_at(y)));
                self.crossings.clear();
                self.crossings.extend(
                    self.active
                        .iter()
                        .filter(|&&i| edges[i].y_top <= y)
                        .map(|&i| (edges[i].x_at(y), edges[i].winding)),
                );

                let mut winding = 0;
                let mut span_start = 0.0;
                for &(x, direction) in &self.crossings {
                    let was_inside = is_inside(fill_rule, winding);
                    winding += direction;
                    match (was_inside, is_inside(fill_rule, winding)) {
                        (false, true) => span_start = x,
                        (true, false) => accumulate_span(&mut self.coverage, span_start, x),
                        _ => {}
                    }
                }
            }

            for (x, &coverage) in self.coverage.iter().enumerate() {
                let alpha = coverage_to_alpha(coverage);
                if alpha > 0 {
                    target.merge(x, row, channel, alpha);
                }
            }
        }
    }

    fn stroke(&mut self, half_width: f64, target: &mut RasterTarget<'_>) {
        if !(half_width > 0.0) {
            return;
        }
        let channel = target.format().stroke_channel();
        let width = f64::from(target.width());
        let height = f64::from(target.height());
        let reach = half_width + 1.0;

        for (subpath, points) in self.polylines.iter() {
            let closing = if subpath.closed {
                points.last().copied().zip(points.first().copied())
            } else {
                None
            };
            let segments = points
                .windows(2)
                .map(|pair| (pair[0], pair[1]))
                .chain(closing);
            for (a, b) in segments {
                let (x0, x1, y0, y1) = (
                    (a.x.min(b.x) - reach).floor().clamp(0.0, width) as usize,
                    (a.x.max(b.x) + reach).ceil().clamp(0.0, width) as usize,
                    (a.y.min(b.y) - reach).floor().clamp(0.0, height) as usize,
                    (a.y.max(b.y) + reach).ceil().clamp(0.0, height) as usize,
                );
                for y in y0..y1 {
                    for x in x0..x1 {
                        let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                        let distance = distance_to_segment(center, a, b);
                        let coverage = (half_width + 0.5 - distance).clamp(0.0, 1.0) as f32;
                        let alpha = coverage_to_alpha(coverage);
                        if alpha > 0 {
                            target.merge(x, y, channel, alpha);
                        }
                    }
                }
            }
        }
    }
}

#[inline]
fn is_inside(fill_rule: Fill, winding: i32) -> bool {
    match fill_rule {
        Fill::NonZero => winding != 0,
        Fill::EvenOdd => winding % 2 != 0,
    }
}

/// Adds the overlap of `[x0, x1)` with each pixel, weighted for one sample line.
fn accumulate_span(coverage: &mut [f32], x0: f64, x1: f64) {
    let width = coverage.len() as f64;
    let x0 = x0.clamp(0.0, width);
    let x1 = x1.clamp(0.0, width);
    if x1 <= x0 {
        return;
    }
    let (first, last) = (x0.floor() as usize, (x1.ceil() as usize).min(coverage.len()));
    for (px, cell) in coverage.iter_mut().enumerate().take(last).skip(first) {
        let left = px as f64;
        let overlap = x1.min(left + 1.0) - x0.max(left);
        if overlap > 0.0 {
            let overlap = overlap as f32;
            *cell += overlap * SAMPLE_WEIGHT;
        }
    }
}

fn coverage_to_alpha(coverage: f32) -> u8 {
    (coverage * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::TargetFormat;
    use alloc::vec;

    fn render(data: &[u8], scale: f64, size: u16, options: RasterOptions) -> Vec<u8> {
        let path = SvgPath::parse(data).unwrap();
        let mut pixels = vec![0_u8; usize::from(size) * usize::from(size) * 4];
        let mut target = RasterTarget::new(
            &mut pixels,
            usize::from(size) * 4,
            size,
            size,
            TargetFormat::Rgba8,
        )
        .unwrap();
        SoftwareRasterizer::new()
            .rasterize(&path, Affine::scale(scale), &options, &mut target)
            .unwrap();
        pixels
    }

    fn pixel(pixels: &[u8], size: u16, x: usize, y: usize) -> [u8; 4] {
        let i = (y * usize::from(size) + x) * 4;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    #[test]
    fn span_overlap_is_exact() {
        let mut coverage = vec![0.0; 4];
        accumulate_span(&mut coverage, 0.5, 2.25);
        assert_eq!(coverage, [0.125, 0.25, 0.0625, 0.0]);
    }

    #[test]
    fn span_is_clipped_to_row() {
        let mut coverage = vec![0.0; 2];
        accumulate_span(&mut coverage, -5.0, 10.0);
        assert_eq!(coverage, [0.25, 0.25]);
    }

    #[test]
    fn aligned_square_has_no_antialiasing() {
        let pixels = render(b"M1 1 H3 V3 H1 Z", 2.0, 8, RasterOptions::fill());
        for y in 0..8 {
            for x in 0..8 {
                let inside = (2..6).contains(&x) && (2..6).contains(&y);
                let expected = if inside { 255 } else { 0 };
                assert_eq!(pixel(&pixels, 8, x, y)[3], expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn half_pixel_edge_is_half_covered() {
        let pixels = render(b"M0 0 H2.5 V4 H0 Z", 1.0, 4, RasterOptions::fill());
        assert_eq!(pixel(&pixels, 4, 1, 1)[0], 255);
        assert_eq!(pixel(&pixels, 4, 2, 1)[0], 128);
        assert_eq!(pixel(&pixels, 4, 3, 1)[0], 0);
    }

    #[test]
    fn horizontal_half_pixel_edge_uses_supersamples() {
        let pixels = render(b"M0 0 H4 V2.5 H0 Z", 1.0, 4, RasterOptions::fill());
        // Two of the four sample lines of row 2 lie above y = 2.5.
        assert_eq!(pixel(&pixels, 4, 0, 2)[0], 128);
    }

    #[test]
    fn even_odd_leaves_hole() {
        let pixels = render(
            b"M0 0 H8 V8 H0 Z M2 2 H6 V6 H2 Z",
            1.0,
            8,
            RasterOptions::fill(),
        );
        assert_eq!(pixel(&pixels, 8, 1, 1)[0], 255);
        assert_eq!(pixel(&pixels, 8, 4, 4)[0], 0, "inner square must be a hole");
    }

    #[test]
    fn nonzero_fills_overlapping_squares() {
        const OVERLAPPING: &[u8] = b"M0 0 H6 V6 H0 Z M2 2 H8 V8 H2 Z";
        let even_odd = render(OVERLAPPING, 1.0, 8, RasterOptions::fill());
        let nonzero = render(
            OVERLAPPING,
            1.0,
            8,
            RasterOptions::fill().with_fill_rule(Fill::NonZero),
        );
        assert_eq!(pixel(&even_odd, 8, 4, 4)[0], 0, "overlap cancels out");
        assert_eq!(pixel(&nonzero, 8, 4, 4)[0], 255, "overlap winds twice");
        for (x, y) in [(1, 1), (7, 7), (1, 5), (5, 1)] {
            assert_eq!(pixel(&even_odd, 8, x, y)[0], 255, "({x}, {y})");
            assert_eq!(pixel(&nonzero, 8, x, y)[0], 255, "({x}, {y})");
        }
        assert_eq!(pixel(&nonzero, 8, 7, 0)[0], 0, "outside both squares");
    }

    #[test]
    fn nonzero_keeps_counter_wound_holes() {
        // The inner square runs the other way, so its winding cancels the outer one.
        let pixels = render(
            b"M0 0 H8 V8 H0 Z M2 2 V6 H6 V2 Z",
            1.0,
            8,
            RasterOptions::fill().with_fill_rule(Fill::NonZero),
        );
        assert_eq!(pixel(&pixels, 8, 1, 1)[0], 255);
        assert_eq!(pixel(&pixels, 8, 4, 4)[0], 0);
    }

    #[test]
    fn open_subpaths_are_filled_as_closed() {
        let open = render(b"M0 0 H8 V8 H0", 1.0, 8, RasterOptions::fill());
        let closed = render(b"M0 0 H8 V8 H0 Z", 1.0, 8, RasterOptions::fill());
        assert_eq!(open, closed);
    }

    #[test]
    fn stroke_goes_to_green_channel() {
        let pixels = render(b"M0 4 H8", 1.0, 8, RasterOptions::stroke(2.0));
        let on_line = pixel(&pixels, 8, 4, 3);
        assert_eq!(on_line, [0, 255, 0, 255]);
        let off_line = pixel(&pixels, 8, 4, 6);
        assert_eq!(off_line, [0, 0, 0, 0]);
    }

    #[test]
    fn stroke_falloff_is_one_pixel_wide() {
        // Half width 1: pixel centers at distance 0.5 are full, 1.5 are empty.
        let pixels = render(b"M0 4 H8", 1.0, 8, RasterOptions::stroke(2.0));
        assert_eq!(pixel(&pixels, 8, 4, 4)[1], 255);
        assert_eq!(pixel(&pixels, 8, 4, 5)[1], 0);

        let wide = render(b"M0 4 H8", 1.0, 8, RasterOptions::stroke(2.5));
        assert_eq!(wide[(5 * 8 + 4) * 4 + 1], 64, "a quarter-covered pixel");
    }

    #[test]
    fn open_stroke_does_not_close() {
        let open = render(b"M1 1 H7 V7", 1.0, 8, RasterOptions::stroke(1.0));
        assert_eq!(pixel(&open, 8, 3, 5)[1], 0, "no closing diagonal");
        let closed = render(b"M1 1 H7 V7 Z", 1.0, 8, RasterOptions::stroke(1.0));
        assert!(pixel(&closed, 8, 4, 4)[1] > 0, "closing diagonal");
    }

    #[test]
    fn alpha_is_max_of_fill_and_stroke() {
        let pixels = render(
            b"M2 2 H14 V14 H2 Z",
            1.0,
            16,
            RasterOptions::fill_and_stroke(3.0),
        );
        for px in pixels.chunks_exact(4) {
            assert_eq!(px[3], px[0].max(px[1]));
            assert_eq!(px[2], 0);
        }
    }
}
