// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening of paths into polylines.

use alloc::vec::Vec;

use crate::RasterizeError;
use crate::arc::ArcApprox;
use crate::kurbo::{Affine, CubicBez, ParamCurve, Point, QuadBez};
use crate::math::distance_to_segment;
use crate::path::{Segment, SvgPath};

/// Maximum recursion depth when subdividing a curve. 2^16 pieces is far beyond what any
/// cacheable size needs, so this only guards against non-finite input.
const MAX_SUBDIVISION_DEPTH: u32 = 16;

/// The polyline tolerance, in path units, that bounds the curve error to half a device pixel.
pub fn tolerance_for(viewbox: f32, device_size: u32) -> f64 {
    f64::from(viewbox) / (2.0 * f64::from(device_size.max(1)))
}

/// A range of [`Polylines::points`] forming one sub-path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subpath {
    /// Index of the first point.
    pub start: usize,
    /// Index one past the last point.
    pub end: usize,
    /// Whether the sub-path was explicitly closed.
    ///
    /// Fills treat every sub-path as closed regardless; strokes only connect the last point
    /// back to the first when this is set.
    pub closed: bool,
}

impl Subpath {
    /// Number of points in the sub-path.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the sub-path has no points.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Flattened path geometry: one flat point list and the sub-path ranges into it.
#[derive(Clone, Debug, Default)]
pub struct Polylines {
    /// All points, sub-path after sub-path.
    pub points: Vec<Point>,
    /// The sub-paths, in path order.
    pub subpaths: Vec<Subpath>,
}

/// Flattens `path` into polylines whose deviation from the true curves stays below `tolerance`.
///
/// Returns [`RasterizeError::EmptyPath`] if the path has nothing to draw.
pub fn flatten(path: &SvgPath, tolerance: f64) -> Result<Polylines, RasterizeError> {
    let mut polylines = Polylines::default();
    polylines.flatten_path(path, Affine::IDENTITY, tolerance)?;
    Ok(polylines)
}

impl Polylines {
    /// Removes all points and sub-paths, keeping the allocations.
    pub fn clear(&mut self) {
        self.points.clear();
        self.subpaths.clear();
    }

    /// Points of a sub-path.
    pub fn subpath_points(&self, subpath: &Subpath) -> &[Point] {
        &self.points[subpath.start..subpath.end]
    }

    /// Iterates over the sub-paths with their points.
    pub fn iter(&self) -> impl Iterator<Item = (&Subpath, &[Point])> + '_ {
        self.subpaths
            .iter()
            .map(move |subpath| (subpath, self.subpath_points(subpath)))
    }

    /// Replaces the contents with `path` mapped through `transform` and flattened.
    ///
    /// Curves are transformed before flattening, so `tolerance` is measured in the output
    /// space (device pixels when `transform` maps to the device).
    pub fn flatten_path(
        &mut self,
        path: &SvgPath,
        transform: Affine,
        tolerance: f64,
    ) -> Result<(), RasterizeError> {
        self.clear();
        if path.is_empty() || !(tolerance > 0.0) {
            return Err(RasterizeError::EmptyPath);
        }

        let mut builder = Builder {
            out: self,
            transform,
            tolerance,
            current: Point::ZERO,
            start: Point::ZERO,
            open: None,
        };
        for segment in path.segments() {
            match segment {
                Segment::MoveTo(p) => {
                    builder.finish(false);
                    builder.current = p;
                    builder.start = p;
                }
                Segment::LineTo(p) => builder.line_to(p),
                Segment::QuadTo(c, p) => {
                    let quad = QuadBez::new(builder.current, c, p);
                    builder.cubic_to(quad.raise());
                }
                Segment::CubicTo(c0, c1, p) => {
                    builder.cubic_to(CubicBez::new(builder.current, c0, c1, p));
                }
                Segment::ArcTo(arc) => match arc.to_cubics() {
                    ArcApprox::Line(p) => builder.line_to(p),
                    ArcApprox::Cubics(cubics) => {
                        for cubic in cubics {
                            builder.cubic_to(cubic);
                        }
                    }
                },
                Segment::Close => {
                    builder.finish(true);
                    builder.current = builder.start;
                }
            }
        }
        builder.finish(false);

        if self.subpaths.is_empty() {
            return Err(RasterizeError::EmptyPath);
        }
        if self.points.iter().any(|p| !p.is_finite()) {
            self.clear();
            return Err(RasterizeError::EmptyPath);
        }
        Ok(())
    }
}

struct Builder<'a> {
    out: &'a mut Polylines,
    transform: Affine,
    tolerance: f64,
    /// Current point, in path space.
    current: Point,
    /// Start of the current sub-path, in path space.
    start: Point,
    /// Index of the first point of the sub-path being built.
    open: Option<usize>,
}

impl Builder<'_> {
    fn begin(&mut self) {
        if self.open.is_none() {
            self.open = Some(self.out.points.len());
            self.out.points.push(self.transform * self.current);
        }
    }

    fn finish(&mut self, closed: bool) {
        let Some(start) = self.open.take() else {
            return;
        };
        let end = self.out.points.len();
        // A lone move-to draws nothing.
        if end - start < 2 {
            self.out.points.truncate(start);
            return;
        }
        self.out.subpaths.push(Subpath { start, end, closed });
    }

    fn line_to(&mut self, p: Point) {
        self.begin();
        self.out.points.push(self.transform * p);
        self.current = p;
    }

    fn cubic_to(&mut self, cubic: CubicBez) {
        self.begin();
        let device = CubicBez::new(
            self.transform * cubic.p0,
            self.transform * cubic.p1,
            self.transform * cubic.p2,
            self.transform * cubic.p3,
        );
        flatten_cubic(device, self.tolerance, 0, &mut self.out.points);
        self.current = cubic.p3;
    }
}

/// Whether the control points are close enough to the chord that the chord can stand in for
/// the curve. The curve lies within the control polygon, so this bounds its deviation.
///
/// Measuring to the segment rather than the line also splits curves whose control points
/// overshoot the chord's endpoints.
fn is_flat(cubic: &CubicBez, tolerance: f64) -> bool {
    let d1 = distance_to_segment(cubic.p1, cubic.p0, cubic.p3);
    let d2 = distance_to_segment(cubic.p2, cubic.p0, cubic.p3);
    d1.max(d2) < tolerance
}

fn flatten_cubic(cubic: CubicBez, tolerance: f64, depth: u32, out: &mut Vec<Point>) {
    if depth >= MAX_SUBDIVISION_DEPTH || is_flat(&cubic, tolerance) {
        out.push(cubic.p3);
        return;
    }
    let (left, right) = cubic.subdivide();
    flatten_cubic(left, tolerance, depth + 1, out);
    flatten_cubic(right, tolerance, depth + 1, out);
}
