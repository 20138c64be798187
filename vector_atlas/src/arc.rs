// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Conversion of SVG elliptical arcs into cubic Bézier segments.
//!
//! The endpoint parameterization used by path data is converted to a center
//! parameterization following the SVG implementation notes
//! (<https://www.w3.org/TR/SVG11/implnote.html#ArcConversionEndpointToCenter>), and the
//! angular span is then split into pieces of at most 90°, each approximated by one cubic.

use core::f64::consts::{FRAC_PI_2, TAU};

use smallvec::SmallVec;

use crate::kurbo::{CubicBez, Point, Vec2};
use crate::math::{FloatExt, signed_angle};

#[cfg(feature = "libm")]
#[allow(unused_imports, reason = "only needed without std")]
use core_maths::CoreFloat;

/// An elliptical arc in SVG endpoint parameterization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SvgArc {
    /// The current point the arc starts from.
    pub from: Point,
    /// The end point.
    pub to: Point,
    /// The ellipse radii. Negative values are treated as their absolute value.
    pub radii: Vec2,
    /// Rotation of the ellipse's x-axis, in radians.
    pub x_rotation: f64,
    /// Whether to take the arc spanning more than 180°.
    pub large_arc: bool,
    /// Whether the arc is drawn in the positive-angle direction.
    pub sweep: bool,
}

/// Result of converting an [`SvgArc`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArcApprox {
    /// The arc degenerated (a zero radius, or identical endpoints) into a straight line to the
    /// end point.
    Line(Point),
    /// Up to four cubic segments, each spanning at most 90°.
    Cubics(SmallVec<[CubicBez; 4]>),
}

/// Tolerance below which a span is considered to fill a whole quadrant, so that exact
/// 90° and 180° arcs are not split into an extra sliver.
const SPAN_EPSILON: f64 = 1e-9;

impl SvgArc {
    /// Approximates the arc by cubic Béziers.
    pub fn to_cubics(&self) -> ArcApprox {
        let mut rx = self.radii.x.abs();
        let mut ry = self.radii.y.abs();
        if rx.is_nearly_zero() || ry.is_nearly_zero() || self.from == self.to {
            return ArcApprox::Line(self.to);
        }

        let (sin_phi, cos_phi) = self.x_rotation.sin_cos();

        // Rotate the half-chord into the ellipse's unit space.
        let half = (self.from - self.to) * 0.5;
        let x1p = cos_phi * half.x + sin_phi * half.y;
        let y1p = -sin_phi * half.x + cos_phi * half.y;

        // Scale the radii up if no ellipse of this size can connect the endpoints.
        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let scale = lambda.sqrt();
            rx *= scale;
            ry *= scale;
        }

        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let numerator = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
        let denominator = rx2 * y1p * y1p + ry2 * x1p * x1p;
        let mut coef = if denominator.is_nearly_zero() {
            0.0
        } else {
            (numerator / denominator).max(0.0).sqrt()
        };
        if self.large_arc == self.sweep {
            coef = -coef;
        }
        let cxp = coef * (rx * y1p / ry);
        let cyp = coef * -(ry * x1p / rx);

        let mid = self.from.midpoint(self.to);
        let center = Point::new(
            cos_phi * cxp - sin_phi * cyp + mid.x,
            sin_phi * cxp + cos_phi * cyp + mid.y,
        );

        let u = Vec2::new((x1p - cxp) / rx, (y1p - cyp) / ry);
        let v = Vec2::new((-x1p - cxp) / rx, (-y1p - cyp) / ry);
        let start_angle = signed_angle(Vec2::new(1.0, 0.0), u);
        let mut sweep_angle = signed_angle(u, v);
        if !self.sweep && sweep_angle > 0.0 {
            sweep_angle -= TAU;
        } else if self.sweep && sweep_angle < 0.0 {
            sweep_angle += TAU;
        }

        let ellipse = Ellipse {
            center,
            rx,
            ry,
            sin_phi,
            cos_phi,
        };

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "a sweep of at most a full turn splits into at most four pieces"
        )]
        let count = ((sweep_angle.abs() / FRAC_PI_2 - SPAN_EPSILON).ceil().max(1.0) as usize).min(4);
        let step = sweep_angle / count as f64;

        let mut cubics = SmallVec::new();
        let mut theta = start_angle;
        let mut p0 = self.from;
        for i in 0..count {
            let next = theta + step;
            // Land exactly on the requested end point rather than the recomputed one.
            let p3 = if i + 1 == count { self.to } else { ellipse.point(next) };
            cubics.push(ellipse.segment(p0, p3, theta, step));
            theta = next;
            p0 = p3;
        }
        ArcApprox::Cubics(cubics)
    }
}

struct Ellipse {
    center: Point,
    rx: f64,
    ry: f64,
    sin_phi: f64,
    cos_phi: f64,
}

impl Ellipse {
    fn point(&self, theta: f64) -> Point {
        let (sin, cos) = theta.sin_cos();
        Point::new(
            self.center.x + self.rx * self.cos_phi * cos - self.ry * self.sin_phi * sin,
            self.center.y + self.rx * self.sin_phi * cos + self.ry * self.cos_phi * sin,
        )
    }

    fn derivative(&self, theta: f64) -> Vec2 {
        let (sin, cos) = theta.sin_cos();
        Vec2::new(
            -self.rx * self.cos_phi * sin - self.ry * self.sin_phi * cos,
            -self.rx * self.sin_phi * sin + self.ry * self.cos_phi * cos,
        )
    }

    /// One cubic spanning `theta..theta + delta`, using the control point offset
    /// `alpha = sin(Δθ) · (√(4 + 3·tan²(Δθ/2)) − 1) / 3`.
    fn segment(&self, p0: Point, p3: Point, theta: f64, delta: f64) -> CubicBez {
        let tan_half = (delta * 0.5).tan();
        let alpha = delta.sin() * ((4.0 + 3.0 * tan_half * tan_half).sqrt() - 1.0) / 3.0;
        let p1 = p0 + self.derivative(theta) * alpha;
        let p2 = p3 - self.derivative(theta + delta) * alpha;
        CubicBez::new(p0, p1, p2, p3)
    }
}
