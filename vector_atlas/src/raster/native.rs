// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The native backend, drawing true curves through Vello CPU.

use core::fmt::{Debug, Formatter};

use vello_cpu::{Pixmap, RenderContext};

use super::{RasterOptions, RasterTarget};
use crate::RasterizeError;
use crate::arc::ArcApprox;
use crate::kurbo::{Affine, BezPath, Cap, Join, Point, Stroke};
use crate::path::{Segment, SvgPath};
use crate::peniko::color::palette::css::BLACK;

/// Renders paths with Vello CPU's anti-aliasing instead of flattening them first.
///
/// Fill and stroke are rendered into separate offscreen pixmaps whose alpha is then merged
/// into the fill and stroke channels of the target.
pub struct NativeRasterizer {
    ctx: Option<RenderContext>,
    pixmap: Option<Pixmap>,
    /// Every sub-path explicitly closed.
    fill_path: BezPath,
    /// Open sub-paths left open.
    stroke_path: BezPath,
}

impl Debug for NativeRasterizer {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativeRasterizer")
            .field("ctx", &self.ctx.as_ref().map(|ctx| (ctx.width(), ctx.height())))
            .field("pixmap", &self.pixmap.as_ref().map(|p| (p.width(), p.height())))
            .field("fill_path", &self.fill_path)
            .field("stroke_path", &self.stroke_path)
            .finish()
    }
}

impl Default for NativeRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRasterizer {
    /// Creates a rasterizer. The render context is allocated on first use.
    pub fn new() -> Self {
        Self {
            ctx: None,
            pixmap: None,
            fill_path: BezPath::new(),
            stroke_path: BezPath::new(),
        }
    }

    /// Draws `path`, mapped to device pixels by `transform`, into `target`.
    pub fn rasterize(
        &mut self,
        path: &SvgPath,
        transform: Affine,
        options: &RasterOptions,
        target: &mut RasterTarget<'_>,
    ) -> Result<(), RasterizeError> {
        self.build_paths(path)?;
        if !transform.is_finite() {
            return Err(RasterizeError::GraphicsError);
        }

        let (width, height) = (target.width(), target.height());
        if width == 0 || height == 0 {
            return Ok(());
        }

        if options.fill {
            let channel = target.format().fill_channel();
            let fill_rule = options.fill_rule;
            self.render(width, height, |ctx, paths| {
                ctx.set_transform(transform);
                ctx.set_paint(BLACK);
                ctx.set_fill_rule(fill_rule);
                ctx.fill_path(&paths.fill_path);
            });
            self.merge_coverage(target, channel);
        }
        if options.stroke.is_visible() {
            let channel = target.format().stroke_channel();
            // The transform scales the stroke along with the path.
            let stroke = Stroke::new(f64::from(options.stroke.width))
                .with_caps(Cap::Round)
                .with_join(Join::Round);
            self.render(width, height, |ctx, paths| {
                ctx.set_transform(transform);
                ctx.set_paint(BLACK);
                ctx.set_stroke(stroke);
                ctx.stroke_path(&paths.stroke_path);
            });
            self.merge_coverage(target, channel);
        }
        target.finish();
        Ok(())
    }

    /// Converts `path` into the fill and stroke variants.
    fn build_paths(&mut self, path: &SvgPath) -> Result<(), RasterizeError> {
        self.fill_path.truncate(0);
        self.stroke_path.truncate(0);

        let mut current = Point::ZERO;
        let mut start = Point::ZERO;
        // Whether the current sub-path has been started in the output paths.
        let mut open = false;
        let mut drawn = false;

        for segment in path.segments() {
            let end = match segment {
                Segment::MoveTo(p) => {
                    if open {
                        self.fill_path.close_path();
                    }
                    open = false;
                    current = p;
                    start = p;
                    continue;
                }
                Segment::Close => {
                    if open {
                        self.fill_path.close_path();
                        self.stroke_path.close_path();
                    }
                    open = false;
                    current = start;
                    continue;
                }
                Segment::LineTo(p) | Segment::QuadTo(_, p) | Segment::CubicTo(_, _, p) => p,
                Segment::ArcTo(arc) => arc.to,
            };

            if !open {
                self.fill_path.move_to(current);
                self.stroke_path.move_to(current);
                open = true;
                drawn = true;
            }
            match segment {
                Segment::LineTo(p) => self.line_to(p),
                Segment::QuadTo(c, p) => {
                    self.fill_path.quad_to(c, p);
                    self.stroke_path.quad_to(c, p);
                }
                Segment::CubicTo(c0, c1, p) => {
                    self.fill_path.curve_to(c0, c1, p);
                    self.stroke_path.curve_to(c0, c1, p);
                }
                Segment::ArcTo(arc) => match arc.to_cubics() {
                    ArcApprox::Line(p) => self.line_to(p),
                    ArcApprox::Cubics(cubics) => {
                        for cubic in cubics {
                            self.fill_path.curve_to(cubic.p1, cubic.p2, cubic.p3);
                            self.stroke_path.curve_to(cubic.p1, cubic.p2, cubic.p3);
                        }
                    }
                },
                Segment::MoveTo(_) | Segment::Close => {}
            }
            current = end;
        }
        if open {
            self.fill_path.close_path();
        }

        if !drawn {
            return Err(RasterizeError::EmptyPath);
        }
        let finite = self.stroke_path.elements().iter().all(|el| {
            el.end_point().is_none_or(|p| p.is_finite())
        });
        if !finite {
            log::warn!("native rasterizer rejected non-finite path geometry");
            return Err(RasterizeError::GraphicsError);
        }
        Ok(())
    }

    fn line_to(&mut self, p: Point) {
        self.fill_path.line_to(p);
        self.stroke_path.line_to(p);
    }

    /// Renders one pass into the offscreen pixmap, reusing the context while the size matches.
    fn render(
        &mut self,
        width: u16,
        height: u16,
        draw: impl FnOnce(&mut RenderContext, &Self),
    ) {
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            _ => RenderContext::new(width, height),
        };
        ctx.reset();
        draw(&mut ctx, self);
        ctx.flush();

        let mut pixmap = match self.pixmap.take() {
            Some(pixmap) if pixmap.width() == width && pixmap.height() == height => pixmap,
            _ => Pixmap::new(width, height),
        };
        pixmap.data_as_u8_slice_mut().fill(0);
        ctx.render_to_pixmap(&mut pixmap);

        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);
    }

    /// Copies the alpha of the last rendered pass into one channel of `target`.
    fn merge_coverage(&self, target: &mut RasterTarget<'_>, channel: usize) {
        let Some(pixmap) = &self.pixmap else {
            return;
        };
        let width = usize::from(target.width());
        let rows = pixmap.data_as_u8_slice().chunks_exact(width * 4);
        for (y, row) in rows.enumerate().take(usize::from(target.height())) {
            for (x, pixel) in row.chunks_exact(4).enumerate() {
                // Paint is opaque black, so premultiplied alpha is the coverage.
                if pixel[3] > 0 {
                    target.merge(x, y, channel, pixel[3]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::TargetFormat;
    use alloc::vec;
    use alloc::vec::Vec;

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
        NativeRasterizer::new()
            .rasterize(&path, Affine::scale(scale), &options, &mut target)
            .unwrap();
        pixels
    }

    #[test]
    fn fill_path_closes_open_subpaths() {
        let mut rasterizer = NativeRasterizer::new();
        rasterizer
            .build_paths(&SvgPath::parse(b"M0 0 L4 0 L4 4 M8 8 L9 9").unwrap())
            .unwrap();
        let closes = |path: &BezPath| {
            path.elements()
                .iter()
                .filter(|el| matches!(el, crate::kurbo::PathEl::ClosePath))
                .count()
        };
        assert_eq!(closes(&rasterizer.fill_path), 2);
        assert_eq!(closes(&rasterizer.stroke_path), 0);
    }

    #[test]
    fn lone_move_to_is_empty() {
        let mut rasterizer = NativeRasterizer::new();
        assert_eq!(
            rasterizer.build_paths(&SvgPath::parse(b"M1 1 M2 2").unwrap()),
            Err(RasterizeError::EmptyPath)
        );
    }

    #[test]
    fn aligned_square_is_solid() {
        let pixels = render(b"M1 1 H3 V3 H1 Z", 2.0, 8, RasterOptions::fill());
        let alpha = |x: usize, y: usize| pixels[(y * 8 + x) * 4 + 3];
        assert_eq!(alpha(3, 3), 255);
        assert_eq!(alpha(0, 0), 0);
        assert_eq!(alpha(7, 7), 0);
    }

    #[test]
    fn fill_rule_decides_overlap() {
        const OVERLAPPING: &[u8] = b"M0 0 H6 V6 H0 Z M2 2 H8 V8 H2 Z";
        let fill = |pixels: &[u8], x: usize, y: usize| pixels[(y * 8 + x) * 4];
        let even_odd = render(OVERLAPPING, 1.0, 8, RasterOptions::fill());
        let nonzero = render(
            OVERLAPPING,
            1.0,
            8,
            RasterOptions::fill().with_fill_rule(crate::peniko::Fill::NonZero),
        );
        assert_eq!(fill(&even_odd, 4, 4), 0);
        assert_eq!(fill(&nonzero, 4, 4), 255);
        assert_eq!(fill(&even_odd, 1, 1), 255);
        assert_eq!(fill(&nonzero, 7, 7), 255);
    }

    #[test]
    fn channels_follow_two_channel_layout() {
        let pixels = render(b"M2 2 H14 V14 H2 Z", 1.0, 16, RasterOptions::stroke(2.0));
        assert!(pixels.chunks_exact(4).any(|px| px[1] > 0), "stroke drawn");
        for px in pixels.chunks_exact(4) {
            assert_eq!(px[0], 0, "no fill requested");
            assert_eq!(px[3], px[1]);
        }
    }
}
