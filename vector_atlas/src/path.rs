// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vector path model and SVG path-data parsing.

use alloc::vec::Vec;

use crate::RasterizeError;
use crate::arc::{ArcApprox, SvgArc};
use crate::kurbo::{Point, Rect, Vec2};

/// The kind of a path command, independent of whether its coordinates are relative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Starts a new sub-path (`M`).
    MoveTo,
    /// Straight line (`L`).
    LineTo,
    /// Horizontal line (`H`).
    HorizLineTo,
    /// Vertical line (`V`).
    VertLineTo,
    /// Cubic Bézier curve (`C`).
    CurveTo,
    /// Cubic Bézier whose first control point mirrors the previous one (`S`).
    SmoothCurveTo,
    /// Quadratic Bézier curve (`Q`).
    QuadTo,
    /// Quadratic Bézier whose control point mirrors the previous one (`T`).
    SmoothQuadTo,
    /// Elliptical arc (`A`).
    ArcTo,
    /// Closes the current sub-path (`Z`).
    ClosePath,
}

impl CommandKind {
    /// Number of operands this command consumes from the operand sequence.
    pub const fn operand_count(self) -> usize {
        match self {
            Self::ClosePath => 0,
            Self::HorizLineTo | Self::VertLineTo => 1,
            Self::MoveTo | Self::LineTo | Self::SmoothQuadTo => 2,
            Self::SmoothCurveTo | Self::QuadTo => 4,
            Self::CurveTo => 6,
            Self::ArcTo => 7,
        }
    }

    fn from_letter(letter: u8) -> Option<(Self, bool)> {
        let kind = match letter.to_ascii_uppercase() {
            b'M' => Self::MoveTo,
            b'L' => Self::LineTo,
            b'H' => Self::HorizLineTo,
            b'V' => Self::VertLineTo,
            b'C' => Self::CurveTo,
            b'S' => Self::SmoothCurveTo,
            b'Q' => Self::QuadTo,
            b'T' => Self::SmoothQuadTo,
            b'A' => Self::ArcTo,
            b'Z' => Self::ClosePath,
            _ => return None,
        };
        Some((kind, letter.is_ascii_lowercase()))
    }
}

/// A single command of an [`SvgPath`].
///
/// Commands do not store their operands. Each one consumes
/// [`CommandKind::operand_count`] values from the path's operand sequence, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathCommand {
    /// What the command draws.
    pub kind: CommandKind,
    /// Whether the coordinates are relative to the current point.
    pub relative: bool,
}

/// A compound vector path: an ordered command list and the flat operand sequence backing it.
///
/// The operand count always matches the commands; this is checked by the parser and maintained
/// by the builder methods.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SvgPath {
    commands: Vec<PathCommand>,
    operands: Vec<f32>,
}

impl SvgPath {
    /// Creates an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses SVG path data (the `d` attribute).
    ///
    /// Returns [`RasterizeError::EmptyPath`] if the data contains no commands, does not start
    /// with a move-to, contains an unknown command, or ends in an incomplete operand group.
    pub fn parse(data: &[u8]) -> Result<Self, RasterizeError> {
        let mut path = Self::new();
        path.parse_into(data)?;
        Ok(path)
    }

    /// Clears the path and parses `data` into it, reusing its allocations.
    pub fn parse_into(&mut self, data: &[u8]) -> Result<(), RasterizeError> {
        self.clear();
        let mut tokens = Tokenizer { data, pos: 0 };
        // The command implied by a bare operand group.
        let mut implicit: Option<PathCommand> = None;

        loop {
            tokens.skip_separators();
            let Some(byte) = tokens.peek() else {
                break;
            };

            let command = if byte.is_ascii_alphabetic() {
                tokens.pos += 1;
                let (kind, relative) =
                    CommandKind::from_letter(byte).ok_or(RasterizeError::EmptyPath)?;
                if self.commands.is_empty() && kind != CommandKind::MoveTo {
                    return Err(RasterizeError::EmptyPath);
                }
                PathCommand { kind, relative }
            } else {
                implicit.ok_or(RasterizeError::EmptyPath)?
            };

            if command.kind == CommandKind::ClosePath {
                self.commands.push(command);
                implicit = None;
                continue;
            }

            self.parse_operands(&mut tokens, command.kind)?;
            self.commands.push(command);
            implicit = Some(match command.kind {
                // Extra coordinate pairs after a move-to are line-tos.
                CommandKind::MoveTo => PathCommand {
                    kind: CommandKind::LineTo,
                    relative: command.relative,
                },
                _ => command,
            });
        }

        if self.commands.is_empty() {
            return Err(RasterizeError::EmptyPath);
        }
        Ok(())
    }

    fn parse_operands(
        &mut self,
        tokens: &mut Tokenizer<'_>,
        kind: CommandKind,
    ) -> Result<(), RasterizeError> {
        for index in 0..kind.operand_count() {
            // Arc flags are single digits and may be written without separators.
            let value = if kind == CommandKind::ArcTo && (index == 3 || index == 4) {
                tokens.flag()
            } else {
                tokens.number()
            };
            self.operands.push(value.ok_or(RasterizeError::EmptyPath)?);
        }
        Ok(())
    }

    /// Removes all commands and operands.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.operands.clear();
    }

    /// Whether the path has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The command list.
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// The flat operand sequence consumed by [`Self::commands`].
    pub fn operands(&self) -> &[f32] {
        &self.operands
    }

    fn push(&mut self, kind: CommandKind, operands: &[f32]) {
        debug_assert_eq!(operands.len(), kind.operand_count(), "operand count mismatch");
        self.commands.push(PathCommand {
            kind,
            relative: false,
        });
        self.operands.extend_from_slice(operands);
    }

    /// Starts a new sub-path at an absolute position.
    pub fn move_to(&mut self, x: f32, y: f32) {
        self.push(CommandKind::MoveTo, &[x, y]);
    }

    /// Adds an absolute line.
    pub fn line_to(&mut self, x: f32, y: f32) {
        self.push(CommandKind::LineTo, &[x, y]);
    }

    /// Adds an absolute quadratic Bézier.
    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.push(CommandKind::QuadTo, &[cx, cy, x, y]);
    }

    /// Adds an absolute cubic Bézier.
    pub fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.push(CommandKind::CurveTo, &[cx0, cy0, cx1, cy1, x, y]);
    }

    /// Adds an absolute elliptical arc. `x_rotation` is in degrees, as in SVG.
    pub fn arc_to(
        &mut self,
        rx: f32,
        ry: f32,
        x_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    ) {
        let large_arc = if large_arc { 1.0 } else { 0.0 };
        let sweep = if sweep { 1.0 } else { 0.0 };
        self.push(CommandKind::ArcTo, &[rx, ry, x_rotation, large_arc, sweep, x, y]);
    }

    /// Closes the current sub-path.
    pub fn close(&mut self) {
        self.push(CommandKind::ClosePath, &[]);
    }

    /// Iterates over the path as absolute segments.
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            commands: self.commands.iter(),
            operands: &self.operands,
            current: Point::ZERO,
            start: Point::ZERO,
            last_cubic_ctrl: None,
            last_quad_ctrl: None,
        }
    }

    /// Bounds of every on-curve and control point.
    ///
    /// Bézier curves lie inside the hull of their control points, so this is a conservative
    /// bound on the ink. Returns `None` for paths without any points.
    pub fn control_bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        let mut add = |p: Point| {
            bounds = Some(match bounds {
                Some(rect) => rect.union_pt(p),
                None => Rect::from_points(p, p),
            });
        };
        for segment in self.segments() {
            match segment {
                Segment::MoveTo(p) | Segment::LineTo(p) => add(p),
                Segment::QuadTo(c, p) => {
                    add(c);
                    add(p);
                }
                Segment::CubicTo(c0, c1, p) => {
                    add(c0);
                    add(c1);
                    add(p);
                }
                Segment::ArcTo(arc) => match arc.to_cubics() {
                    ArcApprox::Line(p) => add(p),
                    ArcApprox::Cubics(cubics) => {
                        for cubic in cubics {
                            add(cubic.p1);
                            add(cubic.p2);
                            add(cubic.p3);
                        }
                    }
                },
                Segment::Close => {}
            }
        }
        bounds
    }
}

/// An absolute path segment produced by [`SvgPath::segments`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    /// Start a new sub-path.
    MoveTo(Point),
    /// Line to the point.
    LineTo(Point),
    /// Quadratic Bézier with control point and end point.
    QuadTo(Point, Point),
    /// Cubic Bézier with two control points and end point.
    CubicTo(Point, Point, Point),
    /// Elliptical arc from the current point.
    ArcTo(SvgArc),
    /// Close the current sub-path back to its start.
    Close,
}

/// Iterator over the absolute segments of an [`SvgPath`].
///
/// Operands are consumed strictly front to back as commands are visited.
#[derive(Clone, Debug)]
pub struct Segments<'a> {
    commands: core::slice::Iter<'a, PathCommand>,
    operands: &'a [f32],
    current: Point,
    start: Point,
    last_cubic_ctrl: Option<Point>,
    last_quad_ctrl: Option<Point>,
}

impl<'a> Segments<'a> {
    fn take_operands(&mut self, count: usize) -> Option<&'a [f32]> {
        let operands = self.operands;
        if operands.len() < count {
            return None;
        }
        let (head, rest) = operands.split_at(count);
        self.operands = rest;
        Some(head)
    }

    fn point(&self, relative: bool, x: f32, y: f32) -> Point {
        let p = Point::new(f64::from(x), f64::from(y));
        if relative {
            p + self.current.to_vec2()
        } else {
            p
        }
    }
}

impl Iterator for Segments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let command = *self.commands.next()?;
        let relative = command.relative;
        let Some(ops) = self.take_operands(command.kind.operand_count()) else {
            debug_assert!(false, "operand sequence shorter than commands");
            return None;
        };
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        let segment = match command.kind {
            CommandKind::MoveTo => {
                let p = self.point(relative, ops[0], ops[1]);
                self.start = p;
                Segment::MoveTo(p)
            }
            CommandKind::LineTo => Segment::LineTo(self.point(relative, ops[0], ops[1])),
            CommandKind::HorizLineTo => {
                let x = f64::from(ops[0]);
                let x = if relative { self.current.x + x } else { x };
                Segment::LineTo(Point::new(x, self.current.y))
            }
            CommandKind::VertLineTo => {
                let y = f64::from(ops[0]);
                let y = if relative { self.current.y + y } else { y };
                Segment::LineTo(Point::new(self.current.x, y))
            }
            CommandKind::CurveTo => {
                let c0 = self.point(relative, ops[0], ops[1]);
                let c1 = self.point(relative, ops[2], ops[3]);
                let p = self.point(relative, ops[4], ops[5]);
                cubic_ctrl = Some(c1);
                Segment::CubicTo(c0, c1, p)
            }
            CommandKind::SmoothCurveTo => {
                let c0 = reflect(self.last_cubic_ctrl, self.current);
                let c1 = self.point(relative, ops[0], ops[1]);
                let p = self.point(relative, ops[2], ops[3]);
                cubic_ctrl = Some(c1);
                Segment::CubicTo(c0, c1, p)
            }
            CommandKind::QuadTo => {
                let c = self.point(relative, ops[0], ops[1]);
                let p = self.point(relative, ops[2], ops[3]);
                quad_ctrl = Some(c);
                Segment::QuadTo(c, p)
            }
            CommandKind::SmoothQuadTo => {
                let c = reflect(self.last_quad_ctrl, self.current);
                let p = self.point(relative, ops[0], ops[1]);
                quad_ctrl = Some(c);
                Segment::QuadTo(c, p)
            }
            CommandKind::ArcTo => {
                let to = self.point(relative, ops[5], ops[6]);
                Segment::ArcTo(SvgArc {
                    from: self.current,
                    to,
                    radii: Vec2::new(f64::from(ops[0]), f64::from(ops[1])),
                    x_rotation: f64::from(ops[2]).to_radians(),
                    large_arc: ops[3] != 0.0,
                    sweep: ops[4] != 0.0,
                })
            }
            CommandKind::ClosePath => Segment::Close,
        };

        self.current = match segment {
            Segment::MoveTo(p)
            | Segment::LineTo(p)
            | Segment::QuadTo(_, p)
            | Segment::CubicTo(_, _, p) => p,
            Segment::ArcTo(arc) => arc.to,
            Segment::Close => self.start,
        };
        self.last_cubic_ctrl = cubic_ctrl;
        self.last_quad_ctrl = quad_ctrl;
        Some(segment)
    }
}

/// Mirrors the previous control point around the current point, or returns the current point
/// when the previous segment was not of the matching kind.
fn reflect(ctrl: Option<Point>, current: Point) -> Point {
    match ctrl {
        Some(c) => current + (current - c),
        None => current,
    }
}

struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Tokenizer<'_> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_separators(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn skip_digits(&mut self) -> usize {
        let begin = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - begin
    }

    fn number(&mut self) -> Option<f32> {
        self.skip_separators();
        let begin = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut digits = self.skip_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            digits += self.skip_digits();
        }
        if digits == 0 {
            self.pos = begin;
            return None;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mantissa_end = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.skip_digits() == 0 {
                // Not an exponent after all.
                self.pos = mantissa_end;
            }
        }
        let text = core::str::from_utf8(&self.data[begin..self.pos]).ok()?;
        let value: f32 = text.parse().ok()?;
        value.is_finite().then_some(value)
    }

    fn flag(&mut self) -> Option<f32> {
        self.skip_separators();
        let value = match self.peek()? {
            b'0' => 0.0,
            b'1' => 1.0,
            _ => return None,
        };
        self.pos += 1;
        Some(value)
    }
}
