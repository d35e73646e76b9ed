use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point { Point::new(self.x + rhs.x, self.y + rhs.y) }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point { Point::new(self.x - rhs.x, self.y - rhs.y) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size { width: 0.0, height: 0.0 };

    pub fn new(width: f64, height: f64) -> Self { Self { width, height } }

    /// Component-wise maximum.
    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

/// Axis-aligned rectangle. Persisted as `{x, y, w, h}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "width")]
    pub w: f64,
    #[serde(alias = "height")]
    pub h: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect { x: 0.0, y: 0.0, w: 0.0, h: 0.0 };

    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self { Self { x, y, w, h } }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    pub fn size(&self) -> Size { Size::new(self.w, self.h) }

    pub fn max_x(&self) -> f64 { self.x + self.w }

    pub fn max_y(&self) -> f64 { self.y + self.h }

    pub fn mid(&self) -> Point { Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0) }

    /// Half-open on the far edges, so adjacent rectangles never both claim a point.
    pub fn contains(&self, p: Point) -> bool {
        self.x <= p.x && p.x < self.max_x() && self.y <= p.y && p.y < self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect { Rect::new(self.x + dx, self.y + dy, self.w, self.h) }

    pub fn with_size(&self, size: Size) -> Rect { Rect::from_parts(self.origin(), size) }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    fn round(&self) -> Self {
        let x = self.x.round();
        let y = self.y.round();
        Rect::new(x, y, (self.max_x().round() - x).max(0.0), (self.max_y().round() - y).max(0.0))
    }
}

pub trait SameAs {
    fn same_as(&self, other: &Self) -> bool;
}

const EPSILON: f64 = 0.1;

impl SameAs for f64 {
    fn same_as(&self, other: &f64) -> bool { (self - other).abs() < EPSILON }
}

impl SameAs for Point {
    fn same_as(&self, other: &Point) -> bool { self.x.same_as(&other.x) && self.y.same_as(&other.y) }
}

impl SameAs for Size {
    fn same_as(&self, other: &Size) -> bool {
        self.width.same_as(&other.width) && self.height.same_as(&other.height)
    }
}

impl SameAs for Rect {
    fn same_as(&self, other: &Rect) -> bool {
        self.origin().same_as(&other.origin()) && self.size().same_as(&other.size())
    }
}

/// 2x2 linear part plus translation, mapping `(x, y)` to
/// `(a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Matrix {
    fn default() -> Self { Self::IDENTITY }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    pub fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn translation(tx: f64, ty: f64) -> Self { Self { tx, ty, ..Self::IDENTITY } }

    pub fn scaling(sx: f64, sy: f64) -> Self { Self { a: sx, d: sy, ..Self::IDENTITY } }

    pub fn is_identity(&self) -> bool { *self == Self::IDENTITY }

    /// `self` followed by `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            tx: self.tx * other.a + self.ty * other.c + other.tx,
            ty: self.tx * other.b + self.ty * other.d + other.ty,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Matrix {
        Matrix { tx: self.tx + dx, ty: self.ty + dy, ..*self }
    }

    pub fn scale(&self, sx: f64, sy: f64) -> Matrix { self.concat(&Matrix::scaling(sx, sy)) }

    /// A singular linear part collapses to a pure inverse translation.
    pub fn invert(&self) -> Matrix {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 || !det.is_finite() {
            return Matrix::translation(-self.tx, -self.ty);
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Matrix {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + c * self.ty),
            ty: -(b * self.tx + d * self.ty),
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    pub fn delta_transform_point(&self, p: Point) -> Point {
        Point::new(self.a * p.x + self.c * p.y, self.b * p.x + self.d * p.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(29.9, 29.9)));
        assert!(!r.contains(Point::new(30.0, 15.0)));
        assert!(!r.contains(Point::new(15.0, 30.0)));
        assert!(!r.contains(Point::new(9.9, 15.0)));
    }

    #[test]
    fn contains_rect_checks_all_edges() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains_rect(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(outer.contains_rect(&Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!outer.contains_rect(&Rect::new(90.0, 10.0, 20.0, 20.0)));
    }

    #[test]
    fn invert_undoes_translate_and_scale() {
        let m = Matrix::scaling(2.0, 4.0).translate(10.0, -5.0);
        let p = Point::new(3.0, 7.0);
        let mapped = m.transform_point(p);
        assert_eq!(mapped, Point::new(16.0, 23.0));
        assert!(m.invert().transform_point(mapped).same_as(&p));
    }

    #[test]
    fn concat_applies_left_then_right() {
        let scale = Matrix::scaling(2.0, 2.0);
        let shift = Matrix::translation(5.0, 5.0);
        let p = Point::new(1.0, 1.0);
        assert_eq!(scale.concat(&shift).transform_point(p), Point::new(7.0, 7.0));
        assert_eq!(shift.concat(&scale).transform_point(p), Point::new(12.0, 12.0));
    }

    #[test]
    fn singular_matrix_inverts_to_translation() {
        let m = Matrix::new(0.0, 0.0, 0.0, 0.0, 3.0, 4.0);
        assert_eq!(m.invert(), Matrix::translation(-3.0, -4.0));
    }

    #[test]
    fn round_snaps_edges() {
        let r = Rect::new(0.4, 0.6, 10.2, 10.0).round();
        assert_eq!(r, Rect::new(0.0, 1.0, 11.0, 10.0));
    }
}
