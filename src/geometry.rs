//! Planar geometry over landmark coordinates.
//!
//! Two interior-angle formulas exist side by side. The alignment rule family
//! measures joints with [`angle`] (difference of `atan2` headings), the
//! tracking rule family with [`angle_acos`] (dot product). Both return degrees
//! in `[0, 180]` and both return exactly `0.0` for a degenerate triple.

use crate::landmark::Landmark;

/// Anything with a 2-D position.
pub trait Point2 {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
}

impl Point2 for Landmark {
    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

impl Point2 for (f64, f64) {
    fn x(&self) -> f64 {
        self.0
    }

    fn y(&self) -> f64 {
        self.1
    }
}

/// Interior angle at vertex `b` between rays `b→a` and `b→c`, via `atan2`.
///
/// The heading difference is folded into `[0, 180]` by reflecting anything
/// above 180 as `360 - angle`.
pub fn angle<P: Point2 + ?Sized>(a: &P, b: &P, c: &P) -> f64 {
    if is_degenerate(a, b, c) {
        return 0.0;
    }
    let radians = (c.y() - b.y()).atan2(c.x() - b.x()) - (a.y() - b.y()).atan2(a.x() - b.x());
    let mut degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// Interior angle at vertex `b` via the dot product of `a→b` and `c→b`.
pub fn angle_acos<P: Point2 + ?Sized>(a: &P, b: &P, c: &P) -> f64 {
    let ab = (b.x() - a.x(), b.y() - a.y());
    let cb = (b.x() - c.x(), b.y() - c.y());
    let dot = ab.0 * cb.0 + ab.1 * cb.1;
    let mag = ab.0.hypot(ab.1) * cb.0.hypot(cb.1);
    if mag == 0.0 {
        return 0.0;
    }
    // Rounding can push the cosine a hair outside [-1, 1].
    (dot / mag).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Euclidean distance in the x/y plane.
pub fn distance<P: Point2 + ?Sized>(p: &P, q: &P) -> f64 {
    (p.x() - q.x()).hypot(p.y() - q.y())
}

/// Absolute heading of the hip→ankle segment in degrees.
///
/// Only a coarse proxy for how far the stance is rotated; it is not a foot
/// orientation measurement.
pub fn foot_angle<P: Point2 + ?Sized>(hip: &P, ankle: &P) -> f64 {
    (ankle.y() - hip.y())
        .atan2(ankle.x() - hip.x())
        .to_degrees()
        .abs()
}

/// Midpoint of two points.
pub fn midpoint<P: Point2 + ?Sized>(p: &P, q: &P) -> (f64, f64) {
    ((p.x() + q.x()) / 2.0, (p.y() + q.y()) / 2.0)
}

fn is_degenerate<P: Point2 + ?Sized>(a: &P, b: &P, c: &P) -> bool {
    same_point(a, b) || same_point(c, b)
}

fn same_point<P: Point2 + ?Sized>(p: &P, q: &P) -> bool {
    p.x() == q.x() && p.y() == q.y()
}
