use crate::error::ScalarError;
use crate::scalar::Scalar;
use std::cmp::Ordering;
use std::fmt;

/// A site or vertex in canvas coordinates.
#[derive(Clone, Debug, Default)]
pub struct Point {
    pub x: Scalar,
    pub y: Scalar,
}

impl Point {
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    pub fn from_f64(x: f64, y: f64) -> Result<Self, ScalarError> {
        Ok(Self::new(Scalar::from_f64(x)?, Scalar::from_f64(y)?))
    }

    pub fn distance_squared(&self, other: &Point) -> Scalar {
        let dx = &self.x - &other.x;
        let dy = &self.y - &other.y;
        &dx * &dx + &dy * &dy
    }

    pub fn to_f64(&self) -> [f64; 2] {
        [self.x.to_f64(), self.y.to_f64()]
    }
}

impl<T: Into<Scalar>> From<(T, T)> for Point {
    fn from((x, y): (T, T)) -> Self {
        Point::new(x.into(), y.into())
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Point) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A bounded straight segment between two points.
///
/// The endpoints are stored in order but equality ignores orientation.
#[derive(Clone, Debug)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
}

impl Segment {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn x1(&self) -> &Scalar {
        &self.p1.x
    }

    pub fn y1(&self) -> &Scalar {
        &self.p1.y
    }

    pub fn x2(&self) -> &Scalar {
        &self.p2.x
    }

    pub fn y2(&self) -> &Scalar {
        &self.p2.y
    }

    pub fn endpoints(&self) -> [&Point; 2] {
        [&self.p1, &self.p2]
    }

    pub fn has_endpoint(&self, p: &Point) -> bool {
        self.p1 == *p || self.p2 == *p
    }

    pub fn length_squared(&self) -> Scalar {
        self.p1.distance_squared(&self.p2)
    }

    /// Whether `p` lies in the bounding box of the segment, endpoints included with tolerance.
    fn spans(&self, p: &Point) -> bool {
        let (lo_x, hi_x) = (self.x1().min(self.x2()), self.x1().max(self.x2()));
        let (lo_y, hi_y) = (self.y1().min(self.y2()), self.y1().max(self.y2()));
        p.x.cmp_margin(lo_x) != Ordering::Less
            && p.x.cmp_margin(hi_x) != Ordering::Greater
            && p.y.cmp_margin(lo_y) != Ordering::Less
            && p.y.cmp_margin(hi_y) != Ordering::Greater
    }

    /// Intersection of the two infinite lines, or `None` when they are parallel.
    pub fn line_intersection(&self, other: &Segment) -> Option<Point> {
        let (x1, y1, x2, y2) = (self.x1(), self.y1(), self.x2(), self.y2());
        let (x3, y3, x4, y4) = (other.x1(), other.y1(), other.x2(), other.y2());

        let dx12 = x1 - x2;
        let dy12 = y1 - y2;
        let dx34 = x3 - x4;
        let dy34 = y3 - y4;

        let den = &dx12 * &dy34 - &dy12 * &dx34;
        if den.is_zero() {
            return None;
        }

        let a = x1 * y2 - y1 * x2;
        let b = x3 * y4 - y3 * x4;
        let px = (&a * &dx34 - &dx12 * &b).checked_div(&den).ok()?;
        let py = (&a * &dy34 - &dy12 * &b).checked_div(&den).ok()?;
        Some(Point::new(px, py))
    }

    /// Crossing point of the two segments, if it falls within both extents.
    pub fn intersection_point(&self, other: &Segment) -> Option<Point> {
        self.line_intersection(other)
            .filter(|p| self.spans(p) && other.spans(p))
    }

    pub fn intersects(&self, other: &Segment) -> bool {
        self.intersection_point(other).is_some()
    }

    /// Perpendicular distance from `p` to the infinite line through the segment.
    pub fn distance_to(&self, p: &Point) -> Result<Scalar, ScalarError> {
        let dx = self.x2() - self.x1();
        let dy = self.y2() - self.y1();
        let length = (&dx * &dx + &dy * &dy).sqrt()?;
        let cross = (&dx * &(self.y1() - &p.y) - &(self.x1() - &p.x) * &dy).abs();
        cross.checked_div(&length)
    }

    /// Whether `p` lies on the segment, within tolerance.
    pub fn contains(&self, p: &Point) -> bool {
        match self.distance_to(p) {
            Ok(d) => d.is_zero() && self.spans(p),
            // a zero-length segment only contains its own endpoint
            Err(_) => self.p1 == *p,
        }
    }

    pub fn to_f64(&self) -> [[f64; 2]; 2] {
        [self.p1.to_f64(), self.p2.to_f64()]
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Segment) -> bool {
        (self.p1 == other.p1 && self.p2 == other.p2) || (self.p1 == other.p2 && self.p2 == other.p1)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} -> {}]", self.p1, self.p2)
    }
}
