use crate::error::{DiagramError, DiagramResult};
use crate::geometry::{Point, Segment};
use crate::scalar::Scalar;

/// One of the four sides of the canvas. `y = 0` is the top side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Top, Side::Right, Side::Bottom];

    pub fn index(&self) -> usize {
        match self {
            Side::Left => 0,
            Side::Top => 1,
            Side::Right => 2,
            Side::Bottom => 3,
        }
    }

    /// Coordinate that varies along this side.
    pub fn along<'a>(&self, p: &'a Point) -> &'a Scalar {
        match self {
            Side::Left | Side::Right => &p.y,
            Side::Top | Side::Bottom => &p.x,
        }
    }
}

/// One of the four canvas corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn index(&self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomLeft => 2,
            Corner::BottomRight => 3,
        }
    }

    /// The two sides meeting at this corner.
    pub fn sides(&self) -> [Side; 2] {
        match self {
            Corner::TopLeft => [Side::Left, Side::Top],
            Corner::TopRight => [Side::Top, Side::Right],
            Corner::BottomLeft => [Side::Left, Side::Bottom],
            Corner::BottomRight => [Side::Right, Side::Bottom],
        }
    }
}

/// Small set of corners, stored as a bit mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CornerSet(u8);

impl CornerSet {
    pub fn all() -> Self {
        CornerSet(0b1111)
    }

    pub fn insert(&mut self, corner: Corner) {
        self.0 |= 1 << corner.index();
    }

    pub fn contains(&self, corner: Corner) -> bool {
        self.0 & (1 << corner.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Corner> + '_ {
        Corner::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Corner> for CornerSet {
    fn from_iter<I: IntoIterator<Item = Corner>>(iter: I) -> Self {
        let mut set = CornerSet::default();
        for corner in iter {
            set.insert(corner);
        }
        set
    }
}

/// The rectangular drawing region `[0, width] x [0, height]`.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    w: Scalar,
    h: Scalar,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> DiagramResult<Self> {
        if width == 0 || height == 0 {
            return Err(DiagramError::InvalidInput(format!(
                "canvas dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            w: Scalar::from(width),
            h: Scalar::from(height),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width_scalar(&self) -> &Scalar {
        &self.w
    }

    pub fn height_scalar(&self) -> &Scalar {
        &self.h
    }

    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::TopLeft => Point::new(Scalar::zero(), Scalar::zero()),
            Corner::TopRight => Point::new(self.w.clone(), Scalar::zero()),
            Corner::BottomLeft => Point::new(Scalar::zero(), self.h.clone()),
            Corner::BottomRight => Point::new(self.w.clone(), self.h.clone()),
        }
    }

    pub fn on_side(&self, side: Side, p: &Point) -> bool {
        match side {
            Side::Left => p.x.is_zero(),
            Side::Top => p.y.is_zero(),
            Side::Right => p.x == self.w,
            Side::Bottom => p.y == self.h,
        }
    }

    /// Sides the point lies on: none for interior points, two for corners.
    pub fn sides_of<'a>(&'a self, p: &'a Point) -> impl Iterator<Item = Side> + 'a {
        Side::ALL.into_iter().filter(move |side| self.on_side(*side, p))
    }

    pub fn on_border(&self, p: &Point) -> bool {
        self.sides_of(p).next().is_some()
    }

    /// The four canvas edges, right side first.
    pub fn border_edges(&self) -> Vec<Segment> {
        vec![
            Segment::new(self.corner(Corner::TopRight), self.corner(Corner::BottomRight)),
            Segment::new(self.corner(Corner::TopLeft), self.corner(Corner::TopRight)),
            Segment::new(self.corner(Corner::TopLeft), self.corner(Corner::BottomLeft)),
            Segment::new(self.corner(Corner::BottomLeft), self.corner(Corner::BottomRight)),
        ]
    }
}
