//! Point records sorted by the terrain pipelines.

/// Plan coordinates of a point-like record.
pub trait XYPoint {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Triangulation point: coordinates plus the index of the point it was loaded as.
///
/// `id` is not part of the ordering, it lets callers observe where each point ended up.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TinPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub id: u32,
}

impl TinPoint {
    pub const fn new(x: f64, y: f64, z: f64, id: u32) -> Self {
        Self { x, y, z, id }
    }
}

impl XYPoint for Point2D {
    #[inline]
    fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    fn y(&self) -> f64 {
        self.y
    }
}

impl XYPoint for Point3D {
    #[inline]
    fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    fn y(&self) -> f64 {
        self.y
    }
}

impl XYPoint for TinPoint {
    #[inline]
    fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    fn y(&self) -> f64 {
        self.y
    }
}

impl XYPoint for (f64, f64) {
    #[inline]
    fn x(&self) -> f64 {
        self.0
    }

    #[inline]
    fn y(&self) -> f64 {
        self.1
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}
