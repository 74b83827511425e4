use std::fmt;

/// A city of the instance.
///
/// `id` labels the city in reports; two points are equal when their
/// coordinates are equal, whatever their ids.
#[derive(Clone, Copy, Debug)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub id: usize,
}

impl Point {
    pub fn new(x: f64, y: f64, id: usize) -> Self {
        Self { x, y, id }
    }

    #[inline]
    pub fn dist(&self, rhs: &Self) -> f64 {
        let dx = self.x - rhs.x;
        let dy = self.y - rhs.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut b1 = ryu::Buffer::new();
        let mut b2 = ryu::Buffer::new();
        write!(f, "{}:{},{}", self.id, b1.format(self.x), b2.format(self.y))
    }
}
