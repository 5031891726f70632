/// 2D point with floating point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Translate point by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Vector from `other` to `self`
    pub fn sub(&self, other: &Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Component-wise sum
    pub fn add(&self, other: &Point) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Scale both components
    pub fn scale(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Dot product, treating both points as vectors
    pub fn dot(&self, other: &Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product, treating both points as vectors
    pub fn cross(&self, other: &Point) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Euclidean norm
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len <= f32::EPSILON {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len))
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1)
    pub fn lerp(&self, other: &Point, t: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_ops() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, 0.0);
        assert!((a.length() - 5.0).abs() < 1e-6);
        assert!((a.dot(&b) - 3.0).abs() < 1e-6);
        assert!((b.cross(&a) - 4.0).abs() < 1e-6);
        let n = a.normalized().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!(Point::default().normalized().is_none());
    }

    #[test]
    fn test_lerp() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, -10.0);
        assert_eq!(a.lerp(&b, 0.5), Point::new(5.0, -5.0));
    }
}
