/// Geometry primitives: a 2D value vector and axis-aligned rectangles.
///
/// All positions are in world pixels, top-left origin, y pointing down.

use std::ops::{Add, Mul, Sub};

use rand::Rng;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Vector2 { x, y }
    }

    pub fn magnitude(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalized(self) -> Self {
        let len = self.magnitude();
        if len == 0.0 {
            Vector2::ZERO
        } else {
            Vector2::new(self.x / len, self.y / len)
        }
    }

    pub fn distance(self, other: Vector2) -> f64 {
        (self - other).magnitude()
    }

    /// One of the eight compass directions, or zero when both draws hit 0.
    pub fn random_dir<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let x = rng.random_range(-1i32..=1) as f64;
        let y = rng.random_range(-1i32..=1) as f64;
        Vector2::new(x, y).normalized()
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, k: f64) -> Vector2 {
        Vector2::new(self.x * k, self.y * k)
    }
}

/// Clamp `value` into `[min, max]`. When the range is inverted
/// (entity larger than the map) `min` wins.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

// ── Rect ──

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn at(pos: Vector2, width: f64, height: f64) -> Self {
        Rect::new(pos.x, pos.y, width, height)
    }

    pub fn pos(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translated(&self, by: Vector2) -> Rect {
        Rect::new(self.x + by.x, self.y + by.y, self.width, self.height)
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vector2::ZERO.normalized(), Vector2::ZERO);
    }

    #[test]
    fn normalize_has_unit_length() {
        let v = Vector2::new(3.0, -4.0).normalized();
        assert!((v.magnitude() - 1.0).abs() < 1e-12);
        assert!((v.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn random_dir_is_unit_or_zero() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            let m = Vector2::random_dir(&mut rng).magnitude();
            assert!(m == 0.0 || (m - 1.0).abs() < 1e-12, "magnitude {m}");
        }
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 32.0, 32.0);
        let b = Rect::new(32.0, 0.0, 32.0, 32.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Rect::new(31.5, 31.5, 1.0, 1.0)));
    }

    #[test]
    fn clamp_prefers_min_on_inverted_range() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(11.0, 0.0, 10.0), 10.0);
        assert_eq!(clamp(3.0, 0.0, -2.0), 0.0);
    }
}
