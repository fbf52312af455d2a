use glam::{UVec2, Vec2};

/// An axis-aligned rectangle in screen space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub const ZERO: Self = Self {
        min: Vec2::ZERO,
        max: Vec2::ZERO,
    };

    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            min: Vec2::new(left, top),
            max: Vec2::new(right, bottom),
        }
    }

    /// The rectangle spanning the origin and `size`.
    pub fn from_size(size: UVec2) -> Self {
        Self {
            min: Vec2::ZERO,
            max: size.as_vec2(),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn intersection(&self, other: Self) -> Option<Self> {
        let rect = Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };

        if rect.is_empty() {
            return None;
        }

        Some(rect)
    }

    /// Whether the closed rectangles share at least one point.
    pub fn intersects(&self, other: Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn union(&self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::Rect;

    #[test]
    fn rect_intersection() {
        let a = Rect::from_ltrb(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_ltrb(5.0, 5.0, 20.0, 20.0);

        assert_eq!(a.intersection(b), Some(Rect::from_ltrb(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn rect_intersection_disjoint() {
        let a = Rect::from_ltrb(0.0, 0.0, 10.0, 10.0);

        // Disjoint on one axis and on both.
        assert_eq!(a.intersection(Rect::from_ltrb(20.0, 0.0, 30.0, 10.0)), None);
        assert_eq!(a.intersection(Rect::from_ltrb(20.0, 20.0, 30.0, 30.0)), None);
    }

    #[test]
    fn rect_degenerate_is_empty() {
        assert!(Rect::from_ltrb(5.0, 0.0, 5.0, 10.0).is_empty());
        assert!(Rect::from_ltrb(0.0, 5.0, 10.0, 5.0).is_empty());
        assert!(!Rect::from_ltrb(0.0, 0.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn rect_union_accumulates() {
        let a = Rect::new(Vec2::new(2.0, 3.0), Vec2::new(4.0, 5.0));
        let b = Rect::new(Vec2::new(-1.0, 4.0), Vec2::new(3.0, 9.0));

        assert_eq!(a.union(b), Rect::new(Vec2::new(-1.0, 3.0), Vec2::new(4.0, 9.0)));
    }
}
