//! Axis-aligned extents in map units

use geo_types::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned bounding rectangle (min/max X/Y) in map units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// An extent with no positive area
    pub fn is_empty(&self) -> bool {
        !(self.max_x > self.min_x && self.max_y > self.min_y)
    }
}

impl From<Rect<f64>> for Extent {
    fn from(rect: Rect<f64>) -> Self {
        Extent::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Space-separated `XMin YMin XMax YMax`, the form used in progress logs
impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    #[test]
    fn test_degenerate_extents_are_empty() {
        assert!(!Extent::new(1.0, 2.0, 5.0, 8.0).is_empty());
        assert!(Extent::new(2.0, 2.0, 2.0, 5.0).is_empty());
        assert!(Extent::new(5.0, 0.0, 1.0, 3.0).is_empty());
        assert!(Extent::new(f64::NAN, 0.0, 1.0, 3.0).is_empty());
    }

    #[test]
    fn test_from_rect() {
        let rect = Rect::new(coord! { x: 4.0, y: 8.0 }, coord! { x: 1.0, y: 2.0 });
        assert_eq!(Extent::from(rect), Extent::new(1.0, 2.0, 4.0, 8.0));
    }

    #[test]
    fn test_display() {
        let e = Extent::new(1.0, 2.5, 3.0, 4.0);
        assert_eq!(e.to_string(), "1 2.5 3 4");
    }
}
