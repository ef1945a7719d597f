//! Footprint masking of sample points
//!
//! Removes the points that fall on a polygon footprint, leaving the donor
//! points that surround it. A point on the footprint boundary counts as
//! inside and is removed.

use geo::{BoundingRect, Intersects, MultiPolygon, Point};

use crate::interpolation::SamplePoint;

/// Keep only the points that do not intersect `footprint`.
pub fn remove_within(points: Vec<SamplePoint>, footprint: &MultiPolygon<f64>) -> Vec<SamplePoint> {
    let Some(bbox) = footprint.bounding_rect() else {
        return points;
    };
    let (min, max) = (bbox.min(), bbox.max());

    points
        .into_iter()
        .filter(|p| {
            let in_box = p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
            !(in_box && footprint.intersects(&Point::new(p.x, p.y)))
        })
        .collect()
}

/// True if any point intersects `footprint`.
pub fn any_within(points: &[SamplePoint], footprint: &MultiPolygon<f64>) -> bool {
    points
        .iter()
        .any(|p| footprint.intersects(&Point::new(p.x, p.y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn footprint() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 2.0, y: 2.0),
            (x: 5.0, y: 2.0),
            (x: 5.0, y: 5.0),
            (x: 2.0, y: 5.0),
            (x: 2.0, y: 2.0),
        ]])
    }

    fn grid_points() -> Vec<SamplePoint> {
        let mut pts = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                pts.push(SamplePoint::new(i as f64 + 0.5, j as f64 + 0.5, 1.0));
            }
        }
        pts
    }

    #[test]
    fn test_points_inside_removed() {
        let fp = footprint();
        let donors = remove_within(grid_points(), &fp);

        // Centers 2.5, 3.5, 4.5 in each axis fall inside: 9 removed
        assert_eq!(donors.len(), 64 - 9);
        assert!(!any_within(&donors, &fp));
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let fp = footprint();
        let pts = vec![
            SamplePoint::new(2.0, 3.0, 1.0),
            SamplePoint::new(5.0, 5.0, 1.0),
            SamplePoint::new(5.5, 3.0, 1.0),
        ];
        let donors = remove_within(pts, &fp);
        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].x, 5.5);
    }

    #[test]
    fn test_hole_points_are_kept() {
        let fp = MultiPolygon::new(vec![polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 8.0, y: 0.0),
                (x: 8.0, y: 8.0),
                (x: 0.0, y: 8.0),
                (x: 0.0, y: 0.0),
            ],
            interiors: [[
                (x: 3.0, y: 3.0),
                (x: 5.0, y: 3.0),
                (x: 5.0, y: 5.0),
                (x: 3.0, y: 5.0),
                (x: 3.0, y: 3.0),
            ]],
        )]);
        let donors = remove_within(grid_points(), &fp);
        assert_eq!(donors.len(), 4);
        assert!(donors.iter().all(|p| p.x > 3.0 && p.x < 5.0));
    }

    #[test]
    fn test_empty_footprint_keeps_everything() {
        let fp: MultiPolygon<f64> = MultiPolygon::new(vec![]);
        assert_eq!(remove_within(grid_points(), &fp).len(), 64);
    }
}
