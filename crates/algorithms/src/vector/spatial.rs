//! Geometry helpers: extents and polygon normalization

use geo::{BoundingRect, Geometry, MultiPolygon};
use slumpdod_core::{Error, Extent, Result};

/// Axis-aligned extent of a geometry, `None` for empty geometries.
pub fn extent_of(geometry: &MultiPolygon<f64>) -> Option<Extent> {
    geometry.bounding_rect().map(Extent::from)
}

/// Normalize a polygonal geometry to a `MultiPolygon`.
///
/// Polygons and multipolygons are accepted, single-member geometry
/// collections are unwrapped; anything else is `InvalidGeometry`.
pub fn to_multi_polygon(geometry: Geometry<f64>) -> Result<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        Geometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::GeometryCollection(mut gc) if gc.0.len() == 1 => {
            let inner = gc.0.remove(0);
            to_multi_polygon(inner)
        }
        other => Err(Error::InvalidGeometry(format!(
            "expected a polygon, found {}",
            geometry_kind(&other)
        ))),
    }
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{line_string, point, polygon, GeometryCollection};

    #[test]
    fn test_extent_of_multipolygon() {
        let mp = MultiPolygon::new(vec![
            polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 0.0)],
            polygon![(x: 5.0, y: 5.0), (x: 7.0, y: 5.0), (x: 7.0, y: 9.0), (x: 5.0, y: 5.0)],
        ]);
        let ext = extent_of(&mp).unwrap();
        assert_relative_eq!(ext.min_x, 0.0);
        assert_relative_eq!(ext.min_y, 0.0);
        assert_relative_eq!(ext.max_x, 7.0);
        assert_relative_eq!(ext.max_y, 9.0);
    }

    #[test]
    fn test_extent_of_empty() {
        assert!(extent_of(&MultiPolygon::new(vec![])).is_none());
    }

    #[test]
    fn test_polygon_normalized() {
        let p = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];
        let mp = to_multi_polygon(Geometry::Polygon(p)).unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn test_single_member_collection_unwrapped() {
        let p = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];
        let gc = GeometryCollection::new_from(vec![Geometry::Polygon(p)]);
        assert!(to_multi_polygon(Geometry::GeometryCollection(gc)).is_ok());
    }

    #[test]
    fn test_non_polygons_rejected() {
        let err = to_multi_polygon(Geometry::Point(point!(x: 1.0, y: 2.0))).unwrap_err();
        assert!(err.to_string().contains("Point"));

        let ls = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert!(matches!(
            to_multi_polygon(Geometry::LineString(ls)),
            Err(Error::InvalidGeometry(_))
        ));
    }
}
