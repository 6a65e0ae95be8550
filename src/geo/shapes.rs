//! Query shapes: coordinates, bounding boxes and route buffers
//!
//! The in-process repository evaluates these shapes directly; the PostgreSQL
//! repository hands the same parameters to PostGIS.

use geo::{coord, EuclideanDistance, Intersects, Line, Point, Rect};
use serde::{Deserialize, Serialize};

use super::GeoError;

/// Mean earth radius in metres
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn validate(&self) -> Result<(), GeoError> {
        let in_range = (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng);
        if in_range {
            Ok(())
        } else {
            Err(GeoError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

/// Axis-aligned box; x is longitude and y is latitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Same box with each axis ordered low to high
    ///
    /// Corners given in either order describe the same box, matching how
    /// `ST_MakeEnvelope` treats them.
    pub fn normalized(&self) -> Self {
        let (min_x, max_x) = if self.min_x > self.max_x {
            (self.max_x, self.min_x)
        } else {
            (self.min_x, self.max_x)
        };
        let (min_y, max_y) = if self.min_y > self.max_y {
            (self.max_y, self.min_y)
        } else {
            (self.min_y, self.max_y)
        };
        Self::new(min_x, min_y, max_x, max_y)
    }

    /// Reject boxes with a non-finite corner
    pub fn validate(&self) -> Result<(), GeoError> {
        let finite = [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite());

        if !finite {
            return Err(GeoError::InvalidBox {
                min_x: self.min_x,
                min_y: self.min_y,
                max_x: self.max_x,
                max_y: self.max_y,
            });
        }
        Ok(())
    }

    /// Boundary points count as inside
    pub fn contains(&self, point: Coordinate) -> bool {
        let rect = Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        );
        rect.intersects(&coord! { x: point.lng, y: point.lat })
    }
}

/// Corridor of `buffer_m` metres around the segment from `a` to `b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteBuffer {
    pub a: Coordinate,
    pub b: Coordinate,
    pub buffer_m: f64,
}

impl RouteBuffer {
    pub fn new(a: Coordinate, b: Coordinate, buffer_m: f64) -> Self {
        Self { a, b, buffer_m }
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        self.a.validate()?;
        self.b.validate()?;
        if !self.buffer_m.is_finite() || self.buffer_m < 0.0 {
            return Err(GeoError::InvalidBuffer {
                buffer: self.buffer_m,
            });
        }
        Ok(())
    }

    /// Approximate distance in metres from `point` to the segment
    ///
    /// Uses an equirectangular projection centred on the segment midpoint,
    /// which is accurate for corridors of a few hundred kilometres.
    pub fn distance_m(&self, point: Coordinate) -> f64 {
        let lat_mid = (self.a.lat + self.b.lat) / 2.0;
        let lng_mid = (self.a.lng + self.b.lng) / 2.0;
        let scale_x = lat_mid.to_radians().cos() * EARTH_RADIUS_M;

        let project = |c: Coordinate| {
            let x = (c.lng - lng_mid).to_radians() * scale_x;
            let y = (c.lat - lat_mid).to_radians() * EARTH_RADIUS_M;
            coord! { x: x, y: y }
        };

        let segment = Line::new(project(self.a), project(self.b));
        Point::from(project(point)).euclidean_distance(&segment)
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        self.distance_m(point) <= self.buffer_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_contains_inclusive() {
        let bbox = BoundingBox::new(11.0, 57.0, 12.0, 58.0);
        assert!(bbox.contains(Coordinate::new(57.5, 11.5)));
        assert!(bbox.contains(Coordinate::new(57.0, 11.0)));
        assert!(!bbox.contains(Coordinate::new(56.9, 11.5)));
        assert!(!bbox.contains(Coordinate::new(57.5, 12.1)));
    }

    #[test]
    fn test_box_validate() {
        assert!(BoundingBox::new(11.0, 57.0, 12.0, 58.0).validate().is_ok());
        assert!(BoundingBox::new(12.0, 57.0, 11.0, 58.0).validate().is_ok());
        assert!(BoundingBox::new(f64::NAN, 57.0, 11.0, 58.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_box_normalized_swaps_corners() {
        let inverted = BoundingBox::new(12.0, 58.0, 11.0, 57.0);
        assert_eq!(inverted.normalized(), BoundingBox::new(11.0, 57.0, 12.0, 58.0));
        assert!(inverted.normalized().contains(Coordinate::new(57.5, 11.5)));

        let ordered = BoundingBox::new(11.0, 57.0, 12.0, 58.0);
        assert_eq!(ordered.normalized(), ordered);
    }

    #[test]
    fn test_route_distance_on_segment_is_zero() {
        let route = RouteBuffer::new(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0), 10.0);
        assert!(route.distance_m(Coordinate::new(0.0, 0.5)) < 1.0);
    }

    #[test]
    fn test_route_buffer_membership() {
        // One degree of longitude at the equator is ~111 km
        let route = RouteBuffer::new(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0), 500.0);

        // ~333 m north of the midpoint
        assert!(route.contains(Coordinate::new(0.003, 0.5)));
        // ~1.1 km north of the midpoint
        assert!(!route.contains(Coordinate::new(0.01, 0.5)));
        // beyond the end cap
        assert!(!route.contains(Coordinate::new(0.0, 1.01)));
    }

    #[test]
    fn test_route_validate() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 1.0);
        assert!(RouteBuffer::new(a, b, -1.0).validate().is_err());
        assert!(RouteBuffer::new(a, Coordinate::new(95.0, 0.0), 1.0)
            .validate()
            .is_err());
        assert!(RouteBuffer::new(a, b, 0.0).validate().is_ok());
    }
}
