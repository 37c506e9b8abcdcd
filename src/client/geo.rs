//! Geographic helpers: coordinates, haversine distance and distance from a
//! home location to arbitrary GeoJSON geometries.
//!
//! GeoJSON stores positions as `[longitude, latitude]`; everything outside
//! this module works with [`Coordinates`] in `(latitude, longitude)` order.

use geojson::{Geometry, PolygonType, Position, Value};
use std::fmt;

/// Mean Earth radius in kilometres used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A `(latitude, longitude)` pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true if both components are within their valid ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Converts a GeoJSON position (`[lon, lat, ...]`) into coordinates.
    ///
    /// Returns `None` for positions with fewer than two components.
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [longitude, latitude, ..] => Some(Self::new(*latitude, *longitude)),
            _ => None,
        }
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// Renders as `(lat, lon)` with floats always carrying a decimal point,
/// e.g. `(-31.0, 151.0)`.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two coordinates in kilometres.
pub fn haversine_distance(from: Coordinates, to: Coordinates) -> f64 {
    let (lat1, lon1) = (from.latitude.to_radians(), from.longitude.to_radians());
    let (lat2, lon2) = (to.latitude.to_radians(), to.longitude.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance in kilometres from `home` to the nearest part of `geometry`.
///
/// Home inside a polygon counts as distance zero. Geometries without any
/// usable position yield `f64::INFINITY`.
pub fn distance_to_geometry(home: Coordinates, geometry: &Geometry) -> f64 {
    match &geometry.value {
        Value::Point(position) => distance_to_position(home, position),
        Value::MultiPoint(positions) => min_distance(
            positions
                .iter()
                .map(|position| distance_to_position(home, position)),
        ),
        Value::LineString(line) => distance_to_line(home, line),
        Value::MultiLineString(lines) => {
            min_distance(lines.iter().map(|line| distance_to_line(home, line)))
        }
        Value::Polygon(polygon) => distance_to_polygon(home, polygon),
        Value::MultiPolygon(polygons) => min_distance(
            polygons
                .iter()
                .map(|polygon| distance_to_polygon(home, polygon)),
        ),
        Value::GeometryCollection(geometries) => min_distance(
            geometries
                .iter()
                .map(|geometry| distance_to_geometry(home, geometry)),
        ),
    }
}

/// Representative coordinates of a geometry.
///
/// Points map to themselves, polygons to the centroid of their exterior ring,
/// lines to their first position and collections to their first member.
pub fn representative_coordinates(geometry: &Geometry) -> Option<Coordinates> {
    match &geometry.value {
        Value::Point(position) => Coordinates::from_position(position),
        Value::MultiPoint(positions) | Value::LineString(positions) => positions
            .first()
            .and_then(|position| Coordinates::from_position(position)),
        Value::MultiLineString(lines) => lines
            .first()
            .and_then(|line| line.first())
            .and_then(|position| Coordinates::from_position(position)),
        Value::Polygon(polygon) => polygon.first().and_then(|ring| ring_centroid(ring)),
        Value::MultiPolygon(polygons) => polygons
            .first()
            .and_then(|polygon| polygon.first())
            .and_then(|ring| ring_centroid(ring)),
        Value::GeometryCollection(geometries) => {
            geometries.first().and_then(representative_coordinates)
        }
    }
}

fn min_distance(distances: impl Iterator<Item = f64>) -> f64 {
    distances.fold(f64::INFINITY, f64::min)
}

fn distance_to_position(home: Coordinates, position: &[f64]) -> f64 {
    Coordinates::from_position(position)
        .map(|point| haversine_distance(home, point))
        .unwrap_or(f64::INFINITY)
}

fn distance_to_line(home: Coordinates, line: &[Position]) -> f64 {
    let points: Vec<Coordinates> = line
        .iter()
        .filter_map(|position| Coordinates::from_position(position))
        .collect();

    match points.as_slice() {
        [] => f64::INFINITY,
        [single] => haversine_distance(home, *single),
        _ => min_distance(
            points
                .windows(2)
                .map(|segment| distance_to_segment(home, segment[0], segment[1])),
        ),
    }
}

fn distance_to_polygon(home: Coordinates, polygon: &PolygonType) -> f64 {
    let Some((exterior, holes)) = polygon.split_first() else {
        return f64::INFINITY;
    };

    let inside = ring_contains(exterior, home) && !holes.iter().any(|hole| ring_contains(hole, home));
    if inside {
        return 0.0;
    }

    min_distance(polygon.iter().map(|ring| distance_to_line(home, ring)))
}

/// Distance to the closest point of segment `a`-`b`.
///
/// The closest point is located in planar lat/lon space, which is accurate
/// enough for the segment lengths found in incident feeds.
fn distance_to_segment(home: Coordinates, a: Coordinates, b: Coordinates) -> f64 {
    let dx = b.longitude - a.longitude;
    let dy = b.latitude - a.latitude;
    let length_squared = dx * dx + dy * dy;

    if length_squared == 0.0 {
        return haversine_distance(home, a);
    }

    let t = (((home.longitude - a.longitude) * dx + (home.latitude - a.latitude) * dy)
        / length_squared)
        .clamp(0.0, 1.0);
    let closest = Coordinates::new(a.latitude + t * dy, a.longitude + t * dx);

    haversine_distance(home, closest)
}

/// Even-odd ray casting test.
fn ring_contains(ring: &[Position], point: Coordinates) -> bool {
    let vertices: Vec<Coordinates> = ring
        .iter()
        .filter_map(|position| Coordinates::from_position(position))
        .collect();
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.latitude > point.latitude) != (vj.latitude > point.latitude) {
            let crossing = (vj.longitude - vi.longitude) * (point.latitude - vi.latitude)
                / (vj.latitude - vi.latitude)
                + vi.longitude;
            if point.longitude < crossing {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn ring_centroid(ring: &[Position]) -> Option<Coordinates> {
    let mut vertices: Vec<Coordinates> = ring
        .iter()
        .filter_map(|position| Coordinates::from_position(position))
        .collect();

    // Closed rings repeat the first vertex at the end
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.is_empty() {
        return None;
    }

    let count = vertices.len() as f64;
    let (lat_sum, lon_sum) = vertices.iter().fold((0.0, 0.0), |(lat, lon), v| {
        (lat + v.latitude, lon + v.longitude)
    });
    Some(Coordinates::new(lat_sum / count, lon_sum / count))
}
