//! Geographic points and field geometry.
//!
//! Separation between burns is measured with the haversine great-circle
//! distance. Plume geometry needs local planar offsets, which use an
//! equirectangular projection around a reference point: the error is well
//! below a metre per kilometre at the distances a smoke plume matters
//! (< 50 km).

use crate::error::{CoordError, Result};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Mean Earth radius (m), as used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, -90..=90.
    pub lat: f64,
    /// Longitude in degrees, -180..=180.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point without validation.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(CoordError::invalid_input(format!(
                "coordinates must be finite, got ({}, {})",
                self.lat, self.lon
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(CoordError::invalid_input(format!(
                "coordinates out of range: ({}, {})",
                self.lat, self.lon
            )));
        }
        Ok(())
    }

    /// Great-circle distance in metres (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Midpoint in the local planar approximation.
    #[must_use]
    pub fn midpoint(&self, other: &GeoPoint) -> GeoPoint {
        let offset = self.offset_to(other) * 0.5;
        self.translate(offset)
    }

    /// East/north offset (m) from `self` to `other`.
    #[must_use]
    pub fn offset_to(&self, other: &GeoPoint) -> Vector2<f64> {
        let mean_lat = ((self.lat + other.lat) / 2.0).to_radians();
        let east = (other.lon - self.lon).to_radians() * mean_lat.cos() * EARTH_RADIUS_M;
        let north = (other.lat - self.lat).to_radians() * EARTH_RADIUS_M;
        Vector2::new(east, north)
    }

    /// Point displaced by an east/north offset (m).
    #[must_use]
    pub fn translate(&self, offset: Vector2<f64>) -> GeoPoint {
        let lat = self.lat + (offset.y / EARTH_RADIUS_M).to_degrees();
        let mean_lat = ((self.lat + lat) / 2.0).to_radians();
        let lon = self.lon + (offset.x / (EARTH_RADIUS_M * mean_lat.cos())).to_degrees();
        GeoPoint { lat, lon }
    }
}

/// Field outline and/or representative point of a burn.
///
/// At least one of the two must be present; when both are, the explicit
/// centroid wins (it is usually surveyed, the polygon is drawn by hand).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    #[serde(default)]
    polygon: Vec<GeoPoint>,
    #[serde(default)]
    centroid: Option<GeoPoint>,
}

impl FieldGeometry {
    /// Geometry from a polygon outline (first vertex need not be repeated).
    pub fn from_polygon(polygon: Vec<GeoPoint>) -> Result<Self> {
        let geometry = Self {
            polygon,
            centroid: None,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Geometry from a single representative point.
    pub fn from_point(point: GeoPoint) -> Result<Self> {
        let geometry = Self {
            polygon: Vec::new(),
            centroid: Some(point),
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Polygon outline, possibly empty.
    #[must_use]
    pub fn polygon(&self) -> &[GeoPoint] {
        &self.polygon
    }

    /// Check there is usable geometry.
    pub fn validate(&self) -> Result<()> {
        if let Some(point) = &self.centroid {
            point.validate()?;
        } else if self.polygon.is_empty() {
            return Err(CoordError::invalid_input(
                "field geometry needs a polygon or a centroid",
            ));
        }
        if !self.polygon.is_empty() {
            if self.polygon.len() < 3 {
                return Err(CoordError::invalid_input(format!(
                    "field polygon needs at least 3 vertices, got {}",
                    self.polygon.len()
                )));
            }
            for vertex in &self.polygon {
                vertex.validate()?;
            }
            if self.centroid.is_none() && polygon_area(&self.polygon) <= f64::EPSILON {
                return Err(CoordError::invalid_input("field polygon is degenerate"));
            }
        }
        Ok(())
    }

    /// Representative point of the field.
    ///
    /// Uses the explicit centroid when given, otherwise the area centroid of
    /// the polygon in a local planar frame.
    #[must_use]
    pub fn centroid(&self) -> GeoPoint {
        if let Some(point) = self.centroid {
            return point;
        }
        let origin = self.polygon[0];
        let local: Vec<Vector2<f64>> = self.polygon.iter().map(|p| origin.offset_to(p)).collect();

        let mut twice_area = 0.0;
        let mut acc = Vector2::<f64>::zeros();
        for (i, a) in local.iter().enumerate() {
            let b = local[(i + 1) % local.len()];
            let cross = a.x * b.y - b.x * a.y;
            twice_area += cross;
            acc += (a + b) * cross;
        }
        if twice_area.abs() <= f64::EPSILON {
            // Collinear outline: fall back to the vertex mean.
            let mean = local.iter().fold(Vector2::<f64>::zeros(), |s, v| s + v) / local.len() as f64;
            return origin.translate(mean);
        }
        origin.translate(acc / (3.0 * twice_area))
    }
}

/// Planar area (m²) of a lat/lon polygon, shoelace formula.
#[must_use]
pub fn polygon_area(polygon: &[GeoPoint]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let origin = polygon[0];
    let local: Vec<Vector2<f64>> = polygon.iter().map(|p| origin.offset_to(p)).collect();
    let twice: f64 = local
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let b = local[(i + 1) % local.len()];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice.abs() / 2.0
}
