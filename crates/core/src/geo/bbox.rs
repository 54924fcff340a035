use std::f64::consts::{FRAC_PI_2, PI};

use serde::Serialize;

use super::{Coordinate, GeoError, EARTH_RADIUS_KM};

/// Absorbs float rounding at the edge of the box (about 6 mm).
const EDGE_PADDING_RAD: f64 = 1e-9;

/// A latitude/longitude rectangle that over-approximates a search circle.
///
/// When `min_lng > max_lng` the box crosses the antimeridian and covers
/// `[min_lng, 180] ∪ [-180, max_lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest latitude/longitude rectangle containing every point within
    /// `radius_km` of `origin`.
    ///
    /// The longitude half-width is `asin(sin(r) / cos(lat))` for angular
    /// radius `r`, which accounts for meridians converging toward the poles.
    /// If the circle reaches a pole the box spans every longitude.
    pub fn around(origin: Coordinate, radius_km: f64) -> Result<Self, GeoError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeoError::InvalidRadius(radius_km));
        }

        let angular = radius_km / EARTH_RADIUS_KM + EDGE_PADDING_RAD;
        let lat = origin.latitude().to_radians();
        let lng = origin.longitude().to_radians();

        let min_lat = lat - angular;
        let max_lat = lat + angular;

        if min_lat <= -FRAC_PI_2 || max_lat >= FRAC_PI_2 {
            return Ok(Self {
                min_lat: min_lat.max(-FRAC_PI_2).to_degrees(),
                max_lat: max_lat.min(FRAC_PI_2).to_degrees(),
                min_lng: -180.0,
                max_lng: 180.0,
            });
        }

        let ratio = angular.sin() / lat.cos();
        if ratio >= 1.0 {
            return Ok(Self::full_longitude(min_lat, max_lat));
        }

        let half_width = ratio.asin() + EDGE_PADDING_RAD;
        if half_width >= PI {
            return Ok(Self::full_longitude(min_lat, max_lat));
        }

        let mut min_lng = lng - half_width;
        let mut max_lng = lng + half_width;
        if min_lng < -PI {
            min_lng += 2.0 * PI;
        }
        if max_lng > PI {
            max_lng -= 2.0 * PI;
        }

        Ok(Self {
            min_lat: min_lat.to_degrees(),
            max_lat: max_lat.to_degrees(),
            min_lng: min_lng.to_degrees(),
            max_lng: max_lng.to_degrees(),
        })
    }

    fn full_longitude(min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lat: min_lat.to_degrees(),
            max_lat: max_lat.to_degrees(),
            min_lng: -180.0,
            max_lng: 180.0,
        }
    }

    /// Whether the box wraps around the ±180° meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lng > self.max_lng
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        let lat = point.latitude();
        let lng = point.longitude();
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.crosses_antimeridian() {
            lng >= self.min_lng || lng <= self.max_lng
        } else {
            lng >= self.min_lng && lng <= self.max_lng
        }
    }
}
