//! Geographic primitives for distance-ranked search.
//!
//! Coordinates are plain WGS84 degrees. Distances are great-circle
//! (haversine) kilometers on a sphere with the mean Earth radius.

mod bbox;
mod distance;
mod types;

pub use bbox::BoundingBox;
pub use distance::{haversine_km, round_km, EARTH_RADIUS_KM};
pub use types::{Coordinate, GeoError};
