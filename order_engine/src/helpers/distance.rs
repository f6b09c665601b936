use crate::db_types::Coordinates;

/// Sentinel distance (km) returned when either coordinate pair is missing or invalid. It is far
/// larger than any clustering threshold, so an unlocatable store always lands in its own batch.
pub const INVALID_DISTANCE_KM: f64 = 9999.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle (haversine) distance between two points, in kilometres.
///
/// Zero or out-of-range coordinates return [`INVALID_DISTANCE_KM`] rather than a spuriously small
/// distance that would corrupt a cluster.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    if !a.is_valid() || !b.is_valid() {
        return INVALID_DISTANCE_KM;
    }
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
