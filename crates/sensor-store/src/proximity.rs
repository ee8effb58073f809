//! Proximity Resolution
//!
//! Flat-plane Euclidean distance over `(longitude, latitude)`. This is an
//! approximation, not a geodesic computation.

use crate::{Coordinate, Sensor};

/// Squared planar distance between two coordinates
pub fn distance_squared(a: &Coordinate, b: &Coordinate) -> f64 {
    let dx = a.longitude - b.longitude;
    let dy = a.latitude - b.latitude;
    dx * dx + dy * dy
}

/// Planar distance between two coordinates
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    distance_squared(a, b).sqrt()
}

/// Whether a stored coordinate coincides exactly with the query point
pub fn coincides(stored: &Coordinate, point: &Coordinate) -> bool {
    stored.longitude == point.longitude && stored.latitude == point.latitude
}

/// Select the sensor closest to `point` from `candidates`.
///
/// Sensors located exactly at `point` are skipped. Among equidistant
/// candidates the lowest id wins, so the result does not depend on the
/// iteration order of `candidates`.
pub fn nearest<'a, I>(point: &Coordinate, candidates: I) -> Option<(&'a Sensor, f64)>
where
    I: IntoIterator<Item = &'a Sensor>,
{
    let mut best: Option<(&'a Sensor, f64)> = None;

    for sensor in candidates {
        if coincides(&sensor.location, point) {
            continue;
        }
        let d2 = distance_squared(&sensor.location, point);
        if d2.is_nan() {
            continue;
        }
        best = match best {
            Some((current, current_d2))
                if current_d2 < d2 || (current_d2 == d2 && current.id <= sensor.id) =>
            {
                Some((current, current_d2))
            }
            _ => Some((sensor, d2)),
        };
    }

    best.map(|(sensor, d2)| (sensor, d2.sqrt()))
}
