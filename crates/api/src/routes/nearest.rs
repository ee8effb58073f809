//! Nearest Sensor Route

use axum::{
    extract::{Query, State},
    Json,
};
use sensor_store::{Coordinate, Nearest};
use serde::Deserialize;
use std::sync::Arc;

use crate::{ApiError, AppState};

const INVALID_COORDINATES: &str = "invalid coordinates input";

/// Query parameters for `GET /nearest`
///
/// Kept as raw strings so malformed numbers produce the same error as
/// missing ones.
#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl NearestQuery {
    fn coordinate(&self) -> Result<Coordinate, ApiError> {
        let parse = |raw: &Option<String>| -> Result<f64, ApiError> {
            raw.as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .ok_or_else(|| ApiError::BadRequest(INVALID_COORDINATES.to_string()))
        };
        Ok(Coordinate::new(parse(&self.lat)?, parse(&self.lon)?))
    }
}

/// Find the sensor closest to `lat`/`lon`
pub async fn nearest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestQuery>,
) -> Result<Json<Nearest>, ApiError> {
    metrics::counter!("sensor_api_requests_total", "route" => "nearest").increment(1);
    let point = params.coordinate()?;

    let nearest = state
        .store
        .find_nearest(point)
        .await?
        .ok_or_else(|| ApiError::NotFound("no other sensor found".to_string()))?;

    metrics::histogram!("sensor_nearest_distance").record(nearest.distance);
    Ok(Json(nearest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(lat: Option<&str>, lon: Option<&str>) -> NearestQuery {
        NearestQuery {
            lat: lat.map(str::to_string),
            lon: lon.map(str::to_string),
        }
    }

    #[test]
    fn test_coordinate_parsing() {
        let point = query(Some("10.5"), Some("-20.25")).coordinate().unwrap();
        assert_eq!(point, Coordinate::new(10.5, -20.25));

        assert!(query(None, Some("1")).coordinate().is_err());
        assert!(query(Some("north"), Some("1")).coordinate().is_err());
        assert!(query(Some("NaN"), Some("1")).coordinate().is_err());
        assert!(query(Some("1"), Some("inf")).coordinate().is_err());
    }
}
