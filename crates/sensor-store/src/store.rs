//! Storage-agnostic sensor contract

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Coordinate, Nearest, Sensor, StoreError, StoreResult, TagInput};

/// Sensor persistence and proximity queries
///
/// Every write replaces the sensor row and its whole tag set atomically: a
/// reader never observes new tags with an old name, or the reverse.
///
/// Writes with a NaN or infinite coordinate component fail with
/// [`StoreError::Constraint`] before anything is persisted, on every backend.
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Persist a new sensor with a store-assigned id.
    ///
    /// Fails with [`StoreError::Constraint`] on a duplicate name or a
    /// non-finite location.
    async fn create(
        &self,
        name: &str,
        location: Coordinate,
        tags: &[TagInput],
    ) -> StoreResult<Sensor>;

    /// Rename, relocate and replace all tags of the sensor currently called `name`.
    ///
    /// Fails with [`StoreError::NotFound`] when no such sensor exists; nothing
    /// is created in that case. A non-finite location fails with
    /// [`StoreError::Constraint`] and leaves the sensor unchanged.
    async fn update(
        &self,
        name: &str,
        new_name: &str,
        location: Coordinate,
        tags: &[TagInput],
    ) -> StoreResult<Sensor>;

    /// Exact-match lookup by name.
    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Sensor>>;

    /// Lookup by id.
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Sensor>>;

    /// Closest sensor to `point`, skipping any sensor located exactly at it.
    ///
    /// Equidistant candidates resolve to the lowest id.
    async fn find_nearest(&self, point: Coordinate) -> StoreResult<Option<Nearest>>;

    /// One bounded page of sensors, in no particular order.
    async fn get_all(&self) -> StoreResult<Vec<Sensor>>;

    /// Short backend label for diagnostics
    fn backend_name(&self) -> &'static str;
}

/// Reject coordinates that cannot be stored or compared
pub(crate) fn ensure_finite(location: &Coordinate) -> StoreResult<()> {
    if location.is_finite() {
        Ok(())
    } else {
        Err(StoreError::Constraint(format!(
            "coordinate ({}, {}) is not finite",
            location.latitude, location.longitude
        )))
    }
}
