//! In-memory sensor store

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::proximity;
use crate::store::ensure_finite;
use crate::{
    Coordinate, Nearest, Sensor, SensorStore, StoreConfig, StoreError, StoreResult, Tag, TagInput,
};

/// Sensor store held entirely in process memory
///
/// Writes build the replacement row off to the side and swap it in under the
/// write lock, so a failed write never leaves a partial sensor behind.
pub struct MemorySensorStore {
    /// Sensors in insertion order
    sensors: RwLock<Vec<Sensor>>,
    config: StoreConfig,
}

impl MemorySensorStore {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store
    pub fn with_config(config: StoreConfig) -> Self {
        info!(page_size = config.page_size, "Creating in-memory sensor store");
        Self {
            sensors: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Number of stored sensors
    pub async fn len(&self) -> usize {
        self.sensors.read().await.len()
    }

    /// Whether the store holds no sensors
    pub async fn is_empty(&self) -> bool {
        self.sensors.read().await.is_empty()
    }

    fn build_tags(tags: &[TagInput]) -> Vec<Tag> {
        tags.iter()
            .map(|t| Tag {
                id: Uuid::new_v4(),
                name: t.name.clone(),
                value: t.value.clone(),
            })
            .collect()
    }

    fn unique_name_violation(name: &str) -> StoreError {
        StoreError::Constraint(format!("sensor name '{}' already exists", name))
    }
}

impl Default for MemorySensorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorStore for MemorySensorStore {
    async fn create(
        &self,
        name: &str,
        location: Coordinate,
        tags: &[TagInput],
    ) -> StoreResult<Sensor> {
        ensure_finite(&location)?;
        let mut sensors = self.sensors.write().await;

        if sensors.iter().any(|s| s.name == name) {
            return Err(Self::unique_name_violation(name));
        }

        let sensor = Sensor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location,
            tags: Self::build_tags(tags),
        };
        sensors.push(sensor.clone());

        info!(id = %sensor.id, name, tags = tags.len(), "Created sensor");
        Ok(sensor)
    }

    async fn update(
        &self,
        name: &str,
        new_name: &str,
        location: Coordinate,
        tags: &[TagInput],
    ) -> StoreResult<Sensor> {
        ensure_finite(&location)?;
        let mut sensors = self.sensors.write().await;

        let index = sensors
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        if new_name != name && sensors.iter().any(|s| s.name == new_name) {
            return Err(Self::unique_name_violation(new_name));
        }

        let replacement = Sensor {
            id: sensors[index].id,
            name: new_name.to_string(),
            location,
            tags: Self::build_tags(tags),
        };
        sensors[index] = replacement.clone();

        info!(id = %replacement.id, from = name, to = new_name, tags = tags.len(), "Updated sensor");
        Ok(replacement)
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Sensor>> {
        let sensors = self.sensors.read().await;
        let found = sensors.iter().find(|s| s.name == name).cloned();
        debug!(name, found = found.is_some(), "Lookup by name");
        Ok(found)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Sensor>> {
        let sensors = self.sensors.read().await;
        let found = sensors.iter().find(|s| s.id == id).cloned();
        debug!(%id, found = found.is_some(), "Lookup by id");
        Ok(found)
    }

    async fn find_nearest(&self, point: Coordinate) -> StoreResult<Option<Nearest>> {
        let sensors = self.sensors.read().await;
        Ok(proximity::nearest(&point, sensors.iter()).map(|(sensor, distance)| Nearest {
            sensor: sensor.clone(),
            distance,
        }))
    }

    async fn get_all(&self) -> StoreResult<Vec<Sensor>> {
        let sensors = self.sensors.read().await;
        Ok(sensors.iter().take(self.config.page_size).cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_keeps_id_and_replaces_tags() {
        let store = MemorySensorStore::new();
        let created = store
            .create("a", Coordinate::new(1.0, 2.0), &[TagInput::new("zone", "north")])
            .await
            .unwrap();

        let updated = store
            .update("a", "b", Coordinate::new(3.0, 4.0), &[TagInput::new("floor", "2")])
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "b");
        assert_eq!(updated.tag_inputs(), vec![TagInput::new("floor", "2")]);
        assert!(store.get_by_name("a").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name_is_rejected() {
        let store = MemorySensorStore::new();
        store.create("a", Coordinate::new(0.0, 0.0), &[]).await.unwrap();
        store
            .create("b", Coordinate::new(1.0, 1.0), &[TagInput::new("k", "v")])
            .await
            .unwrap();

        let err = store
            .update("b", "a", Coordinate::new(9.0, 9.0), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let b = store.get_by_name("b").await.unwrap().unwrap();
        assert_eq!(b.location, Coordinate::new(1.0, 1.0));
        assert_eq!(b.tags.len(), 1);
    }

    #[tokio::test]
    async fn test_page_bound() {
        let store = MemorySensorStore::with_config(StoreConfig::with_page_size(3));
        assert!(store.is_empty().await);
        for i in 0..5 {
            store
                .create(&format!("s{}", i), Coordinate::new(i as f64, 0.0), &[])
                .await
                .unwrap();
        }
        assert!(!store.is_empty().await);
        assert_eq!(store.len().await, 5);
        assert_eq!(store.get_all().await.unwrap().len(), 3);
        assert_eq!(store.backend_name(), "memory");
    }
}
