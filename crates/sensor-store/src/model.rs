//! Sensor domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic coordinate
///
/// Distances treat `(longitude, latitude)` as a point on a flat plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are finite numbers
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Name/value annotation owned by a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub value: String,
}

/// Tag as supplied by a caller, before persistence assigns it an id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagInput {
    pub name: String,
    pub value: String,
}

impl TagInput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl From<&Tag> for TagInput {
    fn from(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
            value: tag.value.clone(),
        }
    }
}

/// Persisted sensor with its current tag set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: Uuid,
    pub name: String,
    pub location: Coordinate,
    pub tags: Vec<Tag>,
}

impl Sensor {
    /// Tags stripped of their ids, in stored order
    pub fn tag_inputs(&self) -> Vec<TagInput> {
        self.tags.iter().map(TagInput::from).collect()
    }
}

/// Result of a nearest-sensor query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nearest {
    pub sensor: Sensor,
    pub distance: f64,
}
