//! Sensor Store
//!
//! Transactional persistence of sensors and their tag sets, plus
//! nearest-sensor resolution, behind a single storage-agnostic trait.
//!
//! Two backends implement [`SensorStore`]:
//! - [`SqliteSensorStore`]: sqlx over SQLite, distance ordering computed in SQL
//! - [`MemorySensorStore`]: in-process table, used for tests and ephemeral runs

mod config;
mod error;
mod memory;
mod model;
pub mod proximity;
mod sqlite;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemorySensorStore;
pub use model::{Coordinate, Nearest, Sensor, Tag, TagInput};
pub use sqlite::SqliteSensorStore;
pub use store::SensorStore;
