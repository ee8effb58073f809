//! SQLite sensor store
//!
//! Every write runs in one transaction spanning the sensor row and all of its
//! tag rows. Reads also run in a transaction so the sensor row and its tags
//! come from the same snapshot. An uncommitted `Transaction` rolls back when
//! dropped, which covers every early return below.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::ensure_finite;
use crate::{
    Coordinate, Nearest, Sensor, SensorStore, StoreConfig, StoreError, StoreResult, Tag, TagInput,
};

/// Schema statements, applied in order on connect
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sensors (
        id          TEXT    PRIMARY KEY NOT NULL,
        name        TEXT    NOT NULL UNIQUE,
        longitude   REAL    NOT NULL,
        latitude    REAL    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        id          TEXT    PRIMARY KEY NOT NULL,
        sensor_id   TEXT    NOT NULL REFERENCES sensors(id) ON DELETE CASCADE,
        position    INTEGER NOT NULL,
        name        TEXT    NOT NULL,
        value       TEXT    NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tags_sensor ON tags(sensor_id, position)",
];

const SELECT_SENSOR_BY_NAME: &str =
    "SELECT id, name, longitude, latitude FROM sensors WHERE name = ?1";

const SELECT_SENSOR_BY_ID: &str =
    "SELECT id, name, longitude, latitude FROM sensors WHERE id = ?1";

const SELECT_PAGE: &str = "SELECT id, name, longitude, latitude FROM sensors LIMIT ?1";

// Squared distance is enough to order candidates; the root is taken on the
// winning row only.
const SELECT_NEAREST: &str = r#"
    SELECT id, name, longitude, latitude,
           ((longitude - ?1) * (longitude - ?1) + (latitude - ?2) * (latitude - ?2)) AS distance_sq
      FROM sensors
     WHERE NOT (longitude = ?1 AND latitude = ?2)
  ORDER BY distance_sq, id
     LIMIT 1
"#;

const SELECT_TAGS: &str =
    "SELECT id, name, value FROM tags WHERE sensor_id = ?1 ORDER BY position";

const INSERT_SENSOR: &str =
    "INSERT INTO sensors (id, name, longitude, latitude) VALUES (?1, ?2, ?3, ?4)";

const UPDATE_SENSOR: &str = r#"
    UPDATE sensors SET name = ?2, longitude = ?3, latitude = ?4
     WHERE name = ?1
 RETURNING id
"#;

const INSERT_TAG: &str =
    "INSERT INTO tags (id, sensor_id, position, name, value) VALUES (?1, ?2, ?3, ?4, ?5)";

const DELETE_TAGS: &str = "DELETE FROM tags WHERE sensor_id = ?1";

#[derive(Debug, sqlx::FromRow)]
struct SensorRow {
    id: String,
    name: String,
    longitude: f64,
    latitude: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct NearestRow {
    id: String,
    name: String,
    longitude: f64,
    latitude: f64,
    distance_sq: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: String,
    name: String,
    value: String,
}

/// `LIMIT` bind value for a page bound; SQLite treats negatives as unbounded
fn limit_param(page_size: usize) -> i64 {
    i64::try_from(page_size).unwrap_or(i64::MAX)
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Backend(format!("invalid stored id '{}': {}", raw, e)))
}

/// Sensor store backed by SQLite through a sqlx connection pool
pub struct SqliteSensorStore {
    pool: SqlitePool,
    config: StoreConfig,
}

impl SqliteSensorStore {
    /// Open (creating if missing) the database at `url` and apply the schema
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;

        info!(url, max_connections, "Connected to SQLite sensor database");
        Self::with_pool(pool, config).await
    }

    /// Private in-memory database
    ///
    /// The pool holds exactly one connection that never expires, since every
    /// SQLite in-memory connection is a separate database.
    pub async fn in_memory(config: StoreConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, config).await
    }

    /// Wrap an existing pool, applying the schema first
    pub async fn with_pool(pool: SqlitePool, config: StoreConfig) -> StoreResult<Self> {
        let store = Self { pool, config };
        store.init_schema().await?;
        Ok(store)
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        debug!("Sensor schema ready");
        Ok(())
    }

    async fn insert_tags(
        conn: &mut SqliteConnection,
        sensor_id: &str,
        tags: &[TagInput],
    ) -> StoreResult<Vec<Tag>> {
        let mut stored = Vec::with_capacity(tags.len());
        for (position, tag) in tags.iter().enumerate() {
            let id = Uuid::new_v4();
            sqlx::query(INSERT_TAG)
                .bind(id.to_string())
                .bind(sensor_id)
                .bind(position as i64)
                .bind(&tag.name)
                .bind(&tag.value)
                .execute(&mut *conn)
                .await?;
            stored.push(Tag {
                id,
                name: tag.name.clone(),
                value: tag.value.clone(),
            });
        }
        Ok(stored)
    }

    async fn load_tags(conn: &mut SqliteConnection, sensor_id: &str) -> StoreResult<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as(SELECT_TAGS)
            .bind(sensor_id)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Tag {
                    id: parse_id(&row.id)?,
                    name: row.name,
                    value: row.value,
                })
            })
            .collect()
    }

    /// Attach tags to a sensor row. The single path by which every read
    /// materialises a [`Sensor`].
    async fn hydrate(conn: &mut SqliteConnection, row: SensorRow) -> StoreResult<Sensor> {
        let tags = Self::load_tags(conn, &row.id).await?;
        Ok(Sensor {
            id: parse_id(&row.id)?,
            name: row.name,
            location: Coordinate::new(row.latitude, row.longitude),
            tags,
        })
    }

    async fn fetch_one(&self, query: &'static str, key: String) -> StoreResult<Option<Sensor>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<SensorRow> = sqlx::query_as(query)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;

        let sensor = match row {
            Some(row) => Some(Self::hydrate(&mut tx, row).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(sensor)
    }
}

#[async_trait]
impl SensorStore for SqliteSensorStore {
    async fn create(
        &self,
        name: &str,
        location: Coordinate,
        tags: &[TagInput],
    ) -> StoreResult<Sensor> {
        ensure_finite(&location)?;
        let id = Uuid::new_v4();
        let id_text = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(INSERT_SENSOR)
            .bind(&id_text)
            .bind(name)
            .bind(location.longitude)
            .bind(location.latitude)
            .execute(&mut *tx)
            .await?;

        let tags = Self::insert_tags(&mut tx, &id_text, tags).await?;

        tx.commit().await?;
        info!(%id, name, tags = tags.len(), "Created sensor");

        Ok(Sensor {
            id,
            name: name.to_string(),
            location,
            tags,
        })
    }

    async fn update(
        &self,
        name: &str,
        new_name: &str,
        location: Coordinate,
        tags: &[TagInput],
    ) -> StoreResult<Sensor> {
        ensure_finite(&location)?;
        let mut tx = self.pool.begin().await?;

        let id_text: Option<String> = sqlx::query_scalar(UPDATE_SENSOR)
            .bind(name)
            .bind(new_name)
            .bind(location.longitude)
            .bind(location.latitude)
            .fetch_optional(&mut *tx)
            .await?;

        let id_text = match id_text {
            Some(id) => id,
            None => {
                debug!(name, "Update target not found");
                return Err(StoreError::NotFound(name.to_string()));
            }
        };

        sqlx::query(DELETE_TAGS)
            .bind(&id_text)
            .execute(&mut *tx)
            .await?;

        let tags = Self::insert_tags(&mut tx, &id_text, tags).await?;

        tx.commit().await?;

        let id = parse_id(&id_text)?;
        info!(%id, from = name, to = new_name, tags = tags.len(), "Updated sensor");

        Ok(Sensor {
            id,
            name: new_name.to_string(),
            location,
            tags,
        })
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Sensor>> {
        let found = self.fetch_one(SELECT_SENSOR_BY_NAME, name.to_string()).await?;
        debug!(name, found = found.is_some(), "Lookup by name");
        Ok(found)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Sensor>> {
        let found = self.fetch_one(SELECT_SENSOR_BY_ID, id.to_string()).await?;
        debug!(%id, found = found.is_some(), "Lookup by id");
        Ok(found)
    }

    async fn find_nearest(&self, point: Coordinate) -> StoreResult<Option<Nearest>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<NearestRow> = sqlx::query_as(SELECT_NEAREST)
            .bind(point.longitude)
            .bind(point.latitude)
            .fetch_optional(&mut *tx)
            .await?;

        let nearest = match row {
            Some(row) => {
                let distance = row.distance_sq.sqrt();
                let sensor = Self::hydrate(
                    &mut tx,
                    SensorRow {
                        id: row.id,
                        name: row.name,
                        longitude: row.longitude,
                        latitude: row.latitude,
                    },
                )
                .await?;
                Some(Nearest { sensor, distance })
            }
            None => None,
        };

        tx.commit().await?;
        debug!(
            latitude = point.latitude,
            longitude = point.longitude,
            found = nearest.is_some(),
            "Nearest sensor query"
        );
        Ok(nearest)
    }

    async fn get_all(&self) -> StoreResult<Vec<Sensor>> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<SensorRow> = sqlx::query_as(SELECT_PAGE)
            .bind(limit_param(self.config.page_size))
            .fetch_all(&mut *tx)
            .await?;

        let mut sensors = Vec::with_capacity(rows.len());
        for row in rows {
            sensors.push(Self::hydrate(&mut tx, row).await?);
        }

        tx.commit().await?;
        Ok(sensors)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
