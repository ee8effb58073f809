//! Rollback behaviour of the SQLite backend when a write fails part-way.

use std::sync::Arc;
use std::time::Duration;

use sensor_store::{Coordinate, Sensor, SensorStore, SqliteSensorStore, StoreConfig, TagInput};

/// Store whose tag inserts abort whenever a tag value is `poison`
async fn store_with_poison_trigger() -> SqliteSensorStore {
    let store = SqliteSensorStore::in_memory(StoreConfig::default()).await.unwrap();
    sqlx::query(
        r#"
        CREATE TRIGGER reject_poison_tag BEFORE INSERT ON tags
        WHEN NEW.value = 'poison'
        BEGIN
            SELECT RAISE(ABORT, 'poisoned tag');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();
    store
}

#[tokio::test]
async fn test_failed_create_leaves_no_sensor() {
    let store = store_with_poison_trigger().await;

    let err = store
        .create(
            "half",
            Coordinate::new(1.0, 2.0),
            &[TagInput::new("ok", "fine"), TagInput::new("bad", "poison")],
        )
        .await
        .unwrap_err();
    assert!(err.is_persistence());

    assert!(store.get_by_name("half").await.unwrap().is_none());
    let tag_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(tag_rows, 0);
}

#[tokio::test]
async fn test_failed_update_keeps_prior_state() {
    let store = store_with_poison_trigger().await;
    let original = store
        .create("stable", Coordinate::new(1.0, 2.0), &[TagInput::new("zone", "north")])
        .await
        .unwrap();

    let err = store
        .update(
            "stable",
            "renamed",
            Coordinate::new(9.0, 9.0),
            &[TagInput::new("zone", "south"), TagInput::new("bad", "poison")],
        )
        .await
        .unwrap_err();
    assert!(err.is_persistence());

    assert!(store.get_by_name("renamed").await.unwrap().is_none());
    let current = store.get_by_name("stable").await.unwrap().unwrap();
    assert_eq!(current, original);
}

#[tokio::test]
async fn test_store_usable_after_rollback() {
    let store = store_with_poison_trigger().await;
    store
        .create("x", Coordinate::new(0.0, 0.0), &[TagInput::new("bad", "poison")])
        .await
        .unwrap_err();

    let created = store
        .create("x", Coordinate::new(0.0, 0.0), &[TagInput::new("good", "value")])
        .await
        .unwrap();
    assert_eq!(created.tags.len(), 1);
}

#[tokio::test]
async fn test_file_backed_store_persists_across_reconnect() {
    let dir = std::env::temp_dir().join(format!("sensor-store-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let url = format!("sqlite://{}", dir.join("sensors.db").display());

    let id = {
        let store = SqliteSensorStore::connect(
            &url,
            2,
            std::time::Duration::from_secs(5),
            StoreConfig::default(),
        )
        .await
        .unwrap();
        let sensor = store
            .create("durable", Coordinate::new(4.0, 5.0), &[TagInput::new("k", "v")])
            .await
            .unwrap();
        store.pool().close().await;
        sensor.id
    };

    let store = SqliteSensorStore::connect(
        &url,
        2,
        std::time::Duration::from_secs(5),
        StoreConfig::default(),
    )
    .await
    .unwrap();
    let sensor = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(sensor.name, "durable");
    assert_eq!(sensor.tag_inputs(), vec![TagInput::new("k", "v")]);

    store.pool().close().await;
    let _ = std::fs::remove_dir_all(&dir);
}

/// Tags that encode which write produced them; must always match the latitude
fn tags_for(write: i64) -> Vec<TagInput> {
    vec![
        TagInput::new("writer", write.to_string()),
        TagInput::new("shadow", write.to_string()),
    ]
}

fn assert_whole(sensor: &Sensor) {
    let expected = sensor.location.latitude.to_string();
    assert_eq!(sensor.tags.len(), 2, "torn tag set: {:?}", sensor);
    assert!(
        sensor.tags.iter().all(|t| t.value == expected),
        "tags do not match row: {:?}",
        sensor
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pooled_writers_and_readers_see_whole_rows() {
    let dir = std::env::temp_dir().join(format!("sensor-store-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let url = format!("sqlite://{}", dir.join("sensors.db").display());

    let store = Arc::new(
        SqliteSensorStore::connect(&url, 5, Duration::from_secs(30), StoreConfig::default())
            .await
            .unwrap(),
    );
    store
        .create("contested", Coordinate::new(0.0, 0.0), &tags_for(0))
        .await
        .unwrap();

    let mut writers = Vec::new();
    for writer in 1..=8i64 {
        let store = Arc::clone(&store);
        writers.push(tokio::spawn(async move {
            for round in 0..5i64 {
                let write = writer * 100 + round;
                store
                    .update(
                        "contested",
                        "contested",
                        Coordinate::new(write as f64, 0.0),
                        &tags_for(write),
                    )
                    .await
                    .unwrap();
            }
        }));
    }

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        readers.push(tokio::spawn(async move {
            for _ in 0..40 {
                let sensor = store.get_by_name("contested").await.unwrap().unwrap();
                assert_whole(&sensor);

                let page = store.get_all().await.unwrap();
                assert_eq!(page.len(), 1);
                assert_whole(&page[0]);

                tokio::task::yield_now().await;
            }
        }));
    }

    for handle in writers.into_iter().chain(readers) {
        handle.await.unwrap();
    }

    let last = store.get_by_name("contested").await.unwrap().unwrap();
    assert_whole(&last);
    let tag_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(tag_rows, 2);

    store.pool().close().await;
    let _ = std::fs::remove_dir_all(&dir);
}
