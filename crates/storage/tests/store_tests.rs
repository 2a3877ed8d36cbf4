//! Store behaviour: dispositions, atomicity, reads and read-only attach.

use chrono::{Duration, NaiveDate};

use comfort_common::{ComfortError, DerivedScore, Gate, GateCount, GateInterval, RawObservation};
use storage::{Column, Disposition, ObservationQuery, Record, ScoreQuery, SqliteQuery, Store};
use test_utils::{datetime, hourly_observations, scratch_db, SITE_LOCATION};

fn scores(values: &[(u32, i32)]) -> Vec<DerivedScore> {
    values
        .iter()
        .map(|&(hour, score)| DerivedScore {
            time: datetime(2024, 6, 1, hour, 0),
            location: SITE_LOCATION.to_string(),
            score,
            rating: if score >= 75 { "Good" } else { "Fair" }.to_string(),
        })
        .collect()
}

fn gate_counts() -> Vec<GateCount> {
    let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
    vec![
        GateCount { date: day(1), gate: Gate::SouthGate, gate_count: 900 },
        GateCount { date: day(1), gate: Gate::LivingWorld, gate_count: 200 },
        GateCount { date: day(2), gate: Gate::SouthGate, gate_count: 1100 },
        GateCount { date: day(2), gate: Gate::LivingWorld, gate_count: 0 },
    ]
}

// ============================================================================
// Dispositions
// ============================================================================

#[tokio::test]
async fn test_append_accumulates_duplicates() {
    let store = Store::open_memory().await.unwrap();
    let batch = hourly_observations(datetime(2024, 6, 1, 0, 0), 3, SITE_LOCATION);

    store.write("weather_history", &batch, Disposition::Append).await.unwrap();
    store.write("weather_history", &batch, Disposition::Append).await.unwrap();

    assert_eq!(store.count("weather_history").await.unwrap(), 6);
}

#[tokio::test]
async fn test_replace_all_is_idempotent() {
    let store = Store::open_memory().await.unwrap();
    let batch = hourly_observations(datetime(2024, 6, 1, 0, 0), 1, SITE_LOCATION);

    for _ in 0..2 {
        store.write("weather_realtime", &batch, Disposition::ReplaceAll).await.unwrap();
    }
    assert_eq!(store.count("weather_realtime").await.unwrap(), 1);
}

#[tokio::test]
async fn test_replace_all_drops_previous_rows() {
    let store = Store::open_memory().await.unwrap();
    let old = hourly_observations(datetime(2024, 6, 1, 0, 0), 5, SITE_LOCATION);
    let new = hourly_observations(datetime(2024, 6, 2, 0, 0), 2, SITE_LOCATION);

    store.write("weather_realtime", &old, Disposition::Append).await.unwrap();
    store.write("weather_realtime", &new, Disposition::ReplaceAll).await.unwrap();

    let rows = store
        .read_observations("weather_realtime", &ObservationQuery::all())
        .await
        .unwrap();
    assert_eq!(rows, new);
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let store = Store::open_memory().await.unwrap();
    let batch = scores(&[(9, 80), (10, 85), (11, 90)]);

    store.write("comfort_scores", &batch, Disposition::UpsertByKey).await.unwrap();
    store.write("comfort_scores", &batch, Disposition::UpsertByKey).await.unwrap();

    assert_eq!(store.count("comfort_scores").await.unwrap(), 3);
}

#[tokio::test]
async fn test_upsert_last_write_wins() {
    let store = Store::open_memory().await.unwrap();
    store
        .write("comfort_scores", &scores(&[(9, 80), (10, 85)]), Disposition::UpsertByKey)
        .await
        .unwrap();
    // Conflicts across batches and within one batch both resolve to the later row.
    store
        .write("comfort_scores", &scores(&[(10, 60), (11, 70), (11, 72)]), Disposition::UpsertByKey)
        .await
        .unwrap();

    let rows = store.read_scores("comfort_scores", &ScoreQuery::default()).await.unwrap();
    let values: Vec<(u32, i32)> = rows
        .iter()
        .map(|s| (chrono::Timelike::hour(&s.time), s.score))
        .collect();
    assert_eq!(values, vec![(11, 72), (10, 60), (9, 80)]);
    assert_eq!(rows[1].rating, "Fair");
}

#[tokio::test]
async fn test_upsert_after_append_keeps_newest_row_per_key() {
    let store = Store::open_memory().await.unwrap();
    let start = datetime(2024, 6, 1, 0, 0);
    let stale = hourly_observations(start, 3, SITE_LOCATION);
    let mut fresh = hourly_observations(start, 3, SITE_LOCATION);
    for obs in &mut fresh {
        obs.temperature = Some(90.0);
    }

    store.write("weather_forecast", &stale, Disposition::Append).await.unwrap();
    store.write("weather_forecast", &fresh, Disposition::Append).await.unwrap();
    assert_eq!(store.count("weather_forecast").await.unwrap(), 6);

    let newer = hourly_observations(start + Duration::hours(3), 1, SITE_LOCATION);
    store
        .write("weather_forecast", &newer, Disposition::UpsertByKey)
        .await
        .unwrap();

    let rows = store
        .read_observations("weather_forecast", &ObservationQuery::all())
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows[..3].iter().all(|r| r.temperature == Some(90.0)));

    // Later upserts keep working against the indexed table.
    store
        .write("weather_forecast", &stale, Disposition::UpsertByKey)
        .await
        .unwrap();
    assert_eq!(store.count("weather_forecast").await.unwrap(), 4);
}

#[tokio::test]
async fn test_read_observations_same_time_in_insert_order() {
    let store = Store::open_memory().await.unwrap();
    let start = datetime(2024, 6, 1, 0, 0);
    let stale = hourly_observations(start, 20, SITE_LOCATION);
    let mut fresh = hourly_observations(start, 20, SITE_LOCATION);
    for obs in &mut fresh {
        obs.humidity = Some(75.0);
    }

    store.write("weather_forecast", &stale, Disposition::Append).await.unwrap();
    store.write("weather_forecast", &fresh, Disposition::Append).await.unwrap();

    let rows = store
        .read_observations("weather_forecast", &ObservationQuery::all())
        .await
        .unwrap();
    assert_eq!(rows.len(), 40);
    for pair in rows.chunks(2) {
        assert_eq!(pair[0].time, pair[1].time);
        assert_eq!(pair[0].humidity, Some(50.0));
        assert_eq!(pair[1].humidity, Some(75.0));
    }
}

#[tokio::test]
async fn test_empty_batch_is_noop() {
    let store = Store::open_memory().await.unwrap();
    let empty: Vec<RawObservation> = Vec::new();

    assert_eq!(store.write("weather_realtime", &empty, Disposition::ReplaceAll).await.unwrap(), 0);
    assert!(!store.table_exists("weather_realtime").await.unwrap());

    let batch = hourly_observations(datetime(2024, 6, 1, 0, 0), 2, SITE_LOCATION);
    store.write("weather_realtime", &batch, Disposition::ReplaceAll).await.unwrap();
    store.write("weather_realtime", &empty, Disposition::ReplaceAll).await.unwrap();
    assert_eq!(store.count("weather_realtime").await.unwrap(), 2);
}

// ============================================================================
// Atomicity
// ============================================================================

/// Record whose second column rejects nulls, to force a mid-batch failure.
struct Strict {
    id: i64,
    value: Option<f64>,
}

const STRICT_COLUMNS: &[Column] = &[
    Column { name: "id", sql_type: "INTEGER NOT NULL" },
    Column { name: "value", sql_type: "REAL NOT NULL" },
];

impl Record for Strict {
    fn columns() -> &'static [Column] {
        STRICT_COLUMNS
    }

    fn key() -> &'static [&'static str] {
        &["id"]
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query.bind(self.id).bind(self.value)
    }
}

#[tokio::test]
async fn test_failed_replace_keeps_previous_contents() {
    let store = Store::open_memory().await.unwrap();
    let good = vec![
        Strict { id: 1, value: Some(1.0) },
        Strict { id: 2, value: Some(2.0) },
        Strict { id: 3, value: Some(3.0) },
    ];
    store.write("strict", &good, Disposition::ReplaceAll).await.unwrap();

    let bad = vec![Strict { id: 4, value: Some(4.0) }, Strict { id: 5, value: None }];
    let err = store.write("strict", &bad, Disposition::ReplaceAll).await.unwrap_err();
    assert!(matches!(err, ComfortError::Store(_)));
    assert_eq!(err.kind(), "store");

    // The drop, the recreate and the first insert all rolled back.
    assert_eq!(store.count("strict").await.unwrap(), 3);
}

#[tokio::test]
async fn test_failed_append_leaves_nothing() {
    let store = Store::open_memory().await.unwrap();
    let bad = vec![Strict { id: 1, value: Some(1.0) }, Strict { id: 2, value: None }];
    assert!(store.write("strict", &bad, Disposition::Append).await.is_err());
    assert_eq!(store.count("strict").await.unwrap(), 0);
}

#[tokio::test]
async fn test_rejects_unsafe_table_name() {
    let store = Store::open_memory().await.unwrap();
    let batch = scores(&[(9, 80)]);
    let err = store
        .write("scores; DROP TABLE x", &batch, Disposition::Append)
        .await
        .unwrap_err();
    assert!(matches!(err, ComfortError::InvalidConfig(_)));
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_read_observations_filters() {
    let store = Store::open_memory().await.unwrap();
    let start = datetime(2024, 6, 1, 0, 0);
    let mut batch = hourly_observations(start, 24, SITE_LOCATION);
    batch.extend(hourly_observations(start, 24, "elsewhere"));
    store.write("weather_forecast", &batch, Disposition::Append).await.unwrap();

    let query = ObservationQuery {
        location: Some(SITE_LOCATION.to_string()),
        since: Some(start + Duration::hours(6)),
        until: Some(start + Duration::hours(12)),
        limit: None,
    };
    let rows = store.read_observations("weather_forecast", &query).await.unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].time, datetime(2024, 6, 1, 6, 0));
    assert_eq!(rows[5].time, datetime(2024, 6, 1, 11, 0));
    assert!(rows.iter().all(|r| r.location == SITE_LOCATION));
    assert_eq!(rows[0].temperature, Some(66.0));
    assert_eq!(rows[0].uv_index, None);

    let limited = ObservationQuery {
        limit: Some(4),
        ..ObservationQuery::at_location("elsewhere")
    };
    assert_eq!(store.read_observations("weather_forecast", &limited).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_read_missing_table_is_empty() {
    let store = Store::open_memory().await.unwrap();
    assert!(store
        .read_observations("weather_history", &ObservationQuery::all())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(store.count("weather_history").await.unwrap(), 0);
}

#[tokio::test]
async fn test_read_scores_min_score() {
    let store = Store::open_memory().await.unwrap();
    store
        .write("comfort_scores", &scores(&[(9, 60), (10, 80), (11, 95)]), Disposition::UpsertByKey)
        .await
        .unwrap();

    let query = ScoreQuery {
        min_score: Some(75),
        limit: Some(1),
        ..Default::default()
    };
    let rows = store.read_scores("comfort_scores", &query).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].score, 95);
}

#[tokio::test]
async fn test_gate_counts_and_summary() {
    let store = Store::open_memory().await.unwrap();
    store.write("gate_count", &gate_counts(), Disposition::Append).await.unwrap();

    let rows = store.read_gate_counts("gate_count").await.unwrap();
    assert_eq!(rows.len(), 4);
    // Most recent day first, gates by label
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    assert_eq!(rows[0].gate, Gate::SouthGate);
    assert_eq!(rows[1].gate, Gate::LivingWorld);

    let summary = store.gate_summary("gate_count").await.unwrap();
    assert_eq!(summary.len(), 2);
    let south = &summary[0];
    assert_eq!(south.gate, Gate::SouthGate);
    assert_eq!(south.records, 2);
    assert_eq!(south.total, 2000);
    assert_eq!(south.max, 1100);
    assert_eq!(south.min, 900);
    test_utils::assert_approx_eq!(south.average, 1000.0, 1e-9);

    let living = &summary[1];
    assert_eq!(living.total, 200);
    assert_eq!(living.min, 0);
}

#[tokio::test]
async fn test_gate_intervals_round_trip_in_order() {
    let store = Store::open_memory().await.unwrap();
    let intervals = vec![
        GateInterval { date_time: datetime(2024, 6, 1, 9, 15), gate: Gate::LivingWorld, ingress: 3, egress: 0 },
        GateInterval { date_time: datetime(2024, 6, 1, 9, 0), gate: Gate::LivingWorld, ingress: 15, egress: 3 },
        GateInterval { date_time: datetime(2024, 6, 1, 9, 0), gate: Gate::SouthGate, ingress: 0, egress: 7 },
    ];
    store.write("gate_interval", &intervals, Disposition::ReplaceAll).await.unwrap();

    let all = store.read_gate_intervals("gate_interval", None, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].gate, Gate::SouthGate);
    assert_eq!(all[2].date_time, datetime(2024, 6, 1, 9, 15));

    let later = store
        .read_gate_intervals("gate_interval", Some(datetime(2024, 6, 1, 9, 10)), None)
        .await
        .unwrap();
    assert_eq!(later, vec![intervals[0].clone()]);
}

// ============================================================================
// Read-only attach
// ============================================================================

#[tokio::test]
async fn test_read_only_attach_sees_committed_rows() {
    let (_dir, path) = scratch_db("raw.db");
    let raw = Store::open(&path).await.unwrap();
    let batch = hourly_observations(datetime(2024, 6, 1, 0, 0), 4, SITE_LOCATION);
    raw.write("weather_history", &batch, Disposition::Append).await.unwrap();

    let reader = Store::open_read_only(&path).await.unwrap();
    assert_eq!(reader.path(), Some(path.as_path()));
    assert!(reader.table_exists("weather_history").await.unwrap());
    assert_eq!(reader.count("weather_history").await.unwrap(), 4);

    let rows = reader
        .read_observations("weather_history", &ObservationQuery::all())
        .await
        .unwrap();
    assert_eq!(rows, batch);
}

#[tokio::test]
async fn test_read_only_attach_requires_existing_store() {
    let (_dir, path) = scratch_db("missing.db");
    let err = Store::open_read_only(&path).await.unwrap_err();
    assert!(matches!(err, ComfortError::Store(_)));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("nested").join("derived.db");
    let store = Store::open(&path).await.unwrap();
    store
        .write("comfort_scores", &scores(&[(12, 100)]), Disposition::UpsertByKey)
        .await
        .unwrap();
    assert!(path.exists());
}
