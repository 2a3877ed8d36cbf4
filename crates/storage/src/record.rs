//! Persistable records and write dispositions.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{Sqlite, SqliteArguments};

use comfort_common::{DerivedScore, GateCount, GateInterval, RawObservation};

/// A query with its arguments still open for binding.
pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// How a batch is applied to its destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Insert without duplicate checks. Overlapping runs accumulate duplicates.
    Append,
    /// Drop and recreate the table, then insert the batch.
    #[serde(alias = "replaceAll")]
    ReplaceAll,
    /// Insert with the record key unique; conflicting keys take the new row.
    #[serde(alias = "upsertByKey")]
    UpsertByKey,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Append => "append",
            Disposition::ReplaceAll => "replace_all",
            Disposition::UpsertByKey => "upsert_by_key",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column definition: name and SQLite declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str) -> Column {
    Column { name, sql_type }
}

/// A canonical record that can be written to a table.
pub trait Record: Send + Sync {
    /// Columns in bind order.
    fn columns() -> &'static [Column];

    /// Columns forming the logical key. Empty if the record has none.
    fn key() -> &'static [&'static str];

    /// Bind every column value, in [`Record::columns`] order.
    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;
}

// ============================================================================
// Canonical record impls
// ============================================================================

const OBSERVATION_COLUMNS: &[Column] = &[
    col("time", "DATETIME NOT NULL"),
    col("location", "TEXT NOT NULL"),
    col("temperature", "REAL"),
    col("temperature_apparent", "REAL"),
    col("humidity", "REAL"),
    col("dew_point", "REAL"),
    col("wind_speed", "REAL"),
    col("wind_gust", "REAL"),
    col("wind_direction", "REAL"),
    col("cloud_cover", "REAL"),
    col("cloud_base", "REAL"),
    col("cloud_ceiling", "REAL"),
    col("uv_index", "REAL"),
    col("precipitation_intensity", "REAL"),
    col("precipitation_probability", "REAL"),
    col("rain_intensity", "REAL"),
    col("snow_intensity", "REAL"),
    col("visibility", "REAL"),
    col("pressure_surface_level", "REAL"),
    col("weather_code", "REAL"),
];

const SCORE_COLUMNS: &[Column] = &[
    col("time", "DATETIME NOT NULL"),
    col("location", "TEXT NOT NULL"),
    col("score", "INTEGER NOT NULL"),
    col("rating", "TEXT NOT NULL"),
];

const GATE_COUNT_COLUMNS: &[Column] = &[
    col("date", "DATE NOT NULL"),
    col("gate", "TEXT NOT NULL"),
    col("gate_count", "INTEGER NOT NULL"),
];

const GATE_INTERVAL_COLUMNS: &[Column] = &[
    col("date_time", "DATETIME NOT NULL"),
    col("gate", "TEXT NOT NULL"),
    col("ingress", "INTEGER NOT NULL"),
    col("egress", "INTEGER NOT NULL"),
];

impl Record for RawObservation {
    fn columns() -> &'static [Column] {
        OBSERVATION_COLUMNS
    }

    fn key() -> &'static [&'static str] {
        &["time"]
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.time)
            .bind(self.location.as_str())
            .bind(self.temperature)
            .bind(self.temperature_apparent)
            .bind(self.humidity)
            .bind(self.dew_point)
            .bind(self.wind_speed)
            .bind(self.wind_gust)
            .bind(self.wind_direction)
            .bind(self.cloud_cover)
            .bind(self.cloud_base)
            .bind(self.cloud_ceiling)
            .bind(self.uv_index)
            .bind(self.precipitation_intensity)
            .bind(self.precipitation_probability)
            .bind(self.rain_intensity)
            .bind(self.snow_intensity)
            .bind(self.visibility)
            .bind(self.pressure_surface_level)
            .bind(self.weather_code)
    }
}

impl Record for DerivedScore {
    fn columns() -> &'static [Column] {
        SCORE_COLUMNS
    }

    fn key() -> &'static [&'static str] {
        &["time", "location"]
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.time)
            .bind(self.location.as_str())
            .bind(self.score)
            .bind(self.rating.as_str())
    }
}

impl Record for GateCount {
    fn columns() -> &'static [Column] {
        GATE_COUNT_COLUMNS
    }

    fn key() -> &'static [&'static str] {
        &["date", "gate"]
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.date)
            .bind(self.gate.label())
            .bind(self.gate_count)
    }
}

impl Record for GateInterval {
    fn columns() -> &'static [Column] {
        GATE_INTERVAL_COLUMNS
    }

    fn key() -> &'static [&'static str] {
        &["date_time", "gate"]
    }

    fn bind<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.date_time)
            .bind(self.gate.label())
            .bind(self.ingress)
            .bind(self.egress)
    }
}

// ============================================================================
// SQL generation
// ============================================================================

/// Comma-separated column list.
pub(crate) fn column_list<R: Record>() -> String {
    R::columns()
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn create_table_sql<R: Record>(table: &str) -> String {
    let columns = R::columns()
        .iter()
        .map(|c| format!("{} {}", c.name, c.sql_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({})", table, columns)
}

pub(crate) fn key_index_sql<R: Record>(table: &str) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
        key_index_name(table),
        table,
        R::key().join(", ")
    )
}

pub(crate) fn key_index_name(table: &str) -> String {
    format!("ux_{}_key", table)
}

/// Delete all but the newest row per key, so a table written by `Append`
/// can take a unique key index.
pub(crate) fn dedupe_sql<R: Record>(table: &str) -> String {
    format!(
        "DELETE FROM {} WHERE rowid NOT IN (SELECT MAX(rowid) FROM {} GROUP BY {})",
        table,
        table,
        R::key().join(", ")
    )
}

pub(crate) fn insert_sql<R: Record>(table: &str, disposition: Disposition) -> String {
    let placeholders = vec!["?"; R::columns().len()].join(", ");
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        column_list::<R>(),
        placeholders
    );

    if disposition == Disposition::UpsertByKey {
        let key = R::key();
        let updates: Vec<String> = R::columns()
            .iter()
            .filter(|c| !key.contains(&c.name))
            .map(|c| format!("{name} = excluded.{name}", name = c.name))
            .collect();

        if updates.is_empty() {
            sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", key.join(", ")));
        } else {
            sql.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                key.join(", "),
                updates.join(", ")
            ));
        }
    }

    sql
}
