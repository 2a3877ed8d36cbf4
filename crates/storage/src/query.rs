//! Filtered reads over stored records.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::debug;

use comfort_common::{ComfortResult, DerivedScore, GateCount, GateInterval, GateSummary, RawObservation};

use crate::record::column_list;
use crate::store::{validate_table_name, RawStoreReader, Store};
use crate::store_err;

/// Filter for observation reads. Results are ordered oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationQuery {
    pub location: Option<String>,
    /// Inclusive lower bound.
    pub since: Option<NaiveDateTime>,
    /// Exclusive upper bound.
    pub until: Option<NaiveDateTime>,
    pub limit: Option<i64>,
}

impl ObservationQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn at_location(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Default::default()
        }
    }
}

/// Filter for score reads. Results are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreQuery {
    pub location: Option<String>,
    pub since: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    /// Only scores at or above this value.
    pub min_score: Option<i32>,
    pub limit: Option<i64>,
}

#[derive(FromRow)]
struct ObservationRow {
    time: NaiveDateTime,
    location: String,
    temperature: Option<f64>,
    temperature_apparent: Option<f64>,
    humidity: Option<f64>,
    dew_point: Option<f64>,
    wind_speed: Option<f64>,
    wind_gust: Option<f64>,
    wind_direction: Option<f64>,
    cloud_cover: Option<f64>,
    cloud_base: Option<f64>,
    cloud_ceiling: Option<f64>,
    uv_index: Option<f64>,
    precipitation_intensity: Option<f64>,
    precipitation_probability: Option<f64>,
    rain_intensity: Option<f64>,
    snow_intensity: Option<f64>,
    visibility: Option<f64>,
    pressure_surface_level: Option<f64>,
    weather_code: Option<f64>,
}

impl From<ObservationRow> for RawObservation {
    fn from(row: ObservationRow) -> Self {
        RawObservation {
            time: row.time,
            location: row.location,
            temperature: row.temperature,
            temperature_apparent: row.temperature_apparent,
            humidity: row.humidity,
            dew_point: row.dew_point,
            wind_speed: row.wind_speed,
            wind_gust: row.wind_gust,
            wind_direction: row.wind_direction,
            cloud_cover: row.cloud_cover,
            cloud_base: row.cloud_base,
            cloud_ceiling: row.cloud_ceiling,
            uv_index: row.uv_index,
            precipitation_intensity: row.precipitation_intensity,
            precipitation_probability: row.precipitation_probability,
            rain_intensity: row.rain_intensity,
            snow_intensity: row.snow_intensity,
            visibility: row.visibility,
            pressure_surface_level: row.pressure_surface_level,
            weather_code: row.weather_code,
        }
    }
}

#[derive(FromRow)]
struct ScoreRow {
    time: NaiveDateTime,
    location: String,
    score: i32,
    rating: String,
}

impl From<ScoreRow> for DerivedScore {
    fn from(row: ScoreRow) -> Self {
        DerivedScore {
            time: row.time,
            location: row.location,
            score: row.score,
            rating: row.rating,
        }
    }
}

/// `WHERE` clauses plus the values to bind, in clause order.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    location: Option<String>,
    since: Option<NaiveDateTime>,
    until: Option<NaiveDateTime>,
    min_score: Option<i32>,
}

impl Filter {
    fn new(
        location: Option<&str>,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
        time_column: &str,
    ) -> Self {
        let mut filter = Filter::default();
        if let Some(location) = location {
            filter.clauses.push("location = ?".to_string());
            filter.location = Some(location.to_string());
        }
        if since.is_some() {
            filter.clauses.push(format!("{} >= ?", time_column));
            filter.since = since;
        }
        if until.is_some() {
            filter.clauses.push(format!("{} < ?", time_column));
            filter.until = until;
        }
        filter
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn limit_clause(limit: Option<i64>) -> String {
    match limit {
        Some(n) if n >= 0 => format!(" LIMIT {}", n),
        _ => String::new(),
    }
}

impl Store {
    /// Whether `table` exists.
    pub async fn table_exists(&self, table: &str) -> ComfortResult<bool> {
        validate_table_name(table)?;
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_one(&self.pool)
                .await
                .map_err(store_err("Lookup failed"))?;
        Ok(count.0 > 0)
    }

    /// Row count of `table`; 0 if it does not exist.
    pub async fn count(&self, table: &str) -> ComfortResult<i64> {
        if !self.table_exists(table).await? {
            return Ok(0);
        }
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .map_err(store_err("Count failed"))?;
        Ok(count.0)
    }

    /// Observations matching `query`, oldest first. Rows sharing a time come
    /// back in insertion order.
    ///
    /// A table that has never been written reads as empty.
    pub async fn read_observations(
        &self,
        table: &str,
        query: &ObservationQuery,
    ) -> ComfortResult<Vec<RawObservation>> {
        if !self.table_exists(table).await? {
            debug!(table = %table, "Table absent, no observations");
            return Ok(Vec::new());
        }

        let filter = Filter::new(query.location.as_deref(), query.since, query.until, "time");
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY time ASC, rowid ASC{}",
            column_list::<RawObservation>(),
            table,
            filter.where_clause(),
            limit_clause(query.limit)
        );

        let mut q = sqlx::query_as::<_, ObservationRow>(&sql);
        if let Some(location) = &filter.location {
            q = q.bind(location.as_str());
        }
        if let Some(since) = filter.since {
            q = q.bind(since);
        }
        if let Some(until) = filter.until {
            q = q.bind(until);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(store_err("Read failed"))?;
        Ok(rows.into_iter().map(RawObservation::from).collect())
    }

    /// Derived scores matching `query`, newest first.
    pub async fn read_scores(&self, table: &str, query: &ScoreQuery) -> ComfortResult<Vec<DerivedScore>> {
        if !self.table_exists(table).await? {
            return Ok(Vec::new());
        }

        let mut filter = Filter::new(query.location.as_deref(), query.since, query.until, "time");
        if query.min_score.is_some() {
            filter.clauses.push("score >= ?".to_string());
            filter.min_score = query.min_score;
        }

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY time DESC, location ASC{}",
            column_list::<DerivedScore>(),
            table,
            filter.where_clause(),
            limit_clause(query.limit)
        );

        let mut q = sqlx::query_as::<_, ScoreRow>(&sql);
        if let Some(location) = &filter.location {
            q = q.bind(location.as_str());
        }
        if let Some(since) = filter.since {
            q = q.bind(since);
        }
        if let Some(until) = filter.until {
            q = q.bind(until);
        }
        if let Some(min_score) = filter.min_score {
            q = q.bind(min_score);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(store_err("Read failed"))?;
        Ok(rows.into_iter().map(DerivedScore::from).collect())
    }

    /// Daily gate counts, most recent day first.
    pub async fn read_gate_counts(&self, table: &str) -> ComfortResult<Vec<GateCount>> {
        if !self.table_exists(table).await? {
            return Ok(Vec::new());
        }

        let rows: Vec<(NaiveDate, String, i64)> = sqlx::query_as(&format!(
            "SELECT {} FROM {} ORDER BY date DESC, gate ASC",
            column_list::<GateCount>(),
            table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("Read failed"))?;

        rows.into_iter()
            .map(|(date, gate, gate_count)| -> ComfortResult<GateCount> {
                Ok(GateCount {
                    date,
                    gate: gate.parse()?,
                    gate_count,
                })
            })
            .collect()
    }

    /// 15-minute gate intervals, oldest first, optionally bounded.
    pub async fn read_gate_intervals(
        &self,
        table: &str,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> ComfortResult<Vec<GateInterval>> {
        if !self.table_exists(table).await? {
            return Ok(Vec::new());
        }

        let filter = Filter::new(None, since, until, "date_time");
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY date_time ASC, gate ASC",
            column_list::<GateInterval>(),
            table,
            filter.where_clause()
        );

        let mut q = sqlx::query_as::<_, (NaiveDateTime, String, i64, i64)>(&sql);
        if let Some(since) = filter.since {
            q = q.bind(since);
        }
        if let Some(until) = filter.until {
            q = q.bind(until);
        }

        let rows = q.fetch_all(&self.pool).await.map_err(store_err("Read failed"))?;
        rows.into_iter()
            .map(|(date_time, gate, ingress, egress)| -> ComfortResult<GateInterval> {
                Ok(GateInterval {
                    date_time,
                    gate: gate.parse()?,
                    ingress,
                    egress,
                })
            })
            .collect()
    }

    /// Per-gate statistics over a daily count table.
    pub async fn gate_summary(&self, table: &str) -> ComfortResult<Vec<GateSummary>> {
        if !self.table_exists(table).await? {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, i64, i64, f64, i64, i64)> = sqlx::query_as(&format!(
            "SELECT gate, COUNT(*), SUM(gate_count), AVG(gate_count), MAX(gate_count), MIN(gate_count) \
             FROM {} GROUP BY gate ORDER BY gate",
            table
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("Summary failed"))?;

        rows.into_iter()
            .map(|(gate, records, total, average, max, min)| -> ComfortResult<GateSummary> {
                Ok(GateSummary {
                    gate: gate.parse()?,
                    records,
                    total,
                    average,
                    max,
                    min,
                })
            })
            .collect()
    }
}

impl RawStoreReader {
    pub async fn table_exists(&self, table: &str) -> ComfortResult<bool> {
        self.store.table_exists(table).await
    }

    pub async fn count(&self, table: &str) -> ComfortResult<i64> {
        self.store.count(table).await
    }

    pub async fn read_observations(
        &self,
        table: &str,
        query: &ObservationQuery,
    ) -> ComfortResult<Vec<RawObservation>> {
        self.store.read_observations(table, query).await
    }

    pub async fn read_scores(&self, table: &str, query: &ScoreQuery) -> ComfortResult<Vec<DerivedScore>> {
        self.store.read_scores(table, query).await
    }

    pub async fn read_gate_counts(&self, table: &str) -> ComfortResult<Vec<GateCount>> {
        self.store.read_gate_counts(table).await
    }

    pub async fn read_gate_intervals(
        &self,
        table: &str,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> ComfortResult<Vec<GateInterval>> {
        self.store.read_gate_intervals(table, since, until).await
    }

    pub async fn gate_summary(&self, table: &str) -> ComfortResult<Vec<GateSummary>> {
        self.store.gate_summary(table).await
    }
}

