//! Traffic payload normalization.
//!
//! Sensor rows are filtered, mapped onto gates and summed per
//! `(bucket, gate)`. Output is sorted by bucket, then gate.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

use comfort_common::{
    parse_bucket_date, ComfortError, ComfortResult, Gate, GateCount, GateInterval, ReferenceZone,
};

use crate::schema::{TrafficGrouping, TrafficSchema};

/// One provider row after validation.
#[derive(Debug, Clone, PartialEq)]
struct SensorRow<'a> {
    bucket: &'a str,
    sensor: &'a str,
    ins: i64,
    outs: i64,
}

fn rows<'a>(payload: &'a Value, schema: &'a TrafficSchema) -> ComfortResult<Vec<SensorRow<'a>>> {
    let name = schema.grouping.name();
    let results = payload
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ComfortError::schema(name, "expected array at 'results'"))?;

    results
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let field = |key: &str| {
                row.get(key)
                    .ok_or_else(|| ComfortError::schema(name, format!("results[{}] has no '{}'", idx, key)))
            };

            let bucket = field(schema.date_field.as_str())?.as_str().ok_or_else(|| {
                ComfortError::schema(name, format!("results[{}].{} is not a string", idx, schema.date_field))
            })?;
            let sensor = field("name")?
                .as_str()
                .ok_or_else(|| ComfortError::schema(name, format!("results[{}].name is not a string", idx)))?;
            let ins = count(field("sumins")?, name, idx)?;
            let outs = match schema.grouping {
                TrafficGrouping::Day => row.get("sumouts").map(|v| count(v, name, idx)).transpose()?.unwrap_or(0),
                TrafficGrouping::Interval => count(field("sumouts")?, name, idx)?,
            };

            Ok(SensorRow {
                bucket,
                sensor,
                ins,
                outs,
            })
        })
        .collect()
}

fn count(value: &Value, schema: &str, idx: usize) -> ComfortResult<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64))
        .ok_or_else(|| ComfortError::schema(schema, format!("results[{}] has a non-integer count", idx)))
}

/// Daily ingress per gate.
///
/// Rows with no ingress are dropped before aggregation.
pub fn normalize_daily(payload: &Value, schema: &TrafficSchema) -> ComfortResult<Vec<GateCount>> {
    let rows = rows(payload, schema)?;
    let total = rows.len();

    let mut totals: BTreeMap<(NaiveDate, Gate), i64> = BTreeMap::new();
    let mut kept = 0usize;
    for row in rows.into_iter().filter(|r| r.ins != 0) {
        let date = parse_bucket_date(row.bucket)?;
        *totals.entry((date, Gate::from_sensor(row.sensor))).or_insert(0) += row.ins;
        kept += 1;
    }

    debug!(rows = total, kept = kept, buckets = totals.len(), "Aggregated daily traffic");

    Ok(totals
        .into_iter()
        .map(|((date, gate), gate_count)| GateCount {
            date,
            gate,
            gate_count,
        })
        .collect())
}

/// 15-minute ingress and egress per gate.
///
/// Bucket timestamps are instants and are converted to the reference zone.
/// Rows where both counts are zero are dropped before aggregation.
pub fn normalize_intervals(
    payload: &Value,
    schema: &TrafficSchema,
    zone: ReferenceZone,
) -> ComfortResult<Vec<GateInterval>> {
    let rows = rows(payload, schema)?;
    let total = rows.len();

    let mut totals: BTreeMap<(NaiveDateTime, Gate), (i64, i64)> = BTreeMap::new();
    let mut kept = 0usize;
    for row in rows.into_iter().filter(|r| r.ins != 0 || r.outs != 0) {
        let date_time = zone.parse_timestamp(row.bucket)?;
        let entry = totals
            .entry((date_time, Gate::from_sensor(row.sensor)))
            .or_insert((0, 0));
        entry.0 += row.ins;
        entry.1 += row.outs;
        kept += 1;
    }

    debug!(rows = total, kept = kept, buckets = totals.len(), "Aggregated interval traffic");

    Ok(totals
        .into_iter()
        .map(|((date_time, gate), (ingress, egress))| GateInterval {
            date_time,
            gate,
            ingress,
            egress,
        })
        .collect())
}
