//! Telemetry payload normalization.

use serde_json::Value;
use tracing::debug;

use comfort_common::{ComfortError, ComfortResult, RawObservation, ReferenceZone};

use crate::fields::apply_values;
use crate::schema::WeatherSchema;

/// Lazy sequence of observations from one payload.
///
/// Entries are located eagerly (so a missing collection fails up front) but
/// each one is converted only when pulled.
#[derive(Debug)]
pub struct WeatherRecords<'a> {
    entries: std::vec::IntoIter<&'a Value>,
    schema: WeatherSchema,
    location: &'a str,
    zone: ReferenceZone,
}

impl<'a> WeatherRecords<'a> {
    /// Number of entries not yet converted.
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl Iterator for WeatherRecords<'_> {
    type Item = ComfortResult<RawObservation>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        Some(convert_entry(entry, self.schema, self.location, self.zone))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for WeatherRecords<'_> {}

/// Locate the records a payload carries under `schema`.
pub fn normalize_weather<'a>(
    payload: &'a Value,
    schema: WeatherSchema,
    location: &'a str,
    zone: ReferenceZone,
) -> ComfortResult<WeatherRecords<'a>> {
    let entries = locate_entries(payload, schema)?;
    debug!(schema = %schema, entries = entries.len(), "Located weather entries");

    Ok(WeatherRecords {
        entries: entries.into_iter(),
        schema,
        location,
        zone,
    })
}

/// Normalize and materialize every record, failing on the first bad entry.
pub fn collect_weather(
    payload: &Value,
    schema: WeatherSchema,
    location: &str,
    zone: ReferenceZone,
) -> ComfortResult<Vec<RawObservation>> {
    normalize_weather(payload, schema, location, zone)?.collect()
}

fn locate_entries(payload: &Value, schema: WeatherSchema) -> ComfortResult<Vec<&Value>> {
    let mismatch = |message: &str| ComfortError::schema(schema.name(), message);

    match schema {
        WeatherSchema::Realtime => {
            let data = payload
                .get("data")
                .filter(|d| d.is_object())
                .ok_or_else(|| mismatch("expected object at 'data'"))?;
            Ok(vec![data])
        }
        WeatherSchema::Forecast { timestep } => {
            let timelines = payload
                .get("timelines")
                .ok_or_else(|| mismatch("expected 'timelines'"))?;

            match timelines {
                Value::Object(by_step) => by_step
                    .get(timestep.collection())
                    .and_then(Value::as_array)
                    .map(|entries| entries.iter().collect())
                    .ok_or_else(|| {
                        mismatch(&format!("expected array at 'timelines.{}'", timestep.collection()))
                    }),
                Value::Array(legacy) => match legacy.first() {
                    None => Ok(Vec::new()),
                    Some(first) => first
                        .get("intervals")
                        .and_then(Value::as_array)
                        .map(|entries| entries.iter().collect())
                        .ok_or_else(|| mismatch("expected array at 'timelines[0].intervals'")),
                },
                _ => Err(mismatch("'timelines' is neither an object nor an array")),
            }
        }
        WeatherSchema::History => {
            let timelines = payload
                .get("data")
                .and_then(|d| d.get("timelines"))
                .and_then(Value::as_array)
                .ok_or_else(|| mismatch("expected array at 'data.timelines'"))?;

            let mut entries = Vec::new();
            for (idx, timeline) in timelines.iter().enumerate() {
                let intervals = timeline
                    .get("intervals")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        mismatch(&format!("expected array at 'data.timelines[{}].intervals'", idx))
                    })?;
                entries.extend(intervals.iter());
            }
            Ok(entries)
        }
    }
}

fn convert_entry(
    entry: &Value,
    schema: WeatherSchema,
    location: &str,
    zone: ReferenceZone,
) -> ComfortResult<RawObservation> {
    let timestamp = entry
        .get("time")
        .or_else(|| entry.get("startTime"))
        .and_then(Value::as_str)
        .ok_or_else(|| ComfortError::schema(schema.name(), "entry has no 'time' or 'startTime'"))?;

    let values = entry
        .get("values")
        .and_then(Value::as_object)
        .ok_or_else(|| ComfortError::schema(schema.name(), "entry has no 'values' object"))?;

    let mut observation = RawObservation::new(zone.parse_timestamp(timestamp)?, location);
    apply_values(&mut observation, values);
    Ok(observation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_realtime_requires_data_object() {
        let err = normalize_weather(&json!({"code": 429001}), WeatherSchema::Realtime, "x", ReferenceZone::default())
            .unwrap_err();
        assert!(matches!(err, ComfortError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_entry_without_values_fails_lazily() {
        let payload = json!({"data": {"time": "2024-06-01T12:00:00Z"}});
        let mut records =
            normalize_weather(&payload, WeatherSchema::Realtime, "x", ReferenceZone::default()).unwrap();
        assert_eq!(records.remaining(), 1);
        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
    }

    #[test]
    fn test_empty_legacy_timelines() {
        let payload = json!({"timelines": []});
        let schema = WeatherSchema::Forecast {
            timestep: Default::default(),
        };
        let records = collect_weather(&payload, schema, "x", ReferenceZone::default()).unwrap();
        assert!(records.is_empty());
    }
}
