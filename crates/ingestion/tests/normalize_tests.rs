//! Normalizer tests against realistic provider payloads.

use chrono::NaiveDate;
use serde_json::json;

use comfort_common::{ComfortError, Gate, ReferenceZone};
use ingestion::{
    collect_weather, normalize_daily, normalize_intervals, normalize_weather, Timestep, TrafficGrouping,
    TrafficSchema, WeatherSchema,
};
use test_utils::{
    daily_traffic_payload, datetime, forecast_payload, history_payload, interval_traffic_payload,
    legacy_forecast_payload, realtime_payload, SITE_LOCATION,
};

fn chicago() -> ReferenceZone {
    ReferenceZone::default()
}

fn hourly() -> WeatherSchema {
    WeatherSchema::Forecast {
        timestep: Timestep::Hourly,
    }
}

// ============================================================================
// Weather
// ============================================================================

#[test]
fn test_realtime_single_record() {
    let payload = realtime_payload("2024-06-01T17:00:00Z");
    let records = collect_weather(&payload, WeatherSchema::Realtime, SITE_LOCATION, chicago()).unwrap();

    assert_eq!(records.len(), 1);
    let obs = &records[0];
    // 17:00Z is noon CDT
    assert_eq!(obs.time, datetime(2024, 6, 1, 12, 0));
    assert_eq!(obs.location, SITE_LOCATION);
    assert_eq!(obs.temperature, Some(65.0));
    assert_eq!(obs.humidity, Some(50.0));
    assert_eq!(obs.wind_speed, Some(5.0));
    assert_eq!(obs.uv_index, Some(2.0));
    assert_eq!(obs.cloud_ceiling, None);
    assert_eq!(obs.snow_intensity, None);
}

#[test]
fn test_forecast_hourly_is_lazy_and_ordered() {
    let payload = forecast_payload(6);
    let mut records = normalize_weather(&payload, hourly(), SITE_LOCATION, chicago()).unwrap();
    assert_eq!(records.len(), 6);

    let first = records.next().unwrap().unwrap();
    assert_eq!(first.time, datetime(2024, 6, 1, 7, 0));
    assert_eq!(records.remaining(), 5);

    let rest: Vec<_> = records.map(Result::unwrap).collect();
    assert_eq!(rest.len(), 5);
    assert_eq!(rest[4].time, datetime(2024, 6, 1, 12, 0));
    assert_eq!(rest[4].temperature, Some(70.0));
}

#[test]
fn test_each_call_yields_a_fresh_sequence() {
    let payload = forecast_payload(3);
    let first: Vec<_> = normalize_weather(&payload, hourly(), SITE_LOCATION, chicago())
        .unwrap()
        .collect();
    let second: Vec<_> = normalize_weather(&payload, hourly(), SITE_LOCATION, chicago())
        .unwrap()
        .collect();
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
}

#[test]
fn test_forecast_legacy_shape() {
    let payload = legacy_forecast_payload(4);
    let records = collect_weather(&payload, hourly(), SITE_LOCATION, chicago()).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].time, datetime(2024, 6, 1, 7, 0));
}

#[test]
fn test_forecast_other_timestep_missing() {
    let payload = forecast_payload(2);
    let schema = WeatherSchema::Forecast {
        timestep: Timestep::Minutely,
    };
    // `minutely` is present but empty in the fixture
    assert!(collect_weather(&payload, schema, SITE_LOCATION, chicago()).unwrap().is_empty());

    let payload = json!({"timelines": {"hourly": []}});
    let err = collect_weather(&payload, schema, SITE_LOCATION, chicago()).unwrap_err();
    assert!(matches!(err, ComfortError::SchemaMismatch { .. }));
}

#[test]
fn test_history_flattens_timelines_in_order() {
    let payload = history_payload();
    let records = collect_weather(&payload, WeatherSchema::History, SITE_LOCATION, chicago()).unwrap();

    assert_eq!(records.len(), 3);
    // 00:00Z on the 25th is 19:00 CDT on the 24th
    assert_eq!(records[0].time, datetime(2024, 5, 24, 19, 0));
    assert_eq!(records[2].time, datetime(2024, 5, 24, 21, 0));
    assert_eq!(records[1].temperature_apparent, Some(68.0));
    assert_eq!(records[2].temperature, Some(66.9));
}

#[test]
fn test_history_schema_mismatch() {
    // Error envelope returned on rate limiting
    let payload = json!({"code": 429001, "type": "Too Many Calls", "message": "rate limited"});
    let err = collect_weather(&payload, WeatherSchema::History, SITE_LOCATION, chicago()).unwrap_err();
    assert!(err.is_pre_persist());
    assert!(err.to_string().contains("data.timelines"));
}

#[test]
fn test_bad_timestamp_fails_whole_collection() {
    let payload = json!({
        "timelines": {
            "hourly": [
                { "time": "2024-06-01T12:00:00Z", "values": { "temperature": 60 } },
                { "time": "soon", "values": { "temperature": 61 } }
            ]
        }
    });
    assert!(collect_weather(&payload, hourly(), SITE_LOCATION, chicago()).is_err());
}

// ============================================================================
// Traffic
// ============================================================================

#[test]
fn test_daily_traffic_aggregation() {
    let schema = TrafficSchema::new(TrafficGrouping::Day);
    let counts = normalize_daily(&daily_traffic_payload(), &schema).unwrap();

    let may_31 = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
    let june_1 = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let summary: Vec<_> = counts.iter().map(|c| (c.date, c.gate, c.gate_count)).collect();
    assert_eq!(
        summary,
        vec![
            (may_31, Gate::SouthGate, 450),
            (june_1, Gate::SouthGate, 900),
            (june_1, Gate::LivingWorld, 200),
        ]
    );
}

#[test]
fn test_daily_zero_rows_never_create_buckets() {
    let schema = TrafficSchema::new(TrafficGrouping::Day);
    let payload = json!({"results": [
        {"recordDate_day_1": "2024-06-02T00:00:00.000Z", "name": "South Entrance 1", "sumins": 0, "sumouts": 12}
    ]});
    assert!(normalize_daily(&payload, &schema).unwrap().is_empty());
}

#[test]
fn test_interval_traffic_aggregation() {
    let schema = TrafficSchema::new(TrafficGrouping::Interval);
    let intervals = normalize_intervals(&interval_traffic_payload(), &schema, chicago()).unwrap();

    let summary: Vec<_> = intervals
        .iter()
        .map(|i| (i.date_time, i.gate, i.ingress, i.egress))
        .collect();
    assert_eq!(
        summary,
        vec![
            (datetime(2024, 6, 1, 9, 0), Gate::SouthGate, 0, 7),
            (datetime(2024, 6, 1, 9, 0), Gate::LivingWorld, 15, 3),
            (datetime(2024, 6, 1, 9, 15), Gate::LivingWorld, 3, 0),
        ]
    );
}

#[test]
fn test_interval_custom_date_field() {
    let schema = TrafficSchema::new(TrafficGrouping::Interval).with_date_field("recordDate_minute_15");
    let payload = json!({"results": [
        {"recordDate_minute_15": "2024-01-10T18:30:00.000Z", "name": "Treetop", "sumins": 1, "sumouts": 0}
    ]});
    let intervals = normalize_intervals(&payload, &schema, chicago()).unwrap();
    assert_eq!(intervals[0].date_time, datetime(2024, 1, 10, 12, 30));
}

#[test]
fn test_schema_from_yaml() {
    let schema: WeatherSchema = serde_yaml::from_str("mode: forecast\ntimestep: daily\n").unwrap();
    assert_eq!(
        schema,
        WeatherSchema::Forecast {
            timestep: Timestep::Daily
        }
    );
    let grouping: TrafficGrouping = serde_yaml::from_str("interval").unwrap();
    assert_eq!(grouping.metrics(), "ins,outs");
}
