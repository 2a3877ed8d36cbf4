//! Provider payload fixtures.
//!
//! Shapes mirror what the telemetry and traffic providers return so the
//! normalizer and ingestor tests exercise realistic envelopes.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use comfort_common::RawObservation;

/// Coordinate the site is queried with.
pub const SITE_LOCATION: &str = "38.6355,-90.2905";

/// Values block for a mild, dry afternoon.
pub fn mild_values() -> Value {
    json!({
        "cloudBase": 1.2,
        "cloudCeiling": null,
        "cloudCover": 40,
        "dewPoint": 46.1,
        "humidity": 50,
        "precipitationIntensity": 0,
        "precipitationProbability": 0,
        "pressureSurfaceLevel": 29.6,
        "rainIntensity": 0,
        "temperature": 65,
        "temperatureApparent": 65,
        "uvIndex": 2,
        "visibility": 9.94,
        "weatherCode": 1101,
        "windDirection": 190,
        "windGust": 9.2,
        "windSpeed": 5
    })
}

/// `GET /v4/weather/realtime` response.
pub fn realtime_payload(time: &str) -> Value {
    json!({
        "data": {
            "time": time,
            "values": mild_values()
        },
        "location": {
            "lat": 38.6355,
            "lon": -90.2905
        }
    })
}

/// `GET /v4/weather/forecast` response with `hours` hourly entries from 12:00Z.
pub fn forecast_payload(hours: usize) -> Value {
    let hourly: Vec<Value> = (0..hours)
        .map(|h| {
            let mut values = mild_values();
            values["temperature"] = json!(65 + h as i64);
            json!({
                "time": format!("2024-06-01T{:02}:00:00Z", 12 + h),
                "values": values
            })
        })
        .collect();

    json!({
        "timelines": {
            "minutely": [],
            "hourly": hourly,
            "daily": []
        },
        "location": { "lat": 38.6355, "lon": -90.2905 }
    })
}

/// Older forecast shape: `timelines[0].intervals[*]` with `startTime`.
pub fn legacy_forecast_payload(hours: usize) -> Value {
    let intervals: Vec<Value> = (0..hours)
        .map(|h| {
            json!({
                "startTime": format!("2024-06-01T{:02}:00:00Z", 12 + h),
                "values": mild_values()
            })
        })
        .collect();

    json!({
        "timelines": [
            { "timestep": "1h", "intervals": intervals }
        ]
    })
}

/// `POST /v4/timelines` response split over two timelines.
pub fn history_payload() -> Value {
    json!({
        "data": {
            "timelines": [
                {
                    "timestep": "1h",
                    "startTime": "2024-05-25T00:00:00Z",
                    "endTime": "2024-05-25T02:00:00Z",
                    "intervals": [
                        { "startTime": "2024-05-25T00:00:00Z", "values": { "temperature": 70.1, "temperatureApparent": 70.1 } },
                        { "startTime": "2024-05-25T01:00:00Z", "values": { "temperature": 68.4, "temperatureApparent": 68.0 } }
                    ]
                },
                {
                    "timestep": "1h",
                    "intervals": [
                        { "startTime": "2024-05-25T02:00:00Z", "values": { "temperature": 66.9, "temperatureApparent": 66.2 } }
                    ]
                }
            ]
        }
    })
}

/// Daily traffic response: two Living World sensors, two south sensors,
/// one of which reported nothing.
pub fn daily_traffic_payload() -> Value {
    json!({
        "messages": [],
        "results": [
            { "recordDate_day_1": "2024-06-01T00:00:00.000Z", "name": "Treetop", "sumins": 120, "sumouts": 100 },
            { "recordDate_day_1": "2024-06-01T00:00:00.000Z", "name": "TLW1", "sumins": 80, "sumouts": 95 },
            { "recordDate_day_1": "2024-06-01T00:00:00.000Z", "name": "South Entrance 1", "sumins": 900, "sumouts": 850 },
            { "recordDate_day_1": "2024-06-01T00:00:00.000Z", "name": "South Entrance 2", "sumins": 0, "sumouts": 0 },
            { "recordDate_day_1": "2024-05-31T00:00:00.000Z", "name": "South Entrance 2", "sumins": 450, "sumouts": 400 }
        ]
    })
}

/// 15-minute traffic response.
pub fn interval_traffic_payload() -> Value {
    json!({
        "messages": [],
        "results": [
            { "recordDate_minute_15_1": "2024-06-01T14:00:00.000Z", "name": "Treetop", "sumins": 10, "sumouts": 2 },
            { "recordDate_minute_15_1": "2024-06-01T14:00:00.000Z", "name": "TLW1", "sumins": 5, "sumouts": 1 },
            { "recordDate_minute_15_1": "2024-06-01T14:00:00.000Z", "name": "South Entrance 1", "sumins": 0, "sumouts": 7 },
            { "recordDate_minute_15_1": "2024-06-01T14:15:00.000Z", "name": "South Entrance 1", "sumins": 0, "sumouts": 0 },
            { "recordDate_minute_15_1": "2024-06-01T14:15:00.000Z", "name": "Treetop", "sumins": 3, "sumouts": 0 }
        ]
    })
}

pub fn datetime(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hh, mm, 0))
        .expect("valid fixture datetime")
}

/// Observation carrying just the scoring inputs.
pub fn scoring_observation(
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    precipitation_intensity: f64,
    cloud_cover: f64,
    uv_index: f64,
) -> RawObservation {
    RawObservation {
        temperature: Some(temperature),
        humidity: Some(humidity),
        wind_speed: Some(wind_speed),
        precipitation_intensity: Some(precipitation_intensity),
        cloud_cover: Some(cloud_cover),
        uv_index: Some(uv_index),
        ..RawObservation::new(datetime(2024, 6, 1, 12, 0), SITE_LOCATION)
    }
}
