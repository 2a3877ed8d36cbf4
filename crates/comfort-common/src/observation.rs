//! Canonical environmental observation rows.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One normalized environmental reading for a location at a point in time.
///
/// `time` is reference-zone wall-clock time. Numeric readings are optional
/// because providers omit fields they have no value for. Units follow the
/// imperial system the telemetry provider is queried with (°F, mph, in/hr).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub time: NaiveDateTime,
    pub location: String,
    pub temperature: Option<f64>,
    pub temperature_apparent: Option<f64>,
    pub humidity: Option<f64>,
    pub dew_point: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub cloud_base: Option<f64>,
    pub cloud_ceiling: Option<f64>,
    pub uv_index: Option<f64>,
    pub precipitation_intensity: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub rain_intensity: Option<f64>,
    pub snow_intensity: Option<f64>,
    pub visibility: Option<f64>,
    pub pressure_surface_level: Option<f64>,
    pub weather_code: Option<f64>,
}

impl RawObservation {
    pub fn new(time: NaiveDateTime, location: impl Into<String>) -> Self {
        Self {
            time,
            location: location.into(),
            ..Default::default()
        }
    }

    /// Set a reading by its canonical snake_case name.
    ///
    /// Returns `false` if the name is not part of the canonical schema.
    pub fn set(&mut self, field: &str, value: f64) -> bool {
        let slot = match field {
            "temperature" => &mut self.temperature,
            "temperature_apparent" => &mut self.temperature_apparent,
            "humidity" => &mut self.humidity,
            "dew_point" => &mut self.dew_point,
            "wind_speed" => &mut self.wind_speed,
            "wind_gust" => &mut self.wind_gust,
            "wind_direction" => &mut self.wind_direction,
            "cloud_cover" => &mut self.cloud_cover,
            "cloud_base" => &mut self.cloud_base,
            "cloud_ceiling" => &mut self.cloud_ceiling,
            "uv_index" => &mut self.uv_index,
            "precipitation_intensity" => &mut self.precipitation_intensity,
            "precipitation_probability" => &mut self.precipitation_probability,
            "rain_intensity" => &mut self.rain_intensity,
            "snow_intensity" => &mut self.snow_intensity,
            "visibility" => &mut self.visibility,
            "pressure_surface_level" => &mut self.pressure_surface_level,
            "weather_code" => &mut self.weather_code,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Number of readings that carry a value.
    pub fn populated_fields(&self) -> usize {
        [
            self.temperature,
            self.temperature_apparent,
            self.humidity,
            self.dew_point,
            self.wind_speed,
            self.wind_gust,
            self.wind_direction,
            self.cloud_cover,
            self.cloud_base,
            self.cloud_ceiling,
            self.uv_index,
            self.precipitation_intensity,
            self.precipitation_probability,
            self.rain_intensity,
            self.snow_intensity,
            self.visibility,
            self.pressure_surface_level,
            self.weather_code,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }
}

/// A comfort score derived from one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedScore {
    pub time: NaiveDateTime,
    pub location: String,
    /// Always within `[1, 100]`.
    pub score: i32,
    pub rating: String,
}
