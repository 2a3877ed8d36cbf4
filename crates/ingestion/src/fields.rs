//! Provider field names and value flattening.

use serde_json::{Map, Value};

use comfort_common::RawObservation;

/// Separator used when flattening nested value objects.
pub const NESTED_SEPARATOR: &str = "__";

/// Provider (camelCase) name to canonical (snake_case) field.
///
/// Anything not listed here is ignored during normalization.
pub const FIELD_MAP: &[(&str, &str)] = &[
    ("temperature", "temperature"),
    ("temperatureApparent", "temperature_apparent"),
    ("humidity", "humidity"),
    ("dewPoint", "dew_point"),
    ("windSpeed", "wind_speed"),
    ("windGust", "wind_gust"),
    ("windDirection", "wind_direction"),
    ("cloudCover", "cloud_cover"),
    ("cloudBase", "cloud_base"),
    ("cloudCeiling", "cloud_ceiling"),
    ("uvIndex", "uv_index"),
    ("precipitationIntensity", "precipitation_intensity"),
    ("precipitationProbability", "precipitation_probability"),
    ("rainIntensity", "rain_intensity"),
    ("snowIntensity", "snow_intensity"),
    ("visibility", "visibility"),
    ("pressureSurfaceLevel", "pressure_surface_level"),
    ("weatherCode", "weather_code"),
];

/// Look up the canonical name for a provider field.
pub fn canonical_name(provider: &str) -> Option<&'static str> {
    FIELD_MAP
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, canonical)| *canonical)
}

/// Flatten nested objects into `parent__child` keys.
///
/// Arrays and scalars are leaves.
pub fn flatten(values: &Map<String, Value>) -> Vec<(String, &Value)> {
    let mut out = Vec::with_capacity(values.len());
    flatten_into(values, None, &mut out);
    out
}

fn flatten_into<'a>(values: &'a Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in values {
        let name = match prefix {
            Some(p) => format!("{}{}{}", p, NESTED_SEPARATOR, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(nested, Some(&name), out),
            _ => out.push((name, value)),
        }
    }
}

/// Copy every recognised numeric reading from a provider values block.
///
/// Nulls and non-numeric values leave the field unset. `FIELD_MAP` only
/// names top-level provider fields, so flattened nested keys (`a__b`) never
/// match and are dropped. Returns the number of fields applied.
pub fn apply_values(observation: &mut RawObservation, values: &Map<String, Value>) -> usize {
    flatten(values)
        .into_iter()
        .filter_map(|(name, value)| Some((canonical_name(&name)?, value.as_f64()?)))
        .filter(|(canonical, value)| observation.set(canonical, *value))
        .count()
}
