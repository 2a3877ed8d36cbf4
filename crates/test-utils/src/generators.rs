//! Generators for synthetic observation data.

use chrono::{Duration, NaiveDateTime};

use comfort_common::RawObservation;

use crate::fixtures::scoring_observation;

/// Temperatures (°F) spanning every band of the default temperature term.
pub const TEMPERATURES: &[f64] = &[-10.0, 19.9, 20.0, 32.0, 45.0, 55.0, 65.0, 78.0, 84.0, 89.0, 94.0, 99.0, 110.0];
pub const HUMIDITIES: &[f64] = &[0.0, 15.0, 45.0, 65.0, 72.0, 82.0, 100.0];
pub const WIND_SPEEDS: &[f64] = &[0.0, 7.0, 12.0, 18.0, 30.0, 60.0];
pub const PRECIPITATION: &[f64] = &[0.0, 0.05, 0.5, 2.0, 6.0];
pub const CLOUD_COVER: &[f64] = &[0.0, 40.0, 95.0];
pub const UV_INDEX: &[f64] = &[0.0, 7.0, 12.0];

/// Cartesian product of the value lists above.
///
/// Roughly 25k observations: enough to exercise every rule of every default
/// term, including all the cross-factor branches.
pub fn observation_grid() -> impl Iterator<Item = RawObservation> {
    TEMPERATURES.iter().flat_map(|&t| {
        HUMIDITIES.iter().flat_map(move |&h| {
            WIND_SPEEDS.iter().flat_map(move |&w| {
                PRECIPITATION.iter().flat_map(move |&p| {
                    CLOUD_COVER.iter().flat_map(move |&c| {
                        UV_INDEX
                            .iter()
                            .map(move |&uv| scoring_observation(t, h, w, p, c, uv))
                    })
                })
            })
        })
    })
}

/// `count` hourly observations starting at `start`, warming one degree an hour.
pub fn hourly_observations(start: NaiveDateTime, count: usize, location: &str) -> Vec<RawObservation> {
    (0..count)
        .map(|i| RawObservation {
            temperature: Some(60.0 + i as f64),
            humidity: Some(50.0),
            wind_speed: Some(4.0),
            cloud_cover: Some(30.0),
            ..RawObservation::new(start + Duration::hours(i as i64), location)
        })
        .collect()
}
