//! Provider payload normalization.
//!
//! Maps raw telemetry and traffic responses into the canonical records of
//! `comfort-common`. Stateless: every function is a pure transform of one
//! payload.
//!
//! # Contracts
//!
//! Each API mode has a [`WeatherSchema`] or [`TrafficSchema`] naming where its
//! record collection lives. A payload missing that collection fails with
//! [`comfort_common::ComfortError::SchemaMismatch`]; an empty collection yields
//! zero records.

pub mod fields;
pub mod schema;
pub mod traffic;
pub mod weather;

pub use fields::{apply_values, canonical_name, flatten, FIELD_MAP, NESTED_SEPARATOR};
pub use schema::{Timestep, TrafficGrouping, TrafficSchema, WeatherSchema};
pub use traffic::{normalize_daily, normalize_intervals};
pub use weather::{collect_weather, normalize_weather, WeatherRecords};
