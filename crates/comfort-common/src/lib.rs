//! Common types shared across the site-comfort workspace.

pub mod error;
pub mod observation;
pub mod time;
pub mod traffic;

pub use error::{ComfortError, ComfortResult};
pub use observation::{DerivedScore, RawObservation};
pub use time::{parse_bucket_date, provider_date, ReferenceZone, DEFAULT_REFERENCE_ZONE};
pub use traffic::{Gate, GateCount, GateInterval, GateSummary, LIVING_WORLD_SENSORS};
