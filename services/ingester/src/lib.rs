//! Site comfort ingester library.
//!
//! Exposes the ingester's modules so runs can be driven with stub sources in
//! integration tests.

pub mod config;
pub mod context;
pub mod ingest;
pub mod sources;

pub use config::{Credentials, IngesterConfig};
pub use context::RunContext;
pub use ingest::{gate_flows, GateFlow, Ingestor, RunReport, Summary};
pub use sources::{DateWindow, SensourceClient, TelemetrySource, TomorrowClient, TrafficSource};
