//! Per-run context.

use chrono::NaiveDateTime;
use uuid::Uuid;

use comfort_common::ReferenceZone;

/// Identity and clock of one scheduled invocation.
///
/// Every log line and every failure of a run carries its `run_id`.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub zone: ReferenceZone,
    /// Reference-zone wall-clock time the run started.
    pub started_at: NaiveDateTime,
}

impl RunContext {
    pub fn new(zone: ReferenceZone) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            zone,
            started_at: zone.now(),
        }
    }
}
