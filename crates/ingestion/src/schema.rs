//! Response-schema contracts.
//!
//! Each provider API mode has an explicit contract naming where its record
//! collection lives. A payload that has none of the candidate locations is a
//! schema mismatch; a payload whose collection is present but empty simply
//! yields no records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Forecast time step, which also picks the `timelines.<step>` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timestep {
    Minutely,
    #[default]
    Hourly,
    Daily,
}

impl Timestep {
    /// Key of the array under `timelines` in forecast responses.
    pub fn collection(&self) -> &'static str {
        match self {
            Timestep::Minutely => "minutely",
            Timestep::Hourly => "hourly",
            Timestep::Daily => "daily",
        }
    }

    /// Value passed in the `timesteps` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            Timestep::Minutely => "1m",
            Timestep::Hourly => "1h",
            Timestep::Daily => "1d",
        }
    }
}

/// Telemetry provider contract, one per API mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum WeatherSchema {
    /// `GET /v4/weather/realtime`: `data.time` + `data.values`.
    Realtime,
    /// `GET /v4/weather/forecast`: `timelines.<step>[*]`, or the older
    /// `timelines[0].intervals[*]` shape.
    Forecast {
        #[serde(default)]
        timestep: Timestep,
    },
    /// `POST /v4/timelines`: `data.timelines[*].intervals[*]`.
    History,
}

impl WeatherSchema {
    pub fn name(&self) -> &'static str {
        match self {
            WeatherSchema::Realtime => "realtime",
            WeatherSchema::Forecast { .. } => "forecast",
            WeatherSchema::History => "history",
        }
    }
}

impl fmt::Display for WeatherSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Traffic date grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficGrouping {
    /// One bucket per calendar day, ingress only.
    Day,
    /// 15-minute buckets, ingress and egress.
    Interval,
}

impl TrafficGrouping {
    /// Column the provider labels each bucket with.
    pub fn default_date_field(&self) -> &'static str {
        match self {
            TrafficGrouping::Day => "recordDate_day_1",
            TrafficGrouping::Interval => "recordDate_minute_15_1",
        }
    }

    /// Value of the `dateGroupings` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            TrafficGrouping::Day => "day",
            TrafficGrouping::Interval => "minute(15)",
        }
    }

    /// Value of the `metrics` query parameter.
    pub fn metrics(&self) -> &'static str {
        match self {
            TrafficGrouping::Day => "ins",
            TrafficGrouping::Interval => "ins,outs",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrafficGrouping::Day => "traffic_day",
            TrafficGrouping::Interval => "traffic_interval",
        }
    }
}

/// Traffic contract: rows live under `results`, each labelled by `date_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSchema {
    pub grouping: TrafficGrouping,
    pub date_field: String,
}

impl TrafficSchema {
    pub fn new(grouping: TrafficGrouping) -> Self {
        Self {
            grouping,
            date_field: grouping.default_date_field().to_string(),
        }
    }

    pub fn with_date_field(mut self, date_field: impl Into<String>) -> Self {
        self.date_field = date_field.into();
        self
    }
}
