//! Ingester configuration.
//!
//! Loaded from an optional YAML file. The file may reference environment
//! variables with `${VAR}` or `${VAR:-default}`; anything it omits falls back
//! to built-in defaults. Credentials never come from the file, only from the
//! environment (after `.env` is loaded).

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use comfort_common::{ComfortError, ComfortResult, ReferenceZone};
use ingestion::{Timestep, TrafficGrouping, TrafficSchema};
use scoring::ScaleSpec;
use storage::{validate_table_name, Disposition};

/// Top-level ingester configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IngesterConfig {
    pub site: SiteConfig,
    pub stores: StoreConfig,
    pub weather: WeatherConfig,
    pub traffic: TrafficConfig,
    pub scoring: ScoringConfig,
    pub http: HttpConfig,
}

/// The operational site being monitored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// `lat,lon` passed to the telemetry provider and stored with every row.
    pub location: String,
    /// Zone all stored timestamps are expressed in.
    pub timezone: ReferenceZone,
    /// Telemetry unit system. Scoring thresholds assume `imperial`.
    pub units: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            location: "38.6355,-90.2905".to_string(),
            timezone: ReferenceZone::default(),
            units: "imperial".to_string(),
        }
    }
}

/// Database files. Raw telemetry, traffic and derived scores live apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub raw: PathBuf,
    pub traffic: PathBuf,
    pub derived: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            raw: PathBuf::from("data/weather.db"),
            traffic: PathBuf::from("data/traffic.db"),
            derived: PathBuf::from("data/comfort.db"),
        }
    }
}

/// Destination table and write policy for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub table: String,
    pub disposition: Disposition,
}

impl DatasetConfig {
    pub fn new(table: &str, disposition: Disposition) -> Self {
        Self {
            table: table.to_string(),
            disposition,
        }
    }
}

/// Telemetry provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    /// Forecast time step.
    pub timestep: Timestep,
    /// Days of history requested by the history run.
    pub history_days: u32,
    pub realtime: DatasetConfig,
    pub forecast: DatasetConfig,
    pub history: DatasetConfig,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tomorrow.io/v4".to_string(),
            timestep: Timestep::Hourly,
            history_days: 7,
            realtime: DatasetConfig::new("weather_realtime", Disposition::ReplaceAll),
            forecast: DatasetConfig::new("weather_forecast", Disposition::Append),
            history: DatasetConfig::new("weather_history", Disposition::Append),
        }
    }
}

/// One traffic grouping's destination plus its bucket column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficDatasetConfig {
    pub table: String,
    pub disposition: Disposition,
    /// Overrides the provider's default bucket column for this grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_field: Option<String>,
}

impl TrafficDatasetConfig {
    pub fn schema(&self, grouping: TrafficGrouping) -> TrafficSchema {
        match &self.date_field {
            Some(field) => TrafficSchema::new(grouping).with_date_field(field.clone()),
            None => TrafficSchema::new(grouping),
        }
    }
}

/// Traffic provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub base_url: String,
    pub daily: TrafficDatasetConfig,
    pub interval: TrafficDatasetConfig,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            base_url: "https://vea.sensourceinc.com".to_string(),
            daily: TrafficDatasetConfig {
                table: "gate_count".to_string(),
                disposition: Disposition::Append,
                date_field: None,
            },
            interval: TrafficDatasetConfig {
                table: "gate_interval".to_string(),
                disposition: Disposition::ReplaceAll,
                date_field: None,
            },
        }
    }
}

/// Scoring run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub scale: ScaleSpec,
    /// Decimal places kept when rounding the raw score.
    pub precision: u32,
    /// Raw tables scored on each run.
    pub sources: Vec<String>,
    pub table: String,
    pub disposition: Disposition,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            scale: ScaleSpec::Coarse,
            precision: 0,
            sources: vec!["weather_realtime".to_string(), "weather_forecast".to_string()],
            table: "comfort_scores".to_string(),
            disposition: Disposition::UpsertByKey,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl IngesterConfig {
    /// Load from a YAML file, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_yaml_str(&content)
                    .with_context(|| format!("Failed to load config file: {}", path.display()))?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse YAML after environment substitution.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Self = serde_yaml::from_str(&expanded).context("Failed to parse YAML")?;
        Ok(config)
    }

    pub fn validate(&self) -> ComfortResult<()> {
        if self.site.location.trim().is_empty() {
            return Err(ComfortError::InvalidConfig("site.location is empty".to_string()));
        }

        for table in [
            &self.weather.realtime.table,
            &self.weather.forecast.table,
            &self.weather.history.table,
            &self.traffic.daily.table,
            &self.traffic.interval.table,
            &self.scoring.table,
        ]
        .into_iter()
        .chain(self.scoring.sources.iter())
        {
            validate_table_name(table)?;
        }

        if self.weather.history_days == 0 {
            return Err(ComfortError::InvalidConfig(
                "weather.history_days must be at least 1".to_string(),
            ));
        }

        if self.scoring.sources.is_empty() {
            return Err(ComfortError::InvalidConfig(
                "scoring.sources lists no tables".to_string(),
            ));
        }

        self.scoring.scale.build()?;
        Ok(())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Provider secrets, read from the process environment.
#[derive(Clone, Default)]
pub struct Credentials {
    pub tomorrow_api_key: Option<String>,
    pub sensource_token: Option<String>,
}

impl Credentials {
    pub const TOMORROW_API_KEY: &'static str = "TOMORROW_API_KEY";
    /// Older deployments name the telemetry key just `API_KEY`.
    pub const LEGACY_API_KEY: &'static str = "API_KEY";
    pub const SENSOURCE_TOKEN: &'static str = "SENSOURCE_TOKEN";

    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            tomorrow_api_key: var(Self::TOMORROW_API_KEY).or_else(|| var(Self::LEGACY_API_KEY)),
            sensource_token: var(Self::SENSOURCE_TOKEN),
        }
    }

    pub fn tomorrow(&self) -> ComfortResult<&str> {
        self.tomorrow_api_key
            .as_deref()
            .ok_or_else(|| ComfortError::MissingCredential(Self::TOMORROW_API_KEY.to_string()))
    }

    pub fn sensource(&self) -> ComfortResult<&str> {
        self.sensource_token
            .as_deref()
            .ok_or_else(|| ComfortError::MissingCredential(Self::SENSOURCE_TOKEN.to_string()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("tomorrow_api_key", &mask(&self.tomorrow_api_key))
            .field("sensource_token", &mask(&self.sensource_token))
            .finish()
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
