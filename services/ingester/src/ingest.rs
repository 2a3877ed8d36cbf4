//! Run orchestration: fetch, normalize, persist.
//!
//! Every run fully normalizes its payload before touching a store, so a fetch
//! or schema failure never leaves a partial write behind. The write itself is
//! one transaction.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use comfort_common::{ComfortError, ComfortResult, DerivedScore, Gate, GateInterval, GateSummary};
use ingestion::{collect_weather, normalize_daily, normalize_intervals, TrafficGrouping, WeatherSchema};
use scoring::{ScoringEngine, ScoringModel};
use storage::{Disposition, ObservationQuery, RawStoreReader, ScoreQuery, Store};

use crate::config::{DatasetConfig, IngesterConfig};
use crate::context::RunContext;
use crate::sources::{DateWindow, TelemetrySource, TrafficSource};

/// Outcome of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub table: String,
    pub disposition: Disposition,
    /// Records produced by normalization.
    pub records: usize,
    /// Rows the store reported written.
    pub written: u64,
}

/// Year-to-date ingress and egress for one gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateFlow {
    pub gate: Gate,
    /// 15-minute buckets with any traffic.
    pub records: i64,
    pub ingress: i64,
    pub egress: i64,
    /// Ingress minus egress.
    pub net: i64,
}

/// Snapshot of stored traffic and recent scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub gates: Vec<GateSummary>,
    pub flows: Vec<GateFlow>,
    /// Busiest 15-minute buckets by ingress.
    pub busiest: Vec<GateInterval>,
    pub latest_scores: Vec<DerivedScore>,
}

/// Per-gate totals over interval rows, in gate order.
pub fn gate_flows(intervals: &[GateInterval]) -> Vec<GateFlow> {
    let mut totals: BTreeMap<Gate, (i64, i64, i64)> = BTreeMap::new();
    for interval in intervals {
        let entry = totals.entry(interval.gate).or_insert((0, 0, 0));
        entry.0 += 1;
        entry.1 += interval.ingress;
        entry.2 += interval.egress;
    }

    totals
        .into_iter()
        .map(|(gate, (records, ingress, egress))| GateFlow {
            gate,
            records,
            ingress,
            egress,
            net: ingress - egress,
        })
        .collect()
}

/// Drives weather, traffic and scoring runs from one configuration.
pub struct Ingestor {
    config: IngesterConfig,
    engine: ScoringEngine,
}

impl Ingestor {
    pub fn new(config: IngesterConfig) -> ComfortResult<Self> {
        let scale = config.scoring.scale.build()?;
        let model = ScoringModel {
            precision: config.scoring.precision,
            ..ScoringModel::default()
        };

        Ok(Self {
            engine: ScoringEngine::new(model, scale),
            config,
        })
    }

    pub fn config(&self) -> &IngesterConfig {
        &self.config
    }

    /// Destination configured for a telemetry mode.
    pub fn weather_dataset(&self, schema: WeatherSchema) -> &DatasetConfig {
        match schema {
            WeatherSchema::Realtime => &self.config.weather.realtime,
            WeatherSchema::Forecast { .. } => &self.config.weather.forecast,
            WeatherSchema::History => &self.config.weather.history,
        }
    }

    /// Fetch one telemetry mode and persist its observations.
    #[instrument(skip(self, ctx, source, store, schema), fields(run_id = %ctx.run_id, schema = %schema))]
    pub async fn run_weather(
        &self,
        ctx: &RunContext,
        source: &dyn TelemetrySource,
        store: &Store,
        schema: WeatherSchema,
    ) -> ComfortResult<RunReport> {
        let dataset = self.weather_dataset(schema);

        let result = async {
            let payload = source.fetch(ctx, schema).await?;
            let records = collect_weather(&payload, schema, &self.config.site.location, ctx.zone)?;
            info!(source = source.name(), records = records.len(), "Normalized weather");

            let written = store.write(&dataset.table, &records, dataset.disposition).await?;
            Ok::<_, ComfortError>((records.len(), written))
        }
        .await;

        self.finish(ctx, dataset.table.as_str(), dataset.disposition, result)
    }

    /// Fetch one traffic grouping for the window ending on `date`.
    #[instrument(skip(self, ctx, source, store, grouping), fields(run_id = %ctx.run_id, grouping = grouping.name()))]
    pub async fn run_traffic(
        &self,
        ctx: &RunContext,
        source: &dyn TrafficSource,
        store: &Store,
        grouping: TrafficGrouping,
        date: NaiveDate,
    ) -> ComfortResult<RunReport> {
        let dataset = match grouping {
            TrafficGrouping::Day => &self.config.traffic.daily,
            TrafficGrouping::Interval => &self.config.traffic.interval,
        };
        let schema = dataset.schema(grouping);
        let window = DateWindow::for_grouping(grouping, date);

        let result = async {
            let payload = source.fetch(ctx, grouping, window).await?;
            let written = match grouping {
                TrafficGrouping::Day => {
                    let records = normalize_daily(&payload, &schema)?;
                    info!(source = source.name(), records = records.len(), "Normalized daily traffic");
                    (records.len(), store.write(&dataset.table, &records, dataset.disposition).await?)
                }
                TrafficGrouping::Interval => {
                    let records = normalize_intervals(&payload, &schema, ctx.zone)?;
                    info!(source = source.name(), records = records.len(), "Normalized interval traffic");
                    (records.len(), store.write(&dataset.table, &records, dataset.disposition).await?)
                }
            };
            Ok::<_, ComfortError>(written)
        }
        .await;

        self.finish(ctx, dataset.table.as_str(), dataset.disposition, result)
    }

    /// Score every observation in the configured raw tables.
    ///
    /// Raw data is only reachable through the read-only `reader`; scores go to
    /// `derived` in a single batch.
    #[instrument(skip(self, ctx, reader, derived), fields(run_id = %ctx.run_id))]
    pub async fn run_scoring(
        &self,
        ctx: &RunContext,
        reader: &RawStoreReader,
        derived: &Store,
    ) -> ComfortResult<RunReport> {
        let scoring = &self.config.scoring;

        let result = async {
            let mut scores = Vec::new();
            for table in &scoring.sources {
                let observations = reader.read_observations(table, &ObservationQuery::all()).await?;
                if observations.is_empty() {
                    warn!(table = %table, "No observations to score");
                }
                scores.extend(observations.iter().map(|o| self.engine.derive(o)));
            }

            info!(scores = scores.len(), "Scored observations");
            let written = derived.write(&scoring.table, &scores, scoring.disposition).await?;
            Ok::<_, ComfortError>((scores.len(), written))
        }
        .await;

        self.finish(ctx, scoring.table.as_str(), scoring.disposition, result)
    }

    /// Per-gate statistics, interval flows and the newest scores.
    ///
    /// Reads only; both stores are attached read-only.
    pub async fn summary(
        &self,
        traffic: &RawStoreReader,
        derived: &RawStoreReader,
        limit: i64,
    ) -> ComfortResult<Summary> {
        let gates = traffic.gate_summary(&self.config.traffic.daily.table).await?;

        let intervals = traffic
            .read_gate_intervals(&self.config.traffic.interval.table, None, None)
            .await?;
        let flows = gate_flows(&intervals);

        let mut busiest = intervals;
        busiest.sort_by(|a, b| b.ingress.cmp(&a.ingress).then(a.date_time.cmp(&b.date_time)));
        busiest.truncate(usize::try_from(limit).unwrap_or(0));

        let latest_scores = derived
            .read_scores(
                &self.config.scoring.table,
                &ScoreQuery {
                    limit: Some(limit),
                    ..Default::default()
                },
            )
            .await?;

        Ok(Summary {
            gates,
            flows,
            busiest,
            latest_scores,
        })
    }

    fn finish(
        &self,
        ctx: &RunContext,
        table: &str,
        disposition: Disposition,
        result: ComfortResult<(usize, u64)>,
    ) -> ComfortResult<RunReport> {
        match result {
            Ok((records, written)) => {
                counter!("records_written_total", "table" => table.to_string()).increment(written);
                info!(
                    run_id = %ctx.run_id,
                    table = %table,
                    disposition = %disposition,
                    records = records,
                    written = written,
                    "Run complete"
                );
                Ok(RunReport {
                    run_id: ctx.run_id,
                    table: table.to_string(),
                    disposition,
                    records,
                    written,
                })
            }
            Err(e) => {
                counter!("runs_failed_total", "table" => table.to_string(), "kind" => e.kind())
                    .increment(1);
                error!(
                    run_id = %ctx.run_id,
                    table = %table,
                    kind = e.kind(),
                    pre_persist = e.is_pre_persist(),
                    error = %e,
                    "Run failed"
                );
                Err(e)
            }
        }
    }
}
