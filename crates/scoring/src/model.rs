//! The comfort scoring model and its default rule set.

use serde::{Deserialize, Serialize};
use tracing::trace;

use comfort_common::{DerivedScore, RawObservation};

use crate::rating::{Rating, RatingScale};
use crate::rules::{Conditions, Factor, Predicate, Rule, Term};
use crate::{MAX_SCORE, MIN_SCORE};

/// Score every term starts from.
pub const BASELINE: f64 = 100.0;

/// Baseline plus additive terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringModel {
    pub baseline: f64,
    /// Decimal places kept when rounding the raw sum.
    pub precision: u32,
    pub terms: Vec<Term>,
}

/// Score and rating for one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub score: i32,
    pub rating: Rating,
}

/// Per-term contributions, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub baseline: f64,
    pub contributions: Vec<(String, f64)>,
    pub raw_total: f64,
    pub score: i32,
}

impl ScoringModel {
    /// Sum of baseline and every term's first-match effect.
    pub fn raw_total(&self, conditions: &Conditions) -> f64 {
        self.baseline
            + self
                .terms
                .iter()
                .map(|term| term.evaluate(conditions))
                .sum::<f64>()
    }

    /// Round to the configured precision and clamp into `[1, 100]`.
    pub fn finalize(&self, raw_total: f64) -> i32 {
        let factor = 10f64.powi(self.precision as i32);
        let rounded = (raw_total * factor).round() / factor;
        if rounded.is_nan() {
            return MIN_SCORE;
        }
        // Integer scores truncate any kept decimals after clamping.
        rounded.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as i32
    }

    pub fn score(&self, conditions: &Conditions) -> i32 {
        self.finalize(self.raw_total(conditions))
    }

    pub fn breakdown(&self, conditions: &Conditions) -> Breakdown {
        let contributions: Vec<(String, f64)> = self
            .terms
            .iter()
            .map(|term| (term.name.clone(), term.evaluate(conditions)))
            .collect();
        let raw_total = self.baseline + contributions.iter().map(|(_, v)| v).sum::<f64>();

        Breakdown {
            baseline: self.baseline,
            contributions,
            raw_total,
            score: self.finalize(raw_total),
        }
    }
}

impl Default for ScoringModel {
    fn default() -> Self {
        Self {
            baseline: BASELINE,
            precision: 0,
            terms: default_terms(),
        }
    }
}

/// Scores observations and rates them on a configured scale.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    model: ScoringModel,
    scale: RatingScale,
}

impl ScoringEngine {
    pub fn new(model: ScoringModel, scale: RatingScale) -> Self {
        Self { model, scale }
    }

    pub fn with_scale(scale: RatingScale) -> Self {
        Self::new(ScoringModel::default(), scale)
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn scale(&self) -> &RatingScale {
        &self.scale
    }

    pub fn assess(&self, observation: &RawObservation) -> Assessment {
        let conditions = Conditions::from(observation);
        let score = self.model.score(&conditions);
        let rating = self.scale.rate(score);

        trace!(
            time = %observation.time,
            score = score,
            rating = %rating,
            "Scored observation"
        );

        Assessment { score, rating }
    }

    /// Build the derived row for an observation.
    pub fn derive(&self, observation: &RawObservation) -> DerivedScore {
        let assessment = self.assess(observation);
        DerivedScore {
            time: observation.time,
            location: observation.location.clone(),
            score: assessment.score,
            rating: assessment.rating.label,
        }
    }
}

/// Default terms: penalties first, then the small ideal-condition bonuses.
///
/// Each term is authored high-to-low (or with disjoint conjunctions) so that
/// exactly one rule fires per term.
pub fn default_terms() -> Vec<Term> {
    use Factor::*;
    use Predicate::*;

    let dry = || AtMost(PrecipitationIntensity, 0.0);

    vec![
        Term::new(
            "temperature",
            vec![
                Rule::new(AtLeast(Temperature, 100.0), -55.0),
                Rule::new(AtLeast(Temperature, 95.0), -45.0),
                Rule::new(AtLeast(Temperature, 90.0), -30.0),
                Rule::new(AtLeast(Temperature, 85.0), -18.0),
                Rule::new(AtLeast(Temperature, 80.0), -8.0),
                Rule::new(AtLeast(Temperature, 60.0), 0.0),
                Rule::new(AtLeast(Temperature, 50.0), -5.0),
                Rule::new(AtLeast(Temperature, 40.0), -15.0),
                Rule::new(AtLeast(Temperature, 32.0), -28.0),
                Rule::new(AtLeast(Temperature, 20.0), -40.0),
                Rule::new(Below(Temperature, 20.0), -55.0),
            ],
        ),
        Term::new(
            "humidity",
            vec![
                Rule::new(AtLeast(Humidity, 80.0).and(AtLeast(Temperature, 85.0)), -25.0),
                Rule::new(AtLeast(Humidity, 70.0).and(AtLeast(Temperature, 80.0)), -15.0),
                Rule::new(AtLeast(Humidity, 85.0), -10.0),
                Rule::new(AtLeast(Humidity, 70.0), -5.0),
                Rule::new(Below(Humidity, 20.0), -5.0),
            ],
        ),
        Term::new(
            "wind",
            vec![
                Rule::new(AtLeast(WindSpeed, 35.0), -35.0),
                Rule::new(AtLeast(WindSpeed, 25.0), -22.0),
                Rule::new(AtLeast(WindSpeed, 15.0).and(Below(Temperature, 45.0)), -15.0),
                Rule::new(AtLeast(WindSpeed, 15.0), -8.0),
                Rule::new(AtLeast(WindSpeed, 10.0).and(Below(Temperature, 40.0)), -6.0),
            ],
        ),
        Term::new(
            "precipitation",
            vec![
                Rule::new(AtLeast(PrecipitationIntensity, 4.0), -45.0),
                Rule::new(AtLeast(PrecipitationIntensity, 1.0), -30.0),
                Rule::new(AtLeast(PrecipitationIntensity, 0.25), -18.0),
                Rule::new(Above(PrecipitationIntensity, 0.0), -8.0),
            ],
        ),
        Term::new("cloud_cover", vec![Rule::new(AtLeast(CloudCover, 90.0), -5.0)]),
        Term::new(
            "uv",
            vec![
                Rule::new(AtLeast(UvIndex, 11.0), -15.0),
                Rule::new(AtLeast(UvIndex, 8.0), -10.0),
                Rule::new(AtLeast(UvIndex, 6.0), -5.0),
            ],
        ),
        Term::new(
            "ideal_comfort_bonus",
            vec![Rule::new(
                Between(Temperature, 60.0, 78.0)
                    .and(Between(Humidity, 30.0, 60.0))
                    .and(dry()),
                5.0,
            )],
        ),
        Term::new(
            "partial_cloud_bonus",
            vec![Rule::new(Between(CloudCover, 20.0, 60.0).and(dry()), 3.0)],
        ),
        Term::new(
            "cool_calm_bonus",
            vec![Rule::new(
                Between(Temperature, 50.0, 65.0)
                    .and(Below(WindSpeed, 8.0))
                    .and(dry()),
                2.0,
            )],
        ),
    ]
}
