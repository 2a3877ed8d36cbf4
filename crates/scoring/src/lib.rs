//! Comfort scoring.
//!
//! Converts a canonical [`comfort_common::RawObservation`] into an integer
//! comfort score in `[1, 100]` and a categorical rating. Pure: no I/O.
//!
//! # Algorithm
//!
//! 1. Start from a baseline of 100.
//! 2. Add one contribution per [`Term`]; each term is an ordered rule list and
//!    only its first matching rule counts.
//! 3. Round the sum, clamp into `[1, 100]`.
//! 4. Look the score up in a [`RatingScale`].

pub mod model;
pub mod rating;
pub mod rules;

use serde::{Deserialize, Serialize};

use comfort_common::ComfortResult;

pub use model::{default_terms, Assessment, Breakdown, ScoringEngine, ScoringModel, BASELINE};
pub use rating::{Cutoff, Rating, RatingScale};
pub use rules::{Conditions, Factor, Predicate, Rule, Term};

/// Lowest possible comfort score.
pub const MIN_SCORE: i32 = 1;
/// Highest possible comfort score.
pub const MAX_SCORE: i32 = 100;

/// Rating scale selection as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleSpec {
    #[default]
    Coarse,
    Fine,
    Custom { cutoffs: Vec<Cutoff>, floor: String },
}

impl ScaleSpec {
    pub fn build(&self) -> ComfortResult<RatingScale> {
        match self {
            ScaleSpec::Coarse => Ok(RatingScale::coarse()),
            ScaleSpec::Fine => Ok(RatingScale::fine()),
            ScaleSpec::Custom { cutoffs, floor } => RatingScale::new(cutoffs.clone(), floor.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_spec_builds() {
        assert_eq!(ScaleSpec::Coarse.build().unwrap().len(), 6);
        assert_eq!(ScaleSpec::Fine.build().unwrap().len(), 16);

        let custom = ScaleSpec::Custom {
            cutoffs: vec![Cutoff::new(50, "Open")],
            floor: "Closed".to_string(),
        };
        assert_eq!(custom.build().unwrap().rate(49).label, "Closed");
    }

    #[test]
    fn test_invalid_custom_scale() {
        let custom = ScaleSpec::Custom {
            cutoffs: vec![Cutoff::new(40, "Low"), Cutoff::new(60, "High")],
            floor: "None".to_string(),
        };
        assert!(custom.build().is_err());
    }
}
