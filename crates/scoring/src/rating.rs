//! Rating scales: ordered threshold tables that label a comfort score.
//!
//! A scale is a list of cutoffs sorted from highest to lowest plus a floor
//! label. A score gets the label of the first cutoff it meets or exceeds; the
//! floor covers everything below the smallest cutoff. Any strictly descending
//! table is therefore exhaustive and contiguous over `[1, 100]`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use comfort_common::{ComfortError, ComfortResult};

use crate::{MAX_SCORE, MIN_SCORE};

/// One threshold row: scores `>= min_score` get `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cutoff {
    pub min_score: i32,
    pub label: String,
}

impl Cutoff {
    pub fn new(min_score: i32, label: impl Into<String>) -> Self {
        Self {
            min_score,
            label: label.into(),
        }
    }
}

/// Categorical rating of a score.
///
/// `tier` is 0 for the floor category and grows with perceived quality, so
/// ratings from the same scale order by tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rating {
    pub tier: usize,
    pub label: String,
}

impl PartialOrd for Rating {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rating {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tier.cmp(&other.tier)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Threshold table mapping scores to ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    /// Descending cutoffs, highest first.
    pub cutoffs: Vec<Cutoff>,
    /// Label for scores below the smallest cutoff.
    pub floor: String,
}

impl RatingScale {
    /// Build and validate a scale.
    pub fn new(cutoffs: Vec<Cutoff>, floor: impl Into<String>) -> ComfortResult<Self> {
        let scale = Self {
            cutoffs,
            floor: floor.into(),
        };
        scale.validate()?;
        Ok(scale)
    }

    /// Six-bucket scale.
    pub fn coarse() -> Self {
        Self {
            cutoffs: vec![
                Cutoff::new(90, "Excellent"),
                Cutoff::new(75, "Good"),
                Cutoff::new(60, "Fair"),
                Cutoff::new(45, "Poor"),
                Cutoff::new(30, "Bad"),
            ],
            floor: "Dangerous".to_string(),
        }
    }

    /// Sixteen-bucket scale.
    pub fn fine() -> Self {
        Self {
            cutoffs: vec![
                Cutoff::new(97, "Perfect"),
                Cutoff::new(93, "Exceptional"),
                Cutoff::new(88, "Excellent"),
                Cutoff::new(82, "Great"),
                Cutoff::new(76, "Very Good"),
                Cutoff::new(70, "Good"),
                Cutoff::new(64, "Pleasant"),
                Cutoff::new(58, "Fair"),
                Cutoff::new(52, "Mediocre"),
                Cutoff::new(46, "Marginal"),
                Cutoff::new(40, "Poor"),
                Cutoff::new(34, "Unpleasant"),
                Cutoff::new(28, "Bad"),
                Cutoff::new(22, "Very Bad"),
                Cutoff::new(15, "Severe"),
            ],
            floor: "Dangerous".to_string(),
        }
    }

    /// Number of categories, floor included.
    pub fn len(&self) -> usize {
        self.cutoffs.len() + 1
    }

    /// Always false: the floor category exists even with no cutoffs.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check that cutoffs are strictly descending and that every category,
    /// including the floor, is reachable by some score in `[1, 100]`.
    pub fn validate(&self) -> ComfortResult<()> {
        if self.floor.trim().is_empty() {
            return Err(ComfortError::InvalidRatingScale(
                "floor label is empty".to_string(),
            ));
        }

        let mut previous: Option<i32> = None;
        for cutoff in &self.cutoffs {
            if cutoff.label.trim().is_empty() {
                return Err(ComfortError::InvalidRatingScale(format!(
                    "cutoff {} has an empty label",
                    cutoff.min_score
                )));
            }
            if cutoff.min_score <= MIN_SCORE || cutoff.min_score > MAX_SCORE {
                return Err(ComfortError::InvalidRatingScale(format!(
                    "cutoff {} outside ({}, {}]",
                    cutoff.min_score, MIN_SCORE, MAX_SCORE
                )));
            }
            if let Some(prev) = previous {
                if cutoff.min_score >= prev {
                    return Err(ComfortError::InvalidRatingScale(format!(
                        "cutoffs must be strictly descending: {} follows {}",
                        cutoff.min_score, prev
                    )));
                }
            }
            previous = Some(cutoff.min_score);
        }

        Ok(())
    }

    /// Rate a score. Scores outside `[1, 100]` are clamped first.
    pub fn rate(&self, score: i32) -> Rating {
        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        let top_tier = self.cutoffs.len();

        self.cutoffs
            .iter()
            .position(|cutoff| score >= cutoff.min_score)
            .map(|idx| Rating {
                tier: top_tier - idx,
                label: self.cutoffs[idx].label.clone(),
            })
            .unwrap_or_else(|| Rating {
                tier: 0,
                label: self.floor.clone(),
            })
    }

    /// Labels from best to worst.
    pub fn labels(&self) -> Vec<&str> {
        self.cutoffs
            .iter()
            .map(|c| c.label.as_str())
            .chain(std::iter::once(self.floor.as_str()))
            .collect()
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self::coarse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scales_are_valid() {
        RatingScale::coarse().validate().unwrap();
        RatingScale::fine().validate().unwrap();
        assert_eq!(RatingScale::coarse().len(), 6);
        assert_eq!(RatingScale::fine().len(), 16);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let scale = RatingScale::coarse();
        assert_eq!(scale.rate(90).label, "Excellent");
        assert_eq!(scale.rate(89).label, "Good");
        assert_eq!(scale.rate(30).label, "Bad");
        assert_eq!(scale.rate(29).label, "Dangerous");
    }

    #[test]
    fn test_extremes() {
        let scale = RatingScale::fine();
        assert_eq!(scale.rate(100).label, "Perfect");
        assert_eq!(scale.rate(1).label, "Dangerous");
        assert_eq!(scale.rate(1).tier, 0);
        assert_eq!(scale.rate(100).tier, 15);
    }

    #[test]
    fn test_out_of_range_scores_clamp() {
        let scale = RatingScale::coarse();
        assert_eq!(scale.rate(250), scale.rate(100));
        assert_eq!(scale.rate(-5), scale.rate(1));
    }

    #[test]
    fn test_rejects_unordered_cutoffs() {
        let err = RatingScale::new(
            vec![Cutoff::new(50, "Ok"), Cutoff::new(70, "Great")],
            "Bad",
        )
        .unwrap_err();
        assert!(err.to_string().contains("strictly descending"));
    }

    #[test]
    fn test_rejects_duplicate_cutoffs() {
        assert!(RatingScale::new(vec![Cutoff::new(50, "A"), Cutoff::new(50, "B")], "C").is_err());
    }

    #[test]
    fn test_rejects_unreachable_floor() {
        // A cutoff of 1 would swallow every score and leave the floor unused.
        assert!(RatingScale::new(vec![Cutoff::new(1, "Everything")], "Nothing").is_err());
    }

    #[test]
    fn test_single_bucket_scale() {
        let scale = RatingScale::new(Vec::new(), "Unrated").unwrap();
        assert_eq!(scale.rate(73).label, "Unrated");
        assert_eq!(scale.len(), 1);
        assert!(!scale.is_empty());
    }

    #[test]
    fn test_labels_order() {
        let scale = RatingScale::coarse();
        let labels = scale.labels();
        assert_eq!(labels.first(), Some(&"Excellent"));
        assert_eq!(labels.last(), Some(&"Dangerous"));
    }
}
