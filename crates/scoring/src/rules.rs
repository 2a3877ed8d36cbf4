//! Ordered first-match rules.
//!
//! A [`Term`] is an ordered list of `(predicate, effect)` rules. Only the first
//! rule whose predicate matches contributes; if none match the term adds
//! nothing. Terms are independent and are summed by the scoring model.

use serde::{Deserialize, Serialize};

use comfort_common::RawObservation;

/// Environmental input a predicate can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Degrees Fahrenheit
    Temperature,
    /// Relative humidity, percent
    Humidity,
    /// Miles per hour
    WindSpeed,
    /// Inches per hour
    PrecipitationIntensity,
    /// Percent of sky covered
    CloudCover,
    UvIndex,
}

/// Scoring inputs extracted from an observation.
///
/// Precipitation, wind, cloud cover and UV default to zero when the provider
/// did not report them: no reading means nothing observed. Temperature and
/// humidity have no neutral value, so rules testing them simply do not match
/// when they are absent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Conditions {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: f64,
    pub precipitation_intensity: f64,
    pub cloud_cover: f64,
    pub uv_index: f64,
}

impl Conditions {
    pub fn value(&self, factor: Factor) -> Option<f64> {
        match factor {
            Factor::Temperature => self.temperature,
            Factor::Humidity => self.humidity,
            Factor::WindSpeed => Some(self.wind_speed),
            Factor::PrecipitationIntensity => Some(self.precipitation_intensity),
            Factor::CloudCover => Some(self.cloud_cover),
            Factor::UvIndex => Some(self.uv_index),
        }
        .filter(|v| v.is_finite())
    }
}

impl From<&RawObservation> for Conditions {
    fn from(obs: &RawObservation) -> Self {
        Self {
            temperature: obs.temperature,
            humidity: obs.humidity,
            wind_speed: obs.wind_speed.unwrap_or(0.0),
            precipitation_intensity: obs.precipitation_intensity.unwrap_or(0.0),
            cloud_cover: obs.cloud_cover.unwrap_or(0.0),
            uv_index: obs.uv_index.unwrap_or(0.0),
        }
    }
}

/// Condition a rule fires on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// `factor >= value`
    AtLeast(Factor, f64),
    /// `factor > value`
    Above(Factor, f64),
    /// `factor < value`
    Below(Factor, f64),
    /// `factor <= value`
    AtMost(Factor, f64),
    /// `low <= factor <= high`
    Between(Factor, f64, f64),
    /// Every inner predicate matches.
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn matches(&self, conditions: &Conditions) -> bool {
        let test = |factor: Factor, check: &dyn Fn(f64) -> bool| {
            conditions.value(factor).map_or(false, check)
        };

        match self {
            Predicate::AtLeast(f, v) => test(*f, &|x: f64| x >= *v),
            Predicate::Above(f, v) => test(*f, &|x: f64| x > *v),
            Predicate::Below(f, v) => test(*f, &|x: f64| x < *v),
            Predicate::AtMost(f, v) => test(*f, &|x: f64| x <= *v),
            Predicate::Between(f, lo, hi) => test(*f, &|x: f64| x >= *lo && x <= *hi),
            Predicate::All(inner) => inner.iter().all(|p| p.matches(conditions)),
        }
    }

    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::All(mut inner) => {
                inner.push(other);
                Predicate::All(inner)
            }
            first => Predicate::All(vec![first, other]),
        }
    }
}

/// A predicate paired with the score adjustment it applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub when: Predicate,
    pub effect: f64,
}

impl Rule {
    pub fn new(when: Predicate, effect: f64) -> Self {
        Self { when, effect }
    }
}

/// Named, ordered rule list evaluated first-match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl Term {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// The first matching rule, if any.
    pub fn matching_rule(&self, conditions: &Conditions) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.when.matches(conditions))
    }

    /// Contribution of this term: the first matching rule's effect, or zero.
    pub fn evaluate(&self, conditions: &Conditions) -> f64 {
        self.matching_rule(conditions).map_or(0.0, |rule| rule.effect)
    }
}
