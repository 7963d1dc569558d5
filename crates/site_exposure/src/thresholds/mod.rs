//! Compliance thresholds inferred from certification requirement text.
//!
//! Regulation documents are scanned with [`parser::resolve_thresholds`]; the resulting
//! [`ThresholdSet`] is what the classifier compares exposure values against. Parsing
//! never fails: a metric without any match falls back to [`DEFAULT_SUN_HOURS`] or
//! [`DEFAULT_DAYLIGHT_FACTOR`].
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod cache;
pub mod parser;

pub use cache::ThresholdCache;
pub use parser::{extract_thresholds, resolve_thresholds, scan_requirement, RequirementMatches};

/// Multiplier applied to a minimum when no explicit target is given.
pub const TARGET_FACTOR: f32 = 1.5;

/// Fallback for direct sun: 2 h minimum, 4 h target.
pub const DEFAULT_SUN_HOURS: Threshold = Threshold {
    minimum: 2.0,
    target: 4.0,
    source: ThresholdSource::Default,
};

/// Fallback for daylight factor: 2 % minimum, 4 % target (as fractions).
pub const DEFAULT_DAYLIGHT_FACTOR: Threshold = Threshold {
    minimum: 0.02,
    target: 0.04,
    source: ThresholdSource::Default,
};

/// Metrics that carry compliance thresholds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Hours of direct sun.
    SunHours,
    /// Daylight factor as a fraction (0.02 == 2 %).
    DaylightFactor,
    /// Prevailing-wind exposure; never has thresholds.
    WindExposure,
}

/// Where a threshold value came from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdSource {
    Parsed,
    Default,
}

/// Minimum and target for one metric. `target >= minimum` always holds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub minimum: f32,
    pub target: f32,
    pub source: ThresholdSource,
}

impl Threshold {
    /// Threshold from a parsed minimum and an optional parsed target.
    ///
    /// Targets that are missing or below the minimum become `minimum × 1.5`.
    pub fn parsed(minimum: f32, target: Option<f32>) -> Self {
        let target = target
            .filter(|t| *t >= minimum)
            .unwrap_or(minimum * TARGET_FACTOR);
        Self {
            minimum,
            target,
            source: ThresholdSource::Parsed,
        }
    }
}

/// Per-metric thresholds. A metric without thresholds is `None`, never zero.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSet {
    pub sun_hours: Option<Threshold>,
    pub daylight_factor: Option<Threshold>,
}

impl Default for ThresholdSet {
    /// Engine-wide defaults for every metric that has them.
    fn default() -> Self {
        Self {
            sun_hours: Some(DEFAULT_SUN_HOURS),
            daylight_factor: Some(DEFAULT_DAYLIGHT_FACTOR),
        }
    }
}

impl ThresholdSet {
    pub fn get(&self, metric: MetricKind) -> Option<Threshold> {
        match metric {
            MetricKind::SunHours => self.sun_hours,
            MetricKind::DaylightFactor => self.daylight_factor,
            MetricKind::WindExposure => None,
        }
    }
}

/// A certification credit and its requirement sentences.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credit {
    pub name: String,
    pub requirement_texts: Vec<String>,
}

impl Credit {
    pub fn new<I, S>(name: impl Into<String>, requirement_texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            requirement_texts: requirement_texts.into_iter().map(Into::into).collect(),
        }
    }
}

/// One regulation or certification document (e.g. a green-building scheme).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RegulationDocument {
    pub name: String,
    pub credits: Vec<Credit>,
}

impl RegulationDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credits: Vec::new(),
        }
    }

    pub fn with_credit(mut self, credit: Credit) -> Self {
        self.credits.push(credit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_threshold_derives_target() {
        let t = Threshold::parsed(2.0, None);
        assert_eq!((t.minimum, t.target), (2.0, 3.0));
        assert_eq!(t.source, ThresholdSource::Parsed);
    }

    #[test]
    fn target_below_minimum_is_replaced() {
        let t = Threshold::parsed(4.0, Some(3.0));
        assert_eq!(t.target, 6.0);
        let t = Threshold::parsed(4.0, Some(5.0));
        assert_eq!(t.target, 5.0);
    }

    #[test]
    fn wind_never_has_thresholds() {
        assert!(ThresholdSet::default()
            .get(MetricKind::WindExposure)
            .is_none());
    }
}
