//! Compliance bands and heatmap colors.
//!
//! With a threshold for the value's metric, values fall into one of three [`Band`]s with
//! fixed colors. Without one (no certification context, or wind exposure) the value is
//! normalized over a per-metric range and colored on a blue-to-red hue gradient.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::{ExposureValue, NEUTRAL_EXPOSURE};
use crate::thresholds::{MetricKind, Threshold, ThresholdSet};

/// Linear RGBA color in [0, 1].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const GREEN: Rgba = Rgba::rgb(0.0, 0.8, 0.0);
    pub const YELLOW: Rgba = Rgba::rgb(1.0, 0.85, 0.0);
    pub const RED: Rgba = Rgba::rgb(0.9, 0.0, 0.0);
    /// Used for vertices that could not be sampled.
    pub const NEUTRAL_GREY: Rgba = Rgba::rgb(0.5, 0.5, 0.5);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Quantizes to 8 bits per channel.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Color from hue in degrees, saturation and lightness in [0, 1].
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = lightness - c * 0.5;
        Rgba::rgb(r + m, g + m, b + m)
    }
}

/// Compliance class of a value against a threshold.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    BelowMinimum,
    MeetsMinimum,
    ExceedsTarget,
}

impl Band {
    pub fn color(self) -> Rgba {
        match self {
            Band::BelowMinimum => Rgba::RED,
            Band::MeetsMinimum => Rgba::YELLOW,
            Band::ExceedsTarget => Rgba::GREEN,
        }
    }
}

/// Outcome of classifying one value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    Band(Band),
    /// Position in [0, 1] along the metric's gradient range.
    Gradient(f32),
}

impl Classification {
    pub fn color(self) -> Rgba {
        match self {
            Classification::Band(band) => band.color(),
            Classification::Gradient(t) => gradient_color(t),
        }
    }

    pub fn band(self) -> Option<Band> {
        match self {
            Classification::Band(band) => Some(band),
            Classification::Gradient(_) => None,
        }
    }
}

/// Places `value` into a band. Boundaries are inclusive at the bottom of each band.
pub fn classify_band(value: f32, threshold: &Threshold) -> Band {
    if value >= threshold.target {
        Band::ExceedsTarget
    } else if value >= threshold.minimum {
        Band::MeetsMinimum
    } else {
        Band::BelowMinimum
    }
}

/// Blue at `t = 0` through green to red at `t = 1`.
pub fn gradient_color(t: f32) -> Rgba {
    let t = if t.is_finite() {
        t.clamp(0.0, 1.0)
    } else {
        NEUTRAL_EXPOSURE
    };
    Rgba::from_hsl((1.0 - t) * 240.0, 1.0, 0.5)
}

/// Classifies exposure values against an optional threshold context.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceClassifier {
    thresholds: Option<ThresholdSet>,
    sun_hours_range: f32,
}

impl ComplianceClassifier {
    /// `window_hours` is the upper end of the sun-hours gradient.
    pub fn new(thresholds: Option<ThresholdSet>, window_hours: f32) -> Self {
        Self {
            thresholds,
            sun_hours_range: window_hours,
        }
    }

    pub fn thresholds(&self) -> Option<&ThresholdSet> {
        self.thresholds.as_ref()
    }

    /// Normalization range used when a metric is shown as a gradient.
    pub fn gradient_range(&self, metric: MetricKind) -> (f32, f32) {
        match metric {
            MetricKind::SunHours => (0.0, self.sun_hours_range),
            MetricKind::DaylightFactor | MetricKind::WindExposure => (0.0, 1.0),
        }
    }

    pub fn classify(&self, value: ExposureValue) -> Classification {
        let metric = value.metric();
        let magnitude = value.magnitude();

        if let Some(threshold) = self.thresholds.and_then(|set| set.get(metric)) {
            return Classification::Band(classify_band(magnitude, &threshold));
        }

        let (lo, hi) = self.gradient_range(metric);
        let t = if hi > lo {
            (magnitude - lo) / (hi - lo)
        } else {
            NEUTRAL_EXPOSURE
        };
        Classification::Gradient(if t.is_finite() {
            t.clamp(0.0, 1.0)
        } else {
            NEUTRAL_EXPOSURE
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DaylightFactor, Hours, WindExposure};
    use crate::thresholds::{DEFAULT_DAYLIGHT_FACTOR, DEFAULT_SUN_HOURS};

    fn approx(a: Rgba, b: Rgba) -> bool {
        (a.r - b.r).abs() < 1e-5 && (a.g - b.g).abs() < 1e-5 && (a.b - b.b).abs() < 1e-5
    }

    #[test]
    fn full_sun_exceeds_target_and_shadow_is_below() {
        let classifier = ComplianceClassifier::new(Some(ThresholdSet::default()), 8.0);
        let lit = classifier.classify(ExposureValue::Hours(Hours(8.0)));
        let shaded = classifier.classify(ExposureValue::Hours(Hours(0.0)));
        assert_eq!(lit, Classification::Band(Band::ExceedsTarget));
        assert_eq!(lit.color(), Rgba::GREEN);
        assert_eq!(shaded, Classification::Band(Band::BelowMinimum));
        assert_eq!(shaded.color(), Rgba::RED);
    }

    #[test]
    fn band_boundaries_are_inclusive_at_the_bottom() {
        let t = DEFAULT_SUN_HOURS;
        assert_eq!(classify_band(1.999, &t), Band::BelowMinimum);
        assert_eq!(classify_band(2.0, &t), Band::MeetsMinimum);
        assert_eq!(classify_band(3.999, &t), Band::MeetsMinimum);
        assert_eq!(classify_band(4.0, &t), Band::ExceedsTarget);
    }

    #[test]
    fn bands_partition_the_range_monotonically() {
        let t = Threshold::parsed(2.5, None);
        let mut previous = Band::BelowMinimum;
        for step in 0..=1000 {
            let band = classify_band(step as f32 * 0.01, &t);
            assert!(band >= previous, "band went down at step {step}");
            previous = band;
        }
        assert_eq!(previous, Band::ExceedsTarget);
    }

    #[test]
    fn daylight_proxy_is_compared_as_a_fraction() {
        let classifier = ComplianceClassifier::new(Some(ThresholdSet::default()), 8.0);
        let c = classifier.classify(ExposureValue::DaylightFactor(DaylightFactor(0.03)));
        assert_eq!(c, Classification::Band(Band::MeetsMinimum));
        assert!(DEFAULT_DAYLIGHT_FACTOR.minimum <= 0.03);
    }

    #[test]
    fn no_context_uses_window_gradient() {
        let classifier = ComplianceClassifier::new(None, 8.0);
        assert_eq!(
            classifier.classify(ExposureValue::Hours(Hours(4.0))),
            Classification::Gradient(0.5)
        );
        assert_eq!(
            classifier.classify(ExposureValue::Hours(Hours(12.0))),
            Classification::Gradient(1.0)
        );
        assert!(classifier
            .classify(ExposureValue::Hours(Hours(8.0)))
            .band()
            .is_none());
    }

    #[test]
    fn wind_is_always_a_gradient() {
        let classifier = ComplianceClassifier::new(Some(ThresholdSet::default()), 8.0);
        assert_eq!(
            classifier.classify(ExposureValue::Wind(WindExposure(0.25))),
            Classification::Gradient(0.25)
        );
    }

    #[test]
    fn gradient_runs_blue_to_red() {
        assert!(approx(gradient_color(0.0), Rgba::rgb(0.0, 0.0, 1.0)));
        assert!(approx(gradient_color(0.5), Rgba::rgb(0.0, 1.0, 0.0)));
        assert!(approx(gradient_color(1.0), Rgba::rgb(1.0, 0.0, 0.0)));
        assert_eq!(gradient_color(f32::NAN), gradient_color(0.5));
    }

    #[test]
    fn quantizes_to_bytes() {
        assert_eq!(Rgba::NEUTRAL_GREY.to_rgba8(), [128, 128, 128, 255]);
        assert_eq!(Rgba::rgb(2.0, -1.0, 0.0).to_rgba8(), [255, 0, 0, 255]);
    }
}
