//! Structured uncertainty attached to verdicts and decisions.
//!
//! The JSON shape is an external contract and must stay field-for-field:
//!
//! ```json
//! {
//!   "verdict": "approve",
//!   "uncertainty_level": 0.2,
//!   "uncertainty_reason": "members agree",
//!   "confidence_bounds": { "lower": 0.7, "upper": 0.9 }
//! }
//! ```
//!
//! Deserialization goes through the same validation as [`UncertaintyReport::new`],
//! so an out-of-range report cannot be smuggled in over the wire.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::Result;

fn in_unit_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Lower and upper confidence bound, both in `[0, 1]` with `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct ConfidenceBounds {
    lower: f64,
    upper: f64,
}

#[derive(Deserialize)]
struct RawBounds {
    lower: f64,
    upper: f64,
}

impl TryFrom<RawBounds> for ConfidenceBounds {
    type Error = ModelError;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.lower, raw.upper)
    }
}

impl ConfidenceBounds {
    /// Creates validated bounds.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidUncertaintyBounds`] if either bound is outside
    /// `[0, 1]` (including NaN) or `lower > upper`.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !in_unit_range(lower) || !in_unit_range(upper) {
            return Err(ModelError::InvalidUncertaintyBounds(format!(
                "bounds [{lower}, {upper}] outside [0, 1]"
            )));
        }
        if lower > upper {
            return Err(ModelError::InvalidUncertaintyBounds(format!(
                "lower {lower} > upper {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Lower bound.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Width of the interval.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// An honest statement of how sure a verdict is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReport")]
pub struct UncertaintyReport {
    verdict: String,
    uncertainty_level: f64,
    uncertainty_reason: String,
    confidence_bounds: ConfidenceBounds,
}

#[derive(Deserialize)]
struct RawReport {
    verdict: String,
    uncertainty_level: f64,
    uncertainty_reason: String,
    confidence_bounds: ConfidenceBounds,
}

impl TryFrom<RawReport> for UncertaintyReport {
    type Error = ModelError;

    fn try_from(raw: RawReport) -> Result<Self> {
        Self::with_bounds(
            raw.verdict,
            raw.uncertainty_level,
            raw.uncertainty_reason,
            raw.confidence_bounds,
        )
    }
}

impl UncertaintyReport {
    /// Creates a validated report.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidUncertaintyBounds`] if the level or either bound is
    /// outside `[0, 1]`, or `lower > upper`.
    pub fn new(
        verdict: impl Into<String>,
        uncertainty_level: f64,
        uncertainty_reason: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> Result<Self> {
        let bounds = ConfidenceBounds::new(lower, upper)?;
        Self::with_bounds(verdict, uncertainty_level, uncertainty_reason, bounds)
    }

    /// Creates a report from already-validated bounds.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidUncertaintyBounds`] if the level is outside `[0, 1]`.
    pub fn with_bounds(
        verdict: impl Into<String>,
        uncertainty_level: f64,
        uncertainty_reason: impl Into<String>,
        confidence_bounds: ConfidenceBounds,
    ) -> Result<Self> {
        if !in_unit_range(uncertainty_level) {
            return Err(ModelError::InvalidUncertaintyBounds(format!(
                "uncertainty level {uncertainty_level} outside [0, 1]"
            )));
        }
        Ok(Self {
            verdict: verdict.into(),
            uncertainty_level,
            uncertainty_reason: uncertainty_reason.into(),
            confidence_bounds,
        })
    }

    /// Derives a report from a single confidence value.
    ///
    /// The level is `1 - confidence`; the bounds are centred on the
    /// confidence with half the uncertainty on each side. A confidence
    /// outside `[0, 1]` is clamped first and NaN counts as zero confidence,
    /// so the result always satisfies the bounds invariant.
    pub fn from_confidence(
        verdict: impl Into<String>,
        confidence: f64,
        uncertainty_reason: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        let level = 1.0 - confidence;
        let spread = level / 2.0;
        let lower = (confidence - spread).max(0.0);
        let upper = (confidence + spread).min(1.0);
        Self {
            verdict: verdict.into(),
            uncertainty_level: level,
            uncertainty_reason: uncertainty_reason.into(),
            confidence_bounds: ConfidenceBounds {
                lower: lower.min(upper),
                upper,
            },
        }
    }

    /// Combines several confidences into one report.
    ///
    /// The level is one minus the mean confidence and the bounds span the
    /// lowest and highest confidence. With no confidences the report is
    /// maximally uncertain: level 1, bounds `[0, 1]`.
    pub fn aggregate(
        verdict: impl Into<String>,
        confidences: &[f64],
        uncertainty_reason: impl Into<String>,
    ) -> Self {
        let clamped: Vec<f64> = confidences
            .iter()
            .map(|c| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) })
            .collect();

        let (level, lower, upper) = if clamped.is_empty() {
            (1.0, 0.0, 1.0)
        } else {
            let mean = clamped.iter().sum::<f64>() / clamped.len() as f64;
            let lower = clamped.iter().copied().fold(1.0, f64::min);
            let upper = clamped.iter().copied().fold(0.0, f64::max);
            ((1.0 - mean).clamp(0.0, 1.0), lower, upper)
        };

        Self {
            verdict: verdict.into(),
            uncertainty_level: level,
            uncertainty_reason: uncertainty_reason.into(),
            confidence_bounds: ConfidenceBounds { lower, upper },
        }
    }

    /// Verdict text.
    pub fn verdict(&self) -> &str {
        &self.verdict
    }

    /// Uncertainty level in `[0, 1]`.
    pub fn uncertainty_level(&self) -> f64 {
        self.uncertainty_level
    }

    /// Why the verdict is uncertain.
    pub fn uncertainty_reason(&self) -> &str {
        &self.uncertainty_reason
    }

    /// Confidence interval.
    pub fn confidence_bounds(&self) -> ConfidenceBounds {
        self.confidence_bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_report() {
        let report = UncertaintyReport::new("approve", 0.2, "members agree", 0.7, 0.9).unwrap();
        assert_eq!(report.verdict(), "approve");
        assert!((report.uncertainty_level() - 0.2).abs() < f64::EPSILON);
        assert!((report.confidence_bounds().width() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_lower_above_upper_rejected() {
        let err = UncertaintyReport::new("approve", 0.2, "x", 0.9, 0.1).unwrap_err();
        assert!(matches!(err, ModelError::InvalidUncertaintyBounds(_)));
    }

    #[test]
    fn test_bounds_outside_unit_interval_rejected() {
        assert!(ConfidenceBounds::new(-0.1, 0.5).is_err());
        assert!(ConfidenceBounds::new(0.1, 1.5).is_err());
        assert!(ConfidenceBounds::new(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_level_outside_unit_interval_rejected() {
        assert!(UncertaintyReport::new("approve", 1.2, "x", 0.1, 0.2).is_err());
        assert!(UncertaintyReport::new("approve", -0.01, "x", 0.1, 0.2).is_err());
    }

    #[test]
    fn test_equal_bounds_allowed() {
        assert!(ConfidenceBounds::new(0.5, 0.5).is_ok());
        assert!(ConfidenceBounds::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn test_from_confidence() {
        let report = UncertaintyReport::from_confidence("approve", 0.8, "clear rubric");
        let bounds = report.confidence_bounds();
        assert!((report.uncertainty_level() - 0.2).abs() < 1e-9);
        assert!((bounds.lower() - 0.7).abs() < 1e-9);
        assert!((bounds.upper() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_from_confidence_clamps() {
        for confidence in [-0.5, 0.0, 0.1, 1.0, 1.7, f64::NAN] {
            let report = UncertaintyReport::from_confidence("reject", confidence, "weak signal");
            let bounds = report.confidence_bounds();
            assert!(bounds.lower() >= 0.0);
            assert!(bounds.lower() <= bounds.upper());
            assert!(bounds.upper() <= 1.0);
            assert!((0.0..=1.0).contains(&report.uncertainty_level()));
        }
    }

    #[test]
    fn test_aggregate() {
        let report = UncertaintyReport::aggregate("approve", &[0.9, 0.7, 0.5], "mixed confidence");
        assert!((report.uncertainty_level() - 0.3).abs() < 1e-9);
        assert!((report.confidence_bounds().lower() - 0.5).abs() < 1e-9);
        assert!((report.confidence_bounds().upper() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_empty_is_maximally_uncertain() {
        let report = UncertaintyReport::aggregate("abstain", &[], "no verdicts");
        assert!((report.uncertainty_level() - 1.0).abs() < f64::EPSILON);
        assert!((report.confidence_bounds().width() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_field_names() {
        let report = UncertaintyReport::new("approve", 0.25, "one abstention", 0.5, 0.75).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["verdict"], "approve");
        assert_eq!(value["uncertainty_level"], 0.25);
        assert_eq!(value["uncertainty_reason"], "one abstention");
        assert_eq!(value["confidence_bounds"]["lower"], 0.5);
        assert_eq!(value["confidence_bounds"]["upper"], 0.75);
    }

    #[test]
    fn test_deserialize_validates_bounds() {
        let json = r#"{
            "verdict": "approve",
            "uncertainty_level": 0.3,
            "uncertainty_reason": "x",
            "confidence_bounds": {"lower": 0.9, "upper": 0.2}
        }"#;
        assert!(serde_json::from_str::<UncertaintyReport>(json).is_err());
    }

    #[test]
    fn test_deserialize_validates_level() {
        let json = r#"{
            "verdict": "approve",
            "uncertainty_level": 3.0,
            "uncertainty_reason": "x",
            "confidence_bounds": {"lower": 0.2, "upper": 0.4}
        }"#;
        assert!(serde_json::from_str::<UncertaintyReport>(json).is_err());
    }
}
