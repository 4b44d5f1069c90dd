//! Benevolence audit of proposed output.
//!
//! Before the council deliberates, text an action intends to say is
//! audited in three layers:
//!
//! 1. **Attribution**: an inference presented on a layer other than the
//!    semantic one is flagged.
//! 2. **Shadow**: the output must overlap with the context it claims to
//!    be grounded in. Too little overlap rejects.
//! 3. **Benevolence**: several pleasing phrases with no honest hedge is
//!    people-pleasing and is intercepted.
//!
//! The worst layer wins: reject, then intercept, then flag.
//!
//! Tension measures how far the output drifts from both its context and
//! honest phrasing: `1 - sqrt(context_score * phrase_score)`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tonesoul_model::{Action, OutputBasis, ProposedOutput, SemanticLayer};
use tracing::{debug, warn};

use crate::matcher::PhraseMatcher;
use crate::Result;

/// Result of one audit layer, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Nothing found.
    Pass,
    /// Recorded, does not stop the action.
    Flag,
    /// People-pleasing output. Stops the action.
    Intercept,
    /// Ungrounded output. Stops the action.
    Reject,
}

impl AuditOutcome {
    /// Returns true if the action must not proceed.
    pub fn blocks(&self) -> bool {
        matches!(self, AuditOutcome::Intercept | AuditOutcome::Reject)
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Pass => write!(f, "pass"),
            AuditOutcome::Flag => write!(f, "flag"),
            AuditOutcome::Intercept => write!(f, "intercept"),
            AuditOutcome::Reject => write!(f, "reject"),
        }
    }
}

/// Full audit of one output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenevolenceAudit {
    /// Attribution layer.
    pub attribute: AuditOutcome,
    /// Shadow layer.
    pub shadow: AuditOutcome,
    /// Benevolence layer.
    pub benevolence: AuditOutcome,
    /// Combined outcome.
    pub outcome: AuditOutcome,
    /// Overlap between output and context, 0.5 without context.
    pub context_score: f64,
    /// Honest markers over all markers, 0.5 without markers.
    pub phrase_score: f64,
    /// `1 - sqrt(context_score * phrase_score)`.
    pub tension: f64,
    /// Explanation of the combined outcome, absent on pass.
    pub finding: Option<String>,
}

/// Thresholds and marker phrases for the audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenevolenceConfig {
    /// Run the audit at all.
    pub enabled: bool,
    /// Minimum context overlap before the output is rejected.
    pub shadow_threshold: f64,
    /// Pleasing markers needed, with no honest marker, to intercept.
    pub intercept_pleasing_min: usize,
    /// Phrases that signal people-pleasing.
    pub pleasing_markers: Vec<String>,
    /// Phrases that signal honest uncertainty.
    pub honest_markers: Vec<String>,
}

impl Default for BenevolenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shadow_threshold: 0.3,
            intercept_pleasing_min: 2,
            pleasing_markers: [
                "absolutely",
                "definitely",
                "of course",
                "certainly",
                "no problem",
                "sure thing",
                "i'd be happy to",
                "great question",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            honest_markers: [
                "i'm not sure",
                "i don't know",
                "might be",
                "could be",
                "uncertain",
                "approximately",
                "based on limited",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl BenevolenceConfig {
    /// Enables or disables the audit.
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the shadow threshold.
    pub const fn with_shadow_threshold(mut self, threshold: f64) -> Self {
        self.shadow_threshold = threshold;
        self
    }

    /// Sets the pleasing-marker count that intercepts.
    pub const fn with_intercept_pleasing_min(mut self, min: usize) -> Self {
        self.intercept_pleasing_min = min;
        self
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Three-layer output audit.
#[derive(Debug, Clone)]
pub struct BenevolenceFilter {
    enabled: bool,
    shadow_threshold: f64,
    intercept_pleasing_min: usize,
    pleasing: PhraseMatcher,
    honest: PhraseMatcher,
}

impl BenevolenceFilter {
    /// Compiles a filter.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRubric`](crate::CouncilError::InvalidRubric)
    /// if the shadow threshold is outside `[0, 1]` or a marker set cannot
    /// be compiled.
    pub fn new(config: &BenevolenceConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.shadow_threshold) {
            return Err(crate::CouncilError::InvalidRubric(format!(
                "shadow threshold {} outside [0, 1]",
                config.shadow_threshold
            )));
        }
        Ok(Self {
            enabled: config.enabled,
            shadow_threshold: config.shadow_threshold,
            intercept_pleasing_min: config.intercept_pleasing_min,
            pleasing: PhraseMatcher::new(&config.pleasing_markers)?,
            honest: PhraseMatcher::new(&config.honest_markers)?,
        })
    }

    /// Whether the audit runs.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Audits an action's attached output. `None` when disabled or when
    /// the action carries no output.
    pub fn audit_action(&self, action: &Action) -> Option<BenevolenceAudit> {
        if !self.enabled {
            return None;
        }
        let output = action.output.as_ref()?;
        let audit = self.audit(output);
        if audit.outcome.blocks() {
            warn!(
                action = %action.id,
                outcome = %audit.outcome,
                tension = audit.tension,
                "benevolence audit blocked output"
            );
        } else {
            debug!(
                action = %action.id,
                outcome = %audit.outcome,
                tension = audit.tension,
                "benevolence audit"
            );
        }
        Some(audit)
    }

    /// Audits one output.
    pub fn audit(&self, output: &ProposedOutput) -> BenevolenceAudit {
        let attribute = Self::check_attribute(output);
        let (shadow, context_score) = self.check_shadow(output);
        let (benevolence, phrase_score, pleasing) = self.check_benevolence(&output.text);

        let tension = 1.0 - (context_score * phrase_score).sqrt();

        let (outcome, finding) = if shadow == AuditOutcome::Reject {
            (
                AuditOutcome::Reject,
                Some(format!(
                    "output not grounded in context (overlap {:.2} < {:.2})",
                    context_score, self.shadow_threshold
                )),
            )
        } else if benevolence == AuditOutcome::Intercept {
            (
                AuditOutcome::Intercept,
                Some(format!(
                    "people-pleasing output: {pleasing} pleasing markers and no honest marker"
                )),
            )
        } else if attribute == AuditOutcome::Flag {
            (
                AuditOutcome::Flag,
                Some(format!(
                    "inference presented on the {:?} layer",
                    output.layer
                )),
            )
        } else {
            (AuditOutcome::Pass, None)
        };

        BenevolenceAudit {
            attribute,
            shadow,
            benevolence,
            outcome,
            context_score,
            phrase_score,
            tension,
            finding,
        }
    }

    fn check_attribute(output: &ProposedOutput) -> AuditOutcome {
        if output.basis == OutputBasis::Inference && output.layer != SemanticLayer::Semantic {
            AuditOutcome::Flag
        } else {
            AuditOutcome::Pass
        }
    }

    fn check_shadow(&self, output: &ProposedOutput) -> (AuditOutcome, f64) {
        if output.context_fragments.is_empty() {
            return (AuditOutcome::Pass, 0.5);
        }

        let output_words = words(&output.text);
        if output_words.is_empty() {
            return (AuditOutcome::Pass, 0.0);
        }

        let context_words: HashSet<String> = output
            .context_fragments
            .iter()
            .flat_map(|f| words(f))
            .collect();

        let overlap = output_words.intersection(&context_words).count() as f64
            / output_words.len() as f64;

        if overlap < self.shadow_threshold {
            (AuditOutcome::Reject, overlap)
        } else {
            (AuditOutcome::Pass, overlap)
        }
    }

    fn check_benevolence(&self, text: &str) -> (AuditOutcome, f64, usize) {
        let pleasing = self.pleasing.count_distinct(text);
        let honest = self.honest.count_distinct(text);
        let total = pleasing + honest;

        let phrase_score = if total == 0 {
            0.5
        } else {
            honest as f64 / total as f64
        };

        if pleasing >= self.intercept_pleasing_min && honest == 0 {
            (AuditOutcome::Intercept, phrase_score, pleasing)
        } else {
            (AuditOutcome::Pass, phrase_score, pleasing)
        }
    }
}
