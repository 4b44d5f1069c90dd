//! Commitment conflict detection.
//!
//! An action conflicts with an active commitment when it speaks about the
//! same thing and goes against it. "The same thing" is term coverage: the
//! share of the commitment's significant words that also appear in the
//! action. "Goes against it" is one of two signals:
//!
//! - the action carries a breaking marker ("break", "no longer", ...) that
//!   is not itself negated ("do not break" reaffirms the commitment), or
//! - the commitment is a prohibition ("never force-push") and the action
//!   does the prohibited thing without a negation of its own.
//!
//! Matching is case-insensitive and word-bounded. Breaking markers and
//! negations are disjoint vocabularies.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tonesoul_model::{Action, Commitment, CommitmentId};
use tracing::debug;

const DEFAULT_BREAK_MARKERS: &[&str] = &[
    "break",
    "abandon",
    "betray",
    "ignore",
    "override",
    "revoke",
    "cancel",
    "undo",
    "stop",
    "no longer",
    "instead of",
    "go back on",
];

const DEFAULT_NEGATIONS: &[&str] = &["never", "not", "no", "don't", "won't", "avoid", "without"];

/// How many words before a breaking marker a negation cancels it.
const NEGATION_REACH: usize = 3;

const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "onto", "will", "shall", "our",
    "your", "their", "all", "any", "are", "was", "were", "has", "have", "had", "but", "its",
    "it's", "then", "than", "also", "always", "keep", "make", "use", "using", "via", "per",
];

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Lowercased words; apostrophes stay inside words.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Word sequence padded with spaces, for word-bounded phrase lookup.
fn padded(words: &[String]) -> String {
    format!(" {} ", words.join(" "))
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let needle = tokenize(phrase);
    !needle.is_empty() && haystack.contains(&padded(&needle))
}

/// Detection thresholds and vocabularies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Phrases that mark an action as going back on something.
    pub break_markers: Vec<String>,
    /// Words that make a commitment a prohibition.
    pub negations: Vec<String>,
    /// Words ignored when comparing terms.
    pub stop_words: Vec<String>,
    /// Minimum share of the commitment's terms the action must cover.
    pub min_coverage: f64,
    /// Minimum length of a significant term.
    pub min_term_len: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            break_markers: to_strings(DEFAULT_BREAK_MARKERS),
            negations: to_strings(DEFAULT_NEGATIONS),
            stop_words: to_strings(DEFAULT_STOP_WORDS),
            min_coverage: 0.5,
            min_term_len: 3,
        }
    }
}

impl GateConfig {
    /// Sets the coverage threshold.
    pub const fn with_min_coverage(mut self, min_coverage: f64) -> Self {
        self.min_coverage = min_coverage;
        self
    }

    /// Replaces the breaking markers.
    pub fn with_break_markers(mut self, markers: Vec<String>) -> Self {
        self.break_markers = markers;
        self
    }

    /// Adds a stop word.
    pub fn with_stop_word(mut self, word: impl Into<String>) -> Self {
        self.stop_words.push(word.into());
        self
    }
}

/// Result of checking an action against the active commitments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GateResult {
    /// The action contradicts no active commitment.
    NoConflict,
    /// The action contradicts a commitment; it may only proceed after
    /// explicit confirmation.
    ConflictRequiresConfirmation {
        /// The commitment that would be broken.
        commitment_id: CommitmentId,
        /// Why the gate stopped the action.
        explanation: String,
    },
}

impl GateResult {
    /// Returns true on conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, GateResult::ConflictRequiresConfirmation { .. })
    }
}

/// Detects actions that would break an active commitment.
#[derive(Debug, Clone)]
pub struct BetrayalGate {
    config: GateConfig,
    stop_words: BTreeSet<String>,
}

impl Default for BetrayalGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl BetrayalGate {
    /// Creates a gate.
    pub fn new(config: GateConfig) -> Self {
        let stop_words = config
            .stop_words
            .iter()
            .chain(config.negations.iter())
            .map(|w| w.to_lowercase())
            .collect();
        Self { config, stop_words }
    }

    /// The configuration in use.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Significant terms of a text.
    pub fn terms(&self, text: &str) -> BTreeSet<String> {
        tokenize(text)
            .into_iter()
            .filter(|w| w.chars().count() >= self.config.min_term_len)
            .filter(|w| !self.stop_words.contains(w))
            .collect()
    }

    /// First breaking marker in `words` with no negation in the
    /// [`NEGATION_REACH`] words before it.
    fn breaking_marker(&self, words: &[String]) -> Option<&str> {
        self.config
            .break_markers
            .iter()
            .find(|marker| {
                let needle = tokenize(marker);
                if needle.is_empty() || needle.len() > words.len() {
                    return false;
                }
                (0..=words.len() - needle.len())
                    .filter(|&at| words[at..at + needle.len()] == needle[..])
                    .any(|at| {
                        let before = padded(&words[at.saturating_sub(NEGATION_REACH)..at]);
                        !self.is_negated(&before)
                    })
            })
            .map(String::as_str)
    }

    fn is_negated(&self, text: &str) -> bool {
        self.config.negations.iter().any(|n| contains_phrase(text, n))
    }

    /// Checks an action against commitments. Revoked commitments are
    /// ignored. When several conflict, the best-covered one is reported;
    /// ties go to the earlier commitment in `commitments`.
    pub fn check(&self, action: &Action, commitments: &[Commitment]) -> GateResult {
        let action_words = tokenize(&action.description);
        let action_text = padded(&action_words);
        let action_terms = self.terms(&action.description);
        let marker = self.breaking_marker(&action_words);
        let action_negated = self.is_negated(&action_text);

        let mut best: Option<(&Commitment, f64, usize, usize, String)> = None;

        for commitment in commitments.iter().filter(|c| c.is_active()) {
            let terms = self.terms(&commitment.description);
            if terms.is_empty() {
                continue;
            }
            let covered = terms.intersection(&action_terms).count();
            let coverage = covered as f64 / terms.len() as f64;
            if coverage < self.config.min_coverage {
                continue;
            }

            let commitment_text = padded(&tokenize(&commitment.description));
            let signal = if let Some(m) = marker {
                format!("breaking marker '{m}'")
            } else if self.is_negated(&commitment_text) && !action_negated {
                "does what the commitment rules out".to_string()
            } else {
                continue;
            };

            if best.as_ref().map_or(true, |(_, c, ..)| coverage > *c) {
                best = Some((commitment, coverage, covered, terms.len(), signal));
            }
        }

        match best {
            None => GateResult::NoConflict,
            Some((commitment, _, covered, total, signal)) => {
                debug!(
                    action = %action.id,
                    commitment = %commitment.id,
                    covered,
                    total,
                    "commitment conflict"
                );
                GateResult::ConflictRequiresConfirmation {
                    commitment_id: commitment.id.clone(),
                    explanation: format!(
                        "action '{}' would break commitment '{}' ({}; covers {} of {} terms)",
                        action.id, commitment.description, signal, covered, total
                    ),
                }
            }
        }
    }
}
