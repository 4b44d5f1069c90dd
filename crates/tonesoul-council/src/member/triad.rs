//! The council triad: Philosopher, Engineer and Guardian.
//!
//! Three rubrics that look at an action from different sides. Each is a
//! pure function of the action and its own configuration.

use serde::{Deserialize, Serialize};
use tonesoul_model::{Action, RiskTier};

use super::{Confidence, CouncilMember, MemberRole, Verdict};
use crate::matcher::PhraseMatcher;
use crate::Result;

/// Text a rubric inspects: description, initiating reason and context
/// values. Mitigation text is left out so that "no data is deleted" in a
/// mitigation does not read as a harm.
fn inspected_text(action: &Action) -> String {
    let mut text = action.description.clone();
    if let Some(reason) = &action.reason {
        text.push('\n');
        text.push_str(reason);
    }
    for value in action.context.values() {
        text.push('\n');
        text.push_str(value);
    }
    text
}

/// A value the Philosopher checks actions against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRule {
    /// Name of the value.
    pub name: String,
    /// Phrases that indicate the action touches this value.
    pub markers: Vec<String>,
    /// A hard value is a constraint: a match rejects. A soft value only
    /// signals ambiguity: a match abstains.
    #[serde(default)]
    pub hard: bool,
}

impl ValueRule {
    /// A hard constraint.
    pub fn hard(name: impl Into<String>, markers: &[&str]) -> Self {
        Self {
            name: name.into(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
            hard: true,
        }
    }

    /// A soft value.
    pub fn soft(name: impl Into<String>, markers: &[&str]) -> Self {
        Self {
            name: name.into(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
            hard: false,
        }
    }

    /// Default value set.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::hard(
                "honesty",
                &["deceive", "mislead", "fabricate", "falsify", "lie to", "fake the"],
            ),
            Self::hard(
                "accountability",
                &[
                    "cover up",
                    "conceal the",
                    "erase the audit",
                    "hide evidence",
                    "without a trace",
                    "bypass review",
                ],
            ),
            Self::hard("autonomy", &["manipulate", "coerce", "guilt trip"]),
            Self::soft("persuasion", &["persuade", "convince", "nudge the user"]),
            Self::soft("attribution", &["anonymous", "unattributed", "ghostwrite"]),
        ]
    }
}

/// Value-alignment member.
///
/// Rejects on any hard value match, abstains when only soft values
/// match, approves otherwise.
#[derive(Debug, Clone)]
pub struct Philosopher {
    values: Vec<(ValueRule, PhraseMatcher)>,
}

impl Philosopher {
    /// Creates a Philosopher over the given value set.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRubric`](crate::CouncilError::InvalidRubric)
    /// if a value's markers cannot be compiled.
    pub fn new(values: Vec<ValueRule>) -> Result<Self> {
        let values = values
            .into_iter()
            .map(|rule| -> Result<(ValueRule, PhraseMatcher)> {
                let matcher = PhraseMatcher::new(&rule.markers)?;
                Ok((rule, matcher))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values })
    }

    /// Names of the configured values.
    pub fn value_names(&self) -> Vec<&str> {
        self.values.iter().map(|(r, _)| r.name.as_str()).collect()
    }
}

impl CouncilMember for Philosopher {
    fn role(&self) -> MemberRole {
        MemberRole::Philosopher
    }

    fn rubric(&self) -> &str {
        "alignment with configured values"
    }

    fn evaluate(&self, action: &Action) -> Verdict {
        let text = inspected_text(action);
        let mut ambiguous = Vec::new();

        for (rule, matcher) in &self.values {
            let Some(phrase) = matcher.find(&text) else {
                continue;
            };
            if rule.hard {
                return Verdict::reject(
                    self.role(),
                    Confidence::high(),
                    format!("violates value '{}' (matched '{}')", rule.name, phrase),
                );
            }
            ambiguous.push(format!("{} ('{}')", rule.name, phrase));
        }

        if ambiguous.is_empty() {
            Verdict::approve(
                self.role(),
                Confidence::high(),
                "consistent with configured values",
            )
        } else {
            Verdict::abstain(
                self.role(),
                format!("values ambiguous for this action: {}", ambiguous.join(", ")),
            )
        }
    }
}

/// Confidence the Engineer assigns per declared risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineerRubric {
    /// Approval confidence for low-risk actions.
    pub low: f64,
    /// Approval confidence for medium-risk actions.
    pub medium: f64,
    /// Approval confidence for mitigated high-risk actions.
    pub high_mitigated: f64,
    /// Rejection confidence for unmitigated high-risk actions.
    pub unmitigated_reject: f64,
}

impl Default for EngineerRubric {
    fn default() -> Self {
        Self {
            low: 0.9,
            medium: 0.7,
            high_mitigated: 0.5,
            unmitigated_reject: 0.9,
        }
    }
}

/// Feasibility and risk member.
///
/// Rejects high-risk actions without a mitigation. Otherwise approves
/// with a confidence that falls as the declared risk rises.
#[derive(Debug, Clone)]
pub struct Engineer {
    low: Confidence,
    medium: Confidence,
    high_mitigated: Confidence,
    unmitigated_reject: Confidence,
}

impl Engineer {
    /// Creates an Engineer from a rubric.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRubric`](crate::CouncilError::InvalidRubric)
    /// if a confidence is outside `[0, 1]`.
    pub fn new(rubric: EngineerRubric) -> Result<Self> {
        Ok(Self {
            low: Confidence::new(rubric.low)?,
            medium: Confidence::new(rubric.medium)?,
            high_mitigated: Confidence::new(rubric.high_mitigated)?,
            unmitigated_reject: Confidence::new(rubric.unmitigated_reject)?,
        })
    }
}

impl CouncilMember for Engineer {
    fn role(&self) -> MemberRole {
        MemberRole::Engineer
    }

    fn rubric(&self) -> &str {
        "feasibility, cost and declared risk"
    }

    fn evaluate(&self, action: &Action) -> Verdict {
        match action.risk {
            RiskTier::Low => Verdict::approve(self.role(), self.low, "declared risk low"),
            RiskTier::Medium => Verdict::approve(self.role(), self.medium, "declared risk medium"),
            RiskTier::High if action.is_mitigated() => Verdict::approve(
                self.role(),
                self.high_mitigated,
                format!(
                    "declared risk high, mitigated: {}",
                    action.mitigation.as_deref().unwrap_or_default().trim()
                ),
            ),
            RiskTier::High => Verdict::reject(
                self.role(),
                self.unmitigated_reject,
                "high risk without mitigation",
            ),
        }
    }
}

/// An enumerated harm the Guardian looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmCategory {
    /// Category name, used in the rejection rationale.
    pub name: String,
    /// Phrases that indicate this harm.
    pub markers: Vec<String>,
}

impl HarmCategory {
    /// Creates a category.
    pub fn new(name: impl Into<String>, markers: &[&str]) -> Self {
        Self {
            name: name.into(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Default harm categories.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "data_destruction",
                &[
                    "delete all",
                    "drop table",
                    "drop database",
                    "wipe",
                    "rm -rf",
                    "purge",
                    "destroy",
                ],
            ),
            Self::new(
                "safety_bypass",
                &[
                    "disable safety",
                    "bypass safety",
                    "disable authentication",
                    "skip verification",
                    "turn off monitoring",
                    "disable the firewall",
                ],
            ),
            Self::new(
                "privacy_breach",
                &[
                    "leak",
                    "dox",
                    "expose personal",
                    "share private",
                    "sell user data",
                ],
            ),
            Self::new(
                "credential_exposure",
                &[
                    "password",
                    "api key",
                    "secret key",
                    "private key",
                    "access token",
                    "credentials",
                ],
            ),
        ]
    }
}

/// Harm-category member. Any match rejects.
#[derive(Debug, Clone)]
pub struct Guardian {
    categories: Vec<(String, PhraseMatcher)>,
}

impl Guardian {
    /// Creates a Guardian over the given categories.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRubric`](crate::CouncilError::InvalidRubric)
    /// if a category's markers cannot be compiled.
    pub fn new(categories: Vec<HarmCategory>) -> Result<Self> {
        let categories = categories
            .into_iter()
            .map(|c| -> Result<(String, PhraseMatcher)> {
                let matcher = PhraseMatcher::new(&c.markers)?;
                Ok((c.name, matcher))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { categories })
    }

    /// Names of the configured categories.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl CouncilMember for Guardian {
    fn role(&self) -> MemberRole {
        MemberRole::Guardian
    }

    fn rubric(&self) -> &str {
        "enumerated harm categories"
    }

    fn evaluate(&self, action: &Action) -> Verdict {
        let text = inspected_text(action);
        for (name, matcher) in &self.categories {
            if let Some(phrase) = matcher.find(&text) {
                return Verdict::reject(
                    self.role(),
                    Confidence::high(),
                    format!("potential harm: {name} (matched '{phrase}')"),
                );
            }
        }
        Verdict::approve(self.role(), Confidence::high(), "no harm category matched")
    }
}
