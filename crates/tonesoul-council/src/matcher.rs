//! Case-insensitive, word-bounded phrase matching.

use regex::Regex;

use crate::Result;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escapes a phrase and anchors each end that is a word character to a
/// word boundary. Punctuated ends ("-rf", "c++") match as written.
fn bounded(phrase: &str) -> String {
    let lead = if phrase.starts_with(is_word_char) { r"\b" } else { "" };
    let trail = if phrase.ends_with(is_word_char) { r"\b" } else { "" };
    format!("{lead}{}{trail}", regex::escape(phrase))
}

/// Compiled set of marker phrases.
///
/// Phrases are escaped before compilation, so rubric text is never
/// interpreted as a regular expression. A phrase only matches on word
/// boundaries: `"lie"` matches "I will lie" but not "library". An end
/// that is punctuation carries no boundary, so `"c++"` still matches.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrases: Vec<String>,
    regex: Option<Regex>,
}

impl PhraseMatcher {
    /// Compiles a matcher. Blank phrases are ignored; an empty set never
    /// matches.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRubric`](crate::CouncilError::InvalidRubric)
    /// if the combined pattern exceeds the regex size limit.
    pub fn new<I, S>(phrases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        if phrases.is_empty() {
            return Ok(Self {
                phrases,
                regex: None,
            });
        }

        let alternation = phrases
            .iter()
            .map(|p| bounded(p))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("(?i)(?:{alternation})"))?;

        Ok(Self {
            phrases,
            regex: Some(regex),
        })
    }

    /// Returns true if any phrase occurs in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// Returns the first phrase found in `text`, lowercased.
    pub fn find(&self, text: &str) -> Option<String> {
        self.regex
            .as_ref()
            .and_then(|r| r.find(text))
            .map(|m| m.as_str().to_lowercase())
    }

    /// Number of distinct phrases that occur in `text`.
    pub fn count_distinct(&self, text: &str) -> usize {
        let Some(regex) = &self.regex else {
            return 0;
        };
        let mut seen: Vec<String> = Vec::new();
        for m in regex.find_iter(text) {
            let phrase = m.as_str().to_lowercase();
            if !seen.contains(&phrase) {
                seen.push(phrase);
            }
        }
        seen.len()
    }

    /// The configured phrases.
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}
