//! Keyword extraction over fixed vocabularies
//!
//! Maps free text to a [`KeywordProfile`]: the skill terms and seniority
//! levels it mentions. Matching is case-insensitive and respects word
//! boundaries, so "java" never fires inside "javascript".
//!
//! Vocabulary patterns are compiled once when the extractor is constructed;
//! extraction itself is a pure function of the input text.
//!
//! # Usage
//!
//! ```ignore
//! use assessrec_lib::keyword::KeywordExtractor;
//!
//! let extractor = KeywordExtractor::builtin();
//! let profile = extractor.extract("Senior Java developer, team lead");
//! assert!(profile.skills.contains("java"));
//! assert!(profile.seniority.contains("manager"));
//! ```

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

mod vocabulary;

pub use vocabulary::*;

static BUILTIN: LazyLock<KeywordExtractor> = LazyLock::new(|| {
    KeywordExtractor::new(&Vocabulary::default())
        .expect("built-in vocabulary terms are escaped literals")
});

/// Skill and seniority tags found in a piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordProfile {
    /// Matched skill terms, in canonical lowercase form
    pub skills: BTreeSet<String>,
    /// Matched seniority level labels; a text may carry several
    pub seniority: BTreeSet<String>,
}

impl KeywordProfile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.seniority.is_empty()
    }

    /// Keyword overlap of `other` against this (query) profile, in [0, 1].
    ///
    /// Mean of the skill and seniority overlaps, each the fraction of this
    /// profile's tags also present in `other`. An empty side contributes 0.
    #[must_use]
    pub fn overlap_score(&self, other: &Self) -> f32 {
        let skill = overlap_fraction(&self.skills, &other.skills);
        let seniority = overlap_fraction(&self.seniority, &other.seniority);
        (skill + seniority) / 2.0
    }
}

fn overlap_fraction(query: &BTreeSet<String>, item: &BTreeSet<String>) -> f32 {
    let shared = query.intersection(item).count();
    shared as f32 / query.len().max(1) as f32
}

/// A vocabulary phrase compiled into a boundary-respecting matcher.
#[derive(Debug, Clone)]
struct Term {
    label: String,
    pattern: Regex,
}

/// Compiled keyword matcher for a [`Vocabulary`]
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    skills: Vec<Term>,
    // level label -> compiled variants
    seniority: Vec<(String, Vec<Regex>)>,
}

impl KeywordExtractor {
    /// Compile the matchers for a vocabulary.
    pub fn new(vocabulary: &Vocabulary) -> Result<Self> {
        let mut skills = Vec::with_capacity(vocabulary.skills.len());
        for skill in &vocabulary.skills {
            let label = skill.trim().to_lowercase();
            if label.is_empty() {
                continue;
            }
            skills.push(Term {
                pattern: phrase_pattern(&label)?,
                label,
            });
        }

        let mut seniority = Vec::with_capacity(vocabulary.seniority.len());
        for (level, variants) in &vocabulary.seniority {
            let patterns = variants
                .iter()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .map(|v| phrase_pattern(&v))
                .collect::<Result<Vec<_>>>()?;
            seniority.push((level.clone(), patterns));
        }

        Ok(Self { skills, seniority })
    }

    /// The extractor for the built-in vocabulary, compiled on first use.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Extract the keyword profile of `text`.
    #[must_use]
    pub fn extract(&self, text: &str) -> KeywordProfile {
        if text.is_empty() {
            return KeywordProfile::default();
        }
        let lowered = text.to_lowercase();

        let skills = self
            .skills
            .iter()
            .filter(|term| term.pattern.is_match(&lowered))
            .map(|term| term.label.clone())
            .collect();

        let seniority = self
            .seniority
            .iter()
            .filter(|(_, variants)| variants.iter().any(|p| p.is_match(&lowered)))
            .map(|(level, _)| level.clone())
            .collect();

        KeywordProfile { skills, seniority }
    }

    /// Number of compiled skill terms
    #[must_use]
    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Matches `phrase` only where it is not flanked by word characters.
///
/// `\b` alone misbehaves for terms that end in punctuation ("c++", "c#"),
/// so the boundary is spelled out as "start/end of text or a non-word char".
fn phrase_pattern(phrase: &str) -> Result<Regex> {
    let pattern = format!(r"(?:^|[^\w]){}(?:$|[^\w])", regex::escape(phrase));
    Regex::new(&pattern)
        .map_err(|e| Error::Config(format!("invalid keyword term '{phrase}': {e}")))
}
