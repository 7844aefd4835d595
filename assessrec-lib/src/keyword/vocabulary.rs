use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Skill terms recognised out of the box.
pub const SKILL_TERMS: &[&str] = &[
    // Programming languages
    "java", "python", "javascript", "typescript", "csharp", "c#", "cpp", "c++",
    "ruby", "go", "rust", "php", "swift", "kotlin", "scala", "r", "sql",
    "html", "css", "react", "angular", "vue", "nodejs", "node.js",
    // Data & ML
    "machine learning", "ml", "deep learning", "nlp", "data science",
    "tensorflow", "pytorch", "scikit-learn", "pandas", "numpy",
    // Cloud & DevOps
    "aws", "azure", "gcp", "docker", "kubernetes", "ci/cd", "jenkins",
    // Databases
    "mysql", "postgresql", "mongodb", "redis", "elasticsearch",
    // Soft skills & practices
    "leadership", "management", "communication", "analytical", "problem solving",
    "agile", "scrum", "git", "version control",
    // Domains
    "finance", "healthcare", "ecommerce", "saas", "api", "microservices",
];

/// Seniority levels and the phrases that signal them.
pub const SENIORITY_TERMS: &[(&str, &[&str])] = &[
    ("entry", &["entry level", "junior", "graduate", "trainee", "intern"]),
    ("mid", &["mid-level", "senior", "experienced", "professional"]),
    ("manager", &["manager", "team lead", "lead", "director", "principal", "staff"]),
    ("c_level", &["cto", "cfo", "ceo", "executive", "vp"]),
];

/// Term lists the keyword extractor matches against.
///
/// Can be replaced wholesale from the `[keywords]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Canonical skill terms and phrases
    pub skills: Vec<String>,
    /// Level label -> phrase variants
    pub seniority: BTreeMap<String, Vec<String>>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            skills: SKILL_TERMS.iter().map(|s| (*s).to_string()).collect(),
            seniority: SENIORITY_TERMS
                .iter()
                .map(|(level, variants)| {
                    (
                        (*level).to_string(),
                        variants.iter().map(|v| (*v).to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_all_levels() {
        let vocab = Vocabulary::default();
        let levels: Vec<_> = vocab.seniority.keys().map(String::as_str).collect();
        assert_eq!(levels, vec!["c_level", "entry", "manager", "mid"]);
    }

    #[test]
    fn test_default_terms_are_lowercase() {
        let vocab = Vocabulary::default();
        assert!(vocab.skills.iter().all(|s| *s == s.to_lowercase()));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let raw = r#"
            skills = ["excel", "sales"]

            [seniority]
            entry = ["junior"]
        "#;
        let vocab: Vocabulary = toml::from_str(raw).unwrap();
        assert_eq!(vocab.skills, vec!["excel", "sales"]);
        assert_eq!(vocab.seniority["entry"], vec!["junior"]);
    }
}
