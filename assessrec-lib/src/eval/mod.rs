//! Recall@K evaluation
//!
//! Runs a [`Recommender`] over a set of test queries and scores each result
//! list against a [`TrainingCorpus`].
//!
//! # Metric modes
//!
//! - [`MetricMode::Exact`]: a query's relevant set is whatever the corpus
//!   labels for that literal query string. Queries the corpus has never seen
//!   score 0, so this mode sits near 0 whenever test and training queries are
//!   disjoint.
//! - [`MetricMode::Semantic`]: every query's relevant set is the whole
//!   corpus item pool. This measures coverage, not relevance, and
//!   approaches 1.0 as K approaches the corpus size.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::item::ItemId;
use crate::search::Recommender;
use crate::{Error, Result};

mod corpus;

pub use corpus::*;

/// Fraction of `relevant` found in the first `k` entries of `retrieved`.
///
/// Defined as 0 when `relevant` is empty. Duplicate retrieved entries count once.
#[must_use]
pub fn recall_at_k(retrieved: &[ItemId], relevant: &HashSet<&ItemId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }

    let found: HashSet<&ItemId> = retrieved
        .iter()
        .take(k)
        .filter(|id| relevant.contains(id))
        .collect();

    found.len() as f64 / relevant.len() as f64
}

/// How a test query's relevant set is determined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricMode {
    /// Items labelled for the identical query string
    #[default]
    Exact,
    /// Every item in the corpus (coverage check)
    Semantic,
}

impl MetricMode {
    fn note(self) -> &'static str {
        match self {
            Self::Exact => {
                "exact query matching: only test queries that appear verbatim in the \
                 training set can score above 0"
            }
            Self::Semantic => {
                "semantic/coverage mode: every training item counts as relevant, so \
                 recall measures corpus coverage within the top-K, not relevance"
            }
        }
    }
}

impl fmt::Display for MetricMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Semantic => f.write_str("semantic"),
        }
    }
}

impl std::str::FromStr for MetricMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "semantic" | "coverage" => Ok(Self::Semantic),
            other => Err(Error::InvalidInput(format!(
                "unknown metric mode '{other}' (expected exact|semantic)"
            ))),
        }
    }
}

/// Recall for one test query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub recall_at_k: f64,
}

/// Machine-readable evaluation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub recall_scores: Vec<f64>,
    pub query_results: Vec<QueryResult>,
    pub mean_recall: f64,
    pub median_recall: f64,
    pub min_recall: f64,
    pub max_recall: f64,
    pub total_queries: usize,
    pub metric_type: MetricMode,
    pub k: usize,
    pub note: String,
}

impl EvaluationReport {
    fn from_results(query_results: Vec<QueryResult>, metric_type: MetricMode, k: usize) -> Self {
        let recall_scores: Vec<f64> = query_results.iter().map(|r| r.recall_at_k).collect();
        let stats = Stats::of(&recall_scores);

        Self {
            total_queries: query_results.len(),
            mean_recall: stats.mean,
            median_recall: stats.median,
            min_recall: stats.min,
            max_recall: stats.max,
            recall_scores,
            query_results,
            metric_type,
            k,
            note: metric_type.note().to_string(),
        }
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;

        tracing::info!(path = %path.display(), "saved evaluation report");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Stats {
    mean: f64,
    median: f64,
    min: f64,
    max: f64,
}

impl Stats {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        Self {
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
            min: sorted[0],
            max: sorted[n - 1],
        }
    }
}

/// Scores a recommender's Recall@K over a query set
#[derive(Debug, Clone, Copy)]
pub struct RecallEvaluator {
    k: usize,
    mode: MetricMode,
}

impl RecallEvaluator {
    #[must_use]
    pub fn new(k: usize, mode: MetricMode) -> Self {
        Self { k, mode }
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    #[must_use]
    pub fn mode(&self) -> MetricMode {
        self.mode
    }

    /// Evaluate `recommender` on `queries`.
    ///
    /// In exact mode, queries with no labelled items score 0 without being
    /// sent to the recommender.
    pub fn evaluate<R: Recommender + ?Sized>(
        &self,
        recommender: &R,
        corpus: &TrainingCorpus,
        queries: &[String],
    ) -> Result<EvaluationReport> {
        tracing::info!(
            k = self.k,
            mode = %self.mode,
            queries = queries.len(),
            training_queries = corpus.queries().len(),
            items = corpus.items().len(),
            "starting recall evaluation"
        );

        let pool: HashSet<&ItemId> = corpus.items().iter().collect();
        let mut results = Vec::with_capacity(queries.len());

        for (idx, query) in queries.iter().enumerate() {
            let relevant: HashSet<&ItemId> = match self.mode {
                MetricMode::Exact => corpus.relevant_for(query).iter().collect(),
                MetricMode::Semantic => pool.clone(),
            };

            let recall = if relevant.is_empty() {
                tracing::warn!(query = %truncate(query, 70), "no relevant items for query");
                0.0
            } else {
                let retrieved: Vec<ItemId> = recommender
                    .recommend(query, self.k)?
                    .into_iter()
                    .map(|hit| hit.id)
                    .collect();
                let recall = recall_at_k(&retrieved, &relevant, self.k);
                tracing::debug!(
                    n = idx + 1,
                    of = queries.len(),
                    recall,
                    relevant = relevant.len(),
                    query = %truncate(query, 70),
                    "scored query"
                );
                recall
            };

            results.push(QueryResult {
                query: query.clone(),
                recall_at_k: recall,
            });
        }

        let report = EvaluationReport::from_results(results, self.mode, self.k);
        tracing::info!(
            mean = report.mean_recall,
            median = report.median_recall,
            min = report.min_recall,
            max = report.max_recall,
            "recall@{} evaluation complete",
            self.k
        );
        Ok(report)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::search::RetrievalHit;

    /// Returns a canned list per query.
    struct Canned {
        answers: HashMap<String, Vec<&'static str>>,
    }

    impl Recommender for Canned {
        fn recommend(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalHit>> {
            Ok(self
                .answers
                .get(query)
                .map(|ids| {
                    ids.iter()
                        .take(top_k)
                        .map(|id| RetrievalHit {
                            id: ItemId::new(*id),
                            score: 1.0,
                        })
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    /// Fails every call, to prove exact mode skips unknown queries.
    struct Unreachable;

    impl Recommender for Unreachable {
        fn recommend(&self, _query: &str, _top_k: usize) -> Result<Vec<RetrievalHit>> {
            Err(Error::NotBuilt)
        }
    }

    fn ids(raw: &[&str]) -> Vec<ItemId> {
        raw.iter().map(|s| ItemId::new(*s)).collect()
    }

    fn corpus() -> TrainingCorpus {
        TrainingCorpus::from_pairs([("q1", "a"), ("q1", "b"), ("q2", "c"), ("q2", "d")])
    }

    #[test]
    fn test_recall_at_k() {
        let relevant_ids = ids(&["a", "b"]);
        let relevant: HashSet<&ItemId> = relevant_ids.iter().collect();
        let retrieved = ids(&["a", "x", "b"]);

        assert_eq!(recall_at_k(&retrieved, &relevant, 1), 0.5);
        assert_eq!(recall_at_k(&retrieved, &relevant, 2), 0.5);
        assert_eq!(recall_at_k(&retrieved, &relevant, 3), 1.0);
        assert_eq!(recall_at_k(&retrieved, &relevant, 0), 0.0);
    }

    #[test]
    fn test_recall_empty_relevant_is_zero() {
        assert_eq!(recall_at_k(&ids(&["a"]), &HashSet::new(), 5), 0.0);
    }

    #[test]
    fn test_recall_duplicates_count_once() {
        let relevant_ids = ids(&["a", "b"]);
        let relevant: HashSet<&ItemId> = relevant_ids.iter().collect();
        assert_eq!(recall_at_k(&ids(&["a", "a"]), &relevant, 2), 0.5);
    }

    #[test]
    fn test_stats_even_median() {
        let stats = Stats::of(&[0.0, 1.0, 0.5, 0.25]);
        assert_eq!(stats.median, 0.375);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 1.0);
        assert_eq!(stats.mean, 0.4375);
    }

    #[test]
    fn test_stats_empty() {
        let stats = Stats::of(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.median, 0.0);
    }

    #[test]
    fn test_exact_mode() {
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), vec!["a", "z"]);
        answers.insert("q2".to_string(), vec!["c", "d"]);
        let recommender = Canned { answers };

        let queries = vec!["q1".to_string(), "q2".to_string(), "unseen".to_string()];
        let report = RecallEvaluator::new(2, MetricMode::Exact)
            .evaluate(&recommender, &corpus(), &queries)
            .unwrap();

        assert_eq!(report.recall_scores, vec![0.5, 1.0, 0.0]);
        assert_eq!(report.total_queries, 3);
        assert_eq!(report.mean_recall, 0.5);
        assert_eq!(report.median_recall, 0.5);
        assert_eq!(report.query_results[2].query, "unseen");
        assert_eq!(report.metric_type, MetricMode::Exact);
    }

    #[test]
    fn test_exact_mode_skips_unknown_queries() {
        let queries = vec!["never seen".to_string()];
        let report = RecallEvaluator::new(10, MetricMode::Exact)
            .evaluate(&Unreachable, &corpus(), &queries)
            .unwrap();

        assert_eq!(report.recall_scores, vec![0.0]);
        assert_eq!(report.max_recall, 0.0);
    }

    #[test]
    fn test_semantic_mode_measures_coverage() {
        let mut answers = HashMap::new();
        answers.insert("anything".to_string(), vec!["a", "b", "c", "d"]);
        let recommender = Canned { answers };
        let queries = vec!["anything".to_string()];

        let at2 = RecallEvaluator::new(2, MetricMode::Semantic)
            .evaluate(&recommender, &corpus(), &queries)
            .unwrap();
        let at4 = RecallEvaluator::new(4, MetricMode::Semantic)
            .evaluate(&recommender, &corpus(), &queries)
            .unwrap();

        assert_eq!(at2.mean_recall, 0.5);
        assert_eq!(at4.mean_recall, 1.0);
        assert!(at4.note.contains("coverage"));
    }

    #[test]
    fn test_recommender_error_propagates() {
        let queries = vec!["q1".to_string()];
        let result =
            RecallEvaluator::new(3, MetricMode::Exact).evaluate(&Unreachable, &corpus(), &queries);
        assert!(matches!(result, Err(Error::NotBuilt)));
    }

    #[test]
    fn test_report_json_shape() {
        let report = EvaluationReport::from_results(
            vec![QueryResult {
                query: "q".to_string(),
                recall_at_k: 1.0,
            }],
            MetricMode::Semantic,
            10,
        );
        let value = serde_json::to_value(&report).unwrap();

        for key in [
            "recall_scores",
            "query_results",
            "mean_recall",
            "median_recall",
            "min_recall",
            "max_recall",
            "total_queries",
            "metric_type",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["metric_type"], "semantic");
        assert_eq!(value["query_results"][0]["recall_at_k"], 1.0);
    }

    #[test]
    fn test_report_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("recall.json");
        let report = EvaluationReport::from_results(Vec::new(), MetricMode::Exact, 10);
        report.save(&path).unwrap();

        let loaded: EvaluationReport =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[test]
    fn test_metric_mode_parse() {
        assert_eq!("EXACT".parse::<MetricMode>().unwrap(), MetricMode::Exact);
        assert_eq!("coverage".parse::<MetricMode>().unwrap(), MetricMode::Semantic);
        assert!("fuzzy".parse::<MetricMode>().is_err());
    }
}
