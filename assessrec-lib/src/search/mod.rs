//! Hybrid retrieval: semantic shortlist plus keyword re-ranking
//!
//! Combines an embedder, the vector index and the keyword extractor into one
//! query API.
//!
//! # Ranking
//!
//! For a query and `top_k`:
//!
//! 1. Embed the query and take the `shortlist_factor * top_k` nearest items
//!    (clamped to the corpus size). Keyword boosting only reorders this
//!    shortlist; it never pulls in items from outside it.
//! 2. Similarity is `1 / (1 + distance)`.
//! 3. With keyword boost on, each candidate gets the overlap of its
//!    [`KeywordProfile`](crate::keyword::KeywordProfile) with the query's.
//!    With boost off the keyword score is exactly 0.
//! 4. `final = semantic_weight * similarity + keyword_weight * keyword`.
//! 5. Stable sort by final score, descending, and keep `top_k`. Equal final
//!    scores keep shortlist order: closer embedding first, then lower index
//!    position.
//!
//! # Usage
//!
//! ```ignore
//! use assessrec_lib::search::HybridRetriever;
//!
//! let mut retriever = HybridRetriever::new(embedder);
//! retriever.build_index(&items)?;
//! let results = retriever.retrieve("Mid-level Java developer with SQL", 10, true)?;
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::embed::{validate_batch, Embedder};
use crate::index::VectorIndex;
use crate::item::{unique_by_id, Item, ItemId};
use crate::keyword::KeywordExtractor;
use crate::{Error, Result};

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalHit {
    pub id: ItemId,
    /// Fused score (higher is better)
    pub score: f32,
}

/// A ranked recommendation with its score breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub id: ItemId,
    /// 1-based position in the final ranking
    pub rank: usize,
    /// Squared Euclidean distance between query and item embeddings
    pub distance: f32,
    /// `1 / (1 + distance)`
    pub semantic_score: f32,
    /// Keyword overlap in [0, 1]; 0 when boosting is off
    pub keyword_score: f32,
    /// Weighted combination used for ranking
    pub final_score: f32,
}

impl From<ScoredCandidate> for RetrievalHit {
    fn from(candidate: ScoredCandidate) -> Self {
        Self {
            id: candidate.id,
            score: candidate.final_score,
        }
    }
}

/// Anything that turns a query into a ranked list of items.
///
/// The evaluator is written against this so it can be driven by stubs.
pub trait Recommender {
    fn recommend(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalHit>>;
}

/// Hybrid semantic + keyword retriever.
///
/// Owns its embedding provider. Building is the only mutation; once built,
/// `retrieve` takes `&self` and can be shared across threads.
pub struct HybridRetriever<E: Embedder> {
    embedder: E,
    config: RetrievalConfig,
    keywords: KeywordExtractor,
    index: VectorIndex,
    // text scanned for keywords, parallel to index positions
    texts: Vec<String>,
}

impl<E: Embedder> HybridRetriever<E> {
    /// Create a retriever with default weights (0.7 semantic, 0.3 keyword)
    /// and the built-in keyword vocabulary.
    #[must_use]
    pub fn new(embedder: E) -> Self {
        Self {
            embedder,
            config: RetrievalConfig::default(),
            keywords: KeywordExtractor::builtin().clone(),
            index: VectorIndex::new(),
            texts: Vec::new(),
        }
    }

    /// Create a retriever with explicit ranking parameters.
    ///
    /// Weights must be non-negative; they are used as given, not normalised.
    pub fn with_config(embedder: E, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            semantic_weight = config.semantic_weight,
            keyword_weight = config.keyword_weight,
            "hybrid retriever initialized"
        );
        if (config.semantic_weight + config.keyword_weight - 1.0).abs() > 1e-6 {
            tracing::debug!("fusion weights do not sum to 1; scores are unnormalised");
        }

        Ok(Self {
            config,
            ..Self::new(embedder)
        })
    }

    /// Shorthand for [`with_config`](Self::with_config) overriding only the weights.
    pub fn with_weights(embedder: E, semantic_weight: f32, keyword_weight: f32) -> Result<Self> {
        Self::with_config(
            embedder,
            RetrievalConfig {
                semantic_weight,
                keyword_weight,
                ..RetrievalConfig::default()
            },
        )
    }

    /// Replace the keyword extractor (e.g. one compiled from a custom vocabulary).
    #[must_use]
    pub fn with_keywords(mut self, keywords: KeywordExtractor) -> Self {
        self.keywords = keywords;
        self
    }

    /// Embed and index `items`, replacing any previous index.
    ///
    /// Repeated identifiers are indexed once, with their first text. On
    /// error the previous index (if any) stays in service.
    pub fn build_index(&mut self, items: &[Item]) -> Result<()> {
        self.index.build(&self.embedder, items)?;
        self.texts = unique_by_id(items)
            .into_iter()
            .map(|item| item.text.clone())
            .collect();
        Ok(())
    }

    /// Persist the current index to `dir`.
    pub fn save_index(&self, dir: &Path) -> Result<()> {
        self.index.save(dir)
    }

    /// Replace the current index with one restored from `dir`.
    ///
    /// The index must come from the same embedding model as this retriever's
    /// provider. Item texts are not part of the artifacts, so keyword matching
    /// runs on the identifiers until [`attach_texts`](Self::attach_texts)
    /// supplies them.
    pub fn load_index(&mut self, dir: &Path) -> Result<()> {
        let index = VectorIndex::load(dir)?;
        if let Some(model) = index.model_name() {
            if model != self.embedder.model_name() {
                return Err(Error::InvalidInput(format!(
                    "index at {} was built with {model} but the embedder is {}",
                    dir.display(),
                    self.embedder.model_name()
                )));
            }
        }

        let dimension = self.embedder.dimension();
        if index.dimension() != Some(dimension) {
            return Err(Error::InvalidInput(format!(
                "index at {} has dimension {:?} but embedder {} produces {dimension}",
                dir.display(),
                index.dimension(),
                self.embedder.model_name()
            )));
        }

        self.texts = index
            .identifiers()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        self.index = index;
        Ok(())
    }

    /// Use the texts of `items` for keyword matching of indexed identifiers.
    ///
    /// Items not present in the index are ignored; for a repeated identifier
    /// the first text wins. Returns how many indexed positions received a text.
    pub fn attach_texts(&mut self, items: &[Item]) -> usize {
        let mut by_id: HashMap<&str, &str> = HashMap::with_capacity(items.len());
        for item in items {
            by_id.entry(item.id.as_str()).or_insert(item.text.as_str());
        }

        let mut attached = 0;
        for (text, id) in self.texts.iter_mut().zip(self.index.identifiers()) {
            if let Some(found) = by_id.get(id.as_str()) {
                *text = (*found).to_string();
                attached += 1;
            }
        }
        attached
    }

    /// Top `top_k` items for `query`, best first.
    pub fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        use_keyword_boost: bool,
    ) -> Result<Vec<RetrievalHit>> {
        Ok(self
            .retrieve_detailed(query, top_k, use_keyword_boost)?
            .into_iter()
            .map(RetrievalHit::from)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve) but with per-candidate score breakdown.
    pub fn retrieve_detailed(
        &self,
        query: &str,
        top_k: usize,
        use_keyword_boost: bool,
    ) -> Result<Vec<ScoredCandidate>> {
        if !self.index.is_built() {
            return Err(Error::NotBuilt);
        }

        let query_embedding = self.embedder.encode(query)?;
        validate_batch(
            1,
            self.embedder.dimension(),
            std::slice::from_ref(&query_embedding),
        )?;
        let shortlist_len = top_k
            .saturating_mul(self.config.shortlist_factor)
            .min(self.index.len());
        let shortlist = self.index.search(&query_embedding, shortlist_len)?;

        let query_profile = use_keyword_boost.then(|| self.keywords.extract(query));

        let mut candidates: Vec<ScoredCandidate> = shortlist
            .into_iter()
            .map(|neighbor| {
                let semantic_score = neighbor.similarity();
                let keyword_score = match &query_profile {
                    Some(profile) => {
                        let item_profile = self.keywords.extract(&self.texts[neighbor.position]);
                        profile.overlap_score(&item_profile)
                    }
                    None => 0.0,
                };
                let final_score = self.config.semantic_weight * semantic_score
                    + self.config.keyword_weight * keyword_score;

                ScoredCandidate {
                    id: neighbor.id,
                    rank: 0,
                    distance: neighbor.distance,
                    semantic_score,
                    keyword_score,
                    final_score,
                }
            })
            .collect();

        // stable: ties keep shortlist order
        candidates.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        candidates.truncate(top_k);
        for (i, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = i + 1;
        }

        Ok(candidates)
    }

    /// Returns `true` once an index has been built or loaded.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.index.is_built()
    }

    /// Returns the number of indexed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no items are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns a reference to the embedder.
    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Returns a reference to the index.
    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Returns the ranking parameters.
    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Returns the keyword extractor.
    #[must_use]
    pub fn keywords(&self) -> &KeywordExtractor {
        &self.keywords
    }
}

impl<E: Embedder> Recommender for HybridRetriever<E> {
    fn recommend(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalHit>> {
        self.retrieve(query, top_k, self.config.use_keyword_boost)
    }
}
