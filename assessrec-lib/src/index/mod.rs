//! Exact nearest-neighbour index over item embeddings
//!
//! The index keeps an ordered list of item identifiers parallel to a
//! [`FlatIndex`] of their embeddings. Position `i` in one names position `i`
//! in the other; that alignment is what persistence has to preserve.
//!
//! # Lifecycle
//!
//! An index starts unbuilt. [`VectorIndex::build`] embeds every item and
//! replaces the whole state in one assignment, so a failed build leaves the
//! previous state untouched. After that it is read-only.
//!
//! # Usage
//!
//! ```ignore
//! use assessrec_lib::index::VectorIndex;
//!
//! let mut index = VectorIndex::new();
//! index.build(&embedder, &items)?;
//! index.save("models/index".as_ref())?;
//!
//! let index = VectorIndex::load("models/index".as_ref())?;
//! let neighbours = index.search(&query_embedding, 5)?;
//! ```

use std::collections::HashSet;
use std::path::Path;

use crate::embed::{validate_batch, Embedder};
use crate::item::{unique_by_id, Item, ItemId};
use crate::{Error, Result};

mod flat;
mod persist;

pub use flat::*;
pub use persist::{IDENTIFIERS_FILE, INDEX_FILE};

/// A search hit from the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Position of the item in the index
    pub position: usize,
    /// Identifier of the item at that position
    pub id: ItemId,
    /// Squared Euclidean distance to the query (lower is closer)
    pub distance: f32,
}

impl Neighbor {
    /// Similarity in (0, 1] derived from the distance
    #[must_use]
    pub fn similarity(&self) -> f32 {
        distance_to_similarity(self.distance)
    }
}

#[derive(Debug, Clone)]
struct IndexState {
    vectors: FlatIndex,
    ids: Vec<ItemId>,
    // empty when built from precomputed embeddings
    model: String,
}

/// Identifier-aware exact search index
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    state: Option<IndexState>,
}

impl VectorIndex {
    /// Create a new unbuilt index.
    #[must_use]
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Embed `items` and replace the index contents with them.
    ///
    /// Fails with [`Error::EmptyCorpus`] for an empty slice. Items whose
    /// identifier was already seen are skipped; the first occurrence wins.
    /// Any failure leaves the previous contents in place.
    pub fn build<E: Embedder + ?Sized>(&mut self, embedder: &E, items: &[Item]) -> Result<()> {
        if items.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let items = unique_by_id(items);
        let dimension = embedder.dimension();
        tracing::info!(
            items = items.len(),
            model = embedder.model_name(),
            dimension,
            "building vector index"
        );

        let texts: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
        let embeddings = embedder.encode_batch(&texts)?;
        validate_batch(texts.len(), dimension, &embeddings)?;

        let vectors = FlatIndex::from_embeddings(dimension, &embeddings)?;
        let ids = items.iter().map(|item| item.id.clone()).collect();
        self.state = Some(IndexState {
            vectors,
            ids,
            model: embedder.model_name().to_string(),
        });

        tracing::info!(items = items.len(), "vector index built");
        Ok(())
    }

    /// Assemble an index from precomputed embeddings.
    pub fn from_embeddings(ids: Vec<ItemId>, embeddings: &[Vec<f32>]) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if ids.len() != embeddings.len() {
            return Err(Error::InvalidInput(format!(
                "{} identifiers for {} embeddings",
                ids.len(),
                embeddings.len()
            )));
        }

        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !seen.insert(*id)) {
            return Err(Error::InvalidInput(format!("duplicate identifier '{dup}'")));
        }

        let dimension = embeddings[0].len();
        let vectors = FlatIndex::from_embeddings(dimension, embeddings)?;
        Ok(Self {
            state: Some(IndexState {
                vectors,
                ids,
                model: String::new(),
            }),
        })
    }

    /// The `n` nearest items to `query`, closest first.
    ///
    /// Returns `min(n, len())` neighbours; equal distances are ordered by
    /// index position.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<Neighbor>> {
        let state = self.state()?;

        Ok(state
            .vectors
            .search(query, n)?
            .into_iter()
            .map(|(position, distance)| Neighbor {
                position,
                id: state.ids[position].clone(),
                distance,
            })
            .collect())
    }

    /// Persist the index and its identifier list into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let state = self.state()?;
        persist::save(dir, &state.vectors, &state.ids, &state.model)
    }

    /// Restore an index previously written by [`save`](Self::save).
    pub fn load(dir: &Path) -> Result<Self> {
        let artifacts = persist::load(dir)?;
        tracing::info!(
            dir = %dir.display(),
            items = artifacts.ids.len(),
            dimension = artifacts.index.dimension(),
            model = %artifacts.model,
            "loaded vector index"
        );
        Ok(Self {
            state: Some(IndexState {
                vectors: artifacts.index,
                ids: artifacts.ids,
                model: artifacts.model,
            }),
        })
    }

    /// Returns `true` once the index has been built or loaded.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.state.is_some()
    }

    /// Number of indexed items (0 when unbuilt)
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.ids.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension, if built
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.vectors.dimension())
    }

    /// Name of the embedding model that produced the vectors.
    ///
    /// `None` when unbuilt or assembled from precomputed embeddings.
    #[must_use]
    pub fn model_name(&self) -> Option<&str> {
        self.state
            .as_ref()
            .map(|s| s.model.as_str())
            .filter(|m| !m.is_empty())
    }

    /// Identifiers in index order (empty when unbuilt)
    #[must_use]
    pub fn identifiers(&self) -> &[ItemId] {
        match &self.state {
            Some(state) => &state.ids,
            None => &[],
        }
    }

    /// The stored vector at `position`
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.state.as_ref()?.vectors.vector(position)
    }

    fn state(&self) -> Result<&IndexState> {
        self.state.as_ref().ok_or(Error::NotBuilt)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::embed::{Embedding, HashEmbedder};
    use crate::Result;

    /// Embedder that fails on demand.
    struct Broken;

    impl Embedder for Broken {
        fn encode(&self, _text: &str) -> Result<Embedding> {
            Err(Error::Provider("backend offline".to_string()))
        }

        fn encode_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>> {
            Err(Error::Provider("backend offline".to_string()))
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item::new("a", "java developer"),
            Item::new("b", "python analyst"),
            Item::new("c", "sales manager"),
        ]
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::from_embeddings(
            vec!["a".into(), "b".into(), "c".into()],
            &[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_build_empty_fails() {
        let mut index = VectorIndex::new();
        let err = index.build(&HashEmbedder::new(8), &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));
        assert!(!index.is_built());
    }

    #[test]
    fn test_search_before_build_fails() {
        let index = VectorIndex::new();
        assert!(matches!(index.search(&[0.0], 1), Err(Error::NotBuilt)));
    }

    #[test]
    fn test_save_before_build_fails() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::new();
        assert!(matches!(index.save(dir.path()), Err(Error::NotBuilt)));
    }

    #[test]
    fn test_build_and_search() {
        let embedder = HashEmbedder::new(64);
        let mut index = VectorIndex::new();
        index.build(&embedder, &items()).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.dimension(), Some(64));

        let query = embedder.encode("python analyst").unwrap();
        let hits = index.search(&query, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id.as_str(), "b");
        assert_eq!(hits[0].similarity(), 1.0);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_state() {
        let mut index = VectorIndex::new();
        index.build(&HashEmbedder::new(16), &items()).unwrap();

        let err = index.build(&Broken, &[Item::new("z", "anything")]).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimension(), Some(16));
    }

    #[test]
    fn test_rebuild_replaces_state() {
        let embedder = HashEmbedder::new(16);
        let mut index = VectorIndex::new();
        index.build(&embedder, &items()).unwrap();
        index.build(&embedder, &[Item::new("only", "one item")]).unwrap();

        assert_eq!(index.identifiers(), &[ItemId::new("only")]);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index();
        index.save(dir.path()).unwrap();

        let loaded = VectorIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.identifiers(), index.identifiers());
        for query in [[0.1, 0.1], [0.9, 0.0], [0.0, 1.9]] {
            assert_eq!(loaded.search(&query, 3).unwrap(), index.search(&query, 3).unwrap());
        }
    }

    #[test]
    fn test_load_missing_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();
        fs::remove_file(dir.path().join(IDENTIFIERS_FILE)).unwrap();

        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingArtifact { path } if path.ends_with(IDENTIFIERS_FILE)));
    }

    #[test]
    fn test_load_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingArtifact { path } if path.ends_with(INDEX_FILE)));
    }

    #[test]
    fn test_load_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();
        fs::write(dir.path().join(IDENTIFIERS_FILE), r#"["a", "b"]"#).unwrap();

        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::CorruptArtifact(msg) if msg.contains("2 identifiers")));
    }

    #[test]
    fn test_load_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();

        let path = dir.path().join(INDEX_FILE);
        let mut bytes = fs::read(&path).unwrap();
        bytes[0] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let err = VectorIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::CorruptArtifact(msg) if msg.contains("checksum")));
    }

    #[test]
    fn test_load_truncated_index() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();
        fs::write(dir.path().join(INDEX_FILE), b"abc").unwrap();

        assert!(matches!(
            VectorIndex::load(dir.path()),
            Err(Error::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_failed_save_leaves_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();

        // Same count, different identifiers and vectors.
        let replacement = VectorIndex::from_embeddings(
            vec!["x".into(), "y".into(), "z".into()],
            &[vec![5.0, 5.0], vec![0.0, 0.0], vec![9.0, 9.0]],
        )
        .unwrap();
        fs::create_dir(dir.path().join("identifiers.json.tmp")).unwrap();
        assert!(matches!(replacement.save(dir.path()), Err(Error::Io(_))));
        assert!(!dir.path().join("index.bin.tmp").exists());

        let loaded = VectorIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.identifiers(), sample_index().identifiers());
        let nearest = loaded.search(&[0.0, 0.0], 1).unwrap();
        assert_eq!(nearest[0].id.as_str(), "a");
    }

    #[test]
    fn test_load_rejects_identifiers_from_another_save() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        sample_index().save(first.path()).unwrap();
        VectorIndex::from_embeddings(
            vec!["x".into(), "y".into(), "z".into()],
            &[vec![5.0, 5.0], vec![0.0, 0.0], vec![9.0, 9.0]],
        )
        .unwrap()
        .save(second.path())
        .unwrap();

        fs::copy(
            second.path().join(IDENTIFIERS_FILE),
            first.path().join(IDENTIFIERS_FILE),
        )
        .unwrap();

        let err = VectorIndex::load(first.path()).unwrap_err();
        assert!(matches!(err, Error::CorruptArtifact(msg) if msg.contains("fingerprint")));
    }

    #[test]
    fn test_model_name_survives_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = VectorIndex::new();
        index.build(&HashEmbedder::new(8), &items()).unwrap();
        assert_eq!(index.model_name(), Some("fnv1a-hash"));

        index.save(dir.path()).unwrap();
        let loaded = VectorIndex::load(dir.path()).unwrap();
        assert_eq!(loaded.model_name(), Some("fnv1a-hash"));
        assert_eq!(sample_index().model_name(), None);
    }

    #[test]
    fn test_build_skips_duplicate_identifiers() {
        let mut index = VectorIndex::new();
        index
            .build(
                &HashEmbedder::new(16),
                &[
                    Item::new("a", "java developer"),
                    Item::new("b", "python analyst"),
                    Item::new("a", "sales manager"),
                ],
            )
            .unwrap();

        assert_eq!(index.identifiers(), &[ItemId::new("a"), ItemId::new("b")]);
        let hits = index.search(&HashEmbedder::new(16).encode("sales manager").unwrap(), 5).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_from_embeddings_rejects_duplicate_identifiers() {
        let result = VectorIndex::from_embeddings(
            vec!["a".into(), "a".into()],
            &[vec![0.0], vec![1.0]],
        );
        assert!(matches!(result, Err(Error::InvalidInput(msg)) if msg.contains("'a'")));
    }
}
