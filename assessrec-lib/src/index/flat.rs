use serde::{Deserialize, Serialize};

use crate::embed::Embedding;
use crate::{Error, Result};

/// Exact-search index over fixed-dimension vectors.
///
/// Vectors are stored row-major in one contiguous buffer; row `i` is the
/// vector inserted at position `i`. Search is brute force by squared L2
/// distance, which is fine for catalogs of a few thousand items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Build from a list of embeddings, all of which must have `dimension` entries.
    pub fn from_embeddings(dimension: usize, embeddings: &[Embedding]) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidInput("index dimension must be at least 1".to_string()));
        }

        let mut vectors = Vec::with_capacity(dimension * embeddings.len());
        for (pos, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(Error::InvalidInput(format!(
                    "vector {pos} has dimension {}, expected {dimension}",
                    embedding.len()
                )));
            }
            vectors.extend_from_slice(embedding);
        }

        Ok(Self { dimension, vectors })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The vector stored at `position`
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.vectors.get(start..start + self.dimension)
    }

    /// The `n` nearest positions to `query` as `(position, squared distance)`.
    ///
    /// Ordered by ascending distance; equal distances keep insertion order,
    /// so the lower position wins.
    pub fn search(&self, query: &[f32], n: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::InvalidInput(format!(
                "query vector has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| squared_l2(query, row))
            .enumerate()
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(n.min(self.len()));
        Ok(scored)
    }

    /// Reject decoded structures whose buffer doesn't divide into rows.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::CorruptArtifact("index dimension is zero".to_string()));
        }
        if self.vectors.len() % self.dimension != 0 {
            return Err(Error::CorruptArtifact(format!(
                "vector buffer of {} floats is not a multiple of dimension {}",
                self.vectors.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

/// Squared Euclidean distance.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Map a distance to a similarity in (0, 1]; 1 only at distance 0.
#[must_use]
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}
