//! Text embedding providers
//!
//! The engine treats the embedding model as an opaque `text -> vector`
//! function. Two providers ship with the crate:
//!
//! - [`FastEmbedder`]: local sentence-transformer models via the fastembed
//!   crate (ONNX runtime). Defaults to `all-MiniLM-L6-v2` (384 dimensions).
//! - [`HashEmbedder`]: deterministic feature hashing, no model download.
//!   Useful offline and in tests.
//!
//! # Usage
//!
//! ```ignore
//! use assessrec_lib::embed::{Embedder, FastEmbedder};
//!
//! let embedder = FastEmbedder::new()?;
//!
//! // Embed catalog texts (for indexing)
//! let item_embeddings = embedder.encode_batch(&["Java 8 (New)", "Verify - Numerical Ability"])?;
//!
//! // Embed a query (for searching)
//! let query_embedding = embedder.encode("Hiring a mid-level Java developer")?;
//! ```

use crate::{Error, Result};

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
///
/// Implementations must be deterministic for a fixed model and always return
/// vectors of [`dimension`](Embedder::dimension) length. Methods take `&self`
/// so a built retriever can serve concurrent queries.
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn encode(&self, text: &str) -> Result<Embedding>;

    /// Embed multiple texts, preserving input order in the output
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn encode(&self, text: &str) -> Result<Embedding> {
        (**self).encode(text)
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        (**self).encode_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Check that a provider honoured the batch contract: one vector per input,
/// each of the advertised dimension.
pub(crate) fn validate_batch(
    expected_len: usize,
    dimension: usize,
    embeddings: &[Embedding],
) -> Result<()> {
    if embeddings.len() != expected_len {
        return Err(Error::Provider(format!(
            "provider returned {} embeddings for {expected_len} inputs",
            embeddings.len()
        )));
    }
    if let Some((pos, bad)) = embeddings
        .iter()
        .enumerate()
        .find(|(_, e)| e.len() != dimension)
    {
        return Err(Error::Provider(format!(
            "embedding {pos} has dimension {}, expected {dimension}",
            bad.len()
        )));
    }
    Ok(())
}

mod hash;
mod onnx;

pub use hash::*;
pub use onnx::*;
