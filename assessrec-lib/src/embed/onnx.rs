use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;

use crate::embed::{validate_batch, Embedder, Embedding};
use crate::{Error, Result};

/// Default sentence-transformer model name.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Default number of texts per inference batch.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Resolve a user-facing model name to the fastembed model and its dimension.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize, &'static str)> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => Ok((
            EmbeddingModel::AllMiniLML6V2,
            384,
            "sentence-transformers/all-MiniLM-L6-v2",
        )),
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => {
            Ok((EmbeddingModel::BGESmallENV15, 384, "BAAI/bge-small-en-v1.5"))
        }
        "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => {
            Ok((EmbeddingModel::BGEBaseENV15, 768, "BAAI/bge-base-en-v1.5"))
        }
        "bge-large-en-v1.5" | "baai/bge-large-en-v1.5" => {
            Ok((EmbeddingModel::BGELargeENV15, 1024, "BAAI/bge-large-en-v1.5"))
        }
        other => Err(Error::Config(format!(
            "unknown embedding model '{other}' (expected all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5 or bge-large-en-v1.5)"
        ))),
    }
}

/// Sentence embedder backed by fastembed's ONNX runtime.
///
/// The underlying session needs exclusive access during inference, so it sits
/// behind a mutex; concurrent `encode` calls serialize on it.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
    name: &'static str,
    dimension: usize,
    batch_size: usize,
}

impl FastEmbedder {
    /// Create an embedder for the default model.
    ///
    /// Downloads the model on first use (~90MB).
    pub fn new() -> Result<Self> {
        Self::with_model(DEFAULT_MODEL, DEFAULT_BATCH_SIZE)
    }

    /// Create an embedder for a named model with a given inference batch size.
    pub fn with_model(name: &str, batch_size: usize) -> Result<Self> {
        let (model, dimension, canonical) = resolve_model(name)?;
        let opts = InitOptions::new(model).with_show_download_progress(true);

        tracing::info!(model = canonical, dimension, "loading embedding model");
        let model = TextEmbedding::try_new(opts).map_err(|e| Error::Provider(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(model),
            name: canonical,
            dimension,
            batch_size: batch_size.max(1),
        })
    }
}

impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .lock()
            .embed(texts, Some(self.batch_size))
            .map_err(|e| Error::Provider(e.to_string()))?;

        validate_batch(texts.len(), self.dimension, &embeddings)?;
        Ok(embeddings)
    }

    fn encode(&self, text: &str) -> Result<Embedding> {
        self.encode_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("model returned no embeddings".to_string()))
    }
}
