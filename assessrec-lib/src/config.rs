//! Runtime configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `ASSESSREC_*` environment variables. Command-line flags are applied on top
//! by the binary.
//!
//! ```toml
//! [retrieval]
//! semantic_weight = 0.7
//! keyword_weight = 0.3
//! top_k = 10
//!
//! [embedding]
//! backend = "fastembed"
//! model = "all-MiniLM-L6-v2"
//!
//! [index]
//! dir = "models/index"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::embed::{
    Embedder, FastEmbedder, HashEmbedder, DEFAULT_BATCH_SIZE, DEFAULT_HASH_DIMENSION,
    DEFAULT_MODEL,
};
use crate::keyword::{KeywordExtractor, Vocabulary};
use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ASSESSREC_CONFIG";
/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "assessrec.toml";

pub const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.7;
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 0.3;
pub const DEFAULT_TOP_K: usize = 10;
/// Shortlist size is `shortlist_factor * top_k` before keyword re-ranking.
pub const DEFAULT_SHORTLIST_FACTOR: usize = 2;
pub const DEFAULT_INDEX_DIR: &str = "models/index";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    /// Replaces the built-in keyword vocabulary when present
    #[serde(default)]
    pub keywords: Option<Vocabulary>,
}

/// Fusion and ranking parameters.
///
/// `semantic_weight` and `keyword_weight` must be non-negative but are not
/// required to sum to 1. Weights that don't sum to 1 produce unnormalised
/// fused scores; ranking is unaffected by a common scale factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    pub top_k: usize,
    pub use_keyword_boost: bool,
    pub shortlist_factor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            top_k: DEFAULT_TOP_K,
            use_keyword_boost: true,
            shortlist_factor: DEFAULT_SHORTLIST_FACTOR,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("semantic_weight", self.semantic_weight),
            ("keyword_weight", self.keyword_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "{name} must be a finite non-negative number, got {weight}"
                )));
            }
        }
        if self.top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".to_string()));
        }
        if self.shortlist_factor == 0 {
            return Err(Error::InvalidInput(
                "shortlist_factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX sentence-transformer via fastembed
    #[default]
    Fastembed,
    /// Model-free feature hashing
    Hash,
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fastembed" => Ok(Self::Fastembed),
            "hash" => Ok(Self::Hash),
            other => Err(Error::Config(format!(
                "unknown embedding backend '{other}' (expected fastembed|hash)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: String,
    pub batch_size: usize,
    pub hash_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Fastembed,
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            hash_dimension: DEFAULT_HASH_DIMENSION,
        }
    }
}

impl EmbeddingConfig {
    /// Construct the configured embedding provider.
    pub fn create_embedder(&self) -> Result<Box<dyn Embedder>> {
        Ok(match self.backend {
            EmbeddingBackend::Fastembed => {
                Box::new(FastEmbedder::with_model(&self.model, self.batch_size)?)
            }
            EmbeddingBackend::Hash => Box::new(HashEmbedder::new(self.hash_dimension)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_INDEX_DIR),
        }
    }
}

impl Config {
    /// Load configuration from `explicit_path`, `$ASSESSREC_CONFIG` or
    /// `./assessrec.toml`, then apply environment overrides.
    ///
    /// An explicitly named file must exist; the implicit default may not.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                Self::from_file(&path)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("read config {}: {err}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|err| Error::Config(format!("parse config {}: {err}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| Error::Config(err.to_string()))
    }

    /// Apply `ASSESSREC_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = parse_env::<f32>(&lookup, "ASSESSREC_SEMANTIC_WEIGHT")? {
            self.retrieval.semantic_weight = value;
        }
        if let Some(value) = parse_env::<f32>(&lookup, "ASSESSREC_KEYWORD_WEIGHT")? {
            self.retrieval.keyword_weight = value;
        }
        if let Some(value) = parse_env::<usize>(&lookup, "ASSESSREC_TOP_K")? {
            self.retrieval.top_k = value;
        }
        if let Some(value) = lookup("ASSESSREC_INDEX_DIR") {
            self.index.dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("ASSESSREC_EMBEDDING_BACKEND") {
            self.embedding.backend = value.parse()?;
        }
        if let Some(value) = lookup("ASSESSREC_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate().map_err(|err| match err {
            Error::InvalidInput(msg) => Error::Config(format!("retrieval.{msg}")),
            other => other,
        })?;
        if self.embedding.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be at least 1".to_string()));
        }
        if self.embedding.hash_dimension == 0 {
            return Err(Error::Config(
                "embedding.hash_dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Compile the keyword extractor for this configuration.
    pub fn keyword_extractor(&self) -> Result<KeywordExtractor> {
        match &self.keywords {
            Some(vocabulary) => KeywordExtractor::new(vocabulary),
            None => Ok(KeywordExtractor::builtin().clone()),
        }
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| Error::Config(format!("invalid {key} value {value}: {err}"))),
        None => Ok(None),
    }
}
