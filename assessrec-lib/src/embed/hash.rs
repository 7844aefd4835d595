use crate::embed::{Embedder, Embedding};
use crate::Result;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Default hash embedding dimension, matching `all-MiniLM-L6-v2`.
pub const DEFAULT_HASH_DIMENSION: usize = 384;

/// Model-free embedder using FNV-1a feature hashing.
///
/// Each lower-cased alphanumeric token is hashed into a bucket with a sign
/// taken from a second hash bit, then the vector is L2-normalised. Texts that
/// share tokens land close together; that is all the semantics it has.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_HASH_DIMENSION,
        }
    }
}

impl HashEmbedder {
    /// Create embedder with specified dimension (at least 1)
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dim as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

impl Embedder for HashEmbedder {
    fn encode(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed(text))
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_name(&self) -> &str {
        "fnv1a-hash"
    }
}
