use rqa_core::error::{codes, AppError};
use sha2::{Digest, Sha256};

use super::Embedder;

/// Deterministic bag-of-tokens embedder: each lower-cased token is hashed into one of
/// `dimensions` buckets and the vector is L2-normalized. Not semantic, but stable
/// across runs and machines, so indexes built with it stay loadable.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn try_new(dimensions: usize) -> Result<Self, AppError> {
        if dimensions == 0 {
            return Err(AppError::new(
                codes::CONFIG_INVALID,
                "embedding dimensions must be greater than zero",
            ));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % self.dimensions as u64) as usize
    }
}

pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '%' || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> String {
        format!("hash:{}", self.dimensions)
    }

    fn dims(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(input) {
            vector[self.bucket(&token)] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
