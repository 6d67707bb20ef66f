use crate::{l2_normalize, Embedder, Result};
use sha2::{Digest, Sha256};

/// A dependency-free embedder for local, offline use: a hashing-trick bag
/// of words. Each lowercased whitespace token is hashed into a bucket of
/// `dim` floats (sign and magnitude both derived from the hash), buckets
/// are summed across the text, then the result is L2-normalized.
///
/// Not semantically sophisticated, but fully deterministic per
/// `(model_id, text)` and requires no model download or network access —
/// the right default so the engine works offline out of the box.
pub struct LocalEmbedder {
    model_id: String,
    dim: usize,
}

impl LocalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            model_id: format!("local-hash-v1-d{}", dim),
            dim,
        }
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0f32; self.dim];
        let lowered = text.to_lowercase();

        for token in lowered.split_whitespace() {
            let mut hasher = Sha256::new();
            hasher.update(token.as_bytes());
            let digest = hasher.finalize();

            // First 8 bytes pick a bucket; the 9th byte's low bit picks a sign.
            let bucket_bytes: [u8; 8] = digest[0..8].try_into().expect("8 bytes");
            let bucket = (u64::from_le_bytes(bucket_bytes) as usize) % self.dim;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            let magnitude = (digest[9] as f32 + 1.0) / 256.0;

            vector[bucket] += sign * magnitude;
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }
}
