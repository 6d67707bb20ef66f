//! Embedding backends: small capability trait plus two implementations
//! (`local`, a deterministic hashing embedder with no external
//! dependencies, and `remote`, an HTTP API client). The embedding worker
//! in `ctxmem-runtime` depends only on the `Embedder` trait.

pub mod error;
pub mod local;
pub mod remote;

pub use error::{Error, Result};
pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

/// Capability trait for turning text into a fixed-dimension, L2-normalized
/// vector. Implementations must be deterministic for a given
/// `(model_id, text)` pair — the outbox relies on re-embedding after a
/// crash producing byte-identical vectors, not just similar ones.
pub trait Embedder: Send + Sync {
    /// Stable identifier mixed into the embedding version; changing a
    /// model's behavior without changing this id is a contract violation.
    fn model_id(&self) -> &str;

    /// Output vector dimensionality.
    fn dim(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Convenience default for batches; implementations with a genuinely
    /// batched remote API should override this.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
