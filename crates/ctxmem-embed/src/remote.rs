use crate::{l2_normalize, Embedder, Error, Result};
use serde::{Deserialize, Serialize};

/// Embedder backed by a remote HTTP API (e.g. an OpenAI-compatible
/// embeddings endpoint). Blocking from the caller's perspective: each
/// worker thread owns a small current-thread `tokio` runtime it drives
/// these calls through, matching the rest of the runtime's thread-per-
/// worker model rather than forcing the whole crate onto an async
/// executor.
pub struct RemoteEmbedder {
    model_id: String,
    dim: usize,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(model_id: impl Into<String>, dim: usize, endpoint: impl Into<String>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Remote(format!("failed to start embedder runtime: {}", e)))?;

        Ok(Self {
            model_id: model_id.into(),
            dim,
            endpoint: endpoint.into(),
            api_key: None,
            client: reqwest::Client::new(),
            runtime,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn embed_batch_async(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbedRequest {
            model: &self.model_id,
            input: texts,
        });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "embedding API returned status {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("malformed embedding response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::Remote(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed
            .data
            .into_iter()
            .map(|d| {
                let mut v = d.embedding;
                l2_normalize(&mut v);
                v
            })
            .collect())
    }
}

impl Embedder for RemoteEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
        batch
            .into_iter()
            .next()
            .ok_or_else(|| Error::Remote("empty embedding response".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.runtime.block_on(self.embed_batch_async(texts))
    }
}
