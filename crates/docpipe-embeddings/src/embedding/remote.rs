//! HTTP embedding provider
//!
//! Talks to an embedding sidecar over JSON: POST the texts, get one vector
//! per text back. The model itself is a deployment concern; this provider
//! only enforces the shape contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docpipe_config::EmbeddingConfig;

use crate::embedding::traits::EmbeddingProvider;
use crate::error::{EmbeddingError, EmbeddingResult};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Provider backed by a remote embedding service
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    /// Build a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::Configuration` if no endpoint is
    /// configured.
    pub fn from_config(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            EmbeddingError::Configuration("embedding.endpoint is required for the HTTP provider".into())
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            model_id: config.model_id.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    #[tracing::instrument(skip(self, texts), fields(batch_size = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.model_id,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Provider(format!(
                "Embedding service returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response.json().await?;

        if body.embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                sent: texts.len(),
                received: body.embeddings.len(),
            });
        }
        for vector in &body.embeddings {
            if vector.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        Ok(body.embeddings)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: String) -> EmbeddingConfig {
        EmbeddingConfig {
            model_id: "test-model".to_string(),
            dimension: 3,
            batch_size: 100,
            endpoint: Some(endpoint),
        }
    }

    #[tokio::test]
    async fn embeds_a_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
            })))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::from_config(&config(format!("{}/embed", server.uri())))
            .unwrap();
        let vectors = provider.embed_batch(&["one", "two"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn surfaces_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::from_config(&config(format!("{}/embed", server.uri())))
            .unwrap();
        let err = provider.embed_batch(&["text"]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Provider(_)));
    }

    #[tokio::test]
    async fn rejects_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2]]
            })))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::from_config(&config(format!("{}/embed", server.uri())))
            .unwrap();
        let err = provider.embed_batch(&["text"]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::DimensionMismatch { .. }));
    }
}
