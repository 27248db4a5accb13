//! Embedding providers.
//!
//! The same HTTP client speaks to the public OpenAI API and to Azure OpenAI
//! deployments; they differ only in URL layout and authentication header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Default API version for Azure OpenAI deployments.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Dimensions for the output (if supported by provider).
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            dimensions: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Get the default embedding dimension.
    fn default_dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// Which API layout the provider talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFlavor {
    /// `POST {base}/embeddings` with a bearer token.
    OpenAI,
    /// `POST {endpoint}/openai/deployments/{deployment}/embeddings` with an `api-key` header.
    Azure {
        deployment: String,
        api_version: String,
    },
}

/// OpenAI / Azure OpenAI embedding provider.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL (OpenAI) or resource endpoint (Azure).
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,

    /// URL layout and auth scheme.
    flavor: ApiFlavor,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            default_model: "text-embedding-3-small".to_string(),
            flavor: ApiFlavor::OpenAI,
        }
    }

    /// Create a provider for an Azure OpenAI embedding deployment.
    ///
    /// The deployment name doubles as the model name.
    pub fn azure(endpoint: impl Into<String>, deployment: impl Into<String>) -> Self {
        let deployment = deployment.into();
        Self {
            api_key: None,
            base_url: endpoint.into(),
            client: reqwest::Client::new(),
            default_model: deployment.clone(),
            flavor: ApiFlavor::Azure {
                deployment,
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            },
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the Azure API version. No effect for the OpenAI flavor.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        if let ApiFlavor::Azure { api_version, .. } = &mut self.flavor {
            *api_version = version.into();
        }
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The API layout in use.
    pub fn flavor(&self) -> &ApiFlavor {
        &self.flavor
    }

    fn request_builder(&self, api_key: &str) -> reqwest::RequestBuilder {
        let base = self.base_url.trim_end_matches('/');
        match &self.flavor {
            ApiFlavor::OpenAI => self
                .client
                .post(format!("{base}/embeddings"))
                .header("Authorization", format!("Bearer {api_key}")),
            ApiFlavor::Azure {
                deployment,
                api_version,
            } => self
                .client
                .post(format!("{base}/openai/deployments/{deployment}/embeddings"))
                .query(&[("api-version", api_version.as_str())])
                .header("api-key", api_key),
        }
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        match self.flavor {
            ApiFlavor::OpenAI => "openai",
            ApiFlavor::Azure { .. } => "azure-openai",
        }
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn default_dimension(&self) -> usize {
        match self.default_model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => crate::DEFAULT_DIMENSION,
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            EmbeddingError::ProviderNotConfigured(format!("{} API key is not set", self.name()))
        })?;

        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Generating embedding with model: {model}");

        let mut body = serde_json::json!({ "input": request.text });
        if self.flavor == ApiFlavor::OpenAI {
            body["model"] = serde_json::json!(model);
        }
        if let Some(dims) = request.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        let response = self
            .request_builder(api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let result: OpenAIEmbeddingResponse = response.json().await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;

        let dimension = embedding.len();
        let tokens_used = result.usage.map(|u| u.total_tokens);

        info!("Generated embedding with {dimension} dimensions");

        Ok(EmbeddingResponse {
            embedding,
            model: result.model.unwrap_or(model),
            dimension,
            tokens_used,
        })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: Option<String>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: u64,
}
