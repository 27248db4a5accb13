//! Configuration for the deduplication workflow.
//!
//! Values come from a TOML file, then environment variables override them.
//! The environment names follow the deployment's existing conventions, with
//! the `AZURE_`-prefixed search variables accepted as fallbacks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sdd_embeddings::{DEFAULT_DIMENSION, EmbeddingClient, OpenAIProvider, RetryPolicy};
use sdd_search_index::{AzureSearchIndex, DEFAULT_INDEX_NAME, IndexSchema, MemoryIndex, SearchMode};

use crate::error::{DedupError, IndexOperation, Result};
use crate::workflow::{DEFAULT_HISTORY_LEN, DEFAULT_NEIGHBORS, SIMILARITY_THRESHOLD};

/// Configuration for the deduplication workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DedupConfig {
    /// Vector index configuration.
    pub search: SearchConfig,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Match and history tuning.
    pub matching: MatchConfig,
}

impl DedupConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DedupError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Override values from an environment lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        };

        if let Some(endpoint) = var(&["SEARCH_ENDPOINT", "AZURE_SEARCH_ENDPOINT"]) {
            self.search.endpoint = Some(endpoint);
        }
        if let Some(key) = var(&["SEARCH_ADMIN_KEY", "AZURE_SEARCH_ADMIN_KEY"]) {
            self.search.api_key = Some(key);
        }
        if let Some(name) = var(&["SEARCH_INDEX_NAME"]) {
            self.search.index_name = name;
        }

        if let Some(endpoint) = var(&["FOUNDRY_PROJECT_ENDPOINT"]) {
            self.embedding.endpoint = Some(endpoint);
        }
        if let Some(key) = var(&["FOUNDRY_PROJECT_KEY"]) {
            self.embedding.api_key = Some(key);
        }
        if let Some(deployment) = var(&["AZURE_OPENAI_EMBEDDING_DEPLOYMENT"]) {
            self.embedding.model = Some(deployment);
        }
        if let Some(version) = var(&["AZURE_OPENAI_API_VERSION"]) {
            self.embedding.api_version = version;
        }
        if self.embedding.provider == EmbeddingProviderType::OpenAI && self.embedding.api_key.is_none() {
            self.embedding.api_key = var(&["OPENAI_API_KEY"]);
        }
    }

    /// Check everything [`validate_index`](Self::validate_index) and
    /// [`validate_embedding`](Self::validate_embedding) check.
    pub fn validate(&self) -> Result<()> {
        self.validate_index()?;
        self.validate_embedding()
    }

    /// Check the values needed to open the index and rank matches.
    pub fn validate_index(&self) -> Result<()> {
        let matching = &self.matching;
        if !(0.0..=1.0).contains(&matching.similarity_threshold) {
            return Err(DedupError::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                matching.similarity_threshold
            )));
        }
        if matching.neighbors == 0 {
            return Err(DedupError::Config("neighbors must be at least 1".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(DedupError::Config("embedding dimension must be at least 1".to_string()));
        }
        if self.search.backend == IndexBackend::Azure {
            require(&self.search.endpoint, "search endpoint")?;
            require(&self.search.api_key, "search admin key")?;
        }
        Ok(())
    }

    /// Check the values needed to call the embedding provider.
    pub fn validate_embedding(&self) -> Result<()> {
        if self.embedding.api_key.is_none() {
            return Err(DedupError::Config("embedding API key is not set".to_string()));
        }
        if self.embedding.provider == EmbeddingProviderType::AzureOpenAI {
            require(&self.embedding.endpoint, "embedding endpoint")?;
            require(&self.embedding.model, "embedding deployment")?;
        }
        if self.embedding.max_input_chars == Some(0) {
            return Err(DedupError::Config("max_input_chars must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Retry policy for embedding calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.embedding.max_attempts,
            Duration::from_secs(self.embedding.backoff_step_secs),
        )
    }

    /// Build the embedding client described by this configuration.
    pub fn embedding_client(&self) -> Result<EmbeddingClient<OpenAIProvider>> {
        let embedding = &self.embedding;
        let mut provider = match embedding.provider {
            EmbeddingProviderType::AzureOpenAI => OpenAIProvider::azure(
                require(&embedding.endpoint, "embedding endpoint")?,
                require(&embedding.model, "embedding deployment")?,
            )
            .with_api_version(embedding.api_version.as_str()),
            EmbeddingProviderType::OpenAI => {
                let mut provider = OpenAIProvider::new();
                if let Some(endpoint) = &embedding.endpoint {
                    provider = provider.with_base_url(endpoint.as_str());
                }
                if let Some(model) = &embedding.model {
                    provider = provider.with_model(model.as_str());
                }
                provider
            }
        };
        if let Some(key) = &embedding.api_key {
            provider = provider.with_api_key(key.as_str());
        }

        let client = EmbeddingClient::new(provider)
            .with_dimension(embedding.dimension)
            .with_retry(self.retry_policy());
        Ok(match embedding.max_input_chars {
            Some(limit) => client.with_max_input_chars(limit),
            None => client,
        })
    }

    /// Index schema for the configured name and dimension.
    pub fn index_schema(&self) -> IndexSchema {
        IndexSchema::ticket_mappings(self.search.index_name.as_str(), self.embedding.dimension)
    }

    /// Build a handle to the configured Azure AI Search index.
    pub fn azure_index(&self) -> Result<AzureSearchIndex> {
        let search = &self.search;
        let mode = if search.exhaustive {
            SearchMode::Exact
        } else {
            SearchMode::Approximate
        };
        Ok(AzureSearchIndex::new(
            require(&search.endpoint, "search endpoint")?,
            require(&search.api_key, "search admin key")?,
            self.index_schema(),
        )
        .with_api_version(search.api_version.as_str())
        .with_search_mode(mode))
    }

    /// Open the configured local index file.
    pub async fn local_index(&self) -> Result<MemoryIndex> {
        let index = MemoryIndex::with_persistence(&self.search.local_path, self.embedding.dimension)
            .await
            .map_err(DedupError::index(IndexOperation::Open))?;
        Ok(index.with_name(self.search.index_name.as_str()))
    }
}

fn require<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| DedupError::Config(format!("{what} is not set")))
}

/// Which vector index backs the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    /// Azure AI Search.
    #[default]
    Azure,
    /// JSON file on local disk with exact search.
    Local,
}

/// Configuration for the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub backend: IndexBackend,

    /// Search service endpoint.
    pub endpoint: Option<String>,

    /// Admin API key.
    pub api_key: Option<String>,

    pub index_name: String,

    /// REST API version.
    pub api_version: String,

    /// Use exhaustive KNN instead of HNSW for similarity queries.
    pub exhaustive: bool,

    /// File backing the local index.
    pub local_path: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            endpoint: None,
            api_key: None,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            api_version: sdd_search_index::azure::DEFAULT_API_VERSION.to_string(),
            exhaustive: false,
            local_path: PathBuf::from(".sdd/tickets.json"),
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// Azure OpenAI deployment.
    #[default]
    #[serde(rename = "azure_openai")]
    AzureOpenAI,
    /// Public OpenAI API.
    #[serde(rename = "openai")]
    OpenAI,
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderType,

    /// Resource endpoint (Azure) or base URL override (OpenAI).
    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    /// Deployment name (Azure) or model name (OpenAI).
    pub model: Option<String>,

    /// Azure OpenAI API version.
    pub api_version: String,

    /// Vector length produced by the model; must match the index.
    pub dimension: usize,

    /// Total attempts per embedding call.
    pub max_attempts: u32,

    /// Linear backoff increment between attempts, in seconds.
    pub backoff_step_secs: u64,

    /// Longest input, in characters, sent to the provider.
    pub max_input_chars: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            provider: EmbeddingProviderType::default(),
            endpoint: None,
            api_key: None,
            model: None,
            api_version: sdd_embeddings::provider::DEFAULT_AZURE_API_VERSION.to_string(),
            dimension: DEFAULT_DIMENSION,
            max_attempts: retry.max_attempts,
            backoff_step_secs: retry.backoff_step.as_secs(),
            max_input_chars: None,
        }
    }
}

/// Match and history tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum score for a hit to count as an existing ticket.
    pub similarity_threshold: f32,

    /// Nearest neighbours fetched per query.
    pub neighbors: usize,

    /// Default number of mappings shown by history.
    pub history_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: SIMILARITY_THRESHOLD,
            neighbors: DEFAULT_NEIGHBORS,
            history_len: DEFAULT_HISTORY_LEN,
        }
    }
}
