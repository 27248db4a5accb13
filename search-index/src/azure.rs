//! Azure AI Search backend over the REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::document::{
    FIELD_CREATED_AT, FIELD_SPEC_TICKET_VECTOR, RecentMappings, SELECT_FIELDS, ScoredMapping,
    TicketMapping,
};
use crate::error::{IndexError, Result};
use crate::schema::{IndexSchema, VectorAlgorithm};
use crate::store::{VectorIndex, check_dimension};

/// REST API version used for every request.
pub const DEFAULT_API_VERSION: &str = "2024-07-01";

/// How vector queries traverse the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Use the HNSW graph bound to the vector field.
    #[default]
    Approximate,
    /// Scan every vector (exhaustive KNN).
    Exact,
}

/// A handle to one Azure AI Search index.
///
/// Holds a single HTTP client for its lifetime. The schema check is
/// remembered per handle, so only the first [`VectorIndex::ensure_schema`]
/// call reaches the service.
pub struct AzureSearchIndex {
    /// Service endpoint, e.g. `https://<service>.search.windows.net`.
    endpoint: String,

    /// Admin API key.
    api_key: String,

    /// REST API version.
    api_version: String,

    /// Index definition.
    schema: IndexSchema,

    /// HTTP client.
    client: reqwest::Client,

    /// Vector query traversal.
    search_mode: SearchMode,

    /// Set once the index is known to exist.
    schema_ready: OnceCell<()>,
}

impl AzureSearchIndex {
    /// Create a handle for the index described by `schema`.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, schema: IndexSchema) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            schema,
            client: reqwest::Client::new(),
            search_mode: SearchMode::default(),
            schema_ready: OnceCell::new(),
        }
    }

    /// Set the REST API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the vector query traversal.
    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The index definition this handle creates.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    fn index_url(&self) -> String {
        format!("{}/indexes/{}", self.endpoint, self.schema.name)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
    }

    async fn create_if_absent(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, self.index_url())
            .send()
            .await?;

        if response.status().is_success() {
            info!("Index '{}' already exists", self.schema.name);
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(status_error(response).await);
        }

        let algorithms: Vec<&str> = self.schema.algorithms.iter().map(VectorAlgorithm::name).collect();
        info!(
            "Creating index '{}' ({} dimensions, algorithms: {})",
            self.schema.name,
            self.schema.dimension,
            algorithms.join(", ")
        );

        let response = self
            .request(reqwest::Method::PUT, self.index_url())
            .json(&self.schema.to_azure_definition())
            .send()
            .await?;
        ensure_success(response).await?;

        info!("Created index '{}'", self.schema.name);
        Ok(())
    }

    async fn search(&self, body: serde_json::Value) -> Result<SearchResponse> {
        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/docs/search", self.index_url()),
            )
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl VectorIndex for AzureSearchIndex {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn dimension(&self) -> usize {
        self.schema.dimension
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| self.create_if_absent())
            .await
            .inspect_err(|err| error!("Failed to check or create index '{}': {err}", self.schema.name))?;
        Ok(())
    }

    async fn search_similar(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredMapping>> {
        check_dimension(self.schema.dimension, vector)?;

        let mut vector_query = json!({
            "kind": "vector",
            "vector": vector,
            "fields": FIELD_SPEC_TICKET_VECTOR,
            "k": k,
        });
        if self.search_mode == SearchMode::Exact {
            vector_query["exhaustive"] = json!(true);
        }

        let response = self
            .search(json!({
                "count": true,
                "select": SELECT_FIELDS.join(","),
                "top": k,
                "vectorQueries": [vector_query],
            }))
            .await?;

        debug!(
            "Vector search on '{}' returned {} hits",
            self.schema.name,
            response.value.len()
        );
        Ok(response.value)
    }

    async fn upsert(&self, mapping: TicketMapping) -> Result<()> {
        check_dimension(self.schema.dimension, &mapping.spec_ticket_vector)?;

        let mut document = serde_json::to_value(&mapping)?;
        document["@search.action"] = json!("mergeOrUpload");

        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/docs/index", self.index_url()),
            )
            .json(&json!({ "value": [document] }))
            .send()
            .await?;

        // A 207 still carries per-document results; the rejection is in the body.
        let batch: IndexBatchResponse = ensure_success(response).await?.json().await?;

        let result = batch
            .value
            .into_iter()
            .find(|r| r.key == mapping.id)
            .ok_or_else(|| {
                IndexError::InvalidResponse(format!("no indexing result for key {}", mapping.id))
            })?;
        if !result.status {
            return Err(IndexError::DocumentRejected {
                key: result.key,
                message: result
                    .error_message
                    .unwrap_or_else(|| format!("status code {}", result.status_code)),
            });
        }

        info!("Upserted ticket mapping {}", result.key);
        Ok(())
    }

    async fn list_recent(&self, n: usize) -> Result<RecentMappings> {
        let response = self
            .search(json!({
                "search": "*",
                "count": true,
                "select": SELECT_FIELDS.join(","),
                "orderby": format!("{FIELD_CREATED_AT} desc"),
                "top": n,
            }))
            .await?;

        Ok(RecentMappings {
            mappings: response.value.into_iter().map(|hit| hit.mapping).collect(),
            total: response.count,
        })
    }

    async fn get(&self, id: &str) -> Result<Option<TicketMapping>> {
        let response = self
            .request(
                reqwest::Method::GET,
                format!("{}/docs/{id}", self.index_url()),
            )
            .query(&[("$select", SELECT_FIELDS.join(","))])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        Ok(Some(response.json().await?))
    }
}

async fn status_error(response: reqwest::Response) -> IndexError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    IndexError::Request { status, body }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "@odata.count")]
    count: Option<u64>,
    value: Vec<ScoredMapping>,
}

#[derive(Debug, Deserialize)]
struct IndexBatchResponse {
    value: Vec<IndexingResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexingResult {
    key: String,
    status: bool,
    error_message: Option<String>,
    status_code: u16,
}
