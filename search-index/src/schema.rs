//! Index definition for ticket mappings.
//!
//! The vector field is searched through an HNSW profile by default; an
//! exhaustive KNN profile is defined alongside it for exact queries.

use serde_json::{Value, json};

use crate::document::{
    FIELD_CREATED_AT, FIELD_DEV_TICKET_LINK, FIELD_GITHUB_ISSUE_LINK, FIELD_ID,
    FIELD_SPEC_TICKET_CONTENT, FIELD_SPEC_TICKET_LINK, FIELD_SPEC_TICKET_VECTOR,
};

/// Default index name.
pub const DEFAULT_INDEX_NAME: &str = "sdd-tickets-index";

/// Name of the approximate (HNSW) vector profile.
pub const HNSW_PROFILE: &str = "hnsw-profile";

/// Name of the exact (exhaustive KNN) vector profile.
pub const KNN_PROFILE: &str = "knn-profile";

/// Data type of an index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    DateTimeOffset,
    /// `Collection(Edm.Single)` bound to a vector profile.
    Vector {
        dimensions: usize,
        profile: &'static str,
    },
}

impl FieldType {
    fn edm_name(&self) -> &'static str {
        match self {
            Self::String => "Edm.String",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Vector { .. } => "Collection(Edm.Single)",
        }
    }
}

/// One field of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub key: bool,
    pub filterable: bool,
    pub searchable: bool,
    pub sortable: bool,
}

impl FieldSpec {
    fn simple(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            key: false,
            filterable: true,
            searchable: false,
            sortable: false,
        }
    }

    fn to_json(&self) -> Value {
        match self.field_type {
            FieldType::Vector {
                dimensions,
                profile,
            } => json!({
                "name": self.name,
                "type": self.field_type.edm_name(),
                "searchable": true,
                "retrievable": true,
                "dimensions": dimensions,
                "vectorSearchProfile": profile,
            }),
            _ => json!({
                "name": self.name,
                "type": self.field_type.edm_name(),
                "key": self.key,
                "filterable": self.filterable,
                "searchable": self.searchable,
                "sortable": self.sortable,
                "retrievable": true,
            }),
        }
    }
}

/// Similarity metric for vector algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cosine,
}

impl Metric {
    fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
        }
    }
}

/// A vector search algorithm configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorAlgorithm {
    /// Approximate nearest neighbours over a navigable small-world graph.
    Hnsw {
        name: &'static str,
        m: u32,
        ef_construction: u32,
        ef_search: u32,
        metric: Metric,
    },
    /// Brute-force exact search.
    ExhaustiveKnn { name: &'static str, metric: Metric },
}

impl VectorAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hnsw { name, .. } | Self::ExhaustiveKnn { name, .. } => name,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Hnsw {
                name,
                m,
                ef_construction,
                ef_search,
                metric,
            } => json!({
                "name": name,
                "kind": "hnsw",
                "hnswParameters": {
                    "m": m,
                    "efConstruction": ef_construction,
                    "efSearch": ef_search,
                    "metric": metric.as_str(),
                },
            }),
            Self::ExhaustiveKnn { name, metric } => json!({
                "name": name,
                "kind": "exhaustiveKnn",
                "exhaustiveKnnParameters": { "metric": metric.as_str() },
            }),
        }
    }
}

/// Binds a profile name to an algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorProfile {
    pub name: &'static str,
    pub algorithm: &'static str,
}

/// Complete definition of the ticket index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub dimension: usize,
    pub fields: Vec<FieldSpec>,
    pub algorithms: Vec<VectorAlgorithm>,
    pub profiles: Vec<VectorProfile>,
}

impl IndexSchema {
    /// Schema for ticket mappings with vectors of `dimension` floats.
    pub fn ticket_mappings(name: impl Into<String>, dimension: usize) -> Self {
        let fields = vec![
            FieldSpec {
                key: true,
                ..FieldSpec::simple(FIELD_ID, FieldType::String)
            },
            FieldSpec::simple(FIELD_SPEC_TICKET_LINK, FieldType::String),
            FieldSpec {
                filterable: false,
                searchable: true,
                ..FieldSpec::simple(FIELD_SPEC_TICKET_CONTENT, FieldType::String)
            },
            FieldSpec {
                filterable: false,
                searchable: true,
                ..FieldSpec::simple(
                    FIELD_SPEC_TICKET_VECTOR,
                    FieldType::Vector {
                        dimensions: dimension,
                        profile: HNSW_PROFILE,
                    },
                )
            },
            FieldSpec::simple(FIELD_DEV_TICKET_LINK, FieldType::String),
            FieldSpec::simple(FIELD_GITHUB_ISSUE_LINK, FieldType::String),
            FieldSpec {
                sortable: true,
                ..FieldSpec::simple(FIELD_CREATED_AT, FieldType::DateTimeOffset)
            },
        ];

        let algorithms = vec![
            VectorAlgorithm::Hnsw {
                name: "hnsw-config",
                m: 4,
                ef_construction: 400,
                ef_search: 500,
                metric: Metric::Cosine,
            },
            VectorAlgorithm::ExhaustiveKnn {
                name: "knn-config",
                metric: Metric::Cosine,
            },
        ];

        let profiles = vec![
            VectorProfile {
                name: HNSW_PROFILE,
                algorithm: "hnsw-config",
            },
            VectorProfile {
                name: KNN_PROFILE,
                algorithm: "knn-config",
            },
        ];

        Self {
            name: name.into(),
            dimension,
            fields,
            algorithms,
            profiles,
        }
    }

    /// The index definition in the search service's REST format.
    pub fn to_azure_definition(&self) -> Value {
        json!({
            "name": self.name,
            "fields": self.fields.iter().map(FieldSpec::to_json).collect::<Vec<_>>(),
            "vectorSearch": {
                "algorithms": self.algorithms.iter().map(VectorAlgorithm::to_json).collect::<Vec<_>>(),
                "profiles": self
                    .profiles
                    .iter()
                    .map(|p| json!({ "name": p.name, "algorithm": p.algorithm }))
                    .collect::<Vec<_>>(),
            },
        })
    }
}
