//! Documents stored in the ticket index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sdd_embeddings::Embedding;

/// Key field.
pub const FIELD_ID: &str = "id";
/// Link to the specification ticket.
pub const FIELD_SPEC_TICKET_LINK: &str = "spec_ticket_link";
/// Text of the specification ticket.
pub const FIELD_SPEC_TICKET_CONTENT: &str = "spec_ticket_content";
/// Embedding of the specification ticket text.
pub const FIELD_SPEC_TICKET_VECTOR: &str = "spec_ticket_vector";
/// Link to the development ticket created for the spec ticket.
pub const FIELD_DEV_TICKET_LINK: &str = "dev_ticket_link";
/// Link to the GitHub issue created for the spec ticket.
pub const FIELD_GITHUB_ISSUE_LINK: &str = "github_issue_link";
/// Creation timestamp used for recency ordering.
pub const FIELD_CREATED_AT: &str = "created_at";

/// Every field except the vector, in schema order.
pub const SELECT_FIELDS: [&str; 6] = [
    FIELD_ID,
    FIELD_SPEC_TICKET_LINK,
    FIELD_SPEC_TICKET_CONTENT,
    FIELD_DEV_TICKET_LINK,
    FIELD_GITHUB_ISSUE_LINK,
    FIELD_CREATED_AT,
];

/// Links a specification ticket to the artifacts created for it.
///
/// One document exists per distinct `spec_ticket_link`; the id is derived
/// from the link so re-recording replaces rather than duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMapping {
    /// Deterministic document key.
    pub id: String,

    #[serde(default)]
    pub spec_ticket_link: String,

    #[serde(default)]
    pub spec_ticket_content: String,

    /// Embedding of `spec_ticket_content`. Empty when the backend was asked
    /// not to return vectors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spec_ticket_vector: Embedding,

    #[serde(default)]
    pub dev_ticket_link: String,

    #[serde(default)]
    pub github_issue_link: String,

    /// Creation time, serialized as RFC 3339 UTC with millisecond precision.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMapping {
    /// Similarity reported by the index; higher is closer. Backend-specific,
    /// see [`crate::VectorIndex::search_similar`].
    #[serde(rename = "@search.score")]
    pub score: f32,

    #[serde(flatten)]
    pub mapping: TicketMapping,
}

/// The newest mappings in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentMappings {
    /// Newest first.
    pub mappings: Vec<TicketMapping>,

    /// Number of documents in the whole index, when the backend reports it.
    pub total: Option<u64>,
}

impl RecentMappings {
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }
}

/// RFC 3339 timestamps with millisecond precision, the finest the search
/// service's `DateTimeOffset` type keeps.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
