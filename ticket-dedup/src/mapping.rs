//! Deterministic document ids for ticket mappings.

use sha2::{Digest, Sha256};

/// Derive the index document id for a spec-ticket link.
///
/// The id is the lowercase hex SHA-256 of the trimmed link, so recording the
/// same spec ticket twice overwrites the earlier mapping. Hex digits are
/// valid Azure AI Search keys.
pub fn mapping_id(spec_ticket_link: &str) -> String {
    let digest = Sha256::digest(spec_ticket_link.trim().as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
