//! Human-readable rendering of workflow results.

use std::fmt;

use sdd_search_index::{RecentMappings, TicketMapping};

use crate::workflow::DuplicateCheck;

/// Characters of spec content shown per history entry.
pub const SUMMARY_CHARS: usize = 100;

impl fmt::Display for DuplicateCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No similar existing tickets found. Create a new dev ticket and GitHub issue."
            ),
            Self::Matches(matches) => {
                write!(f, "Found {} similar existing ticket(s):", matches.len())?;
                for (i, hit) in matches.iter().enumerate() {
                    let mapping = &hit.mapping;
                    write!(f, "\n\n[{}] similarity score: {:.4}", i + 1, hit.score)?;
                    write!(f, "\n    spec ticket: {}", mapping.spec_ticket_link)?;
                    write!(f, "\n    dev ticket: {}", mapping.dev_ticket_link)?;
                    write!(f, "\n    GitHub issue: {}", mapping.github_issue_link)?;
                }
                Ok(())
            }
        }
    }
}

/// Confirmation for a recorded mapping.
pub struct SavedMapping<'a>(pub &'a TicketMapping);

impl fmt::Display for SavedMapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mapping = self.0;
        writeln!(f, "Ticket mapping saved.")?;
        writeln!(f, "  spec ticket: {}", mapping.spec_ticket_link)?;
        writeln!(f, "  dev ticket: {}", mapping.dev_ticket_link)?;
        write!(f, "  GitHub issue: {}", mapping.github_issue_link)
    }
}

/// Listing of recently recorded mappings.
pub struct HistoryReport<'a>(pub &'a RecentMappings);

impl fmt::Display for HistoryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recent = self.0;
        if recent.is_empty() {
            return write!(f, "No ticket mapping history saved yet.");
        }

        let total = recent.total.unwrap_or(recent.len() as u64);
        write!(
            f,
            "Recent ticket mapping history ({} of {total}):",
            recent.len()
        )?;
        for (i, mapping) in recent.mappings.iter().enumerate() {
            write!(
                f,
                "\n\n[{}] created: {}",
                i + 1,
                mapping.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            )?;
            write!(f, "\n    spec ticket: {}", mapping.spec_ticket_link)?;
            write!(f, "\n    summary: {}", summarize(&mapping.spec_ticket_content))?;
            write!(f, "\n    dev ticket: {}", mapping.dev_ticket_link)?;
            write!(f, "\n    GitHub issue: {}", mapping.github_issue_link)?;
        }
        Ok(())
    }
}

/// First [`SUMMARY_CHARS`] characters, with an ellipsis when cut.
fn summarize(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(SUMMARY_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
