//! Command-line front end for spec-ticket deduplication.
//!
//! ```text
//! sdd-tickets search "Users can reset their password"
//! sdd-tickets record --spec-link <url> --dev-link <url> --issue-link <url> < ticket.txt
//! sdd-tickets history -n 10
//! sdd-tickets --backend local ensure-index
//! ```

pub mod cli;
pub mod commands;

pub use cli::{Backend, Cli, Command};
pub use commands::execute;
