//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use sdd_ticket_dedup::{DedupConfig, IndexBackend};

/// Find existing dev tickets for a spec ticket and record new mappings
#[derive(Parser, Debug)]
#[command(name = "sdd-tickets")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH", env = "SDD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Vector index backend
    #[arg(long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// File backing the local index
    #[arg(long, global = true, value_name = "PATH")]
    pub local_store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Look for recorded spec tickets similar to new ticket content
    ///
    /// Content is read from standard input when neither text nor a file is given.
    Search {
        /// Spec ticket content
        content: Option<String>,

        /// Read spec ticket content from a file
        #[arg(long, value_name = "PATH", conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Override the similarity threshold
        #[arg(long)]
        threshold: Option<f32>,
    },

    /// Record the dev ticket and GitHub issue created for a spec ticket
    Record {
        /// Spec ticket link (identifies the mapping)
        #[arg(long)]
        spec_link: String,

        /// Spec ticket content; read from standard input when omitted
        #[arg(long)]
        content: Option<String>,

        /// Read spec ticket content from a file
        #[arg(long, value_name = "PATH", conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Dev ticket link
        #[arg(long)]
        dev_link: String,

        /// GitHub issue link
        #[arg(long)]
        issue_link: String,
    },

    /// Show the most recently recorded mappings
    History {
        /// Number of mappings to show
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Create the index if it does not exist
    EnsureIndex,
}

/// Vector index backend.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Azure AI Search
    Azure,
    /// Local JSON file
    Local,
}

impl From<Backend> for IndexBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Azure => IndexBackend::Azure,
            Backend::Local => IndexBackend::Local,
        }
    }
}

impl Command {
    /// Whether the command calls the embedding provider.
    pub fn needs_embedding(&self) -> bool {
        matches!(self, Self::Search { .. } | Self::Record { .. })
    }
}

impl Cli {
    /// Build the configuration: file (or defaults), then environment, then flags.
    pub fn resolve_config<F>(&self, lookup: F) -> sdd_ticket_dedup::Result<DedupConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config {
            Some(path) => DedupConfig::load(path)?,
            None => DedupConfig::default(),
        };
        config.apply_env(lookup);

        if let Some(backend) = self.backend {
            config.search.backend = backend.into();
        }
        if let Some(path) = &self.local_store {
            config.search.local_path = path.clone();
            if self.backend.is_none() {
                config.search.backend = IndexBackend::Local;
            }
        }
        if let Command::Search {
            threshold: Some(threshold),
            ..
        } = &self.command
        {
            config.matching.similarity_threshold = *threshold;
        }
        Ok(config)
    }
}
