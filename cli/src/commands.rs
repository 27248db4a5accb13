//! Command implementations.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::debug;

use sdd_search_index::VectorIndex;
use sdd_ticket_dedup::{
    DedupConfig, DedupError, HistoryReport, IndexBackend, IndexOperation, OpenAIProvider,
    SavedMapping, TicketDedup,
};

use crate::cli::Command;

/// Run `command` against the configured backend and return the text to print.
pub async fn execute(command: Command, config: &DedupConfig) -> Result<String> {
    if command.needs_embedding() {
        config.validate()?;
    } else {
        config.validate_index()?;
    }

    match config.search.backend {
        IndexBackend::Azure => {
            let index = config.azure_index()?;
            execute_on(command, config, index).await
        }
        IndexBackend::Local => {
            let index = config.local_index().await?;
            execute_on(command, config, index).await
        }
    }
}

async fn execute_on<I>(command: Command, config: &DedupConfig, index: I) -> Result<String>
where
    I: VectorIndex,
{
    debug!(
        "Using index '{}' ({} dimensions)",
        index.name(),
        index.dimension()
    );

    let output = match command {
        Command::Search { content, file, .. } => {
            let content = read_content(content, file).await?;
            let dedup = workflow(config, index)?;
            dedup.find_or_flag_duplicate(&content).await?.to_string()
        }
        Command::Record {
            spec_link,
            content,
            file,
            dev_link,
            issue_link,
        } => {
            let content = read_content(content, file).await?;
            let dedup = workflow(config, index)?;
            let mapping = dedup
                .record_mapping(&spec_link, &content, &dev_link, &issue_link)
                .await?;
            SavedMapping(&mapping).to_string()
        }
        Command::History { count } => {
            let n = count.unwrap_or(config.matching.history_len);
            index
                .ensure_schema()
                .await
                .map_err(DedupError::index(IndexOperation::EnsureSchema))?;
            let recent = index
                .list_recent(n)
                .await
                .map_err(DedupError::index(IndexOperation::History))?;
            HistoryReport(&recent).to_string()
        }
        Command::EnsureIndex => {
            index
                .ensure_schema()
                .await
                .map_err(DedupError::index(IndexOperation::EnsureSchema))?;
            format!(
                "Index '{}' is ready ({} dimensions).",
                index.name(),
                index.dimension()
            )
        }
    };
    Ok(output)
}

fn workflow<I>(config: &DedupConfig, index: I) -> Result<TicketDedup<OpenAIProvider, I>>
where
    I: VectorIndex,
{
    Ok(TicketDedup::new(config.embedding_client()?, index)?
        .with_threshold(config.matching.similarity_threshold)
        .with_neighbors(config.matching.neighbors))
}

/// Inline text, then the file, then standard input.
async fn read_content(content: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(content) = content {
        return Ok(content);
    }
    if let Some(path) = file {
        return tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read ticket content from {}", path.display()));
    }
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .context("failed to read ticket content from stdin")?;
    Ok(buffer)
}
