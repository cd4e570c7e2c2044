use crate::importer::{Message, MessageFilter, Store};
use crate::pagination::{PartReport, PartWriter};
use crate::renderer;
use crate::utils::{
    ExportConfig, ensure_dir, ensure_store_exists, message_file_name, open_store,
    read_message_ids,
};
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    pub total: usize,
    /// `None` when the store had no messages and nothing was written.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectiveSummary {
    /// Valid ids read from the list, duplicates included.
    pub requested: usize,
    pub exported: usize,
    pub not_found: Vec<i64>,
    pub invalid_lines: Vec<String>,
    /// One entry per export, so a repeated id shows up more than once.
    pub written: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndividualSummary {
    pub exported: usize,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginatedSummary {
    pub total_messages: usize,
    pub parts: Vec<PartReport>,
}

/// All messages into one combined file.
pub fn export_full_dump(config: &ExportConfig) -> Result<DumpSummary> {
    let opened = open_store(config)?;
    info!("Reading data from {}...", config.db_path.display());
    let messages = opened.store.list_messages(&MessageFilter::All)?.messages;

    if messages.is_empty() {
        info!("No messages found in the database.");
        return Ok(DumpSummary {
            total: 0,
            path: None,
        });
    }

    info!("Exporting {} messages...", messages.len());
    if let Some(parent) = config.dump_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let path = &config.dump_file;
    let file =
        File::create(path).wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    renderer::write_dump_header(&mut writer, messages.len())?;
    for msg in &messages {
        renderer::write_message_entry(&mut writer, msg)
            .wrap_err_with(|| format!("Failed to write message {}", msg.id))?;
    }
    writer.flush().wrap_err("Failed to flush markdown file")?;

    info!("Data exported to: {}", path.display());
    Ok(DumpSummary {
        total: messages.len(),
        path: Some(path.clone()),
    })
}

/// One file per id listed in the id file, with comments.
pub fn export_selective(config: &ExportConfig) -> Result<SelectiveSummary> {
    ensure_store_exists(&config.db_path)?;
    let ids = read_message_ids(&config.id_file)?;

    let mut summary = SelectiveSummary {
        requested: ids.ids.len(),
        invalid_lines: ids.invalid,
        ..Default::default()
    };
    if ids.ids.is_empty() {
        warn!("No valid message IDs found in {}", config.id_file.display());
        return Ok(summary);
    }
    info!(
        "Found {} message IDs in {}",
        ids.ids.len(),
        config.id_file.display()
    );

    ensure_dir(&config.selected_dir)?;
    let opened = open_store(config)?;
    let listing = opened.store.list_messages(&MessageFilter::ByIds(ids.ids))?;

    for id in &listing.missing {
        warn!("Message ID {} not found in database", id);
    }

    for msg in &listing.messages {
        let path = write_message_file(&opened.store, msg, &config.selected_dir)?;
        info!("Exported: {}", message_file_name(msg.id));
        summary.written.push(path);
        summary.exported += 1;
    }
    summary.not_found = listing.missing;

    info!("Export completed!");
    info!("  - Total message IDs in file: {}", summary.requested);
    info!("  - Successfully exported: {}", summary.exported);
    info!("  - Not found in database: {}", summary.not_found.len());
    info!("  - Output directory: {}", config.selected_dir.display());
    Ok(summary)
}

/// One file per message, with comments.
pub fn export_individual(config: &ExportConfig) -> Result<IndividualSummary> {
    ensure_store_exists(&config.db_path)?;
    ensure_dir(&config.individual_dir)?;
    let opened = open_store(config)?;

    info!("Reading data from {}...", config.db_path.display());
    let messages = opened.store.list_messages(&MessageFilter::All)?.messages;
    let summary = IndividualSummary {
        exported: messages.len(),
        output_dir: config.individual_dir.clone(),
    };
    if messages.is_empty() {
        info!("No messages found in the database.");
        return Ok(summary);
    }

    info!("Exporting {} messages with their comments...", messages.len());
    let pb = if config.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(messages.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        bar
    };

    for msg in &messages {
        let path = write_message_file(&opened.store, msg, &config.individual_dir)?;
        debug!("Wrote {}", path.display());
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "All {} messages exported to: {}",
        summary.exported,
        summary.output_dir.display()
    );
    Ok(summary)
}

/// All messages into size-capped combined parts.
pub fn export_paginated(config: &ExportConfig) -> Result<PaginatedSummary> {
    ensure_store_exists(&config.db_path)?;
    ensure_dir(&config.paginated_dir)?;
    let opened = open_store(config)?;

    info!("Reading data from {}...", config.db_path.display());
    let messages = opened.store.list_messages(&MessageFilter::All)?.messages;
    if messages.is_empty() {
        info!("No messages found in the database.");
        return Ok(PaginatedSummary {
            total_messages: 0,
            parts: Vec::new(),
        });
    }

    info!("Exporting {} messages with pagination...", messages.len());
    let mut parts = PartWriter::new(&config.paginated_dir, config.max_lines_per_file);
    for msg in &messages {
        parts.append(msg)?;
    }
    let parts = parts.finish()?;

    info!(
        "Data exported to {} file(s) in: {}",
        parts.len(),
        config.paginated_dir.display()
    );
    info!("  - Total messages: {}", messages.len());
    info!("  - Maximum lines per file: {}", config.max_lines_per_file);
    Ok(PaginatedSummary {
        total_messages: messages.len(),
        parts,
    })
}

fn write_message_file(store: &Store, msg: &Message, dir: &Path) -> Result<PathBuf> {
    let comments = store.comments_for(msg)?;
    let path = dir.join(message_file_name(msg.id));
    let file =
        File::create(&path).wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    renderer::write_message_document(&mut writer, msg, &comments)
        .wrap_err_with(|| format!("Failed to write message {}", msg.id))?;
    writer.flush().wrap_err("Failed to flush markdown file")?;
    Ok(path)
}
