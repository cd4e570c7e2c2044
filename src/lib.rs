//! # blackpulse-export
//!
//! Exports the messages and comments of a BlackPulse SQLite store to local Markdown files.
//!
//! ## What it does
//!
//! The store keeps messages in a `messages` table and their comments in a `comments`
//! table. This crate reads them in primary-key order and writes one of four layouts:
//!
//! - **dump**: every message in a single `exported_messages.md`.
//! - **individual**: one `message_NNNNNN.md` per message, comments included.
//! - **selective**: like individual, restricted to the ids listed in `MessageID.txt`.
//! - **paginate**: combined files capped at an estimated line budget
//!   (`exported_messages_NNN.md`), never splitting a message across files.
//!
//! The database is opened **read-only**; your data is never modified. With
//! `--snapshot` the export reads a temporary copy taken through the SQLite backup API.
//!
//! ## Usage
//!
//! ```sh
//! # Everything in one file
//! blackpulse-export dump
//!
//! # Selected ids, one file each
//! blackpulse-export --db data/messages.db selective --ids MessageID.txt
//!
//! # Parts of at most 500 estimated lines
//! blackpulse-export paginate --max-lines 500
//! ```
//!
//! Defaults can be persisted in `~/.config/blackpulse-export/config.toml`.
pub mod error;
pub mod export;
pub mod importer;
pub mod pagination;
pub mod renderer;
pub mod utils;

pub use error::ExportError;
pub use export::{
    DumpSummary, IndividualSummary, PaginatedSummary, SelectiveSummary, export_full_dump,
    export_individual, export_paginated, export_selective,
};
pub use utils::ExportConfig;
