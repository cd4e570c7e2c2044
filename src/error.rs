use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that abort a whole export run.
///
/// These travel inside an [`eyre::Report`] so callers can add context with
/// `wrap_err` and still classify the failure with `downcast_ref`.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Database not found at: {}", .0.display())]
    MissingStore(PathBuf),

    #[error("Failed to read store: {context}")]
    StoreRead {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Message ID file not found at: {}", .0.display())]
    MissingIdFile(PathBuf),
}

impl ExportError {
    pub fn store_read(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::StoreRead {
            context: context.into(),
            source,
        }
    }

    /// Short label shown to the operator in front of the error chain.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingStore(_) => "Store Not Found",
            Self::StoreRead { .. } => "Store Read Error",
            Self::MissingIdFile(_) => "ID File Not Found",
        }
    }
}

/// Classify any report produced by this crate.
pub fn category_of(report: &eyre::Report) -> &'static str {
    report
        .chain()
        .find_map(|e| e.downcast_ref::<ExportError>())
        .map(ExportError::category)
        .unwrap_or("Error")
}
