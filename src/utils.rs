use crate::error::ExportError;
use crate::importer::Store;
use eyre::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_DB_PATH: &str = "data/messages.db";
pub const DEFAULT_DUMP_FILE: &str = "exported_messages.md";
pub const DEFAULT_INDIVIDUAL_DIR: &str = "exported_messages_individual";
pub const DEFAULT_SELECTED_DIR: &str = "exported_messages_selected";
pub const DEFAULT_PAGINATED_DIR: &str = "exported_messages";
pub const DEFAULT_ID_FILE: &str = "MessageID.txt";
pub const DEFAULT_MAX_LINES_PER_FILE: usize = 1000;

/// Configuration required to run an export.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub db_path: PathBuf,
    pub dump_file: PathBuf,
    pub individual_dir: PathBuf,
    pub selected_dir: PathBuf,
    pub paginated_dir: PathBuf,
    pub id_file: PathBuf,
    pub max_lines_per_file: usize,
    /// Copy the store to a temporary file before reading it.
    pub snapshot: bool,
    pub quiet: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            dump_file: PathBuf::from(DEFAULT_DUMP_FILE),
            individual_dir: PathBuf::from(DEFAULT_INDIVIDUAL_DIR),
            selected_dir: PathBuf::from(DEFAULT_SELECTED_DIR),
            paginated_dir: PathBuf::from(DEFAULT_PAGINATED_DIR),
            id_file: PathBuf::from(DEFAULT_ID_FILE),
            max_lines_per_file: DEFAULT_MAX_LINES_PER_FILE,
            snapshot: false,
            quiet: false,
        }
    }
}

impl ExportConfig {
    /// Every output path placed under `root`. Handy for tests and scratch runs.
    pub fn rooted_at(root: &Path, db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            dump_file: root.join(DEFAULT_DUMP_FILE),
            individual_dir: root.join(DEFAULT_INDIVIDUAL_DIR),
            selected_dir: root.join(DEFAULT_SELECTED_DIR),
            paginated_dir: root.join(DEFAULT_PAGINATED_DIR),
            id_file: root.join(DEFAULT_ID_FILE),
            ..Self::default()
        }
    }
}

/// An opened store, plus the snapshot file backing it when one was taken.
/// The snapshot is deleted when this is dropped.
pub struct OpenStore {
    pub store: Store,
    _snapshot: Option<NamedTempFile>,
}

pub fn ensure_store_exists(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        return Err(ExportError::MissingStore(db_path.to_path_buf()).into());
    }
    Ok(())
}

/// Open the configured store read-only, snapshotting it first if requested.
pub fn open_store(config: &ExportConfig) -> Result<OpenStore> {
    ensure_store_exists(&config.db_path)?;

    if config.snapshot {
        let snapshot = backup_database(&config.db_path, config.quiet)?;
        let conn = open_db(snapshot.path())?;
        return Ok(OpenStore {
            store: Store::new(conn),
            _snapshot: Some(snapshot),
        });
    }

    Ok(OpenStore {
        store: Store::new(open_db(&config.db_path)?),
        _snapshot: None,
    })
}

fn open_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ExportError::store_read(format!("opening {}", path.display()), e))?;
    Ok(conn)
}

/// Create a read-only backup of the database to a temporary file.
pub fn backup_database(db_path: &Path, quiet: bool) -> Result<NamedTempFile> {
    use rusqlite::backup::Backup;
    use std::time::Duration;

    let spinner = if quiet {
        indicatif::ProgressBar::hidden()
    } else {
        let s = indicatif::ProgressBar::new_spinner();
        s.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        s.set_message("Snapshotting database...");
        s.enable_steady_tick(Duration::from_millis(80));
        s
    };

    let src = open_db(db_path)?;

    let tmp = NamedTempFile::new().wrap_err("Failed to create temporary file")?;
    let mut dst =
        Connection::open(tmp.path()).wrap_err("Failed to open snapshot database connection")?;

    {
        let backup = Backup::new(&src, &mut dst)
            .map_err(|e| ExportError::store_read("initializing backup", e))?;
        backup
            .run_to_completion(1000, Duration::from_millis(5), None)
            .map_err(|e| ExportError::store_read("copying store to snapshot", e))?;
    }

    drop(src);
    spinner.finish_and_clear();
    tracing::debug!("Snapshot of {} at {}", db_path.display(), tmp.path().display());
    Ok(tmp)
}

/// Requested message ids, plus the lines that were not integers.
#[derive(Debug, Default, PartialEq)]
pub struct IdList {
    pub ids: Vec<i64>,
    pub invalid: Vec<String>,
}

/// Parse a newline-delimited id list. Blank lines are skipped; order and
/// duplicates are preserved.
pub fn parse_message_ids<R: Read>(reader: R) -> std::io::Result<IdList> {
    let mut list = IdList::default();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<i64>() {
            Ok(id) => list.ids.push(id),
            Err(_) => {
                tracing::warn!("Skipping invalid message ID: {}", line);
                list.invalid.push(line.to_string());
            }
        }
    }
    Ok(list)
}

pub fn read_message_ids(path: &Path) -> Result<IdList> {
    if !path.exists() {
        return Err(ExportError::MissingIdFile(path.to_path_buf()).into());
    }
    let file = fs::File::open(path)
        .wrap_err_with(|| format!("Failed to open ID file: {}", path.display()))?;
    parse_message_ids(file).wrap_err_with(|| format!("Failed to read ID file: {}", path.display()))
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create output directory: {}", dir.display()))?;
        tracing::info!("Created output directory: {}", dir.display());
    }
    Ok(())
}

/// `message_000042.md`
pub fn message_file_name(id: i64) -> String {
    format!("message_{:06}.md", id)
}

/// `exported_messages_007.md`
pub fn part_file_name(index: usize) -> String {
    format!("exported_messages_{:03}.md", index)
}
