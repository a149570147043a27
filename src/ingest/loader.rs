use crate::types::{AppError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Extensions read as UTF-8 text; anything else is skipped.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "csv", "tsv", "json", "html", "htm", "xml", "log",
];

/// A readable file from the data directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
}

impl SourceDocument {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lower-cased extension, `unknown` when there is none.
    pub fn file_type(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// `source`, `file_name` and `file_type`, as stored with every chunk.
    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert(
            "source".to_string(),
            Value::String(self.path.display().to_string()),
        );
        metadata.insert("file_name".to_string(), Value::String(self.file_name()));
        metadata.insert("file_type".to_string(), Value::String(self.file_type()));
        metadata
    }
}

/// Result of scanning a data directory.
#[derive(Debug, Default)]
pub struct LoadedDirectory {
    pub documents: Vec<SourceDocument>,
    /// Files that were unsupported, unreadable or empty
    pub skipped: Vec<PathBuf>,
}

/// Read every supported file under `dir`, in file-name order.
///
/// Hidden files and directories are ignored.
pub fn load_directory(dir: &Path) -> Result<LoadedDirectory> {
    if !dir.is_dir() {
        return Err(AppError::InvalidInput(format!(
            "Data directory not found: {}",
            dir.display()
        )));
    }

    let mut loaded = LoadedDirectory::default();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_text_file(path) {
            warn!(path = %path.display(), "Skipping unsupported format");
            loaded.skipped.push(path.to_path_buf());
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => loaded.documents.push(SourceDocument {
                path: path.to_path_buf(),
                text,
            }),
            Ok(_) => {
                debug!(path = %path.display(), "Skipping empty file");
                loaded.skipped.push(path.to_path_buf());
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read file");
                loaded.skipped.push(path.to_path_buf());
            }
        }
    }

    Ok(loaded)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}
