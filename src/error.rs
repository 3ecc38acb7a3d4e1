//! Error types
//!
//! One enum per failure family. Per-file failures during a folder scan are
//! counted by the caller and never abort the batch; everything else is
//! surfaced to the user as a dismissible notice.

use std::path::PathBuf;
use thiserror::Error;

/// Directory enumeration failed; the folder cannot be opened.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("folder does not exist or is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to enumerate {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("scan task failed: {0}")]
    Task(String),
}

/// A single file could not be turned into a displayable buffer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no embedded preview available in {0}")]
    NoPreviewAvailable(PathBuf),

    #[error("failed to read {path}: {source}")]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The preview extraction service found nothing for a tag.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("tag {tag} not present in {path}")]
    TagNotFound { tag: &'static str, path: PathBuf },

    #[error("failed to run exiftool: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Thumbnail creation failed. The grid cell shows an error state.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("failed to load source image: {0}")]
    Load(#[from] LoadError),

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    #[error("thumbnail task failed: {0}")]
    Task(String),
}

/// The rating sidecar could not be written. In-memory state is untouched.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("save task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to clear thumbnail cache {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine the user configuration directory")]
    NoConfigDir,

    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not determine the user data directory")]
    NoDataDir,

    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("project name must not be empty")]
    EmptyName,

    #[error("no project with id {0}")]
    UnknownProject(i64),
}
