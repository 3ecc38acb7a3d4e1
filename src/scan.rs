//! Folder enumeration and file identity
//!
//! Walks an opened folder, keeps supported image files and derives a
//! metadata-based identity plus a folder-relative path for each one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use file_id::FileId;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::state::data::Identity;

/// Camera RAW extensions (lowercase, with leading dot)
pub const RAW_EXTENSIONS: &[&str] = &[
    ".nef", ".arw", ".cr2", ".cr3", ".dng", ".rw2", ".orf", ".raf",
    ".srw", ".pef", ".erf", ".3fr", ".iiq", ".mos", ".mef", ".nrw",
];

/// Raster formats we accept besides RAW
pub const RASTER_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".bmp", ".gif", ".tiff", ".webp",
];

/// Sidecar metadata files that sit next to images and must be ignored
pub const SIDECAR_EXTENSIONS: &[&str] = &[".xmp"];

/// Identity and folder-relative path of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identified {
    pub identity: Identity,
    pub relative_path: Option<String>,
    pub byte_size: u64,
}

/// Lowercase extension with leading dot, or an empty string
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn is_raw(path: &Path) -> bool {
    RAW_EXTENSIONS.contains(&extension_of(path).as_str())
}

pub fn is_supported(path: &Path) -> bool {
    let ext = extension_of(path);
    RAW_EXTENSIONS.contains(&ext.as_str()) || RASTER_EXTENSIONS.contains(&ext.as_str())
}

/// Dot-files, AppleDouble resource forks ("._x") and sidecars
pub fn is_hidden_or_sidecar(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name.starts_with('.') {
        return true;
    }
    SIDECAR_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// Replace Windows separators with '/'
pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolve `.` and `..` segments of a '/'-separated path without touching
/// the filesystem. Leading `..` segments of a relative path are kept.
pub fn clean_path(path: &str) -> String {
    let path = normalize_slashes(path);
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if rooted {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// '/'-separated path of `path` below `root`, or `None` if it is not inside it
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(normalize_slashes(&rel.to_string_lossy()))
}

/// Recursively list supported image files under `root`, sorted by path.
///
/// Symbolic links are not followed and hidden directories are not entered.
/// Failing to read `root` itself aborts the scan; unreadable nested entries
/// are logged and skipped.
pub fn enumerate(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: root.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                tracing::warn!("⚠️  Skipping unreadable entry: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_hidden_or_sidecar(path) || !is_supported(path) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    tracing::debug!("🔍 Found {} candidate files in {}", files.len(), root.display());
    Ok(files)
}

/// Derive `{identity, relative_path}` for a discovered file.
///
/// The identity combines a filesystem serial number (inode or file index),
/// the modification time in milliseconds and the byte size. A filesystem
/// that instantly reuses serial numbers could produce a collision; that
/// risk is accepted.
pub fn identify(path: &Path, root: Option<&Path>) -> io::Result<Identified> {
    let metadata = fs::metadata(path)?;
    let modified_ms = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let size = metadata.len();
    let serial = serial_number(path)?;

    Ok(Identified {
        identity: Identity::new(serial, modified_ms, size),
        relative_path: root.and_then(|root| relative_to(root, path)),
        byte_size: size,
    })
}

fn serial_number(path: &Path) -> io::Result<u128> {
    Ok(match file_id::get_file_id(path)? {
        FileId::Inode { inode_number, .. } => inode_number as u128,
        FileId::LowRes { file_index, .. } => file_index as u128,
        FileId::HighRes { file_id, .. } => file_id,
    })
}
