//! Rating sidecar
//!
//! Every opened folder carries `image_selections.csv` with the header
//! `filename,path,score` and one row per file seen in the last session.
//! Paths are written folder-relative when possible.
//!
//! Loading builds a [`RatingTable`] that can match a scanned record by
//! absolute path, folder-relative path or bare filename, tried in that
//! order, so scores survive the folder being moved or paths being lost.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::scan::{clean_path, normalize_slashes, relative_to};
use crate::state::data::{ImageRecord, Score};

/// Sidecar file name inside the opened folder
pub const SIDECAR_NAME: &str = "image_selections.csv";

pub const HEADER: &str = "filename,path,score";

pub fn sidecar_path(folder: &Path) -> PathBuf {
    folder.join(SIDECAR_NAME)
}

/// One line of the sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRow {
    pub name: String,
    pub path: String,
    pub score: Score,
}

/// Ways of deriving a lookup key from a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    AbsolutePath,
    RelativePath,
    FileName,
}

/// Lookup precedence used when merging scores onto scanned records
pub const KEY_STRATEGIES: [KeyStrategy; 3] = [
    KeyStrategy::AbsolutePath,
    KeyStrategy::RelativePath,
    KeyStrategy::FileName,
];

impl KeyStrategy {
    fn key_for(self, record: &ImageRecord) -> Option<String> {
        match self {
            KeyStrategy::AbsolutePath => Some(clean_path(&record.absolute_path.to_string_lossy())),
            KeyStrategy::RelativePath => record.relative_path.as_deref().map(clean_path),
            KeyStrategy::FileName => Some(record.name.clone()),
        }
    }
}

/// Previously recorded scores of one folder
#[derive(Debug, Clone, Default)]
pub struct RatingTable {
    by_absolute: HashMap<String, Score>,
    by_relative: HashMap<String, Score>,
    by_name: HashMap<String, Score>,
}

impl RatingTable {
    /// Parse sidecar text. Rows that cannot be understood are skipped.
    pub fn parse(folder: &Path, text: &str) -> Self {
        let mut table = Self::default();
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_line(line);
            if line_no == 0 && fields.first().map(|f| f.trim().eq_ignore_ascii_case("filename")) == Some(true) {
                continue;
            }
            match parse_row(&fields) {
                Some(row) => table.insert(folder, &row),
                None => tracing::debug!("Skipping malformed rating row {}: {:?}", line_no + 1, line),
            }
        }
        table
    }

    /// Register one row. Later rows replace earlier ones for the same key.
    pub fn insert(&mut self, folder: &Path, row: &RatingRow) {
        // "./x/a.jpg" and "sub/../x/a.jpg" both address "x/a.jpg"
        let path = clean_path(row.path.trim());

        let name = if path.is_empty() {
            row.name.trim().to_string()
        } else {
            path.rsplit('/').next().unwrap_or_default().to_string()
        };
        if !name.is_empty() {
            self.by_name.insert(name, row.score);
        }

        if path.is_empty() {
            return;
        }
        if Path::new(&path).is_absolute() {
            self.by_absolute.insert(path, row.score);
        } else {
            let absolute = clean_path(&folder.join(&path).to_string_lossy());
            self.by_absolute.insert(absolute, row.score);
            self.by_relative.insert(path, row.score);
        }
    }

    /// Prior score of a scanned record, or unscored
    pub fn resolve(&self, record: &ImageRecord) -> Score {
        KEY_STRATEGIES
            .iter()
            .find_map(|&strategy| {
                let key = strategy.key_for(record)?;
                self.map(strategy).get(&key).copied()
            })
            .unwrap_or(Score::UNSCORED)
    }

    /// Look up any key form: absolute path, relative path or filename
    pub fn get(&self, key: &str) -> Option<Score> {
        let key = clean_path(key);
        KEY_STRATEGIES
            .iter()
            .find_map(|&strategy| self.map(strategy).get(&key).copied())
    }

    pub fn is_empty(&self) -> bool {
        self.by_absolute.is_empty() && self.by_relative.is_empty() && self.by_name.is_empty()
    }

    fn map(&self, strategy: KeyStrategy) -> &HashMap<String, Score> {
        match strategy {
            KeyStrategy::AbsolutePath => &self.by_absolute,
            KeyStrategy::RelativePath => &self.by_relative,
            KeyStrategy::FileName => &self.by_name,
        }
    }
}

/// Read the sidecar of `folder`. A missing or unreadable file yields an
/// empty table.
pub fn load_scores(folder: &Path) -> RatingTable {
    let path = sidecar_path(folder);
    match fs::read_to_string(&path) {
        Ok(text) => RatingTable::parse(folder, &text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => RatingTable::default(),
        Err(err) => {
            tracing::warn!("⚠️  Could not read {}: {}", path.display(), err);
            RatingTable::default()
        }
    }
}

/// Canonical rows for a record set: relative path when derivable,
/// otherwise the absolute path. Unscored records are included.
pub fn rows_for(folder: &Path, records: &[ImageRecord]) -> Vec<RatingRow> {
    records
        .iter()
        .map(|record| {
            let path = record
                .relative_path
                .clone()
                .or_else(|| relative_to(folder, &record.absolute_path))
                .unwrap_or_else(|| normalize_slashes(&record.absolute_path.to_string_lossy()));
            RatingRow {
                name: record.name.clone(),
                path,
                score: record.score,
            }
        })
        .collect()
}

pub fn render(rows: &[RatingRow]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + rows.len() * 48);
    out.push_str(HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&quote(&row.name));
        out.push(',');
        out.push_str(&quote(&row.path));
        out.push(',');
        out.push_str(&row.score.to_string());
        out.push('\n');
    }
    out
}

/// Replace the sidecar with a full snapshot of `rows`.
///
/// Written to a temporary file first and renamed over the old one, so a
/// reader never sees a half-written table.
pub fn write_scores(folder: &Path, rows: &[RatingRow]) -> Result<PathBuf, PersistenceError> {
    let target = sidecar_path(folder);
    let temp = folder.join(format!(".{}.tmp", SIDECAR_NAME));
    let write_err = |source| PersistenceError::Write {
        path: target.clone(),
        source,
    };

    fs::write(&temp, render(rows)).map_err(write_err)?;
    if let Err(err) = fs::rename(&temp, &target) {
        let _ = fs::remove_file(&temp);
        return Err(write_err(err));
    }

    tracing::debug!("💾 Wrote {} ratings to {}", rows.len(), target.display());
    Ok(target)
}

/// Create the sidecar with just the header if it does not exist yet.
/// Returns whether a file was created.
pub fn ensure_sidecar(folder: &Path) -> io::Result<bool> {
    let path = sidecar_path(folder);
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(mut file) => {
            writeln!(file, "{}", HEADER)?;
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err),
    }
}

fn parse_row(fields: &[String]) -> Option<RatingRow> {
    let [name, path, score, ..] = fields else {
        return None;
    };
    let score = score.trim().parse::<i64>().ok().and_then(Score::new)?;
    Some(RatingRow {
        name: name.clone(),
        path: path.clone(),
        score,
    })
}

/// Split one line on commas, honouring double-quoted fields
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
