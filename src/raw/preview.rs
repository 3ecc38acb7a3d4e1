//! Embedded preview extraction
//!
//! RAW files carry pre-rendered JPEG previews. Extraction is a service with
//! two backends: the `exiftool` command line tool, and an in-process scanner
//! that walks JPEG segments inside the file and reads the EXIF thumbnail.
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use image::{ImageFormat, ImageReader};

use crate::error::PreviewError;
use crate::state::settings::{PreviewBackend, Settings};

/// Metadata tags that may hold an embedded preview image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTag {
    /// Full-size JPEG (Nikon, Canon, ...)
    JpgFromRaw,
    /// Medium-size preview
    PreviewImage,
    /// Small EXIF thumbnail (IFD1)
    ThumbnailImage,
}

/// Most complete first
pub const PREVIEW_TAGS: [PreviewTag; 3] = [
    PreviewTag::JpgFromRaw,
    PreviewTag::PreviewImage,
    PreviewTag::ThumbnailImage,
];

impl PreviewTag {
    pub fn as_str(self) -> &'static str {
        match self {
            PreviewTag::JpgFromRaw => "JpgFromRaw",
            PreviewTag::PreviewImage => "PreviewImage",
            PreviewTag::ThumbnailImage => "ThumbnailImage",
        }
    }
}

/// Given a file and a tag, return the binary payload or fail.
pub trait PreviewSource: Send + Sync {
    fn extract(&self, path: &Path, tag: PreviewTag) -> Result<Vec<u8>, PreviewError>;

    /// Try `tags` in order and return the first non-empty payload.
    fn extract_first(&self, path: &Path, tags: &[PreviewTag]) -> Result<Vec<u8>, PreviewError> {
        let mut last_err = None;
        for &tag in tags {
            match self.extract(path, tag) {
                Ok(buf) if !buf.is_empty() => return Ok(buf),
                Ok(_) => {}
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| PreviewError::TagNotFound {
            tag: tags.last().map(|t| t.as_str()).unwrap_or("none"),
            path: path.to_path_buf(),
        }))
    }
}

/// Build the extraction service selected in the settings
pub fn from_settings(settings: &Settings) -> Arc<dyn PreviewSource> {
    match settings.preview_backend {
        PreviewBackend::ExifTool => Arc::new(ExifTool::new(&settings.exiftool_path)),
        PreviewBackend::Embedded => Arc::new(EmbeddedJpeg),
        PreviewBackend::Auto => {
            let exiftool = ExifTool::new(&settings.exiftool_path);
            if exiftool.is_available() {
                tracing::info!("📷 Using exiftool for RAW previews");
                Arc::new(Chain(vec![Arc::new(exiftool), Arc::new(EmbeddedJpeg)]))
            } else {
                tracing::info!("📷 exiftool not found, using built-in preview extraction");
                Arc::new(EmbeddedJpeg)
            }
        }
    }
}

/// Runs `exiftool -b -<Tag> <file>` and returns stdout
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// True if the binary can be spawned
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-ver")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

impl PreviewSource for ExifTool {
    fn extract(&self, path: &Path, tag: PreviewTag) -> Result<Vec<u8>, PreviewError> {
        let output = Command::new(&self.program)
            .arg("-b")
            .arg(format!("-{}", tag.as_str()))
            .arg(path)
            .output()
            .map_err(PreviewError::Spawn)?;

        if output.status.success() && !output.stdout.is_empty() {
            Ok(output.stdout)
        } else {
            Err(PreviewError::TagNotFound {
                tag: tag.as_str(),
                path: path.to_path_buf(),
            })
        }
    }
}

/// Tries each source in turn; the first payload wins
pub struct Chain(pub Vec<Arc<dyn PreviewSource>>);

impl PreviewSource for Chain {
    fn extract(&self, path: &Path, tag: PreviewTag) -> Result<Vec<u8>, PreviewError> {
        self.extract_first(path, &[tag])
    }

    fn extract_first(&self, path: &Path, tags: &[PreviewTag]) -> Result<Vec<u8>, PreviewError> {
        let mut last_err = None;
        for source in &self.0 {
            match source.extract_first(path, tags) {
                Ok(buf) => return Ok(buf),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| PreviewError::TagNotFound {
            tag: "none",
            path: path.to_path_buf(),
        }))
    }
}

/// In-process extraction without external tools.
///
/// - `JpgFromRaw`: the largest well-formed JPEG stream in the file
/// - `PreviewImage`: the first JPEG above a size floor near the file start
/// - `ThumbnailImage`: the EXIF IFD1 thumbnail
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedJpeg;

/// (bytes to read from the start of the file, minimum JPEG size)
const QUICK_SEARCH_TIERS: [(usize, usize); 3] = [
    (256 * 1024, 50_000),
    (512 * 1024, 30_000),
    (5 * 1024 * 1024, 10_000),
];

impl PreviewSource for EmbeddedJpeg {
    fn extract(&self, path: &Path, tag: PreviewTag) -> Result<Vec<u8>, PreviewError> {
        let found = match tag {
            PreviewTag::JpgFromRaw => {
                let data = fs::read(path).map_err(|source| PreviewError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                largest_jpeg(&data)
            }
            PreviewTag::PreviewImage => quick_jpeg(path)?,
            PreviewTag::ThumbnailImage => exif_thumbnail(path),
        };

        found.ok_or_else(|| PreviewError::TagNotFound {
            tag: tag.as_str(),
            path: path.to_path_buf(),
        })
    }
}

fn quick_jpeg(path: &Path) -> Result<Option<Vec<u8>>, PreviewError> {
    let io_err = |source| PreviewError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let max_window = QUICK_SEARCH_TIERS[QUICK_SEARCH_TIERS.len() - 1].0;
    let mut data = Vec::new();
    file.take(max_window as u64)
        .read_to_end(&mut data)
        .map_err(io_err)?;

    for (window, min_size) in QUICK_SEARCH_TIERS {
        let prefix = &data[..data.len().min(window)];
        let hit = jpeg_streams(prefix)
            .into_iter()
            .find(|&(start, end)| end - start > min_size && is_decodable(&prefix[start..end]));
        if let Some((start, end)) = hit {
            return Ok(Some(prefix[start..end].to_vec()));
        }
    }
    Ok(None)
}

/// Largest embedded JPEG that parses
pub fn largest_jpeg(data: &[u8]) -> Option<Vec<u8>> {
    let mut streams = jpeg_streams(data);
    streams.sort_by_key(|&(start, end)| std::cmp::Reverse(end - start));
    streams
        .into_iter()
        .find(|&(start, end)| is_decodable(&data[start..end]))
        .map(|(start, end)| data[start..end].to_vec())
}

fn exif_thumbnail(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let offset = exif
        .get_field(exif::Tag::JPEGInterchangeFormat, exif::In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(exif::Tag::JPEGInterchangeFormatLength, exif::In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;

    let bytes = exif.buf().get(offset..offset.checked_add(length)?)?;
    if bytes.is_empty() {
        return None;
    }
    Some(bytes.to_vec())
}

fn is_decodable(jpeg: &[u8]) -> bool {
    ImageReader::with_format(Cursor::new(jpeg), ImageFormat::Jpeg)
        .into_dimensions()
        .is_ok()
}

/// Byte ranges `[start, end)` of every well-formed JPEG stream in `data`
fn jpeg_streams(data: &[u8]) -> Vec<(usize, usize)> {
    const SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

    let mut streams = Vec::new();
    let mut pos = 0;
    while pos + SOI.len() <= data.len() {
        if data[pos..].starts_with(&SOI) {
            if let Some(end) = jpeg_end(data, pos) {
                streams.push((pos, end));
            }
            pos += 2;
        } else {
            pos += 1;
        }
    }
    streams
}

/// Walk the segments of the JPEG starting at `start` and return the offset
/// just past its EOI marker. Segment lengths are honoured, so an EXIF
/// thumbnail nested in APP1 does not end the outer image early.
fn jpeg_end(data: &[u8], start: usize) -> Option<usize> {
    let segment_len = |at: usize| -> Option<usize> {
        let hi = *data.get(at)? as usize;
        let lo = *data.get(at + 1)? as usize;
        Some((hi << 8) | lo)
    };

    let mut pos = start + 2;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        while *data.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos + 1)?;
        pos += 2;

        match marker {
            0xD9 => return Some(pos),
            0x01 | 0xD0..=0xD7 => {}
            0xDA => {
                pos += segment_len(pos)?;
                // Entropy-coded data runs until a marker that is neither
                // a stuffed zero nor a restart marker.
                loop {
                    if *data.get(pos)? == 0xFF {
                        let next = *data.get(pos + 1)?;
                        if next == 0x00 || (0xD0..=0xD7).contains(&next) {
                            pos += 2;
                            continue;
                        }
                        break;
                    }
                    pos += 1;
                }
            }
            _ => {
                let len = segment_len(pos)?;
                if len < 2 {
                    return None;
                }
                pos += len;
            }
        }
    }
}
