use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{CacheError, ThumbnailError};
use crate::state::data::Identity;

/// Hidden cache directory created inside every opened folder
pub const CACHE_DIR_NAME: &str = ".thumbnails";

/// Default longest edge of generated thumbnails
pub const DEFAULT_MAX_SIZE: u32 = 400;

/// Default JPEG quality of generated thumbnails
pub const DEFAULT_QUALITY: u8 = 80;

/// Target dimensions for a uniform downscale into a `max_size` box.
/// Never upscales; never returns a zero dimension.
pub fn fit_within(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width.max(1), height.max(1));
    }
    let scale = (max_size as f64 / width as f64)
        .min(max_size as f64 / height as f64)
        .min(1.0);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Decode `source`, scale it into a `max_size` box and re-encode as JPEG
pub fn render_thumbnail(source: &[u8], max_size: u32, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
    let img = image::load_from_memory(source).map_err(ThumbnailError::Decode)?;

    let (w, h) = fit_within(img.width(), img.height(), max_size);
    let scaled = if (w, h) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    };

    // JPEG has no alpha channel
    let rgb = scaled.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(ThumbnailError::Encode)?;
    Ok(out)
}

/// On-disk thumbnail cache of one folder, keyed by file identity.
///
/// Entries live in `<folder>/.thumbnails/<identity>.jpg`, so moving or
/// renaming a source file inside the folder keeps its thumbnail.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    dir: PathBuf,
}

/// SOI at the start and EOI at the end
fn is_complete_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes.starts_with(&[0xFF, 0xD8]) && bytes.ends_with(&[0xFF, 0xD9])
}

impl ThumbnailCache {
    pub fn for_folder(folder: &Path) -> Self {
        Self {
            dir: folder.join(CACHE_DIR_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the thumbnail path for an identity (doesn't generate, just returns the expected path)
    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.dir.join(format!("{}.jpg", identity))
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Cached bytes, or `None` on a miss. Unreadable entries and entries
    /// that are not a complete JPEG stream count as misses.
    pub async fn read(&self, identity: &Identity) -> Option<Vec<u8>> {
        match fs::read(self.path_for(identity)).await {
            Ok(bytes) if is_complete_jpeg(&bytes) => Some(bytes),
            Ok(_) => {
                tracing::debug!("Ignoring truncated thumbnail for {}", identity);
                None
            }
            Err(_) => None,
        }
    }

    /// Store an entry. Bytes go to a temporary file that is renamed into
    /// place, so readers never see a partial entry.
    pub async fn write(&self, identity: &Identity, bytes: &[u8]) -> io::Result<PathBuf> {
        self.ensure_dir().await?;
        let path = self.path_for(identity);
        let tmp = self.dir.join(format!(".{}.jpg.tmp", identity));

        fs::write(&tmp, bytes).await?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }
        Ok(path)
    }

    /// Delete every cached entry. Returns how many files were removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let clear_err = |source| CacheError::Clear {
            path: self.dir.clone(),
            source,
        };

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(clear_err(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(clear_err)? {
            let path = entry.path();
            let result = if entry.file_type().await.map_err(clear_err)?.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(clear_err(e)),
            }
        }

        tracing::info!("🧹 Cleared {} cached thumbnails in {}", removed, self.dir.display());
        Ok(removed)
    }
}
