//! Image loader
//!
//! Turns a file path into a displayable byte buffer. Common raster formats
//! are read as-is; RAW files yield their embedded JPEG preview. The loader
//! is stateless: callers cache the result on the record.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::task;

use super::preview::{PreviewSource, PREVIEW_TAGS};
use crate::error::LoadError;
use crate::scan::{extension_of, RAW_EXTENSIONS};

/// Formats every image widget can show without conversion
pub const DISPLAYABLE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];

/// Mime type of an embedded preview
pub const PREVIEW_MIME: &str = "image/jpeg";

/// A display buffer with its mime type
#[derive(Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl LoadedImage {
    /// Pixel size read from the image header, `None` when undecodable
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::ImageReader::new(std::io::Cursor::new(&self.bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".bmp" => "image/bmp",
        ".tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Produces display buffers through an injected preview extraction service
#[derive(Clone)]
pub struct ImageLoader {
    previews: Arc<dyn PreviewSource>,
}

impl ImageLoader {
    pub fn new(previews: Arc<dyn PreviewSource>) -> Self {
        Self { previews }
    }

    /// Load a displayable buffer for `path`.
    ///
    /// - displayable raster: raw bytes
    /// - RAW: embedded preview, or `NoPreviewAvailable`
    /// - anything else (TIFF): embedded preview, falling back to raw bytes
    pub fn load(&self, path: &Path) -> Result<LoadedImage, LoadError> {
        let ext = extension_of(path);

        if DISPLAYABLE_EXTENSIONS.contains(&ext.as_str()) {
            return read_bytes(path, mime_for_extension(&ext));
        }

        match self.previews.extract_first(path, &PREVIEW_TAGS) {
            Ok(bytes) => Ok(LoadedImage {
                bytes,
                mime: PREVIEW_MIME,
            }),
            Err(err) if RAW_EXTENSIONS.contains(&ext.as_str()) => {
                tracing::debug!("No preview in {}: {}", path.display(), err);
                Err(LoadError::NoPreviewAvailable(path.to_path_buf()))
            }
            Err(err) => {
                tracing::debug!(
                    "Preview extraction failed for {}, reading raw bytes: {}",
                    path.display(),
                    err
                );
                read_bytes(path, mime_for_extension(&ext))
            }
        }
    }

    /// `load` on the blocking thread pool
    pub async fn load_async(&self, path: &Path) -> Result<LoadedImage, LoadError> {
        let loader = self.clone();
        let owned = path.to_path_buf();
        task::spawn_blocking(move || loader.load(&owned))
            .await
            .map_err(|e| LoadError::ReadFailure {
                path: path.to_path_buf(),
                source: std::io::Error::other(format!("Task join error: {}", e)),
            })?
    }
}

impl fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoader").finish_non_exhaustive()
    }
}

fn read_bytes(path: &Path, mime: &'static str) -> Result<LoadedImage, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::ReadFailure {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LoadedImage { bytes, mime })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreviewError;
    use crate::raw::preview::PreviewTag;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Returns a fixed payload for one tag and counts calls
    struct FakePreviews {
        tag: Option<PreviewTag>,
        calls: AtomicUsize,
    }

    impl PreviewSource for FakePreviews {
        fn extract(&self, path: &Path, tag: PreviewTag) -> Result<Vec<u8>, PreviewError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.tag == Some(tag) {
                Ok(tag.as_str().as_bytes().to_vec())
            } else {
                Err(PreviewError::TagNotFound {
                    tag: tag.as_str(),
                    path: path.to_path_buf(),
                })
            }
        }
    }

    fn loader_with(tag: Option<PreviewTag>) -> (ImageLoader, Arc<FakePreviews>) {
        let fake = Arc::new(FakePreviews {
            tag,
            calls: AtomicUsize::new(0),
        });
        (ImageLoader::new(fake.clone()), fake)
    }

    #[test]
    fn test_displayable_reads_bytes_without_extraction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.PNG");
        fs::write(&path, b"png-bytes").unwrap();

        let (loader, fake) = loader_with(Some(PreviewTag::JpgFromRaw));
        let loaded = loader.load(&path).unwrap();
        assert_eq!(loaded.bytes, b"png-bytes");
        assert_eq!(loaded.mime, "image/png");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_raw_uses_first_available_tag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.nef");
        fs::write(&path, b"raw").unwrap();

        let (loader, fake) = loader_with(Some(PreviewTag::PreviewImage));
        let loaded = loader.load(&path).unwrap();
        assert_eq!(loaded.bytes, b"PreviewImage");
        assert_eq!(loaded.mime, PREVIEW_MIME);
        // JpgFromRaw tried first, then PreviewImage
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_raw_without_preview_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.cr2");
        fs::write(&path, b"raw").unwrap();

        let (loader, _) = loader_with(None);
        assert!(matches!(
            loader.load(&path),
            Err(LoadError::NoPreviewAvailable(_))
        ));
    }

    #[test]
    fn test_tiff_falls_back_to_raw_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.tiff");
        fs::write(&path, b"tiff-bytes").unwrap();

        let (loader, _) = loader_with(None);
        let loaded = loader.load(&path).unwrap();
        assert_eq!(loaded.bytes, b"tiff-bytes");
        assert_eq!(loaded.mime, "image/tiff");
    }

    #[test]
    fn test_missing_file_is_read_failure() {
        let dir = tempdir().unwrap();
        let (loader, _) = loader_with(None);
        assert!(matches!(
            loader.load(&dir.path().join("gone.jpg")),
            Err(LoadError::ReadFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_async() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"jpeg").unwrap();

        let (loader, _) = loader_with(None);
        let loaded = loader.load_async(&path).await.unwrap();
        assert_eq!(loaded.mime, "image/jpeg");
    }

    #[test]
    fn test_dimensions_from_header() {
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::RgbImage::new(30, 20)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        let png = LoadedImage {
            bytes: bytes.into_inner(),
            mime: "image/png",
        };
        assert_eq!(png.dimensions(), Some((30, 20)));

        let junk = LoadedImage {
            bytes: b"nope".to_vec(),
            mime: PREVIEW_MIME,
        };
        assert_eq!(junk.dimensions(), None);
    }
}
