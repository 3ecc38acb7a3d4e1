//! Per-folder culling session
//!
//! A [`Session`] is created when a folder is opened and torn down when
//! another folder replaces it. It owns the record set, the selection, the
//! thumbnail pipeline and the autosave timer. Background results arrive on
//! channels and are applied to the records by [`Session::poll_events`],
//! which the view layer calls on every tick.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task;

use super::autosave::{Autosave, SaveOutcome};
use super::data::{Identity, ImageRecord, Score, ThumbnailSlot};
use super::ratings::{self, RatingRow};
use super::selection::{ClickMode, Selection, ViewMode};
use super::settings::Settings;
use crate::error::{CacheError, LoadError, PersistenceError, ScanError};
use crate::raw::loader::{ImageLoader, LoadedImage};
use crate::raw::pipeline::{
    PipelineStats, ThumbnailEvent, ThumbnailJob, ThumbnailOutcome, ThumbnailPipeline,
};
use crate::raw::thumbnail::ThumbnailCache;
use crate::scan;

/// Result of scanning a folder
#[derive(Debug, Clone)]
pub struct OpenedFolder {
    pub folder: PathBuf,
    pub records: Vec<ImageRecord>,
    /// Files that matched the extension filter but could not be loaded
    pub skipped: usize,
}

impl OpenedFolder {
    pub fn summary(&self) -> String {
        format!("Loaded {} images ({} skipped)", self.records.len(), self.skipped)
    }

    /// Re-read the sidecar and apply its scores to the scanned records
    pub fn merge_saved_scores(&mut self) {
        let table = ratings::load_scores(&self.folder);
        for record in &mut self.records {
            record.score = table.resolve(record);
        }
    }
}

/// Shared collaborators handed to every session
#[derive(Clone)]
pub struct Services {
    pub runtime: Handle,
    pub loader: ImageLoader,
    pub settings: Settings,
}

/// Something the view layer may want to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ThumbnailReady(usize),
    ThumbnailFailed { index: usize, error: String },
    FullImageReady(usize),
    FullImageFailed { index: usize, error: String },
    Saved { path: PathBuf, manual: bool },
    SaveFailed(String),
}

/// Scan `folder`, load every supported file and merge prior ratings.
///
/// The sidecar (header only) and the thumbnail cache directory are created
/// up front when missing. Files that cannot be identified or loaded are
/// counted in `skipped`; only a failure to enumerate the folder itself is
/// an error.
pub async fn open_folder(
    folder: &Path,
    loader: ImageLoader,
    retain_buffers: bool,
) -> Result<OpenedFolder, ScanError> {
    let folder = std::path::absolute(folder).unwrap_or_else(|_| folder.to_path_buf());

    match ratings::ensure_sidecar(&folder) {
        Ok(true) => tracing::info!("📄 Created {}", ratings::sidecar_path(&folder).display()),
        Ok(false) => {}
        Err(err) => tracing::warn!("⚠️  Could not create rating sidecar: {}", err),
    }
    if let Err(err) = ThumbnailCache::for_folder(&folder).ensure_dir().await {
        tracing::warn!("⚠️  Could not create thumbnail cache: {}", err);
    }

    let opened = task::spawn_blocking(move || scan_folder(folder, &loader, retain_buffers))
        .await
        .map_err(|e| ScanError::Task(e.to_string()))??;

    tracing::info!("📸 {} in {}", opened.summary(), opened.folder.display());
    Ok(opened)
}

fn scan_folder(folder: PathBuf, loader: &ImageLoader, retain_buffers: bool) -> Result<OpenedFolder, ScanError> {
    let paths = scan::enumerate(&folder)?;

    let mut records = Vec::with_capacity(paths.len());
    let mut skipped = 0;
    for path in paths {
        let identified = match scan::identify(&path, Some(&folder)) {
            Ok(identified) => identified,
            Err(err) => {
                tracing::warn!("⚠️  Skipping {}: {}", path.display(), err);
                skipped += 1;
                continue;
            }
        };
        let full = match loader.load(&path) {
            Ok(full) => full,
            Err(err) => {
                tracing::warn!("⚠️  Skipping {}: {}", path.display(), err);
                skipped += 1;
                continue;
            }
        };

        records.push(ImageRecord {
            identity: identified.identity,
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            extension: scan::extension_of(&path),
            relative_path: identified.relative_path,
            byte_size: identified.byte_size,
            full_image: retain_buffers.then(|| Arc::new(full)),
            thumbnail: ThumbnailSlot::Missing,
            score: Score::UNSCORED,
            absolute_path: path,
        });
    }

    let mut opened = OpenedFolder {
        folder,
        records,
        skipped,
    };
    opened.merge_saved_scores();
    Ok(opened)
}

type FullLoad = (usize, Identity, Result<LoadedImage, LoadError>);

pub struct Session {
    folder: PathBuf,
    records: Vec<ImageRecord>,
    skipped: usize,
    selection: Selection,

    loader: ImageLoader,
    runtime: Handle,
    retain_full: bool,

    pipeline: ThumbnailPipeline,
    thumbnails: UnboundedReceiver<ThumbnailEvent>,

    full_tx: UnboundedSender<FullLoad>,
    full_rx: UnboundedReceiver<FullLoad>,
    loading_full: HashSet<usize>,

    autosave: Autosave,
    saves: UnboundedReceiver<SaveOutcome>,
    /// Bumped on every rating change
    revision: u64,
    /// Newest revision known to be on disk
    saved_revision: u64,
}

impl Session {
    pub fn start(opened: OpenedFolder, services: &Services) -> Self {
        let settings = &services.settings;
        let (pipeline, thumbnails) = ThumbnailPipeline::new(
            services.loader.clone(),
            ThumbnailCache::for_folder(&opened.folder),
            settings.pipeline_config(),
            services.runtime.clone(),
        );
        let (autosave, saves) = Autosave::new(
            &opened.folder,
            settings.autosave_interval(),
            services.runtime.clone(),
        );
        let (full_tx, full_rx) = mpsc::unbounded_channel();

        Self {
            selection: Selection::new(opened.records.len()),
            folder: opened.folder,
            records: opened.records,
            skipped: opened.skipped,
            loader: services.loader.clone(),
            runtime: services.runtime.clone(),
            retain_full: settings.retain_scan_buffers,
            pipeline,
            thumbnails,
            full_tx,
            full_rx,
            loading_full: HashSet::new(),
            autosave,
            saves,
            revision: 0,
            saved_revision: 0,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current(&self) -> Option<usize> {
        self.selection.current()
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    pub fn thumbnail_cache(&self) -> &ThumbnailCache {
        self.pipeline.cache()
    }

    // ========== Thumbnails ==========

    /// Request the grid thumbnail of `index`.
    ///
    /// No-op (returns `false`) when the record already has a thumbnail, one
    /// is in flight, or the last attempt failed.
    pub fn ensure_thumbnail(&mut self, index: usize) -> bool {
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        if !matches!(record.thumbnail, ThumbnailSlot::Missing) {
            return false;
        }
        record.thumbnail = ThumbnailSlot::Requested;
        self.pipeline.request(ThumbnailJob {
            index,
            identity: record.identity.clone(),
            path: record.absolute_path.clone(),
            full: record.full_image.clone(),
        });
        true
    }

    /// Clear a failed thumbnail and request it again
    pub fn retry_thumbnail(&mut self, index: usize) -> bool {
        match self.records.get_mut(index) {
            Some(record) if matches!(record.thumbnail, ThumbnailSlot::Failed(_)) => {
                record.thumbnail = ThumbnailSlot::Missing;
                self.ensure_thumbnail(index)
            }
            _ => false,
        }
    }

    /// Delete every persisted thumbnail of this folder. Thumbnails already
    /// in memory stay visible.
    pub fn clear_thumbnail_cache(&self) -> impl std::future::Future<Output = Result<usize, CacheError>> + Send + 'static {
        let cache = self.pipeline.cache().clone();
        async move { cache.clear().await }
    }

    // ========== Full images ==========

    /// Load the display buffer of `index` if it is not in memory yet.
    /// Returns `true` when a load was started.
    pub fn ensure_full_image(&mut self, index: usize) -> bool {
        let Some(record) = self.records.get(index) else {
            return false;
        };
        if record.full_image.is_some() || !self.loading_full.insert(index) {
            return false;
        }

        let loader = self.loader.clone();
        let identity = record.identity.clone();
        let path = record.absolute_path.clone();
        let tx = self.full_tx.clone();
        self.runtime.spawn(async move {
            let result = loader.load_async(&path).await;
            let _ = tx.send((index, identity, result));
        });
        true
    }

    /// Warm the previous and next records for the viewer
    pub fn preload_adjacent(&mut self) {
        if let Some((prev, next)) = self.selection.neighbours() {
            self.ensure_full_image(prev);
            self.ensure_full_image(next);
        }
    }

    // ========== Selection ==========

    pub fn click(&mut self, index: usize, mode: ClickMode) {
        self.selection.click(index, mode);
    }

    pub fn next(&mut self) -> Option<usize> {
        self.selection.next()
    }

    pub fn prev(&mut self) -> Option<usize> {
        self.selection.prev()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_selection();
    }

    // ========== Ratings ==========

    /// Rate whatever the selection targets in `view`. Returns the indices
    /// that were rated.
    pub fn apply_score(&mut self, score: Score, view: ViewMode) -> Vec<usize> {
        let targets = self.selection.targets(view);
        self.apply_score_to(score, &targets);
        targets
    }

    /// Set `score` on `targets` and schedule a write. Returns how many
    /// records actually changed.
    pub fn apply_score_to(&mut self, score: Score, targets: &[usize]) -> usize {
        let mut changed = 0;
        for &index in targets {
            if let Some(record) = self.records.get_mut(index) {
                if record.score != score {
                    record.score = score;
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            self.revision += 1;
            let rows = self.rows();
            self.autosave.schedule(self.revision, rows);
        }
        changed
    }

    /// Accept with five stars if the focused record is unscored or
    /// rejected, otherwise reset to unscored
    pub fn toggle_accept(&mut self, view: ViewMode) -> Vec<usize> {
        let Some(current) = self.selection.current() else {
            return Vec::new();
        };
        let focused = self.records[current].score;
        let score = if focused.is_unscored() || focused.is_rejected() {
            Score::stars(Score::MAX_STARS as u8)
        } else {
            Score::UNSCORED
        };
        self.apply_score(score, view)
    }

    /// Write the sidecar now, regardless of the autosave setting
    pub fn save_now(&mut self) {
        let rows = self.rows();
        self.autosave.save_now(self.revision, rows);
    }

    /// Unsaved rating changes exist
    pub fn is_dirty(&self) -> bool {
        self.saved_revision < self.revision
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave.is_enabled()
    }

    fn rows(&self) -> Vec<RatingRow> {
        ratings::rows_for(&self.folder, &self.records)
    }

    /// Write unsaved ratings synchronously. Must run before the folder is
    /// scanned again, or the rescan merges the stale sidecar.
    pub fn flush(&mut self) -> Result<Option<PathBuf>, PersistenceError> {
        if !self.is_dirty() {
            return Ok(None);
        }
        let rows = self.rows();
        let path = self.autosave.flush_blocking(self.revision, &rows)?;
        self.saved_revision = self.revision;
        tracing::info!("💾 Flushed ratings to {}", path.display());
        Ok(Some(path))
    }

    /// Tear the session down, flushing unsaved ratings synchronously
    pub fn close(mut self) -> Result<(), PersistenceError> {
        self.flush()?;
        self.autosave.cancel();
        Ok(())
    }

    // ========== Background results ==========

    /// Apply every finished background result to the records
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        while let Ok(event) = self.thumbnails.try_recv() {
            let index = event.index;
            let Some(record) = self.records.get_mut(index) else {
                continue;
            };
            if record.identity != event.identity {
                continue;
            }
            match event.outcome {
                ThumbnailOutcome::CacheHit(bytes) => {
                    record.thumbnail = ThumbnailSlot::Ready(Arc::new(bytes));
                    events.push(SessionEvent::ThumbnailReady(index));
                }
                ThumbnailOutcome::Generated { thumbnail, full } => {
                    record.thumbnail = ThumbnailSlot::Ready(Arc::new(thumbnail));
                    if self.retain_full && record.full_image.is_none() {
                        record.full_image = Some(full);
                    }
                    events.push(SessionEvent::ThumbnailReady(index));
                }
                ThumbnailOutcome::Failed(err) => {
                    let error = err.to_string();
                    record.thumbnail = ThumbnailSlot::Failed(error.clone());
                    events.push(SessionEvent::ThumbnailFailed { index, error });
                }
            }
        }

        while let Ok((index, identity, result)) = self.full_rx.try_recv() {
            self.loading_full.remove(&index);
            let Some(record) = self.records.get_mut(index) else {
                continue;
            };
            if record.identity != identity {
                continue;
            }
            match result {
                Ok(full) => {
                    record.full_image = Some(Arc::new(full));
                    events.push(SessionEvent::FullImageReady(index));
                }
                Err(err) => events.push(SessionEvent::FullImageFailed {
                    index,
                    error: err.to_string(),
                }),
            }
        }

        while let Ok(outcome) = self.saves.try_recv() {
            match outcome.result {
                Ok(path) => {
                    self.saved_revision = self.saved_revision.max(outcome.revision);
                    events.push(SessionEvent::Saved {
                        path,
                        manual: outcome.manual,
                    });
                }
                Err(err) => {
                    tracing::error!("❌ Saving ratings failed: {}", err);
                    events.push(SessionEvent::SaveFailed(err.to_string()));
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::preview::EmbeddedJpeg;
    use image::{ImageFormat, RgbImage};
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn write_png(path: &Path) {
        RgbImage::from_pixel(32, 24, image::Rgb([90, 60, 30]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn services() -> Services {
        Services {
            runtime: Handle::current(),
            loader: ImageLoader::new(Arc::new(EmbeddedJpeg)),
            settings: Settings {
                autosave_interval_ms: 20,
                ..Settings::default()
            },
        }
    }

    async fn open(dir: &Path) -> Session {
        let services = services();
        let opened = open_folder(dir, services.loader.clone(), true).await.unwrap();
        Session::start(opened, &services)
    }

    async fn pump_until(session: &mut Session, mut done: impl FnMut(&Session) -> bool) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for _ in 0..500 {
            events.extend(session.poll_events());
            if done(session) {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session never settled");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_open_creates_sidecar_and_cache() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"));
        fs::write(dir.path().join("broken.nef"), b"no preview in here").unwrap();

        let session = open(dir.path()).await;
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.skipped(), 1);
        assert!(ratings::sidecar_path(dir.path()).exists());
        assert!(session.thumbnail_cache().dir().is_dir());
        assert_eq!(session.current(), Some(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ensure_thumbnail_is_idempotent() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"));
        let mut session = open(dir.path()).await;

        assert!(session.ensure_thumbnail(0));
        assert!(!session.ensure_thumbnail(0));
        let events = pump_until(&mut session, |s| s.records()[0].thumbnail_data().is_some()).await;
        assert!(events.contains(&SessionEvent::ThumbnailReady(0)));

        assert!(!session.ensure_thumbnail(0));
        assert!(!session.ensure_thumbnail(99));
        assert_eq!(session.stats().requests, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_thumbnail_needs_explicit_retry() {
        let dir = tempdir().unwrap();
        // Readable as bytes, but not decodable
        fs::write(dir.path().join("fake.png"), b"not really a png").unwrap();
        let mut session = open(dir.path()).await;

        session.ensure_thumbnail(0);
        pump_until(&mut session, |s| matches!(s.records()[0].thumbnail, ThumbnailSlot::Failed(_))).await;
        assert!(!session.ensure_thumbnail(0));

        assert!(session.retry_thumbnail(0));
        pump_until(&mut session, |s| matches!(s.records()[0].thumbnail, ThumbnailSlot::Failed(_))).await;
        assert_eq!(session.stats().failed, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scores_autosave_and_dirty_flag() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"));
        write_png(&dir.path().join("b.png"));
        let mut session = open(dir.path()).await;

        session.click(0, ClickMode::Plain);
        session.click(1, ClickMode::Range);
        assert_eq!(session.apply_score(Score::stars(4), ViewMode::Grid), vec![0, 1]);
        assert!(session.is_dirty());

        pump_until(&mut session, |s| !s.is_dirty()).await;
        let table = ratings::load_scores(dir.path());
        assert_eq!(table.get("a.png").map(Score::value), Some(4));
        assert_eq!(table.get("b.png").map(Score::value), Some(4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cleared_selection_rates_only_the_focus() {
        let dir = tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            write_png(&dir.path().join(name));
        }
        let mut session = open(dir.path()).await;

        session.click(0, ClickMode::Toggle);
        session.click(2, ClickMode::Toggle);
        session.clear_selection();
        assert!(session.selection().selected().is_empty());
        assert_eq!(session.current(), Some(2));
        assert_eq!(session.apply_score(Score::stars(1), ViewMode::Grid), vec![2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_toggle_accept() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"));
        let mut session = open(dir.path()).await;

        session.toggle_accept(ViewMode::Viewer);
        assert_eq!(session.records()[0].score.value(), 5);
        session.toggle_accept(ViewMode::Viewer);
        assert_eq!(session.records()[0].score, Score::UNSCORED);

        session.apply_score_to(Score::REJECTED, &[0]);
        session.toggle_accept(ViewMode::Viewer);
        assert_eq!(session.records()[0].score.value(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_flushes_with_autosave_disabled() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"));

        let mut services = services();
        services.settings.autosave_interval_ms = 0;
        let opened = open_folder(dir.path(), services.loader.clone(), true).await.unwrap();
        let mut session = Session::start(opened, &services);

        session.apply_score_to(Score::stars(2), &[0]);
        assert!(session.is_dirty());
        session.close().unwrap();

        let table = ratings::load_scores(dir.path());
        assert_eq!(table.get("a.png").map(Score::value), Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reopening_the_same_folder_keeps_pending_scores() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"));

        let mut services = services();
        services.settings.autosave_interval_ms = 60_000;
        let opened = open_folder(dir.path(), services.loader.clone(), true).await.unwrap();
        let mut session = Session::start(opened, &services);
        session.apply_score_to(Score::stars(3), &[0]);

        // The pending write has not fired yet; flushing must precede the rescan
        let flushed = session.flush().unwrap();
        assert_eq!(flushed, Some(ratings::sidecar_path(session.folder())));
        assert!(!session.is_dirty());
        assert_eq!(session.flush().unwrap(), None);

        let mut reopened = open_folder(dir.path(), services.loader.clone(), true).await.unwrap();
        // A score given while the rescan ran reaches the new session too
        session.apply_score_to(Score::stars(4), &[0]);
        session.close().unwrap();
        assert_eq!(reopened.records[0].score.value(), 3);
        reopened.merge_saved_scores();
        let next = Session::start(reopened, &services);
        assert_eq!(next.records()[0].score.value(), 4);

        next.close().unwrap();
        let table = ratings::load_scores(dir.path());
        assert_eq!(table.get("a.png").map(Score::value), Some(4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lazy_full_image_and_preload() {
        let dir = tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            write_png(&dir.path().join(name));
        }
        let services = services();
        let opened = open_folder(dir.path(), services.loader.clone(), false).await.unwrap();
        assert!(opened.records.iter().all(|r| r.full_image.is_none()));

        let mut session = Session::start(opened, &services);
        session.preload_adjacent();
        assert!(!session.ensure_full_image(1));
        pump_until(&mut session, |s| {
            s.records()[1].full_image.is_some() && s.records()[2].full_image.is_some()
        })
        .await;
        assert!(session.records()[0].full_image.is_none());
        assert!(session.ensure_full_image(0));
    }
}
