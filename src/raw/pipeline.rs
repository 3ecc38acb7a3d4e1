//! Thumbnail pipeline
//!
//! Produces grid previews with a fixed ceiling on concurrent generations:
//! - cache hits are served straight from disk and never take a slot
//! - misses take one of `max_parallel` slots, or wait in a FIFO queue
//!   (deduplicated by identity) until a slot frees
//! - each finished generation releases its slot and starts exactly one
//!   queued job as a new task
//!
//! Results are delivered asynchronously as [`ThumbnailEvent`]s.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task;

use super::loader::{ImageLoader, LoadedImage};
use super::thumbnail::{render_thumbnail, ThumbnailCache, DEFAULT_MAX_SIZE, DEFAULT_QUALITY};
use crate::error::ThumbnailError;
use crate::state::data::Identity;

/// Default number of generations allowed to run at once
pub const MAX_PARALLEL: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_parallel: usize,
    pub max_size: u32,
    pub quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_parallel: MAX_PARALLEL,
            max_size: DEFAULT_MAX_SIZE,
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Everything needed to produce one record's thumbnail
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub index: usize,
    pub identity: Identity,
    pub path: PathBuf,
    /// Already-loaded display buffer, if the record has one
    pub full: Option<Arc<LoadedImage>>,
}

#[derive(Debug)]
pub enum ThumbnailOutcome {
    CacheHit(Vec<u8>),
    Generated {
        thumbnail: Vec<u8>,
        full: Arc<LoadedImage>,
    },
    Failed(ThumbnailError),
}

#[derive(Debug)]
pub struct ThumbnailEvent {
    pub index: usize,
    pub identity: Identity,
    pub outcome: ThumbnailOutcome,
}

/// Snapshot of pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub requests: usize,
    pub cache_hits: usize,
    pub generated: usize,
    pub failed: usize,
    pub active: usize,
    pub queued: usize,
    pub peak_active: usize,
}

enum Admission {
    Start(ThumbnailJob),
    Queued,
    AlreadyQueued,
}

/// Counting slots plus a FIFO of waiting jobs
struct Limiter {
    max_parallel: usize,
    active: usize,
    peak_active: usize,
    pending: VecDeque<ThumbnailJob>,
    queued: HashSet<Identity>,
}

impl Limiter {
    fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            active: 0,
            peak_active: 0,
            pending: VecDeque::new(),
            queued: HashSet::new(),
        }
    }

    fn admit(&mut self, job: ThumbnailJob) -> Admission {
        if self.active < self.max_parallel {
            self.take_slot();
            Admission::Start(job)
        } else if self.queued.insert(job.identity.clone()) {
            self.pending.push_back(job);
            Admission::Queued
        } else {
            Admission::AlreadyQueued
        }
    }

    /// Free a slot; hand it straight to the oldest waiting job, if any
    fn release(&mut self) -> Option<ThumbnailJob> {
        self.active = self.active.saturating_sub(1);
        let next = self.pending.pop_front()?;
        self.queued.remove(&next.identity);
        self.take_slot();
        Some(next)
    }

    fn take_slot(&mut self) {
        self.active += 1;
        self.peak_active = self.peak_active.max(self.active);
    }
}

#[derive(Default)]
struct Counters {
    requests: AtomicUsize,
    cache_hits: AtomicUsize,
    generated: AtomicUsize,
    failed: AtomicUsize,
}

struct Inner {
    loader: ImageLoader,
    cache: ThumbnailCache,
    config: PipelineConfig,
    limiter: Mutex<Limiter>,
    counters: Counters,
    events: UnboundedSender<ThumbnailEvent>,
    runtime: Handle,
}

/// Bounded thumbnail scheduler for one folder
#[derive(Clone)]
pub struct ThumbnailPipeline {
    inner: Arc<Inner>,
}

impl ThumbnailPipeline {
    pub fn new(
        loader: ImageLoader,
        cache: ThumbnailCache,
        config: PipelineConfig,
        runtime: Handle,
    ) -> (Self, UnboundedReceiver<ThumbnailEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = Inner {
            loader,
            cache,
            limiter: Mutex::new(Limiter::new(config.max_parallel)),
            config,
            counters: Counters::default(),
            events,
            runtime,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.inner.cache
    }

    /// Request a thumbnail. Returns immediately; the result arrives as an
    /// event. Disk cache hits bypass the concurrency limit.
    pub fn request(&self, job: ThumbnailJob) {
        self.inner.counters.requests.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            if let Some(bytes) = inner.cache.read(&job.identity).await {
                inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                inner.emit(&job, ThumbnailOutcome::CacheHit(bytes));
                return;
            }

            let admission = inner.limiter().admit(job);
            match admission {
                Admission::Start(job) => Inner::start(inner, job),
                Admission::Queued => {}
                Admission::AlreadyQueued => {
                    tracing::debug!("Thumbnail already queued, not re-enqueued");
                }
            }
        });
    }

    pub fn stats(&self) -> PipelineStats {
        let counters = &self.inner.counters;
        let limiter = self.inner.limiter();
        PipelineStats {
            requests: counters.requests.load(Ordering::Relaxed),
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            generated: counters.generated.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            active: limiter.active,
            queued: limiter.pending.len(),
            peak_active: limiter.peak_active,
        }
    }
}

impl Inner {
    fn limiter(&self) -> MutexGuard<'_, Limiter> {
        self.limiter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, job: &ThumbnailJob, outcome: ThumbnailOutcome) {
        // A closed channel means the session is gone; nothing to notify.
        let _ = self.events.send(ThumbnailEvent {
            index: job.index,
            identity: job.identity.clone(),
            outcome,
        });
    }

    /// Run `job` in its own task. The caller must already hold a slot for it.
    fn start(inner: Arc<Inner>, job: ThumbnailJob) {
        let runtime = inner.runtime.clone();
        runtime.spawn(async move {
            let outcome = match inner.generate(&job).await {
                Ok((thumbnail, full)) => {
                    inner.counters.generated.fetch_add(1, Ordering::Relaxed);
                    ThumbnailOutcome::Generated { thumbnail, full }
                }
                Err(err) => {
                    tracing::warn!("⚠️  Thumbnail failed for {}: {}", job.path.display(), err);
                    inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                    ThumbnailOutcome::Failed(err)
                }
            };
            inner.emit(&job, outcome);

            let next = inner.limiter().release();
            if let Some(next) = next {
                Inner::start(inner, next);
            }
        });
    }

    async fn generate(&self, job: &ThumbnailJob) -> Result<(Vec<u8>, Arc<LoadedImage>), ThumbnailError> {
        let full = match &job.full {
            Some(full) => Arc::clone(full),
            None => Arc::new(self.loader.load_async(&job.path).await?),
        };

        let source = Arc::clone(&full);
        let PipelineConfig { max_size, quality, .. } = self.config;
        let thumbnail = task::spawn_blocking(move || render_thumbnail(&source.bytes, max_size, quality))
            .await
            .map_err(|e| ThumbnailError::Task(e.to_string()))??;

        if let Err(err) = self.cache.write(&job.identity, &thumbnail).await {
            tracing::warn!("⚠️  Could not cache thumbnail for {}: {}", job.path.display(), err);
        }

        Ok((thumbnail, full))
    }
}
