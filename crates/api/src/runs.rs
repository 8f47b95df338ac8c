//! In-memory registry of processing runs.
//!
//! Each run owns a directory under `<data_dir>/runs/` and a record guarded by
//! its own async mutex. Handlers hold that mutex for the whole stage, so two
//! requests on the same run are serialized while different runs proceed
//! independently.
//!
//! Only the newest `max_runs` runs are kept. Registering a run deletes the
//! directories of older ones, except runs whose stage is still in flight.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use vidtally_core::error::CoreError;
use vidtally_core::run::{RunContext, RunId, RunStage};

/// State of one run.
#[derive(Debug)]
pub struct RunRecord {
    pub ctx: RunContext,
    /// Sanitized name of the uploaded video.
    pub video_name: String,
    pub stage: RunStage,
    /// Report written by the latest detection pass.
    pub report_path: Option<PathBuf>,
}

impl RunRecord {
    pub fn video_path(&self) -> PathBuf {
        self.ctx.upload_path(&self.video_name)
    }

    /// Fails with `Conflict` unless the run has reached `required`.
    pub fn require(&self, required: RunStage, message: &str) -> Result<(), CoreError> {
        if self.stage < required {
            return Err(CoreError::Conflict(message.to_string()));
        }
        Ok(())
    }
}

pub type RunHandle = Arc<Mutex<RunRecord>>;

/// Exclusive access to a run, movable into a spawned task.
pub type RunGuard = OwnedMutexGuard<RunRecord>;

struct Entry {
    /// Registration order, oldest first.
    seq: u64,
    handle: RunHandle,
}

/// All runs known to this process, plus the most recent one.
pub struct RunRegistry {
    data_dir: PathBuf,
    max_runs: usize,
    next_seq: AtomicU64,
    runs: RwLock<HashMap<RunId, Entry>>,
    latest: RwLock<Option<RunId>>,
}

impl RunRegistry {
    /// `max_runs` is clamped to at least one.
    pub fn new(data_dir: impl Into<PathBuf>, max_runs: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_runs: max_runs.max(1),
            next_seq: AtomicU64::new(0),
            runs: RwLock::new(HashMap::new()),
            latest: RwLock::new(None),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Register a new run for `video_name`, make it the latest, and evict
    /// runs beyond the retention limit.
    ///
    /// The run is returned already locked, so eviction can never reach it
    /// before the caller has started on it. Only the record is created; the
    /// caller creates directories.
    pub async fn create(&self, video_name: &str) -> (RunId, RunGuard) {
        let id = RunId::new();
        let record = RunRecord {
            ctx: RunContext::new(&self.data_dir, id),
            video_name: video_name.to_string(),
            stage: RunStage::Created,
            report_path: None,
        };
        let handle = Arc::new(Mutex::new(record));
        let guard = Arc::clone(&handle).lock_owned().await;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        self.runs.write().await.insert(id, Entry { seq, handle });
        *self.latest.write().await = Some(id);
        tracing::debug!(run_id = %id, video = video_name, "Registered run");

        self.evict_old_runs().await;
        (id, guard)
    }

    /// Delete the oldest runs beyond `max_runs`.
    ///
    /// Only runs outside the newest `max_runs` are candidates. A candidate
    /// whose lock is held is busy and stays until a later pass.
    async fn evict_old_runs(&self) {
        let evicted: Vec<(RunId, RunGuard)> = {
            let mut runs = self.runs.write().await;
            let excess = runs.len().saturating_sub(self.max_runs);
            if excess == 0 {
                return;
            }
            let mut oldest: Vec<(u64, RunId)> =
                runs.iter().map(|(id, entry)| (entry.seq, *id)).collect();
            oldest.sort_unstable();

            let mut evicted = Vec::new();
            for (_, id) in oldest.into_iter().take(excess) {
                let Some(entry) = runs.get(&id) else {
                    continue;
                };
                let Ok(mut run) = Arc::clone(&entry.handle).try_lock_owned() else {
                    tracing::debug!(run_id = %id, "Run busy, not evicting");
                    continue;
                };
                // Anyone still holding the handle sees a run with nothing in it.
                run.stage = RunStage::Created;
                run.report_path = None;
                runs.remove(&id);
                evicted.push((id, run));
            }
            evicted
        };

        for (id, run) in evicted {
            match run.ctx.remove().await {
                Ok(()) => tracing::info!(run_id = %id, "Evicted run"),
                Err(e) => {
                    tracing::warn!(run_id = %id, error = %e, "Failed to remove evicted run directory")
                }
            }
        }
    }

    /// Drop a run from the registry. The directory is left to the caller.
    pub async fn forget(&self, id: RunId) {
        self.runs.write().await.remove(&id);
        let mut latest = self.latest.write().await;
        if *latest == Some(id) {
            *latest = None;
        }
    }

    /// Look up `id`, or the latest run when `id` is `None`.
    ///
    /// An unknown id is `NotFound`; asking for the latest run before any
    /// upload is `Conflict`.
    pub async fn resolve(&self, id: Option<RunId>) -> Result<(RunId, RunHandle), CoreError> {
        let id = match id {
            Some(id) => id,
            None => self.latest.read().await.ok_or_else(|| {
                CoreError::Conflict("no video has been uploaded yet".to_string())
            })?,
        };
        let handle = self
            .runs
            .read()
            .await
            .get(&id)
            .map(|entry| Arc::clone(&entry.handle))
            .ok_or_else(|| CoreError::NotFound {
                entity: "Run",
                id: id.to_string(),
            })?;
        Ok((id, handle))
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}
