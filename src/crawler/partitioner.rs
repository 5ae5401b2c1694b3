//! Spatial partitioner - splits the search area until every piece fits in
//! one page of results
//!
//! Boxes are processed from a shared FIFO queue by a pool of workers that
//! starts with one task and grows, up to `max_workers`, each time a box is
//! split. All bookkeeping (queue, leaves, worker count) lives under a single
//! mutex so that checking the cap and claiming a worker slot happen in one
//! critical section. Completion is detected WaitGroup-style: every worker
//! holds a guard that decrements the active count on exit and wakes the
//! supervisor, which returns once the count reaches zero.

use crate::crawler::lock;
use crate::geo::BBox;
use crate::search::{SearchClient, SearchError, SearchQuery};
use crate::CrawlError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Default maximum number of bisections below the root
pub const DEFAULT_MAX_DEPTH: u32 = 24;

/// Default smallest box side, in degrees (roughly one metre)
pub const DEFAULT_MIN_SPAN: f64 = 1e-5;

/// Tuning for a partitioning run
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSettings {
    /// Largest found-count a leaf may report
    pub threshold: u64,

    /// Most workers alive at once
    pub max_workers: usize,

    /// Boxes at this depth are accepted as leaves whatever their count
    pub max_depth: u32,

    /// Boxes whose halves would be narrower than this are accepted as leaves
    pub min_span: f64,
}

impl PartitionSettings {
    pub fn new(threshold: u64, max_workers: usize) -> Self {
        Self {
            threshold,
            max_workers,
            max_depth: DEFAULT_MAX_DEPTH,
            min_span: DEFAULT_MIN_SPAN,
        }
    }

    fn worker_cap(&self) -> usize {
        self.max_workers.max(1)
    }
}

/// Counters collected while partitioning
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionStats {
    /// Count requests issued
    pub queries: usize,

    /// Boxes bisected
    pub splits: usize,

    /// Leaves accepted only because the depth or size limit was reached
    pub forced_leaves: usize,

    /// Leaves accepted because the count was unavailable
    pub unavailable_counts: usize,

    pub workers_spawned: usize,

    /// Most workers alive at the same time
    pub peak_workers: usize,
}

#[derive(Debug, Clone, Copy)]
struct WorkItem {
    bbox: BBox,
    depth: u32,
}

#[derive(Debug, Default)]
struct WorkState {
    queue: VecDeque<WorkItem>,
    leaves: Vec<BBox>,
    active_workers: usize,
    stats: PartitionStats,
    failure: Option<CrawlError>,
}

impl WorkState {
    fn record_failure(&mut self, error: CrawlError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }
}

struct Shared {
    state: Mutex<WorkState>,
    idle: Notify,
    client: Arc<dyn SearchClient>,
    query: SearchQuery,
    settings: PartitionSettings,
}

/// Owns one worker slot; releasing it wakes the supervisor
///
/// A guard dropped without calling `finish` belongs to a worker that
/// panicked or was cancelled, and whatever box it held is lost.
struct WorkerGuard {
    shared: Arc<Shared>,
    finished: bool,
}

impl WorkerGuard {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        state.active_workers -= 1;
        if !self.finished {
            state.record_failure(CrawlError::Worker(
                "partition worker stopped before finishing".to_string(),
            ));
        }
        drop(state);
        self.shared.idle.notify_one();
    }
}

/// What a worker decided about one box
enum Verdict {
    Leaf,
    ForcedLeaf,
    Unavailable,
    Split(BBox, BBox),
}

/// Splits a root box into leaves whose found-count is at most the threshold
pub struct Partitioner {
    client: Arc<dyn SearchClient>,
    settings: PartitionSettings,
}

impl Partitioner {
    pub fn new(client: Arc<dyn SearchClient>, settings: PartitionSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &PartitionSettings {
        &self.settings
    }

    /// Partitions `root` for `query`
    ///
    /// # Returns
    ///
    /// * `Ok(leaves)` - Boxes that exactly cover `root` without overlapping, in no
    ///   particular order
    /// * `Err(CrawlError)` - A count request failed, or a worker panicked
    pub async fn partition(&self, root: BBox, query: &SearchQuery) -> Result<Vec<BBox>, CrawlError> {
        let (leaves, _) = self.partition_with_stats(root, query).await?;
        Ok(leaves)
    }

    /// Like [`partition`](Self::partition), also returning run counters
    pub async fn partition_with_stats(
        &self,
        root: BBox,
        query: &SearchQuery,
    ) -> Result<(Vec<BBox>, PartitionStats), CrawlError> {
        tracing::info!(
            "Partitioning {} (threshold {}, up to {} workers)",
            root,
            self.settings.threshold,
            self.settings.worker_cap()
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(WorkState::default()),
            idle: Notify::new(),
            client: Arc::clone(&self.client),
            query: query.clone(),
            settings: self.settings.clone(),
        });

        lock(&shared.state)
            .queue
            .push_back(WorkItem { bbox: root, depth: 0 });
        try_spawn_worker(&shared);

        // Notify is edge-triggered: register before checking the count
        loop {
            let notified = shared.idle.notified();
            let active = lock(&shared.state).active_workers;
            if active == 0 {
                break;
            }
            notified.await;
        }

        let mut state = lock(&shared.state);
        if let Some(error) = state.failure.take() {
            tracing::error!("Partitioning failed: {}", error);
            return Err(error);
        }
        if !state.queue.is_empty() {
            return Err(CrawlError::Worker(format!(
                "workers exited with {} boxes still queued",
                state.queue.len()
            )));
        }

        let leaves = std::mem::take(&mut state.leaves);
        let stats = state.stats.clone();
        tracing::info!(
            "Partition complete: {} leaves, {} queries, {} splits, {} forced leaves, peak {} workers",
            leaves.len(),
            stats.queries,
            stats.splits,
            stats.forced_leaves,
            stats.peak_workers
        );

        Ok((leaves, stats))
    }
}

/// Claims a worker slot and spawns a worker, unless the pool is full
///
/// The cap check and the increment happen under one lock with no await in
/// between, so concurrent callers can never oversubscribe the pool.
fn try_spawn_worker(shared: &Arc<Shared>) -> bool {
    {
        let mut state = lock(&shared.state);
        if state.active_workers >= shared.settings.worker_cap() {
            return false;
        }
        state.active_workers += 1;
        state.stats.workers_spawned += 1;
        state.stats.peak_workers = state.stats.peak_workers.max(state.active_workers);
    }

    // The guard moves into the task so the slot is released even if the task
    // is dropped before it first runs
    let guard = WorkerGuard {
        shared: Arc::clone(shared),
        finished: false,
    };
    let worker = Arc::clone(shared);
    tokio::spawn(async move {
        run_worker(worker).await;
        guard.finish();
    });
    true
}

async fn run_worker(shared: Arc<Shared>) {
    loop {
        let item = {
            let mut state = lock(&shared.state);
            if state.failure.is_some() {
                return;
            }
            match state.queue.pop_front() {
                Some(item) => item,
                None => return,
            }
        };

        let verdict = match evaluate(&shared, &item).await {
            Ok(verdict) => verdict,
            Err(error) => {
                tracing::warn!("Count request for {} failed: {}", item.bbox, error);
                let mut state = lock(&shared.state);
                state.stats.queries += 1;
                state.record_failure(error.into());
                return;
            }
        };

        let split = {
            let mut state = lock(&shared.state);
            state.stats.queries += 1;
            match verdict {
                Verdict::Leaf => {
                    state.leaves.push(item.bbox);
                    false
                }
                Verdict::ForcedLeaf => {
                    state.stats.forced_leaves += 1;
                    state.leaves.push(item.bbox);
                    false
                }
                Verdict::Unavailable => {
                    state.stats.unavailable_counts += 1;
                    state.leaves.push(item.bbox);
                    false
                }
                Verdict::Split(low, high) => {
                    state.stats.splits += 1;
                    let depth = item.depth + 1;
                    state.queue.push_back(WorkItem { bbox: low, depth });
                    state.queue.push_back(WorkItem { bbox: high, depth });
                    true
                }
            }
        };

        if split {
            try_spawn_worker(&shared);
        }
    }
}

async fn evaluate(shared: &Shared, item: &WorkItem) -> Result<Verdict, SearchError> {
    let count = shared.client.count(&item.bbox, &shared.query).await?;
    let settings = &shared.settings;

    let found = match count.get("found") {
        Ok(found) => *found,
        Err(error) => {
            tracing::warn!(
                "Count unavailable for {} ({}), accepting it as a leaf",
                item.bbox,
                error
            );
            return Ok(Verdict::Unavailable);
        }
    };

    if found <= settings.threshold {
        tracing::debug!("{} holds {} objects, leaf", item.bbox, found);
        return Ok(Verdict::Leaf);
    }

    if item.depth >= settings.max_depth || !item.bbox.is_splittable(settings.min_span) {
        tracing::warn!(
            "{} still holds {} objects at depth {}, accepting it as a leaf",
            item.bbox,
            found,
            item.depth
        );
        return Ok(Verdict::ForcedLeaf);
    }

    tracing::debug!("{} holds {} objects, splitting", item.bbox, found);
    let (low, high) = item.bbox.bisect();
    Ok(Verdict::Split(low, high))
}
