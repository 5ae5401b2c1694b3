//! Crawl pipeline - partition, search every leaf, keep what is new
//!
//! A run has three stages, executed strictly one after another:
//! 1. Obtain a partition, from the store cache when it matches the current
//!    area and query, otherwise from the [`Partitioner`]
//! 2. Search every leaf with a fixed pool of workers, collecting all records
//! 3. Deduplicate the records against the store with a second fixed pool
//!
//! A failed search ends the run. Problems with individual records never do.

use crate::config::Config;
use crate::crawler::lock;
use crate::crawler::partitioner::{PartitionSettings, PartitionStats, Partitioner};
use crate::geo::BBox;
use crate::search::{FieldError, ObjectRecord, SearchClient, SearchError, SearchQuery};
use crate::storage::{CachedPartition, DedupStore, StorageError};
use crate::{CrawlError, GeoError};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Everything that defines what a crawl covers
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSettings {
    pub root: BBox,
    pub query: SearchQuery,
    pub partition: PartitionSettings,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Result<Self, GeoError> {
        Ok(Self {
            root: config.root_bbox()?,
            query: config.query.clone(),
            partition: PartitionSettings {
                threshold: config.threshold(),
                max_workers: config.crawler.max_workers,
                max_depth: config.crawler.max_depth,
                min_span: config.crawler.min_span,
            },
        })
    }

    /// Digest of every input the partition depends on
    ///
    /// The worker count is left out: it changes how fast a partition is
    /// computed, not what it is.
    pub fn partition_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.root.to_string().as_bytes());
        for part in [
            self.query.text.as_str(),
            self.query.lang.as_str(),
            self.query.kind.as_str(),
        ] {
            hasher.update([0u8]);
            hasher.update(part.as_bytes());
        }
        hasher.update([0u8, u8::from(self.query.restrict_to_area)]);
        hasher.update(self.query.results.to_le_bytes());
        hasher.update(self.partition.threshold.to_le_bytes());
        hasher.update(self.partition.max_depth.to_le_bytes());
        hasher.update(self.partition.min_span.to_le_bytes());
        hex::encode(hasher.finalize())
    }
}

/// What happened during one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub leaves: usize,

    /// Whether the partition came from the store
    pub partition_cached: bool,

    /// Partitioner counters, when a partition was computed
    pub partition: Option<PartitionStats>,

    /// Records returned by all searches
    pub features: usize,

    /// New objects, including recovered ones
    pub accepted: usize,

    pub already_seen: usize,

    /// Records accepted under a fallback id
    pub recovered: usize,

    /// Records dropped because of missing or malformed fields, or store errors
    pub dropped: usize,
}

/// Runs crawls against one search client and one store
pub struct CrawlPipeline {
    client: Arc<dyn SearchClient>,
    store: Arc<dyn DedupStore>,
    settings: CrawlSettings,
}

impl CrawlPipeline {
    pub fn new(
        client: Arc<dyn SearchClient>,
        store: Arc<dyn DedupStore>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            client,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Runs one crawl, returning objects not seen on any earlier run
    ///
    /// The order of the returned objects is unspecified.
    pub async fn run(&self) -> Result<Vec<ObjectRecord>, CrawlError> {
        let (objects, _) = self.run_with_report().await?;
        Ok(objects)
    }

    /// Like [`run`](Self::run), also returning a summary of the run
    pub async fn run_with_report(&self) -> Result<(Vec<ObjectRecord>, CrawlReport), CrawlError> {
        let mut report = CrawlReport::default();
        let start_time = std::time::Instant::now();

        let leaves = self.acquire_partition(&mut report).await?;
        report.leaves = leaves.len();

        let features = self.search_leaves(leaves).await?;
        report.features = features.len();
        tracing::info!("Search stage returned {} records", features.len());

        let (objects, tally) = self.dedup(features).await?;
        report.accepted = objects.len();
        report.already_seen = tally.already_seen;
        report.recovered = tally.recovered;
        report.dropped = tally.dropped;

        tracing::info!(
            "Crawl complete in {:.1}s: {} new, {} already seen, {} dropped",
            start_time.elapsed().as_secs_f64(),
            report.accepted,
            report.already_seen,
            report.dropped
        );

        Ok((objects, report))
    }

    /// Stage 0: the cached partition if it is usable, otherwise a fresh one
    async fn acquire_partition(&self, report: &mut CrawlReport) -> Result<Vec<BBox>, CrawlError> {
        let fingerprint = self.settings.partition_fingerprint();

        match self.store.cached_partition()? {
            Some(cached) if cached.fingerprint == fingerprint && !cached.leaves.is_empty() => {
                tracing::info!(
                    "Using cached partition of {} leaves from {}",
                    cached.leaves.len(),
                    cached.computed_at
                );
                self.store.put_cached_partition(&cached)?;
                report.partition_cached = true;
                return Ok(cached.leaves);
            }
            Some(cached) if cached.leaves.is_empty() => {
                tracing::debug!("Cached partition is empty, recomputing");
            }
            Some(_) => {
                tracing::info!("Cached partition was computed for other settings, recomputing");
            }
            None => {
                tracing::debug!("No cached partition");
            }
        }

        let partitioner = Partitioner::new(Arc::clone(&self.client), self.settings.partition.clone());
        let (leaves, stats) = partitioner
            .partition_with_stats(self.settings.root, &self.settings.query)
            .await?;

        self.store
            .put_cached_partition(&CachedPartition::new(fingerprint, leaves.clone()))?;
        report.partition = Some(stats);

        Ok(leaves)
    }

    fn pool_size(&self, items: usize) -> usize {
        self.settings.partition.max_workers.max(1).min(items)
    }

    /// Stage 1: search every leaf, collecting all returned records
    async fn search_leaves(&self, leaves: Vec<BBox>) -> Result<Vec<ObjectRecord>, CrawlError> {
        let workers = self.pool_size(leaves.len());
        tracing::info!("Searching {} leaves with {} workers", leaves.len(), workers);

        let queue = Arc::new(Mutex::new(VecDeque::from(leaves)));
        let features = Arc::new(Mutex::new(Vec::new()));

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let features = Arc::clone(&features);
            let client = Arc::clone(&self.client);
            let query = self.settings.query.clone();

            tasks.spawn(async move {
                loop {
                    let next = lock(&queue).pop_front();
                    let Some(bbox) = next else {
                        break;
                    };

                    let records = client.search(&bbox, &query).await?;
                    tracing::debug!("Worker {}: {} returned {} records", worker, bbox, records.len());
                    lock(&features).extend(records);
                }
                Ok::<(), SearchError>(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!("Search failed, aborting crawl: {}", e);
                    tasks.abort_all();
                    return Err(e.into());
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(CrawlError::Worker(e.to_string()));
                }
            }
        }

        let features = std::mem::take(&mut *lock(&features));
        Ok(features)
    }

    /// Stage 2: keep the records whose id the store has not seen
    async fn dedup(
        &self,
        features: Vec<ObjectRecord>,
    ) -> Result<(Vec<ObjectRecord>, DedupTally), CrawlError> {
        let workers = self.pool_size(features.len());
        tracing::debug!("Deduplicating {} records with {} workers", features.len(), workers);

        let queue = Arc::new(Mutex::new(VecDeque::from(features)));
        let output = Arc::new(Mutex::new((Vec::new(), DedupTally::default())));

        let mut tasks = JoinSet::new();
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let output = Arc::clone(&output);
            let store = Arc::clone(&self.store);

            tasks.spawn(async move {
                loop {
                    let next = lock(&queue).pop_front();
                    let Some(record) = next else {
                        break;
                    };

                    let admission = admit(store.as_ref(), record);
                    let mut guard = lock(&output);
                    let (objects, tally) = &mut *guard;
                    match admission {
                        Admission::New(record) => objects.push(record),
                        Admission::Recovered(record) => {
                            tally.recovered += 1;
                            objects.push(record);
                        }
                        Admission::Seen => tally.already_seen += 1,
                        Admission::Dropped => tally.dropped += 1,
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tasks.abort_all();
                return Err(CrawlError::Worker(e.to_string()));
            }
        }

        let result = std::mem::take(&mut *lock(&output));
        Ok(result)
    }
}

#[derive(Debug, Default)]
struct DedupTally {
    already_seen: usize,
    recovered: usize,
    dropped: usize,
}

#[derive(Debug)]
enum Admission {
    New(ObjectRecord),
    Recovered(ObjectRecord),
    Seen,
    Dropped,
}

#[derive(Debug, Error)]
enum AdmitError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Decides one record, retrying once under a fallback id if it has none
fn admit(store: &dyn DedupStore, mut record: ObjectRecord) -> Admission {
    match try_admit(store, &record) {
        Ok(true) => Admission::New(record),
        Ok(false) => Admission::Seen,
        Err(AdmitError::Field(FieldError::Missing { .. })) => {
            let fallback = Uuid::new_v4().simple().to_string();
            tracing::debug!(
                "Record {:?} has no id, retrying as {}",
                record.name.as_option(),
                fallback
            );
            record.assign_fallback_id(fallback);

            match try_admit(store, &record) {
                Ok(true) => Admission::Recovered(record),
                Ok(false) => Admission::Seen,
                Err(e) => {
                    tracing::error!("Dropping record after fallback id retry: {}", e);
                    Admission::Dropped
                }
            }
        }
        Err(AdmitError::Field(e)) => {
            tracing::warn!("Dropping malformed record: {}", e);
            Admission::Dropped
        }
        Err(e) => {
            tracing::error!("Dropping record: {}", e);
            Admission::Dropped
        }
    }
}

/// Stores the record if its id is new; `Ok(false)` if it was already known
fn try_admit(store: &dyn DedupStore, record: &ObjectRecord) -> Result<bool, AdmitError> {
    let id = record.id()?;
    if store.exists(id)? {
        return Ok(false);
    }

    let blob = serde_json::to_vec(record)?;
    Ok(store.put(id, &blob)?)
}
