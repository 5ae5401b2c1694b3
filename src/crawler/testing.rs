//! In-process search client used by crawler tests

use crate::geo::{BBox, Point};
use crate::search::{Field, ObjectRecord, SearchClient, SearchError, SearchQuery};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type CountFn = Box<dyn Fn(&BBox) -> Result<Field<u64>, SearchError> + Send + Sync>;

/// A `SearchClient` over a fixed set of records, or a scripted count function
///
/// Records are matched with half-open containment, so a record sitting on a
/// split line is found in exactly one leaf.
pub struct FakeClient {
    records: Vec<ObjectRecord>,
    count_fn: Option<CountFn>,
    failing_search: Option<String>,
    delay: Duration,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    count_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl FakeClient {
    /// A client whose counts and searches are answered from `records`
    pub fn with_records(records: Vec<ObjectRecord>) -> Self {
        Self {
            records,
            count_fn: None,
            failing_search: None,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        }
    }

    /// A client whose counts come from `count_fn` and whose searches return
    /// nothing
    pub fn with_count<F>(count_fn: F) -> Self
    where
        F: Fn(&BBox) -> Result<Field<u64>, SearchError> + Send + Sync + 'static,
    {
        Self {
            count_fn: Some(Box::new(count_fn)),
            ..Self::with_records(Vec::new())
        }
    }

    /// Makes every call sleep, so concurrent callers overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every search call fail with `message`
    pub fn fail_searches(mut self, message: &str) -> Self {
        self.failing_search = Some(message.to_string());
        self
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Most calls ever in progress at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of records inside `bbox`
    pub fn records_in(&self, bbox: &BBox) -> usize {
        self.matching(bbox).count()
    }

    fn matching<'a>(&'a self, bbox: &'a BBox) -> impl Iterator<Item = &'a ObjectRecord> + 'a {
        self.records.iter().filter(move |record| match record.coordinates() {
            Ok(point) => bbox.contains(&point),
            Err(_) => false,
        })
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchClient for FakeClient {
    async fn count(&self, bbox: &BBox, _query: &SearchQuery) -> Result<Field<u64>, SearchError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = match &self.count_fn {
            Some(count_fn) => count_fn(bbox),
            None => Ok(Field::Present(self.records_in(bbox) as u64)),
        };
        self.exit();
        result
    }

    async fn search(
        &self,
        bbox: &BBox,
        query: &SearchQuery,
    ) -> Result<Vec<ObjectRecord>, SearchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let result = match &self.failing_search {
            Some(message) => Err(SearchError::Unavailable(message.clone())),
            None => Ok(self
                .matching(bbox)
                .take(query.results as usize)
                .cloned()
                .collect()),
        };
        self.exit();
        result
    }
}

pub fn bbox(min: [f64; 2], max: [f64; 2]) -> BBox {
    BBox::new(Point::from(min), Point::from(max)).unwrap()
}

pub fn query() -> SearchQuery {
    SearchQuery {
        text: "coffee".to_string(),
        lang: "en_US".to_string(),
        kind: "biz".to_string(),
        restrict_to_area: true,
        results: 500,
    }
}

/// One record per cell of a `cols` x `rows` grid over `area`, placed at the
/// cell centres
pub fn grid_records(area: &BBox, cols: usize, rows: usize) -> Vec<ObjectRecord> {
    let min = area.min();
    let max = area.max();
    let step_lon = (max.lon - min.lon) / cols as f64;
    let step_lat = (max.lat - min.lat) / rows as f64;

    let mut records = Vec::with_capacity(cols * rows);
    for col in 0..cols {
        for row in 0..rows {
            let point = Point::new(
                min.lon + step_lon * (col as f64 + 0.5),
                min.lat + step_lat * (row as f64 + 0.5),
            );
            records.push(ObjectRecord::new(
                format!("obj-{}-{}", col, row),
                format!("Cafe {}/{}", col, row),
                point,
            ));
        }
    }
    records
}
