//! Per-kind entry manager.
//!
//! Every mutation flows through here so persistence and scheduling can never
//! drift: cancel/reschedule strictly precedes the cache swap, and the
//! periodic resync job is the sole recovery path for timers lost across a
//! restart. The caches are DashMaps so resync jobs, fire callbacks, and
//! foreground calls can touch them concurrently.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::StubFilter;
use crate::error::AlmanacResult;
use crate::models::{Entry, EntryDetail, EntryKind, EntryStub};
use crate::scheduler::ReminderScheduler;
use crate::store::EntryStore;

/// Manager tuning knobs; sensible defaults, all overridable from config.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Look-forward horizon in days; -1 = unbounded.
    pub horizon_days: i64,
    pub resync_interval: Duration,
    /// Re-partition the active/past caches at most this often.
    pub cache_staleness: Duration,
    /// Above this many candidate documents, search fans out to workers.
    pub search_fanout_threshold: usize,
    pub search_max_workers: usize,
    pub search_unit_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            horizon_days: -1,
            resync_interval: Duration::from_secs(300),
            cache_staleness: Duration::from_secs(60),
            search_fanout_threshold: 32,
            search_max_workers: 8,
            search_unit_timeout: Duration::from_secs(2),
        }
    }
}

pub struct EntryManager {
    kind: EntryKind,
    store: EntryStore,
    scheduler: Arc<ReminderScheduler>,
    config: ManagerConfig,
    active: DashMap<Uuid, Entry>,
    /// Elapsed entries for kinds with a time window (events).
    past: DashMap<Uuid, Entry>,
    last_recalc: Mutex<Instant>,
}

impl EntryManager {
    pub fn new(
        store: EntryStore,
        scheduler: Arc<ReminderScheduler>,
        config: ManagerConfig,
    ) -> Self {
        EntryManager {
            kind: store.kind(),
            store,
            scheduler,
            config,
            active: DashMap::new(),
            past: DashMap::new(),
            last_recalc: Mutex::new(Instant::now()),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Persist a new entry; schedule and cache it when its anchor falls
    /// within the look-forward horizon.
    pub fn add(&self, entry: Entry) -> AlmanacResult<Entry> {
        self.store.upsert(&entry)?;
        if self.within_horizon(&entry) {
            self.scheduler.schedule(&entry);
            self.insert_cached(entry.clone());
        }
        Ok(entry)
    }

    /// Reschedule, re-persist, and replace the cached copy. The cancel
    /// inside reschedule strictly precedes the new timers, so no stale
    /// timer can outlive the old reminder values.
    pub fn update(&self, entry: Entry) -> AlmanacResult<Entry> {
        self.scheduler.reschedule(&entry);
        self.store.upsert(&entry)?;

        self.active.remove(&entry.id);
        self.past.remove(&entry.id);
        if self.within_horizon(&entry) {
            self.insert_cached(entry.clone());
        }
        Ok(entry)
    }

    /// Hard delete: timers first, then both stores, then the caches.
    pub fn delete(&self, id: Uuid) -> AlmanacResult<()> {
        self.scheduler.cancel_all(id);
        self.store.delete(id)?;
        self.active.remove(&id);
        self.past.remove(&id);
        Ok(())
    }

    /// Soft delete: the document stays readable, but the entry leaves the
    /// caches and the schedule and never comes back via resync.
    pub fn archive(&self, id: Uuid) -> AlmanacResult<()> {
        self.scheduler.cancel_all(id);
        self.store.archive(id)?;
        self.active.remove(&id);
        self.past.remove(&id);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> AlmanacResult<Entry> {
        self.store.get_by_id(id)
    }

    /// Snapshot of the active cache, soonest anchor first. Re-partitions
    /// first when the last recalculation is older than the staleness
    /// threshold.
    pub fn list_active(&self) -> Vec<Entry> {
        self.maybe_repartition();
        let mut entries: Vec<Entry> = self.active.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| match (a.anchor_time(), b.anchor_time()) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        entries
    }

    pub fn list_all(&self) -> AlmanacResult<Vec<Entry>> {
        self.store.list_full(&StubFilter::default())
    }

    pub fn list_archived(&self) -> AlmanacResult<Vec<Entry>> {
        self.store.list_full(&StubFilter::archived())
    }

    pub fn list_stubs(&self, filter: &StubFilter) -> AlmanacResult<Vec<EntryStub>> {
        self.store.list_stubs(filter)
    }

    pub fn tag_counts(&self) -> AlmanacResult<Vec<(String, usize)>> {
        self.store.tag_counts()
    }

    /// Case-insensitive substring scan over document bodies. Small result
    /// sets are scanned inline; larger ones fan out to bounded concurrent
    /// workers with a per-unit timeout. A failed or slow unit contributes
    /// nothing instead of failing the whole search.
    pub async fn search(&self, query: &str) -> AlmanacResult<Vec<Entry>> {
        let stubs = self.store.list_stubs(&StubFilter::default())?;
        let needle = query.to_lowercase();

        if stubs.len() <= self.config.search_fanout_threshold {
            let mut hits = Vec::new();
            for stub in stubs {
                match self.store.documents().load(&PathBuf::from(&stub.document_path)) {
                    Ok(entry) if entry_matches(&entry, &needle) => hits.push(entry),
                    Ok(_) => {}
                    Err(e) => log::warn!(
                        "[SEARCH] Skipping {} document {}: {}",
                        self.kind,
                        stub.document_path,
                        e
                    ),
                }
            }
            return Ok(hits);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.search_max_workers));
        let mut workers: JoinSet<Option<Entry>> = JoinSet::new();

        for stub in stubs {
            let semaphore = Arc::clone(&semaphore);
            let docs = self.store.documents().clone();
            let needle = needle.clone();
            let unit_timeout = self.config.search_unit_timeout;

            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let path = PathBuf::from(&stub.document_path);
                let load = tokio::time::timeout(
                    unit_timeout,
                    tokio::task::spawn_blocking(move || docs.load(&path)),
                )
                .await;

                match load {
                    Ok(Ok(Ok(entry))) if entry_matches(&entry, &needle) => Some(entry),
                    Ok(Ok(Ok(_))) => None,
                    Ok(Ok(Err(e))) => {
                        log::warn!("[SEARCH] Skipping document {}: {}", stub.document_path, e);
                        None
                    }
                    Ok(Err(e)) => {
                        log::warn!("[SEARCH] Worker failed for {}: {}", stub.document_path, e);
                        None
                    }
                    Err(_) => {
                        log::warn!("[SEARCH] Unit timed out for {}", stub.document_path);
                        None
                    }
                }
            });
        }

        let mut hits = Vec::new();
        while let Some(result) = workers.join_next().await {
            if let Ok(Some(entry)) = result {
                hits.push(entry);
            }
        }
        Ok(hits)
    }

    /// Rebuild caches and schedules wholesale from persisted state. Uses
    /// `schedule` (not `reschedule`) so an already-armed key stays armed -
    /// resync is idempotent. This is the sole recovery path after a restart.
    pub fn resync(&self) -> AlmanacResult<usize> {
        let filter = StubFilter::active_within(self.config.horizon_days);
        let entries = self.store.list_full(&filter)?;

        self.active.clear();
        self.past.clear();
        let count = entries.len();
        for entry in entries {
            self.scheduler.schedule(&entry);
            self.insert_cached(entry);
        }
        *self.last_recalc.lock() = Instant::now();

        log::debug!("[MANAGER] Resynced {} {} entries", count, self.kind);
        Ok(count)
    }

    /// Background resync loop, stopped via the shutdown token.
    pub fn start_resync_job(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.config.resync_interval);
            ticker.tick().await; // skip immediate tick
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = manager.resync() {
                            log::warn!("[MANAGER] Resync failed for {}: {}", manager.kind, e);
                        }
                    }
                }
            }
        })
    }

    fn within_horizon(&self, entry: &Entry) -> bool {
        if self.config.horizon_days < 0 {
            return true;
        }
        match entry.anchor_time() {
            None => true,
            Some(anchor) => {
                anchor <= Utc::now() + chrono::Duration::days(self.config.horizon_days)
            }
        }
    }

    fn insert_cached(&self, entry: Entry) {
        if self.kind.has_time_window() && is_elapsed(&entry) {
            self.past.insert(entry.id, entry);
        } else {
            self.active.insert(entry.id, entry);
        }
    }

    /// Move elapsed entries from the active cache to the past partition.
    /// Only kinds with a time window (events) migrate.
    fn maybe_repartition(&self) {
        if !self.kind.has_time_window() {
            return;
        }
        {
            let last = self.last_recalc.lock();
            if last.elapsed() < self.config.cache_staleness {
                return;
            }
        }

        let elapsed_ids: Vec<Uuid> = self
            .active
            .iter()
            .filter(|e| is_elapsed(e.value()))
            .map(|e| *e.key())
            .collect();
        for id in elapsed_ids {
            if let Some((id, entry)) = self.active.remove(&id) {
                self.past.insert(id, entry);
            }
        }
        *self.last_recalc.lock() = Instant::now();
    }
}

/// An event has elapsed once its end (or start, if open-ended) has passed.
fn is_elapsed(entry: &Entry) -> bool {
    match &entry.detail {
        EntryDetail::Event {
            starts_at, ends_at, ..
        } => ends_at.unwrap_or(*starts_at) < Utc::now(),
        _ => false,
    }
}

fn entry_matches(entry: &Entry, needle: &str) -> bool {
    entry.name.to_lowercase().contains(needle)
        || entry.description.to_lowercase().contains(needle)
        || entry.body().to_lowercase().contains(needle)
        || entry.tags.iter().any(|t| t.to_lowercase().contains(needle))
}
