//! Keyed cache for remote entities with staleness, dedup and retry.
//!
//! Every remote read in stockdeck goes through a [`CacheStore`]: the store
//! serves the last known value immediately and refreshes it in the background
//! once it has gone stale (stale-while-revalidate). Concurrent readers of the
//! same key attach to a single in-flight fetch, and out-of-order resolutions
//! are discarded through a per-entry sequence number, so no locking beyond the
//! map mutex is needed.

use crate::error::ApiError;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

/// Produces one fetch attempt for a cache entry.
pub type Fetcher<V> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync + 'static>;

/// Observable lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    Fetching,
    Fresh,
    Stale,
    Error,
}

/// What a passive reader sees. The store never propagates fetch failures as
/// panics or early returns; callers decide how to treat `error`.
#[derive(Debug, Clone)]
pub struct Snapshot<V> {
    pub value: Option<V>,
    pub is_loading: bool,
    pub error: Option<ApiError>,
}

impl<V> Snapshot<V> {
    fn empty() -> Self {
        Snapshot {
            value: None,
            is_loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Age beyond which a Fresh entry is served as Stale and refetched.
    pub stale_after: Duration,
    /// Extra attempts after the first failure, for retriable errors only.
    pub retries: usize,
    /// First retry delay; doubles on each subsequent attempt.
    pub backoff_base: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            stale_after: Duration::from_secs(5 * 60),
            retries: 2,
            backoff_base: Duration::from_millis(250),
        }
    }
}

struct Entry<V> {
    value: Option<V>,
    fetched_at: Option<Instant>,
    options: FetchOptions,
    status: EntryState,
    sequence: u64,
    last_error: Option<ApiError>,
    fetcher: Option<Fetcher<V>>,
    version_tx: watch::Sender<u64>,
}

impl<V: Clone> Entry<V> {
    fn new(options: FetchOptions) -> Self {
        let (version_tx, _) = watch::channel(0);
        Entry {
            value: None,
            fetched_at: None,
            options,
            status: EntryState::Empty,
            sequence: 0,
            last_error: None,
            fetcher: None,
            version_tx,
        }
    }

    /// Effective state: a Fresh entry older than `stale_after` reads as Stale.
    fn state(&self) -> EntryState {
        if self.status == EntryState::Fresh {
            if let Some(fetched_at) = self.fetched_at {
                if fetched_at.elapsed() > self.options.stale_after {
                    return EntryState::Stale;
                }
            }
        }
        self.status
    }

    fn snapshot(&self) -> Snapshot<V> {
        Snapshot {
            value: self.value.clone(),
            is_loading: self.status == EntryState::Fetching,
            error: self.last_error.clone(),
        }
    }

    fn touch(&self) {
        self.version_tx.send_modify(|v| *v += 1);
    }

    fn observed(&self) -> bool {
        self.version_tx.receiver_count() > 0
    }
}

pub struct CacheStore<V> {
    entries: Arc<Mutex<HashMap<String, Entry<V>>>>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        CacheStore {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        CacheStore {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reads the entry for `key`, dispatching a background fetch when it is
    /// Empty, Stale or Error. Returns the last known value without waiting;
    /// a Stale entry still serves its previous value while the refetch runs.
    pub fn get(&self, key: &str, options: FetchOptions, fetcher: Fetcher<V>) -> Snapshot<V> {
        let (snapshot, _) = self.access(key, options, fetcher);
        snapshot
    }

    /// Like [`CacheStore::get`], but waits for the entry to leave `Fetching`
    /// before returning. Joins an in-flight fetch rather than issuing another.
    pub async fn resolve(
        &self,
        key: &str,
        options: FetchOptions,
        fetcher: Fetcher<V>,
    ) -> Snapshot<V> {
        let (mut snapshot, mut rx) = self.access(key, options, fetcher);
        while snapshot.is_loading {
            if rx.changed().await.is_err() {
                break;
            }
            snapshot = match self.snapshot(key) {
                Some(s) => s,
                None => return Snapshot::empty(),
            };
        }
        snapshot
    }

    /// Single locked step behind `get` and `resolve`: creates the entry on
    /// first access, dispatches at most one fetch when the entry is Empty,
    /// Stale or Error, and hands back a version receiver taken under the same
    /// lock so no transition can be missed.
    fn access(
        &self,
        key: &str,
        options: FetchOptions,
        fetcher: Fetcher<V>,
    ) -> (Snapshot<V>, watch::Receiver<u64>) {
        // Lock is never held across an await; fetches run in spawned tasks.
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(options));
        entry.options = options;
        entry.fetcher = Some(Arc::clone(&fetcher));

        if matches!(
            entry.state(),
            EntryState::Empty | EntryState::Stale | EntryState::Error
        ) {
            Self::dispatch(&self.entries, key, entry, fetcher);
        }
        (entry.snapshot(), entry.version_tx.subscribe())
    }

    /// Passive read: no fetch is dispatched, `None` if the key was never seen.
    pub fn snapshot(&self, key: &str) -> Option<Snapshot<V>> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|entry| entry.snapshot())
    }

    pub fn state(&self, key: &str) -> Option<EntryState> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|entry| entry.state())
    }

    /// Version channel for `key`; bumped on every entry transition. Dropping
    /// the receiver unsubscribes. `None` if the key was never seen.
    pub fn subscribe(&self, key: &str) -> Option<watch::Receiver<u64>> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|entry| entry.version_tx.subscribe())
    }

    /// Forces the entry to Stale and discards any in-flight result for it.
    /// Observed entries with a remembered fetcher are refetched immediately,
    /// unless a fetch is already in flight (its discard handler redispatches).
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            Self::invalidate_entry(&self.entries, key, entry);
        }
    }

    /// Invalidates every key starting with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().unwrap();
        let keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in keys {
            if let Some(entry) = entries.get_mut(&key) {
                Self::invalidate_entry(&self.entries, &key, entry);
            }
        }
    }

    /// Drops every entry. Used on logout, when cached per-user keys stop
    /// being meaningful.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        debug!("Cache CLEAR ({} entries)", entries.len());
        entries.clear();
    }

    fn invalidate_entry(
        entries: &Arc<Mutex<HashMap<String, Entry<V>>>>,
        key: &str,
        entry: &mut Entry<V>,
    ) {
        entry.sequence += 1;
        debug!(key, sequence = entry.sequence, "Cache INVALIDATE");
        if entry.status == EntryState::Fetching {
            // In-flight result will be discarded on arrival; its discard
            // handler restores a fetchable state and redispatches if needed.
            entry.touch();
            return;
        }
        entry.status = if entry.value.is_some() {
            EntryState::Stale
        } else {
            EntryState::Empty
        };
        if entry.observed() {
            if let Some(fetcher) = entry.fetcher.clone() {
                Self::dispatch(entries, key, entry, fetcher);
                return;
            }
        }
        entry.touch();
    }

    /// Marks the entry Fetching and spawns the fetch-with-retry task. Caller
    /// must hold the map lock and have checked that no fetch is in flight.
    fn dispatch(
        entries: &Arc<Mutex<HashMap<String, Entry<V>>>>,
        key: &str,
        entry: &mut Entry<V>,
        fetcher: Fetcher<V>,
    ) {
        entry.sequence += 1;
        entry.status = EntryState::Fetching;
        entry.touch();
        let sequence = entry.sequence;
        let options = entry.options;
        debug!(key, sequence, "Cache FETCH dispatched");

        let entries = Arc::clone(entries);
        let key = key.to_string();
        tokio::spawn(async move {
            let result = Self::fetch_with_retry(&fetcher, options).await;
            Self::apply(&entries, &key, sequence, result);
        });
    }

    async fn fetch_with_retry(
        fetcher: &Fetcher<V>,
        options: FetchOptions,
    ) -> Result<V, ApiError> {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retriable() || attempt >= options.retries {
                        return Err(err);
                    }
                    let delay = options.backoff_base * 2u32.pow(attempt as u32);
                    debug!(
                        attempt = attempt + 1,
                        retries = options.retries,
                        ?delay,
                        %err,
                        "Fetch attempt failed, backing off"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn apply(
        entries: &Arc<Mutex<HashMap<String, Entry<V>>>>,
        key: &str,
        sequence: u64,
        result: Result<V, ApiError>,
    ) {
        let mut map = entries.lock().unwrap();
        let Some(entry) = map.get_mut(key) else {
            debug!(key, "Fetch resolved for a cleared entry, discarding");
            return;
        };
        if entry.sequence != sequence {
            // A newer dispatch or an invalidation superseded this attempt.
            debug!(
                key,
                resolved = sequence,
                current = entry.sequence,
                "Discarding out-of-sequence fetch result"
            );
            entry.status = if entry.value.is_some() {
                EntryState::Stale
            } else {
                EntryState::Empty
            };
            if entry.observed() {
                if let Some(fetcher) = entry.fetcher.clone() {
                    Self::dispatch(entries, key, entry, fetcher);
                    return;
                }
            }
            entry.touch();
            return;
        }

        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.fetched_at = Some(Instant::now());
                entry.status = EntryState::Fresh;
                entry.last_error = None;
                debug!(key, sequence, "Cache entry refreshed");
            }
            Err(err) => {
                // Last good value stays available to readers.
                entry.status = EntryState::Error;
                entry.last_error = Some(err);
                debug!(key, sequence, "Cache entry fetch exhausted");
            }
        }
        entry.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counting_fetcher(counter: Arc<AtomicUsize>, delay: Duration) -> Fetcher<i32> {
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                sleep(delay).await;
                Ok(call as i32)
            })
        })
    }

    fn quick_options() -> FetchOptions {
        FetchOptions {
            stale_after: Duration::from_millis(40),
            retries: 2,
            backoff_base: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_empty_to_fresh_single_fetch() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(5));

        let snapshot = store.resolve("quote:AAPL", quick_options(), fetcher).await;
        assert_eq!(snapshot.value, Some(1));
        assert!(snapshot.error.is_none());
        assert_eq!(store.state("quote:AAPL"), Some(EntryState::Fresh));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_gets_dedup_to_one_fetch() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(20));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            let fetcher = Arc::clone(&fetcher);
            handles.push(tokio::spawn(async move {
                store.resolve("quote:AAPL", quick_options(), fetcher).await
            }));
        }
        for handle in handles {
            let snapshot = handle.await.unwrap();
            assert_eq!(snapshot.value, Some(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_serves_without_fetch() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(1));

        store
            .resolve("quote:AAPL", quick_options(), Arc::clone(&fetcher))
            .await;
        let snapshot = store.get("quote:AAPL", quick_options(), fetcher);
        assert_eq!(snapshot.value, Some(1));
        assert!(!snapshot.is_loading);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_serves_old_value_while_revalidating() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(10));

        store
            .resolve("quote:AAPL", quick_options(), Arc::clone(&fetcher))
            .await;
        sleep(Duration::from_millis(60)).await;
        assert_eq!(store.state("quote:AAPL"), Some(EntryState::Stale));

        // Old value comes back synchronously, refetch runs in the background.
        let snapshot = store.get("quote:AAPL", quick_options(), Arc::clone(&fetcher));
        assert_eq!(snapshot.value, Some(1));

        let refreshed = store.resolve("quote:AAPL", quick_options(), fetcher).await;
        assert_eq!(refreshed.value, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retriable_errors_are_retried_with_backoff() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher: Fetcher<i32> = Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if call < 3 {
                    Err(ApiError::Server { status: 503 })
                } else {
                    Ok(42)
                }
            })
        });

        let snapshot = store.resolve("quote:AAPL", quick_options(), fetcher).await;
        assert_eq!(snapshot.value, Some(42));
        assert!(snapshot.error.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher: Fetcher<i32> = Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Client {
                    status: 404,
                    message: "Stock not found".to_string(),
                })
            })
        });

        let snapshot = store.resolve("quote:NOPE", quick_options(), fetcher).await;
        assert!(snapshot.value.is_none());
        assert!(matches!(
            snapshot.error,
            Some(ApiError::Client { status: 404, .. })
        ));
        assert_eq!(store.state("quote:NOPE"), Some(EntryState::Error));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_after_exhaustion_keeps_last_good_value() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetcher: Fetcher<i32> = Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if call == 1 {
                    Ok(7)
                } else {
                    Err(ApiError::Server { status: 500 })
                }
            })
        });

        store
            .resolve("quote:AAPL", quick_options(), Arc::clone(&fetcher))
            .await;
        store.invalidate("quote:AAPL");

        let snapshot = store.resolve("quote:AAPL", quick_options(), fetcher).await;
        assert_eq!(snapshot.value, Some(7));
        assert!(snapshot.error.is_some());
        assert_eq!(store.state("quote:AAPL"), Some(EntryState::Error));
        // Initial success + 1 failed attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_invalidation_discards_in_flight_result() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(40));

        // Dispatch, then invalidate while the fetch sleeps.
        store.get("quote:AAPL", quick_options(), Arc::clone(&fetcher));
        store.invalidate("quote:AAPL");
        sleep(Duration::from_millis(80)).await;

        // The stale resolution was discarded: no value, entry fetchable again.
        let snapshot = store.snapshot("quote:AAPL").unwrap();
        assert!(snapshot.value.is_none());
        assert_eq!(store.state("quote:AAPL"), Some(EntryState::Empty));
    }

    #[tokio::test]
    async fn test_invalidate_prefix_hits_matching_keys_only() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(1));

        store
            .resolve("quote:AAPL", quick_options(), Arc::clone(&fetcher))
            .await;
        store
            .resolve("quote:MSFT", quick_options(), Arc::clone(&fetcher))
            .await;
        store
            .resolve("rate:USD->EUR", quick_options(), fetcher)
            .await;

        store.invalidate_prefix("quote:");
        assert_eq!(store.state("quote:AAPL"), Some(EntryState::Stale));
        assert_eq!(store.state("quote:MSFT"), Some(EntryState::Stale));
        assert_eq!(store.state("rate:USD->EUR"), Some(EntryState::Fresh));
    }

    #[tokio::test]
    async fn test_subscription_sees_transitions() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(5));

        store
            .resolve("quote:AAPL", quick_options(), Arc::clone(&fetcher))
            .await;
        let mut rx = store.subscribe("quote:AAPL").unwrap();
        let seen = *rx.borrow_and_update();

        store.invalidate("quote:AAPL");
        rx.changed().await.unwrap();
        assert!(*rx.borrow() > seen);

        // Observed + invalidated means an immediate refetch was dispatched.
        let snapshot = store
            .resolve("quote:AAPL", quick_options(), fetcher)
            .await;
        assert_eq!(snapshot.value, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_forgets_everything() {
        let store = CacheStore::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = counting_fetcher(Arc::clone(&calls), Duration::from_millis(1));

        store.resolve("quote:AAPL", quick_options(), fetcher).await;
        store.clear();
        assert!(store.snapshot("quote:AAPL").is_none());
    }
}
