use std::any::{Any, TypeId};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::key::QueryKey;
use crate::policy::{CachePolicy, RefetchTrigger};

type AnyValue = Arc<dyn Any + Send + Sync>;
type Fetch<T, E> = Shared<BoxFuture<'static, Result<Arc<T>, E>>>;
type Attempt<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Restart = Arc<dyn Fn() -> bool + Send + Sync>;

/// A value served from the cache.
#[derive(Debug)]
pub struct QueryResult<T> {
    pub data: Arc<T>,
    /// The value is older than the stale window or was invalidated.
    pub is_stale: bool,
    /// A revalidation is running in the background.
    pub is_fetching: bool,
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    key: QueryKey,
    type_id: TypeId,
}

impl CacheKey {
    fn of<T: 'static>(key: QueryKey) -> Self {
        Self {
            key,
            type_id: TypeId::of::<T>(),
        }
    }
}

struct Entry {
    value: Option<AnyValue>,
    updated_at: Option<Instant>,
    last_access: Instant,
    invalidated: bool,
    in_flight: Option<(u64, Box<dyn Any + Send + Sync>)>,
    latest_request: u64,
    applied_request: u64,
    restart: Option<Restart>,
}

impl Entry {
    fn new(now: Instant) -> Self {
        Self {
            value: None,
            updated_at: None,
            last_access: now,
            invalidated: false,
            in_flight: None,
            latest_request: 0,
            applied_request: 0,
            restart: None,
        }
    }

    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        self.invalidated
            || self
                .updated_at
                .is_none_or(|at| now.saturating_duration_since(at) >= window)
    }

    fn cached<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().and_then(|v| v.downcast::<T>().ok())
    }

    fn running<T, E>(&self) -> Option<(u64, Fetch<T, E>)>
    where
        T: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        self.in_flight
            .as_ref()
            .and_then(|(id, fut)| fut.downcast_ref::<Fetch<T, E>>().map(|f| (*id, f.clone())))
    }
}

struct Inner<E> {
    policy: CachePolicy,
    is_retryable: fn(&E) -> bool,
    entries: DashMap<CacheKey, Entry>,
    next_request: AtomicU64,
}

/// Read-through cache for backend queries.
///
/// Concurrent reads of one key share a single request. Values younger than
/// the stale window are served without a fetch; older ones are served and
/// refreshed in the background. Retryable failures are retried with
/// exponential backoff. When two requests for one key overlap, the response
/// of the newer one wins.
///
/// Spawns background tasks, so it must be used inside a tokio runtime.
pub struct QueryCache<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for QueryCache<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> QueryCache<E>
where
    E: Clone + Display + Send + Sync + 'static,
{
    /// `is_retryable` decides which failures are worth another attempt.
    #[must_use]
    pub fn new(policy: CachePolicy, is_retryable: fn(&E) -> bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                is_retryable,
                entries: DashMap::new(),
                next_request: AtomicU64::new(1),
            }),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    /// Read `key`, running `fetcher` when there is nothing usable cached.
    ///
    /// # Errors
    /// Returns the fetcher's error once retries are exhausted or the error is
    /// not retryable. Stale values are still served when a background
    /// revalidation fails.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<QueryResult<T>, E>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let attempt: Attempt<T, E> = Arc::new(move || fetcher().boxed());
        let ckey = CacheKey::of::<T>(key);
        let now = Instant::now();

        let (id, fut) = {
            let mut entry = self
                .inner
                .entries
                .entry(ckey.clone())
                .or_insert_with(|| Entry::new(now));
            entry.last_access = now;
            entry.restart = Some(Inner::restart_fn(&self.inner, &ckey, &attempt));

            let stale = entry.is_stale(now, self.inner.policy.stale_window);
            let in_flight = entry.running::<T, E>();
            match (entry.cached::<T>(), in_flight) {
                (Some(data), in_flight) => {
                    let is_fetching = in_flight.is_some() || stale;
                    if stale && in_flight.is_none() {
                        debug!(key = ?ckey.key, "serving stale value, revalidating");
                        Inner::start(&self.inner, &mut entry, &ckey, attempt);
                    }
                    return Ok(QueryResult {
                        data,
                        is_stale: stale,
                        is_fetching,
                    });
                }
                (None, Some(joined)) => {
                    debug!(key = ?ckey.key, "joining in-flight request");
                    joined
                }
                (None, None) => Inner::start(&self.inner, &mut entry, &ckey, attempt),
            }
        };

        let result = fut.await;
        self.inner.apply(&ckey, id, &result);
        result.map(|data| QueryResult {
            data,
            is_stale: false,
            is_fetching: false,
        })
    }

    /// Start a new request for `key` even if one is running; the newer
    /// response supersedes the older one.
    ///
    /// # Errors
    /// Same as [`QueryCache::fetch`].
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let attempt: Attempt<T, E> = Arc::new(move || fetcher().boxed());
        let ckey = CacheKey::of::<T>(key);
        let now = Instant::now();

        let (id, fut) = {
            let mut entry = self
                .inner
                .entries
                .entry(ckey.clone())
                .or_insert_with(|| Entry::new(now));
            entry.last_access = now;
            entry.restart = Some(Inner::restart_fn(&self.inner, &ckey, &attempt));
            Inner::start(&self.inner, &mut entry, &ckey, attempt)
        };

        let result = fut.await;
        self.inner.apply(&ckey, id, &result);
        result
    }

    /// Cached value of `key`, fresh or not, without fetching.
    #[must_use]
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let ckey = CacheKey::of::<T>(key.clone());
        self.inner.entries.get(&ckey).and_then(|e| e.cached::<T>())
    }

    /// Mark every entry of `kind` stale. Requests already running for those
    /// entries can no longer make them fresh again.
    pub fn invalidate(&self, kind: &str) -> usize {
        let mut count = 0;
        for mut entry in self.inner.entries.iter_mut() {
            if entry.key().key.kind() != kind {
                continue;
            }
            let marker = self.inner.next_id();
            let entry = entry.value_mut();
            entry.invalidated = true;
            entry.in_flight = None;
            entry.latest_request = marker;
            count += 1;
        }
        debug!(kind, count, "invalidated cache entries");
        count
    }

    /// Drop everything, e.g. when the signed-in identity changes.
    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// React to an environment event: when the policy enables `trigger`,
    /// refetch every stale entry that has no request running.
    ///
    /// Returns how many refetches were started.
    pub fn notify(&self, trigger: RefetchTrigger) -> usize {
        if !self.inner.policy.refetch_triggers.contains(&trigger) {
            debug!(?trigger, "refetch trigger disabled");
            return 0;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(?trigger, "refetch requested outside a tokio runtime");
            return 0;
        }

        let now = Instant::now();
        let window = self.inner.policy.stale_window;
        let restarts: Vec<Restart> = self
            .inner
            .entries
            .iter()
            .filter(|e| e.in_flight.is_none() && e.is_stale(now, window))
            .filter_map(|e| e.restart.clone())
            .collect();

        let started = restarts.iter().filter(|restart| restart()).count();
        debug!(?trigger, started, "refetched stale entries");
        started
    }

    /// Evict entries nobody read within the gc window. Entries with a request
    /// running are kept.
    pub fn gc(&self) -> usize {
        let now = Instant::now();
        let window = self.inner.policy.gc_window;
        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, e| {
            e.in_flight.is_some() || now.saturating_duration_since(e.last_access) < window
        });
        let evicted = before.saturating_sub(self.inner.entries.len());
        if evicted > 0 {
            debug!(evicted, "evicted idle cache entries");
        }
        evicted
    }

    /// Run [`QueryCache::gc`] periodically until `cancel` fires.
    #[must_use]
    pub fn spawn_gc(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        cache.gc();
                    }
                }
            }
            debug!("cache gc stopped");
        })
    }
}

impl<E> Inner<E>
where
    E: Clone + Display + Send + Sync + 'static,
{
    fn next_id(&self) -> u64 {
        self.next_request.fetch_add(1, Ordering::Relaxed)
    }

    /// Start a request and record it as the entry's latest. A driver task
    /// stores the result even if every caller stops waiting.
    fn start<T>(
        this: &Arc<Self>,
        entry: &mut Entry,
        ckey: &CacheKey,
        attempt: Attempt<T, E>,
    ) -> (u64, Fetch<T, E>)
    where
        T: Send + Sync + 'static,
    {
        let id = this.next_id();
        let fut = Self::with_retries(this, ckey.key.kind().to_owned(), attempt);

        entry.in_flight = Some((id, Box::new(fut.clone())));
        entry.latest_request = id;

        let weak = Arc::downgrade(this);
        let driver = fut.clone();
        let ckey = ckey.clone();
        tokio::spawn(async move {
            let result = driver.await;
            if let Some(inner) = weak.upgrade() {
                inner.apply(&ckey, id, &result);
            }
        });
        (id, fut)
    }

    fn with_retries<T>(this: &Arc<Self>, kind: String, attempt: Attempt<T, E>) -> Fetch<T, E>
    where
        T: Send + Sync + 'static,
    {
        let max_retries = this.policy.max_retries;
        let backoff = this.policy.backoff.clone();
        let is_retryable = this.is_retryable;

        async move {
            let mut retries = 0u32;
            loop {
                match attempt().await {
                    Ok(value) => return Ok(Arc::new(value)),
                    Err(err) if retries < max_retries && is_retryable(&err) => {
                        let delay = backoff.delay(retries);
                        retries += 1;
                        warn!(kind = %kind, retries, ?delay, error = %err, "query failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    Err(err) => {
                        debug!(kind = %kind, retries, error = %err, "query failed");
                        return Err(err);
                    }
                }
            }
        }
        .boxed()
        .shared()
    }

    fn restart_fn<T>(this: &Arc<Self>, ckey: &CacheKey, attempt: &Attempt<T, E>) -> Restart
    where
        T: Send + Sync + 'static,
    {
        let weak: Weak<Self> = Arc::downgrade(this);
        let ckey = ckey.clone();
        let attempt = Arc::clone(attempt);
        Arc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let Some(mut entry) = inner.entries.get_mut(&ckey) else {
                return false;
            };
            if entry.in_flight.is_some() {
                return false;
            }
            let _ = Self::start(&inner, &mut entry, &ckey, Arc::clone(&attempt));
            true
        })
    }

    /// Store a finished response unless a newer one is already applied.
    fn apply<T>(&self, ckey: &CacheKey, id: u64, result: &Result<Arc<T>, E>)
    where
        T: Send + Sync + 'static,
    {
        let Some(mut entry) = self.entries.get_mut(ckey) else {
            return;
        };
        if entry.in_flight.as_ref().is_some_and(|(running, _)| *running == id) {
            entry.in_flight = None;
        }
        let Ok(value) = result else {
            return;
        };
        if id <= entry.applied_request {
            if id < entry.applied_request {
                debug!(key = ?ckey.key, id, "discarding superseded response");
            }
            return;
        }
        let erased: AnyValue = value.clone();
        entry.value = Some(erased);
        entry.applied_request = id;
        entry.updated_at = Some(Instant::now());
        if id >= entry.latest_request {
            entry.invalidated = false;
        }
    }
}
