#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fleetdesk_cache::{CachePolicy, ExponentialBackoff, QueryCache, QueryKey, RefetchTrigger};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
enum FetchError {
    Transient,
    Fatal,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Fatal => f.write_str("fatal"),
        }
    }
}

fn cache(policy: CachePolicy) -> QueryCache<FetchError> {
    QueryCache::new(
        policy.with_retries(3, ExponentialBackoff::fast()),
        |e| *e == FetchError::Transient,
    )
}

/// Let spawned revalidations finish; paused time auto-advances.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[derive(Clone, Default)]
struct Counter(Arc<AtomicUsize>);

impl Counter {
    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_reads_share_one_request() {
    let cache = cache(CachePolicy::default());
    let calls = Counter::default();
    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                calls.bump();
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, FetchError>(vec![1, 2, 3])
            }
        }
    };

    let key = QueryKey::new("licenses").with(&("scope", 1));
    let (a, b) = tokio::join!(
        cache.fetch(key.clone(), fetcher.clone()),
        cache.fetch(key.clone(), fetcher)
    );

    assert_eq!(calls.get(), 1);
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a.data, &b.data));
}

#[tokio::test(start_paused = true)]
async fn fresh_values_are_served_without_fetching() {
    let cache = cache(CachePolicy::default());
    let calls = Counter::default();
    let key = QueryKey::new("clients");

    for _ in 0..3 {
        let calls = calls.clone();
        let result = cache
            .fetch(key.clone(), move || {
                let calls = calls.clone();
                async move { Ok::<_, FetchError>(calls.bump()) }
            })
            .await
            .unwrap();
        assert_eq!(*result.data, 1);
        assert!(!result.is_stale);
    }
    assert_eq!(calls.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn stale_value_is_served_then_revalidated() {
    let cache = cache(CachePolicy::default().with_stale_window(Duration::from_secs(60)));
    let calls = Counter::default();
    let key = QueryKey::new("equipment");
    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move { Ok::<_, FetchError>(calls.bump()) }
        }
    };

    let first = cache.fetch(key.clone(), fetcher.clone()).await.unwrap();
    assert_eq!(*first.data, 1);

    tokio::time::advance(Duration::from_secs(61)).await;

    let second = cache.fetch(key.clone(), fetcher.clone()).await.unwrap();
    assert_eq!(*second.data, 1);
    assert!(second.is_stale);
    assert!(second.is_fetching);

    settle().await;
    assert_eq!(calls.get(), 2);
    assert_eq!(*cache.peek::<usize>(&key).unwrap(), 2);

    let third = cache.fetch(key, fetcher).await.unwrap();
    assert_eq!(*third.data, 2);
    assert!(!third.is_stale);
}

#[tokio::test(start_paused = true)]
async fn zero_stale_window_revalidates_every_read() {
    let cache = cache(CachePolicy::always_revalidate());
    let calls = Counter::default();
    let key = QueryKey::new("dashboard");
    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move { Ok::<_, FetchError>(calls.bump()) }
        }
    };

    cache.fetch(key.clone(), fetcher.clone()).await.unwrap();
    settle().await;
    let again = cache.fetch(key.clone(), fetcher).await.unwrap();
    assert!(again.is_stale);
    settle().await;
    assert_eq!(calls.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let cache = cache(CachePolicy::default());
    let calls = Counter::default();
    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                if calls.bump() < 3 {
                    Err(FetchError::Transient)
                } else {
                    Ok("ok")
                }
            }
        }
    };

    let result = cache.fetch(QueryKey::new("clients"), fetcher).await.unwrap();
    assert_eq!(*result.data, "ok");
    assert_eq!(calls.get(), 3);
}

#[tokio::test(start_paused = true)]
async fn retries_stop_after_the_configured_count() {
    let cache = cache(CachePolicy::default());
    let calls = Counter::default();
    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                calls.bump();
                Err::<u8, _>(FetchError::Transient)
            }
        }
    };

    let err = cache
        .fetch(QueryKey::new("clients"), fetcher)
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Transient);
    assert_eq!(calls.get(), 4);
}

#[tokio::test(start_paused = true)]
async fn fatal_failures_are_not_retried() {
    let cache = cache(CachePolicy::default());
    let calls = Counter::default();
    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                calls.bump();
                Err::<u8, _>(FetchError::Fatal)
            }
        }
    };

    let err = cache
        .fetch(QueryKey::new("clients"), fetcher)
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Fatal);
    assert_eq!(calls.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn older_response_finishing_later_is_discarded() {
    let cache = cache(CachePolicy::default());
    let key = QueryKey::new("licenses");

    let (old, fresh) = tokio::join!(
        cache.fetch(key.clone(), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, FetchError>("old")
        }),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache
                .refetch(key.clone(), || async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok::<_, FetchError>("new")
                })
                .await
        }
    );

    assert_eq!(*old.unwrap().data, "old");
    assert_eq!(*fresh.unwrap(), "new");
    settle().await;
    assert_eq!(*cache.peek::<&str>(&key).unwrap(), "new");
}

#[tokio::test(start_paused = true)]
async fn invalidation_marks_only_the_named_kind() {
    let cache = cache(CachePolicy::default());
    let licenses = QueryKey::new("licenses").with(&1);
    let clients = QueryKey::new("clients").with(&1);

    cache
        .fetch(licenses.clone(), || async { Ok::<_, FetchError>(1) })
        .await
        .unwrap();
    cache
        .fetch(clients.clone(), || async { Ok::<_, FetchError>(1) })
        .await
        .unwrap();

    assert_eq!(cache.invalidate("licenses"), 1);

    let l = cache
        .fetch(licenses, || async { Ok::<_, FetchError>(2) })
        .await
        .unwrap();
    assert!(l.is_stale);
    let c = cache
        .fetch(clients, || async { Ok::<_, FetchError>(2) })
        .await
        .unwrap();
    assert!(!c.is_stale);
    assert_eq!(*c.data, 1);
}

#[tokio::test(start_paused = true)]
async fn focus_refetches_stale_entries_when_enabled() {
    let cache = cache(
        CachePolicy::default()
            .with_stale_window(Duration::from_secs(10))
            .with_triggers([RefetchTrigger::Focus]),
    );
    let calls = Counter::default();
    let key = QueryKey::new("clients");
    {
        let calls = calls.clone();
        cache
            .fetch(key.clone(), move || {
                let calls = calls.clone();
                async move { Ok::<_, FetchError>(calls.bump()) }
            })
            .await
            .unwrap();
    }

    assert_eq!(cache.notify(RefetchTrigger::Focus), 0, "still fresh");
    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(cache.notify(RefetchTrigger::Reconnect), 0, "trigger disabled");
    assert_eq!(cache.notify(RefetchTrigger::Focus), 1);

    settle().await;
    assert_eq!(calls.get(), 2);
    assert_eq!(*cache.peek::<usize>(&key).unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn idle_entries_are_collected() {
    let cache = cache(CachePolicy::default().with_gc_window(Duration::from_secs(60)));
    let idle = QueryKey::new("clients").with(&"idle");
    let busy = QueryKey::new("clients").with(&"busy");

    cache
        .fetch(idle.clone(), || async { Ok::<_, FetchError>(1) })
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(45)).await;
    cache
        .fetch(busy.clone(), || async { Ok::<_, FetchError>(1) })
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(20)).await;

    assert_eq!(cache.gc(), 1);
    assert!(cache.peek::<i32>(&idle).is_none());
    assert!(cache.peek::<i32>(&busy).is_some());
}

#[tokio::test(start_paused = true)]
async fn background_gc_stops_on_cancel() {
    let cache = cache(CachePolicy::default().with_gc_window(Duration::from_secs(1)));
    cache
        .fetch(QueryKey::new("clients"), || async { Ok::<_, FetchError>(1) })
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = cache.spawn_gc(Duration::from_millis(500), cancel.clone());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(cache.is_empty());

    cancel.cancel();
    handle.await.unwrap();
}
