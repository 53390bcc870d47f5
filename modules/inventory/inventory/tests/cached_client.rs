#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Fixture, admin, technician};
use fleetdesk_backend::{BackendError, ChangeKind, InMemoryBackend};
use fleetdesk_cache::ExponentialBackoff;
use fleetdesk_query::PageRequest;
use inventory::InventoryConfig;
use inventory_sdk::{InventoryError, LicenseFilter, LicenseStatus, NewLicense};
use tokio_util::sync::CancellationToken;

fn fast_config() -> InventoryConfig {
    let mut config = InventoryConfig::default();
    config.cache = config.cache.with_retries(3, ExponentialBackoff::fast());
    config
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_reads_share_one_request() {
    let backend = InMemoryBackend::new().with_latency(Duration::from_millis(200));
    let fx = Fixture::build(backend, fast_config());
    let client = fx.module.client();
    let ctx = admin();
    let filter = LicenseFilter::default();

    let (a, b) = tokio::join!(
        client.list_licenses(&ctx, &filter, PageRequest::new(1, 10)),
        client.list_licenses(&ctx, &filter, PageRequest::new(1, 10)),
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(fx.backend.select_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn callers_with_equal_capabilities_share_entries() {
    let fx = Fixture::build(InMemoryBackend::new(), fast_config());
    let client = fx.module.client();
    let filter = LicenseFilter::default();

    client.list_licenses(&technician(), &filter, PageRequest::new(1, 10)).await.unwrap();
    client.list_licenses(&technician(), &filter, PageRequest::new(1, 10)).await.unwrap();
    assert_eq!(fx.backend.select_calls(), 1);

    let restricted = client
        .list_licenses(&fx.client_user(fx.c1), &filter, PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(fx.backend.select_calls(), 2);
    assert!(restricted.items.iter().all(|l| l.client_id == Some(fx.c1)));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let fx = Fixture::build(InMemoryBackend::new(), fast_config());
    for _ in 0..2 {
        fx.backend.fail_next_select(BackendError::Status {
            status: 503,
            message: "unavailable".into(),
        });
    }

    let page = fx
        .module
        .client()
        .list_licenses(&admin(), &LicenseFilter::default(), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 10);
    assert_eq!(fx.backend.select_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn auth_failures_are_not_retried() {
    let fx = Fixture::build(InMemoryBackend::new(), fast_config());
    fx.backend.fail_next_select(BackendError::Auth("JWT expired".into()));

    let err = fx
        .module
        .client()
        .list_licenses(&admin(), &LicenseFilter::default(), PageRequest::new(1, 10))
        .await
        .unwrap_err();
    assert_eq!(err, InventoryError::Unauthenticated);
    assert_eq!(fx.backend.select_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn writes_mark_reads_stale() {
    let fx = Fixture::build(InMemoryBackend::new(), fast_config());
    let client = fx.module.client();
    let ctx = admin();
    let filter = LicenseFilter::default().client(fx.c2);
    let request = PageRequest::new(1, 50);

    let before = client.list_licenses(&ctx, &filter, request).await.unwrap();
    client
        .create_license(&ctx, NewLicense {
            name: "Globex backup".into(),
            client_id: Some(fx.c2),
            license_key: None,
            status: LicenseStatus::Active,
            seats: None,
            start_date: None,
            expiry_date: None,
        })
        .await
        .unwrap();

    let stale = client.list_licenses(&ctx, &filter, request).await.unwrap();
    assert_eq!(stale, before);
    settle().await;

    let fresh = client.list_licenses(&ctx, &filter, request).await.unwrap();
    assert_eq!(fresh.total_count, before.total_count + 1);
}

#[tokio::test(start_paused = true)]
async fn backend_changes_invalidate_cached_reads() {
    let fx = Fixture::build(InMemoryBackend::new(), fast_config());
    let client = fx.module.client();
    let ctx = admin();
    let forwarder = fx.module.start_realtime();
    assert_eq!(forwarder.subscriptions(), 3);

    client.license_stats(&ctx, &LicenseFilter::default()).await.unwrap();
    let calls = fx.backend.select_calls();

    fx.backend.emit_change("licenses", ChangeKind::Update, None);
    settle().await;

    client.license_stats(&ctx, &LicenseFilter::default()).await.unwrap();
    settle().await;
    assert!(fx.backend.select_calls() > calls);
}

#[tokio::test]
async fn dropping_the_forwarder_releases_listeners() {
    let fx = Fixture::new();
    let backend = Arc::clone(&fx.backend);
    let before = ["clients", "licenses", "equipment"].map(|t| backend.listener_count(t));

    let forwarder = fx.module.start_realtime();
    assert_eq!(backend.listener_count("licenses"), before[1] + 1);

    drop(forwarder);
    wait_until(|| ["clients", "licenses", "equipment"].map(|t| backend.listener_count(t)) == before)
        .await;
}

#[tokio::test(start_paused = true)]
async fn module_gc_evicts_idle_entries() {
    let mut config = fast_config();
    config.cache = config.cache.with_gc_window(Duration::from_secs(60));
    let fx = Fixture::build(InMemoryBackend::new(), config);
    let cache = fx.module.cached().cache().clone();
    let cancel = CancellationToken::new();
    let gc = fx.module.start_gc(cancel.clone());

    let client = fx.module.client();
    client
        .list_licenses(&admin(), &LicenseFilter::default(), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(cache.len(), 1);

    // The sweep at 30s sees a young entry; the one at 60s evicts it.
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(cache.len(), 1);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(cache.is_empty());

    cancel.cancel();
    gc.await.unwrap();
}
