//! Concurrent stress test for the container.
//!
//! Readers call `get` in a tight loop while a writer keeps changing the
//! fingerprint and running passes. Readers must always see a connection, and
//! every connection must be closed exactly once after `stop`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use relink_resource::ContainerBuilder;
use relink_resource::testing::{MockConnection, MockProvider, ScriptedProvider};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_readers_during_swaps() {
    let provider = Arc::new(ScriptedProvider::new("gen-0"));
    let container = Arc::new(
        ContainerBuilder::new()
            .provider("db", Arc::clone(&provider))
            .build_container(),
    );
    let cancel = CancellationToken::new();
    container.run(&cancel).await.unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicU64::new(0));
    let mut set = JoinSet::new();

    for _ in 0..50 {
        let container = Arc::clone(&container);
        let done = Arc::clone(&done);
        let reads = Arc::clone(&reads);
        set.spawn(async move {
            while !done.load(Ordering::SeqCst) {
                assert!(
                    container.get("db").is_some(),
                    "readers never observe an empty slot"
                );
                reads.fetch_add(1, Ordering::Relaxed);
                tokio::task::yield_now().await;
            }
        });
    }

    for generation in 1..=200 {
        provider.set_fingerprint(format!("gen-{generation}"));
        container.run(&cancel).await.unwrap();
        if generation % 20 == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
    done.store(true, Ordering::SeqCst);

    // Timeout as safety net against deadlock
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    while let Some(result) = tokio::time::timeout_at(deadline, set.join_next())
        .await
        .expect("stress test should not deadlock (30s timeout)")
    {
        result.expect("reader should not panic");
    }
    assert!(reads.load(Ordering::Relaxed) > 0);

    container.stop().await;

    let ledger = provider.ledger();
    assert_eq!(ledger.connections().len(), 201);
    assert_eq!(ledger.closed_total(), 201);
    assert!(ledger.connections().iter().all(|c| c.close_count() == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_concurrent_passes_over_many_names() {
    let providers: Vec<_> = (0..16)
        .map(|i| Arc::new(ScriptedProvider::new(format!("p{i}-0"))))
        .collect();
    let container = Arc::new(
        providers
            .iter()
            .enumerate()
            .fold(ContainerBuilder::new(), |builder, (i, p)| {
                builder.provider(format!("r{i}"), Arc::clone(p))
            })
            .build_container(),
    );
    let cancel = CancellationToken::new();

    let mut set = JoinSet::new();
    for round in 1..=10 {
        for (i, provider) in providers.iter().enumerate() {
            provider.set_fingerprint(format!("p{i}-{round}"));
        }
        for _ in 0..4 {
            let container = Arc::clone(&container);
            let cancel = cancel.clone();
            set.spawn(async move { container.run(&cancel).await });
        }
        while let Some(result) = set.join_next().await {
            result.expect("pass should not panic").unwrap();
        }
    }

    container.stop().await;
    for provider in &providers {
        let ledger = provider.ledger();
        assert_eq!(ledger.peak_in_flight(), 1, "one mutator per resource");
        assert!(ledger.connections().iter().all(|c| c.close_count() == 1));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_overlapping_passes_always_rebuild() {
    let provider = Arc::new(MockProvider::new(Duration::from_millis(5)));
    let container = Arc::new(
        ContainerBuilder::new()
            .provider("db", Arc::clone(&provider))
            .build_container(),
    );
    let cancel = CancellationToken::new();

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let container = Arc::clone(&container);
        let cancel = cancel.clone();
        set.spawn(async move {
            for _ in 0..5 {
                container.run(&cancel).await.unwrap();
            }
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("pass should not panic");
    }

    let ledger = provider.ledger();
    assert_eq!(ledger.peak_in_flight(), 1, "one mutator per resource");
    assert_eq!(ledger.connections().len(), 40);

    let live = container
        .get("db")
        .and_then(|handle| handle.downcast::<MockConnection>())
        .expect("a connection is published");
    assert_eq!(
        container.state("db").map(|state| state.fingerprint),
        Some(live.fingerprint().to_string())
    );

    // Retirement is detached; wait for the stale connections to be closed.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while ledger.closed_total() < 39 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "stale connections should be retired"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    for conn in ledger.connections() {
        let expected = u32::from(!Arc::ptr_eq(&conn, &live));
        assert_eq!(conn.close_count(), expected, "connection {}", conn.id());
    }

    container.stop().await;
    assert_eq!(live.close_count(), 1);
}
