//! Tests for tokio spawner utilities

use prometheus_throttle::core::Spawn;
use prometheus_throttle::runtime::tokio_spawner::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());
    assert!(!spawner.owns_runtime());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_owned_runtime_outlives_builder_scope() {
    let spawner = TokioSpawner::with_worker_threads(2).unwrap();
    assert!(spawner.owns_runtime());

    let (tx, rx) = std::sync::mpsc::channel();
    spawner.spawn(async move {
        tx.send("ran").unwrap();
    });

    assert_eq!(rx.recv().unwrap(), "ran");
}

#[test]
fn test_multi_thread_spawner_clones_share_runtime() {
    let spawner = TokioSpawner::multi_thread().unwrap();
    let clone = spawner.clone();
    drop(spawner);

    let (tx, rx) = std::sync::mpsc::channel();
    clone.spawn(async move {
        tokio::task::yield_now().await;
        tx.send(7).unwrap();
    });

    assert_eq!(rx.recv().unwrap(), 7);
}
