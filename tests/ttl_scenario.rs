//! End-to-end TTL behaviour against the real clock.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use rttp_cache::{
    Request, Response, StatusCode,
    cache::{Adapter, CacheConfig, CacheMiddleware, CachedResponse, MemoryAdapter, canonical_key},
    context::Context,
    middleware::Pipeline,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn get(target: &str) -> Request {
    let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    Request::parse(raw.as_bytes()).unwrap().0
}

#[tokio::test]
async fn entry_expires_after_ttl() {
    init_tracing();

    let adapter = Arc::new(MemoryAdapter::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let endpoint_calls = Arc::clone(&calls);

    let cache = CacheMiddleware::new(
        CacheConfig::new()
            .with_adapter(adapter.clone())
            .with_ttl(Duration::from_secs(1)),
    )
    .unwrap();
    let pipeline = Pipeline::new(move |_ctx: Context| {
        endpoint_calls.fetch_add(1, Ordering::SeqCst);
        async { Response::new(StatusCode::Ok).body("hello") }
    })
    .layer(cache);

    // t = 0s
    let resp = pipeline.handle(get("/a?x=1")).await;
    assert_eq!(resp.status(), StatusCode::Ok);
    assert_eq!(resp.payload(), b"hello");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // t = 0.5s
    tokio::time::sleep(Duration::from_millis(500)).await;
    let resp = pipeline.handle(get("/a?x=1")).await;
    assert_eq!(resp.status(), StatusCode::Found);
    assert_eq!(resp.payload(), b"hello");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // t = 1.5s
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let resp = pipeline.handle(get("/a?x=1")).await;
    assert_eq!(resp.status(), StatusCode::Ok);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let raw = adapter
        .get(canonical_key("http://localhost/a?x=1"))
        .await
        .unwrap();
    let entry = CachedResponse::decode(&raw).unwrap();
    assert_eq!(entry.frequency, 1);
    assert!(entry.is_fresh(std::time::SystemTime::now()));
}

#[tokio::test]
async fn concurrent_requests_share_one_adapter() {
    init_tracing();

    let adapter = Arc::new(MemoryAdapter::new());
    let cache = Arc::new(
        CacheMiddleware::new(
            CacheConfig::new()
                .with_adapter(adapter.clone())
                .with_ttl(Duration::from_secs(30)),
        )
        .unwrap(),
    );
    let pipeline = Pipeline::new(|ctx: Context| async move {
        Response::new(StatusCode::Ok).body(ctx.request().path().to_owned())
    })
    .layer_shared(cache);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let pipeline = pipeline.clone();
        tasks.push(tokio::spawn(async move {
            pipeline.handle(get(&format!("/item/{}", i % 4))).await
        }));
    }
    for task in tasks {
        let resp = task.await.unwrap();
        assert!(resp.status() == StatusCode::Ok || resp.status() == StatusCode::Found);
    }

    assert_eq!(adapter.len().await, 4);
}
