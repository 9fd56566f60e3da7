//! End-to-end tests against a live listener

use api::{create_router, serve, AppState, RateLimitConfig};
use data_validator::QueryValidator;
use inference_engine::{InferencePool, LexiconClassifier};
use serde_json::{json, Value};
use std::sync::Arc;
use storage::Repository;
use tokio::net::TcpListener;

async fn spawn_server(rate_limit: RateLimitConfig) -> (String, Arc<AppState>) {
    let repository = Repository::in_memory().await.unwrap();
    let state = Arc::new(AppState::new(
        repository,
        InferencePool::new(Arc::new(LexiconClassifier::new()), 4),
        QueryValidator::default(),
    ));
    let app = create_router(state.clone(), &rate_limit);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, app));

    (format!("http://{}", addr), state)
}

#[tokio::test]
async fn test_positive_query_end_to_end() {
    let (base, state) = spawn_server(RateLimitConfig::default()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/query", base))
        .json(&json!({"text": "Hey this project is pretty cool!"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["input_text"], "Hey this project is pretty cool!");
    assert_eq!(body["sentiment_label"], "POSITIVE");
    let score = body["sentiment_score"].as_f64().unwrap();
    assert!(score > 0.9 && score <= 1.0);

    let rows = state.repository.fetch_recent(None, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].input_text, "Hey this project is pretty cool!");
    assert_eq!(rows[0].label, "POSITIVE");
    assert_eq!(rows[0].score, score);
}

#[tokio::test]
async fn test_empty_query_end_to_end() {
    let (base, state) = spawn_server(RateLimitConfig::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&json!({"text": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(state.repository.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_queries_each_logged_once() {
    let (base, state) = spawn_server(RateLimitConfig::default()).await;
    let client = reqwest::Client::new();

    let requests = (0..16).map(|i| {
        let client = client.clone();
        let url = format!("{}/query", base);
        async move {
            client
                .post(url)
                .json(&json!({"text": format!("great idea number {}", i)}))
                .send()
                .await
                .unwrap()
                .status()
        }
    });
    let handles: Vec<_> = requests.map(tokio::spawn).collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    assert_eq!(state.repository.count(None).await.unwrap(), 16);
}

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let rate_limit = RateLimitConfig {
        enabled: true,
        per_second: 60,
        burst_size: 2,
    };
    let (base, state) = spawn_server(rate_limit).await;
    let client = reqwest::Client::new();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = client
            .post(format!("{}/query", base))
            .json(&json!({"text": "nice"}))
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, vec![200, 200, 429]);
    assert_eq!(state.repository.count(None).await.unwrap(), 2);

    // Health is not rate limited
    let health = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(health.status(), 200);
}
