use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;

use super::*;
use crate::chain::mock::{claimed_log, created_log, ScriptedProvider};
use crate::chain::{ChainProvider, LogFilter, ProviderError, RawLog};
use crate::config::Config;
use crate::reconcile::GLOBAL_POSITION;
use crate::storage::Stores;

const TOKEN: &str = "test-token";
const CLAIMER: &str = "0x2222222222222222222222222222222222222222";

fn app_with(provider: Arc<dyn ChainProvider>, stores: Stores, budget: Duration) -> Router {
    let config = Config::for_test();
    let pipeline = Pipeline::with_provider(&config, stores, provider).unwrap();
    router(AppState::new(
        Arc::new(pipeline),
        config.server.api_tokens,
        budget,
    ))
}

async fn seeded() -> (Router, Stores) {
    let provider = Arc::new(ScriptedProvider::new(203));
    provider.push_log(created_log("0x01", 0, 10, 1, 5_000_000_000_000_000_000)).await;
    provider.push_log(claimed_log("0x02", 0, 20, 1, CLAIMER, None)).await;
    let stores = Stores::memory();
    let app = app_with(provider, stores.clone(), Duration::from_secs(5));
    (app, stores)
}

fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

async fn json_body(resp: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let (app, _) = seeded().await;

    let req = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_rejected_without_side_effects() {
    let (app, stores) = seeded().await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/reconcile")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(resp).await;
    assert_eq!(json["error"], "unauthorized");
    assert!(json["traceId"].is_string());
    assert_eq!(stores.positions.get(GLOBAL_POSITION).await.unwrap(), None);
    assert_eq!(stores.events.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let (app, _) = seeded().await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/materialize")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_same_length_wrong_token_rejected() {
    let (app, stores) = seeded().await;
    let wrong = "x".repeat(TOKEN.len());

    let req = Request::builder()
        .method("POST")
        .uri("/api/reconcile")
        .header(CRON_SECRET_HEADER, wrong)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(stores.events.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_reconcile_returns_report() {
    let (app, stores) = seeded().await;

    let resp = app
        .oneshot(post("/api/reconcile").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["fromBlock"], 0);
    assert_eq!(json["toBlock"], 200);
    assert_eq!(json["eventsProcessed"], 2);
    assert_eq!(json["hasMore"], false);
    assert_eq!(stores.positions.get(GLOBAL_POSITION).await.unwrap(), Some(200));
}

#[tokio::test]
async fn test_reconcile_cron_secret_and_query_override() {
    let (app, _) = seeded().await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/reconcile?fromBlock=15")
        .header(CRON_SECRET_HEADER, TOKEN)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp).await;
    assert_eq!(json["fromBlock"], 15);
    assert_eq!(json["eventsProcessed"], 1);
}

#[tokio::test]
async fn test_reconcile_json_body_override() {
    let (app, _) = seeded().await;

    let req = post("/api/reconcile")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"fromBlock": 12}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["fromBlock"], 12);
}

#[tokio::test]
async fn test_reconcile_bad_body_is_400() {
    let (app, stores) = seeded().await;

    let req = post("/api/reconcile")
        .body(Body::from(r#"{"fromBlock": "soon"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stores.positions.get(GLOBAL_POSITION).await.unwrap(), None);
}

#[tokio::test]
async fn test_materialize_then_read_rollups() {
    let (app, _) = seeded().await;

    let resp = app
        .clone()
        .oneshot(post("/api/reconcile").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(post("/api/materialize").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let report = json_body(resp).await;
    assert_eq!(report["eventsProcessed"], 2);
    assert!(report["rollups"]["hourly"].as_u64().unwrap() >= 1);

    let resp = app
        .clone()
        .oneshot(get("/api/rollups/global").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let global = json_body(resp).await;
    assert_eq!(global["created"], "1");
    assert_eq!(global["claimed"], "1");
    assert_eq!(global["totalValue"], "5.00");
    assert_eq!(global["conversionRate"], "100.00");
}

#[tokio::test]
async fn test_missing_rollup_is_404() {
    let (app, _) = seeded().await;

    let resp = app
        .oneshot(
            get("/api/rollups/hourly/2020-01-01T00")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = json_body(resp).await;
    assert!(json["error"].as_str().unwrap().contains("no activity"));
}

#[tokio::test]
async fn test_unknown_rollup_kind_is_400() {
    let (app, _) = seeded().await;

    let resp = app
        .oneshot(get("/api/rollups/weekly/2024-01").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

/// Provider whose head lookup never finishes in time.
struct StalledProvider;

#[async_trait]
impl ChainProvider for StalledProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }

    async fn get_logs(&self, _filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_invocation_budget_enforced() {
    let stores = Stores::memory();
    let app = app_with(
        Arc::new(StalledProvider),
        stores.clone(),
        Duration::from_millis(50),
    );

    let resp = app
        .oneshot(post("/api/reconcile").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(stores.positions.get(GLOBAL_POSITION).await.unwrap(), None);
}

#[tokio::test]
async fn test_provider_failure_is_opaque_500() {
    struct DownProvider;

    #[async_trait]
    impl ChainProvider for DownProvider {
        async fn block_number(&self) -> Result<u64, ProviderError> {
            Err(ProviderError::Transport(
                "connect to http://secret-rpc.internal failed".to_string(),
            ))
        }

        async fn get_logs(&self, _filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError> {
            Ok(Vec::new())
        }
    }

    let app = app_with(
        Arc::new(DownProvider),
        Stores::memory(),
        Duration::from_secs(5),
    );

    let resp = app
        .oneshot(post("/api/reconcile").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(resp).await;
    assert_eq!(json["error"], "internal error");
    assert!(!json.to_string().contains("secret-rpc"));
}
