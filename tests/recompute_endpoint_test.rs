use agropulse::api::{self, AppState};
use agropulse::config::Config;
use agropulse::datasource::{CatalogEntry, MockArchive, PriceArchive};
use agropulse::db::init_db;
use agropulse::domain::{Decimal, RawObservation};
use agropulse::orchestration::{CatalogSync, SignalRunner};
use agropulse::Repository;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

const TOKEN: &str = "test-secret";

fn dec(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn test_config(db_path: String) -> Config {
    Config {
        port: 0,
        database_path: db_path,
        fpma_api_url: "http://example.invalid".to_string(),
        recompute_token: TOKEN.to_string(),
        fpma_fetch_enabled: false,
    }
}

async fn setup_test_app(archive: MockArchive) -> (axum::Router, Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();

    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let archive: Arc<dyn PriceArchive> = Arc::new(archive);

    let config = test_config(db_path);
    let runner = Arc::new(SignalRunner::new(
        repo.clone(),
        archive.clone(),
        config.clone(),
    ));
    let catalog = Arc::new(CatalogSync::new(repo.clone(), archive));
    let state = AppState::new(repo.clone(), config, runner, catalog);

    (api::create_router(state), repo, temp_dir)
}

/// Two AZN observations: one today, one 27 days old, so the month window
/// always has a reference point regardless of the wall clock.
async fn seed_observations(repo: &Repository) {
    repo.upsert_currency("AZN", &dec("1.7")).await.unwrap();
    let today = Utc::now().date_naive();
    let cases = [
        (today, "1.87"),
        (today - Duration::days(27), "1.00"),
    ];
    for (date, price) in cases {
        let obs = RawObservation::parse(
            "ministry",
            &date.format("%Y-%m-%d").to_string(),
            price,
            "AZN",
            "kg",
            Some(1),
            None,
            Some(10),
            Some(100),
            None,
        )
        .unwrap();
        repo.insert_observation(&obs).await.unwrap();
    }
}

fn post(uri: &str, auth: Option<&str>) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::builder().method("POST").uri(uri);
    if let Some(token) = auth {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(axum::body::Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let (app, _repo, _temp) = setup_test_app(MockArchive::new()).await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn recompute_requires_bearer_token() {
    let (app, _repo, _temp) = setup_test_app(MockArchive::new()).await;

    let response = app
        .clone()
        .oneshot(post("/v1/signals/recompute", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post("/v1/signals/recompute", Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn recompute_runs_and_reports_summary() {
    let (app, repo, _temp) = setup_test_app(MockArchive::new()).await;
    seed_observations(&repo).await;

    let response = app
        .clone()
        .oneshot(post("/v1/signals/recompute", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let summary = body_json(response).await;
    assert_eq!(summary["success"], true);
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["created"], 1);
    assert_eq!(summary["updated"], 0);
    assert_eq!(summary["errored"], 0);

    // A second trigger updates the same record.
    let response = app
        .oneshot(post("/v1/signals/recompute", Some(TOKEN)))
        .await
        .unwrap();
    let summary = body_json(response).await;
    assert_eq!(summary["created"], 0);
    assert_eq!(summary["updated"], 1);
}

#[tokio::test]
async fn signals_endpoint_returns_computed_rows() {
    let (app, repo, _temp) = setup_test_app(MockArchive::new()).await;
    seed_observations(&repo).await;

    app.clone()
        .oneshot(post("/v1/signals/recompute", Some(TOKEN)))
        .await
        .unwrap();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/v1/signals?source=ministry")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rows = body_json(response).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["productId"], 1);
    assert_eq!(row["currentPrice"], "1.1");
    assert_eq!(row["monthAgoPrice"], "0.588");
    assert_eq!(row["mom"], "87.07");
    assert_eq!(row["momStatus"], "increased");
    assert_eq!(row["yearStatus"], "stable");
    assert_eq!(row["dataSource"], "ministry");
}

#[tokio::test]
async fn signals_endpoint_rejects_unknown_source() {
    let (app, _repo, _temp) = setup_test_app(MockArchive::new()).await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/v1/signals?source=carrier-pigeon")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_sync_endpoint_links_products() {
    let archive = MockArchive::new().with_entry(CatalogEntry {
        series_id: "s1".to_string(),
        commodity_name: "Dessert apples".to_string(),
        country_iso3: "AZE".to_string(),
        market_name: "Baku".to_string(),
        price_stage: Some("retail".to_string()),
        currency: "AZN".to_string(),
        unit: "kg".to_string(),
    });
    let (app, repo, _temp) = setup_test_app(archive).await;
    repo.insert_product("alma", Some("Apple")).await.unwrap();

    let response = app
        .clone()
        .oneshot(post("/v1/catalog/sync", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let summary = body_json(response).await;
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["matched"], 1);
    assert_eq!(summary["unmatched"], 0);

    // Re-running reproduces the same outcome.
    let response = app
        .oneshot(post("/v1/catalog/sync", Some(TOKEN)))
        .await
        .unwrap();
    let summary = body_json(response).await;
    assert_eq!(summary["matched"], 1);
}

#[tokio::test]
async fn catalog_sync_failure_surfaces_as_error_status() {
    let (app, _repo, _temp) = setup_test_app(MockArchive::new().with_catalog_failure()).await;

    let response = app
        .oneshot(post("/v1/catalog/sync", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("catalog fetch failed"));
}
