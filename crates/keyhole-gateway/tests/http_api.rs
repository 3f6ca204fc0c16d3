//! End-to-end tests driving the gateway router as a tower service, backed
//! by the in-memory repository.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use keyhole_gateway::identity::OWNER_COOKIE;
use keyhole_gateway::model::{BatchShortenResult, ShortenResponse, StatsResponse, UserUrl};
use keyhole_gateway::{App, AppState};
use keyhole_generator::SeqGenerator;
use keyhole_shortener::{DeletionPipeline, ShortenerService};
use keyhole_storage::MemoryRepository;
use keyhole_core::TrustedSubnet;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BASE: &str = "http://localhost:8080";

fn router() -> Router {
    let (router, _pipeline) = router_with_pipeline(None);
    router
}

fn router_with_pipeline(
    trusted_subnet: Option<TrustedSubnet>,
) -> (Router, DeletionPipeline<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::new());
    let (service, pipeline) =
        ShortenerService::new(repository, Arc::new(SeqGenerator::new()), BASE);
    (
        App::router(AppState::new(service, trusted_subnet)),
        pipeline,
    )
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

fn text_request(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

/// The owner cookie the response set, as a `Cookie:` header value.
fn issued_cookie(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("response should set the owner cookie")
        .to_str()
        .unwrap();
    set_cookie
        .split(';')
        .next()
        .unwrap()
        .to_owned()
}

#[tokio::test]
async fn shorten_text_round_trip() {
    let app = router();

    let response = app
        .clone()
        .oneshot(text_request("/", "https://example.com/a"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let short_url = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(short_url, format!("{BASE}/AAAAAAAA"));

    let response = app
        .oneshot(Request::get("/AAAAAAAA").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "https://example.com/a"
    );
}

#[tokio::test]
async fn duplicate_shorten_answers_conflict_with_existing_url() {
    let app = router();

    let first = app
        .clone()
        .oneshot(text_request("/", "https://example.com/a"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_url = body_bytes(first).await;

    let second = app
        .oneshot(text_request("/", "https://example.com/a"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_bytes(second).await, first_url);
}

#[tokio::test]
async fn empty_body_is_a_bad_request() {
    let app = router();

    let response = app
        .clone()
        .oneshot(text_request("/", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request("/api/shorten", r#"{"url": ""}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn shorten_json_envelope() {
    let app = router();

    let response = app
        .oneshot(json_request(
            "/api/shorten",
            r#"{"url": "https://example.com/a"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: ShortenResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.result, format!("{BASE}/AAAAAAAA"));
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let app = router();

    let response = app
        .oneshot(Request::get("/ZZZZZZZZ").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn batch_shorten_keeps_correlation_ids() {
    let app = router();

    let payload = r#"[
        {"correlation_id": "id-1", "original_url": "https://a.com"},
        {"correlation_id": "id-2", "original_url": "https://b.com"}
    ]"#;
    let response = app
        .oneshot(json_request("/api/shorten/batch", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let mut results: Vec<BatchShortenResult> =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    results.sort_by(|a, b| a.correlation_id.cmp(&b.correlation_id));
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].correlation_id, "id-1");
    assert_eq!(results[1].correlation_id, "id-2");
    assert_ne!(results[0].short_url, results[1].short_url);
}

#[tokio::test]
async fn first_response_issues_the_owner_cookie() {
    let app = router();

    let response = app
        .clone()
        .oneshot(text_request("/", "https://example.com/a"))
        .await
        .unwrap();
    let cookie = issued_cookie(&response);
    assert!(cookie.starts_with(&format!("{OWNER_COOKIE}=")));

    // A request that presents the cookie is not issued another one.
    let response = app
        .oneshot(
            Request::get("/api/user/urls")
                .header(COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn user_urls_are_scoped_by_cookie() {
    let app = router();

    let response = app
        .clone()
        .oneshot(text_request("/", "https://example.com/a"))
        .await
        .unwrap();
    let owner_cookie = issued_cookie(&response);

    // The creating owner sees the mapping.
    let response = app
        .clone()
        .oneshot(
            Request::get("/api/user/urls")
                .header(COOKIE, owner_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let urls: Vec<UserUrl> = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].original_url, "https://example.com/a");

    // A caller without the cookie gets a fresh identity and owns nothing.
    let response = app
        .oneshot(Request::get("/api/user/urls").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn delete_is_accepted_then_applied_by_the_pipeline() {
    let (app, pipeline) = router_with_pipeline(None);
    let handle = tokio::spawn(pipeline.with_interval(Duration::from_millis(20)).run());

    let response = app
        .clone()
        .oneshot(text_request("/", "https://example.com/a"))
        .await
        .unwrap();
    let owner_cookie = issued_cookie(&response);

    let response = app
        .clone()
        .oneshot(
            Request::delete("/api/user/urls")
                .header(CONTENT_TYPE, "application/json")
                .header(COOKIE, owner_cookie)
                .body(Body::from(r#"["AAAAAAAA"]"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(120)).await;
    let response = app
        .clone()
        .oneshot(Request::get("/AAAAAAAA").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GONE);

    drop(app);
    handle.await.unwrap();
}

#[tokio::test]
async fn stats_requires_the_trusted_subnet() {
    let subnet = TrustedSubnet::parse("192.168.0.0/24").unwrap();
    let (app, _pipeline) = router_with_pipeline(Some(subnet));

    app.clone()
        .oneshot(text_request("/", "https://example.com/a"))
        .await
        .unwrap();

    // Inside the subnet.
    let response = app
        .clone()
        .oneshot(
            Request::get("/api/internal/stats")
                .header("x-real-ip", "192.168.0.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats: StatsResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(stats.urls, 1);
    assert_eq!(stats.users, 1);

    // Outside the subnet.
    let response = app
        .clone()
        .oneshot(
            Request::get("/api/internal/stats")
                .header("x-real-ip", "10.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // No header at all.
    let response = app
        .oneshot(Request::get("/api/internal/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stats_without_a_configured_subnet_denies_everyone() {
    let app = router();

    let response = app
        .oneshot(
            Request::get("/api/internal/stats")
                .header("x-real-ip", "127.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ping_is_ok() {
    let app = router();

    let response = app
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
