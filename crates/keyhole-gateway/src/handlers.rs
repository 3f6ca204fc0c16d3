use crate::error::Result;
use crate::identity::OwnerId;
use crate::model::{
    BatchShortenEntry, BatchShortenResult, ShortenRequest, ShortenResponse, StatsResponse,
    UserUrl,
};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use keyhole_core::Repository;
use keyhole_shortener::ShortenOutcome;
use std::collections::HashMap;

/// `POST /` — plain-text body in, plain-text short URL out. Duplicate
/// submissions answer 409 with the existing short URL.
pub async fn shorten_text<R: Repository>(
    State(state): State<AppState<R>>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    body: String,
) -> Result<Response> {
    if body.is_empty() {
        return Ok(StatusCode::BAD_REQUEST.into_response());
    }
    let outcome = state.service.shorten(&body, &owner_id).await?;
    Ok((shorten_status(&outcome), outcome.short_url().to_owned()).into_response())
}

/// `POST /api/shorten` — same operation with a JSON envelope.
pub async fn shorten_json<R: Repository>(
    State(state): State<AppState<R>>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Json(request): Json<ShortenRequest>,
) -> Result<Response> {
    if request.url.is_empty() {
        return Ok(StatusCode::BAD_REQUEST.into_response());
    }
    let outcome = state.service.shorten(&request.url, &owner_id).await?;
    let body = Json(ShortenResponse {
        result: outcome.short_url().to_owned(),
    });
    Ok((shorten_status(&outcome), body).into_response())
}

fn shorten_status(outcome: &ShortenOutcome) -> StatusCode {
    if outcome.already_existed() {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// `POST /api/shorten/batch` — correlation ids in, short URLs out, keyed
/// the same way.
pub async fn shorten_batch<R: Repository>(
    State(state): State<AppState<R>>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Json(entries): Json<Vec<BatchShortenEntry>>,
) -> Result<Response> {
    if entries.is_empty() {
        return Ok(StatusCode::BAD_REQUEST.into_response());
    }
    let originals: HashMap<String, String> = entries
        .into_iter()
        .map(|entry| (entry.correlation_id, entry.original_url))
        .collect();
    let short_urls = state.service.shorten_batch(&originals, &owner_id).await?;

    let results: Vec<BatchShortenResult> = short_urls
        .into_iter()
        .map(|(correlation_id, short_url)| BatchShortenResult {
            correlation_id,
            short_url,
        })
        .collect();
    Ok((StatusCode::CREATED, Json(results)).into_response())
}

/// `GET /{code}` — 307 to the original URL; 404 for unknown codes, 410 for
/// deleted ones.
pub async fn redirect<R: Repository>(
    Path(code): Path<String>,
    State(state): State<AppState<R>>,
) -> Result<Response> {
    let original_url = state.service.resolve(&code).await?;
    Ok((
        StatusCode::TEMPORARY_REDIRECT,
        [(LOCATION, original_url)],
    )
        .into_response())
}

pub async fn ping<R: Repository>(State(state): State<AppState<R>>) -> Result<StatusCode> {
    state.service.ping().await?;
    Ok(StatusCode::OK)
}

/// `GET /api/user/urls` — the caller's mappings; 204 when there are none.
pub async fn list_user_urls<R: Repository>(
    State(state): State<AppState<R>>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
) -> Result<Response> {
    let owned = state.service.list_owned(&owner_id).await?;
    if owned.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let urls: Vec<UserUrl> = owned
        .into_iter()
        .map(|(short_url, original_url)| UserUrl {
            short_url,
            original_url,
        })
        .collect();
    Ok(Json(urls).into_response())
}

/// `DELETE /api/user/urls` — queues the soft deletes and answers 202; the
/// pipeline applies them on its next flush.
pub async fn delete_user_urls<R: Repository>(
    State(state): State<AppState<R>>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Json(codes): Json<Vec<String>>,
) -> Result<StatusCode> {
    state.service.request_deletion(&codes, &owner_id).await;
    Ok(StatusCode::ACCEPTED)
}

/// `GET /api/internal/stats` — usage counters, only for callers whose
/// `X-Real-IP` falls inside the trusted subnet. No subnet configured means
/// nobody is trusted.
pub async fn stats<R: Repository>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
) -> Result<Response> {
    let Some(subnet) = state.trusted_subnet else {
        return Ok(StatusCode::FORBIDDEN.into_response());
    };
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !subnet.contains_str(real_ip) {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let stats = state.service.stats().await?;
    Ok(Json(StatsResponse {
        urls: stats.urls,
        users: stats.users,
    })
    .into_response())
}
