use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use keyhole_core::Repository;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    delete_user_urls, list_user_urls, ping, redirect, shorten_batch, shorten_json, shorten_text,
    stats,
};
use crate::identity::owner_identity;
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router<R: Repository>(state: AppState<R>) -> Router {
        Router::new()
            .route("/", post(shorten_text))
            .route("/{code}", get(redirect))
            .route("/ping", get(ping))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(shorten_json))
                    .route("/shorten/batch", post(shorten_batch))
                    .route(
                        "/user/urls",
                        get(list_user_urls).delete(delete_user_urls),
                    )
                    .route("/internal/stats", get(stats)),
            )
            .layer(middleware::from_fn(owner_identity))
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(RequestDecompressionLayer::new())
            .with_state(state)
    }
}
