//! API router.
//!
//! Composable `Router` with all endpoints under `/api/` plus the read-only
//! `/media/` object namespace. Receipt routes sit behind the bearer-token
//! auth middleware; middleware reads `ApiContext` from an `Extension` layer
//! while handlers use `State` (the `Extension` layer is outermost so the
//! middleware can see it).

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Transport-level body cap. Above the validator's 5 MiB image limit so the
/// validator owns the rejection reason, below anything pathological.
const UPLOAD_BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn app_router(ctx: ApiContext) -> Router {
    let protected = Router::new()
        .route(
            "/receipts",
            get(endpoints::receipts::list).post(endpoints::receipts::upload),
        )
        .route(
            "/receipts/:id",
            get(endpoints::receipts::detail).delete(endpoints::receipts::remove),
        )
        .with_state(ctx.clone())
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new().route("/health", get(endpoints::health::check));

    // Stored images must be fetchable by the extraction provider.
    let media = Router::new().nest_service("/media", ServeDir::new(ctx.store.root().clone()));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .merge(media)
        .layer(CorsLayer::permissive())
}
