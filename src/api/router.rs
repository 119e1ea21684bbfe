//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum
//! server. Owner-scoped routes are nested under `/api/` behind the
//! bearer-auth middleware; registration and the caretaker share view
//! are public.

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Extension, Router};
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the application router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // Protected routes — bearer auth injects UserContext.
    //
    // Extension must be outermost so the middleware can access
    // ApiContext; .with_state() converts Router<ApiContext> → Router<()>
    // so the from_fn layer composes.
    let protected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/medicines",
            get(endpoints::medicines::list).post(endpoints::medicines::create),
        )
        .route("/medicines/batch", post(endpoints::medicines::create_batch))
        .route("/medicines/:id", delete(endpoints::medicines::remove))
        .route("/doses/today", get(endpoints::doses::today))
        .route("/doses/:id/action", post(endpoints::doses::action))
        .route("/doses/:id/confirm", post(endpoints::doses::confirm))
        .route("/adherence", get(endpoints::adherence::summary))
        .route("/extraction/analyze", post(endpoints::extraction::analyze))
        .route(
            "/profile",
            get(endpoints::profile::get).put(endpoints::profile::update),
        )
        .route(
            "/profile/weekly-report",
            post(endpoints::profile::send_weekly_report),
        )
        .route(
            "/shares",
            get(endpoints::share::list).post(endpoints::share::create),
        )
        .route("/shares/:id/revoke", post(endpoints::share::revoke))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(Extension(ctx.clone()));

    let public = Router::new()
        .route("/auth/register", post(endpoints::auth::register))
        .route("/share/:token", get(endpoints::share::view))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .merge(public)
        .layer(CorsLayer::permissive())
}
