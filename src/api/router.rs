//! Router construction for the registry server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::middleware::require_admin;
use crate::auth::Authorizer;
use crate::service::OrganizationService;

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<OrganizationService>, authorizer: Arc<Authorizer>) -> Router {
    // Routes that require an admin principal
    let protected = Router::new()
        .route(
            "/organizations",
            get(handlers::list).post(handlers::create),
        )
        .route("/organizations/aggregates", get(handlers::aggregates))
        .route(
            "/organizations/:id",
            get(handlers::get)
                .put(handlers::update)
                .delete(handlers::delete),
        )
        .route(
            "/organizations/:id/review",
            post(handlers::submit_for_review),
        )
        .route("/organizations/:id/publish", post(handlers::publish))
        .route("/organizations/:id/archive", post(handlers::archive))
        .route("/organizations/:id/reject", post(handlers::reject))
        .route("/organizations/:id/geocode", post(handlers::geocode))
        .route(
            "/organizations/:id/coordinates",
            post(handlers::set_coordinates).patch(handlers::set_coordinates),
        )
        .layer(axum_mw::from_fn(require_admin))
        .layer(Extension(authorizer));

    // Public routes (no auth)
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/public/organizations", get(handlers::list_public))
        .route(
            "/public/organizations/aggregates",
            get(handlers::public_aggregates),
        )
        .route("/public/organizations/:id", get(handlers::get_public))
        .route("/public/taxonomies", get(handlers::taxonomies));

    // Combine and add shared state
    public.merge(protected).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(Extension(service)),
    )
}
