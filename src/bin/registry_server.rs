//! registry_server: REST server for the organization registry.
//!
//! Configuration comes from `REGISTRY_CONFIG` (YAML) or the environment; see
//! `org_registry::config`.

use std::sync::Arc;

use anyhow::Context;
use org_registry::api::build_router;
use org_registry::audit::AuditSink;
use org_registry::auth::{Authorizer, MemorySessionStore};
use org_registry::clock::{Clock, SystemClock};
use org_registry::config::{ttl, RegistryConfig};
use org_registry::geocoding::NominatimGeocoder;
use org_registry::service::OrganizationService;
use org_registry::store::{PgAuditSink, PgOrganizationStore, PgTaxonomyStore};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,org_registry=debug,tower_http=debug".into()),
        )
        .init();

    let config = RegistryConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Connected to database");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let audit: Arc<dyn AuditSink> = Arc::new(PgAuditSink::new(pool.clone()));
    let geocoder = NominatimGeocoder::new(&config.geocoder, clock.clone())?;
    let taxonomy_ttl = ttl(config.taxonomy_ttl_secs).context("TAXONOMY_TTL_SECS")?;

    let service = Arc::new(
        OrganizationService::new(
            Arc::new(PgOrganizationStore::new(pool.clone())),
            Arc::new(PgTaxonomyStore::new(pool)),
            audit,
            Arc::new(geocoder),
            clock,
        )
        .with_taxonomy_ttl(taxonomy_ttl),
    );

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set; admin routes are unreachable without a session flow");
    }
    // Sessions are issued by an external login flow; until one is wired in this
    // store stays empty and only the static admin token is accepted.
    let authorizer = Arc::new(Authorizer::new(
        config.admin_token.clone(),
        Arc::new(MemorySessionStore::new()),
    ));

    let mut app = build_router(service, authorizer);
    if config.cors_allow_any {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("registry_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
