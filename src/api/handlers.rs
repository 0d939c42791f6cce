//! Route handlers.
//!
//! Public:
//! GET  /health
//! GET  /public/organizations
//! GET  /public/organizations/aggregates
//! GET  /public/organizations/:id
//! GET  /public/taxonomies
//!
//! Admin (bearer token):
//! GET|POST          /organizations
//! GET               /organizations/aggregates
//! GET|PUT|DELETE    /organizations/:id
//! POST              /organizations/:id/{review,publish,archive,reject,geocode}
//! PATCH|POST        /organizations/:id/coordinates

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::error::AppError;
use crate::auth::Principal;
use crate::error::RegistryError;
use crate::models::{AggregatesResponse, GroupedTaxonomies, Organization, OrganizationStatus};
use crate::service::{DeleteOutcome, OrganizationService};

type Service = Extension<Arc<OrganizationService>>;
type Params = Query<HashMap<String, String>>;

/// Body rejections (malformed JSON, unknown fields) are plain invalid input.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError(RegistryError::invalid(rejection.body_text())))
}

pub async fn health() -> &'static str {
    "OK"
}

// ── Public ──

pub async fn list_public(
    Extension(service): Service,
    Query(params): Params,
) -> Result<Json<Vec<Organization>>, AppError> {
    Ok(Json(service.list_published(&params).await?))
}

pub async fn public_aggregates(
    Extension(service): Service,
    Query(params): Params,
) -> Result<Json<AggregatesResponse>, AppError> {
    Ok(Json(service.public_aggregates(&params).await?))
}

pub async fn get_public(
    Extension(service): Service,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.get_published(&id).await?))
}

pub async fn taxonomies(Extension(service): Service) -> Result<Json<GroupedTaxonomies>, AppError> {
    Ok(Json(service.taxonomies().await?))
}

// ── Admin ──

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Query(params): Params,
) -> Result<Json<Vec<Organization>>, AppError> {
    Ok(Json(service.list(&principal, &params).await?))
}

pub async fn aggregates(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Query(params): Params,
) -> Result<Json<AggregatesResponse>, AppError> {
    Ok(Json(service.aggregates(&principal, &params).await?))
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    payload: Result<Json<Organization>, JsonRejection>,
) -> Result<(StatusCode, Json<Organization>), AppError> {
    let org = service.create(&principal, body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(org)))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.get(&principal, &id).await?))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
    payload: Result<Json<Organization>, JsonRejection>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.update(&principal, &id, body(payload)?).await?))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
    Query(params): Params,
) -> Result<Response, AppError> {
    let force = params.get("force").map(String::as_str) == Some("true");
    let response = match service.delete(&principal, &id, force).await? {
        DeleteOutcome::Deleted => StatusCode::NO_CONTENT.into_response(),
        DeleteOutcome::Archived => (
            StatusCode::OK,
            Json(json!({ "status": OrganizationStatus::Archived })),
        )
            .into_response(),
    };
    Ok(response)
}

pub async fn submit_for_review(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.submit_for_review(&principal, &id).await?))
}

pub async fn publish(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.publish(&principal, &id).await?))
}

pub async fn archive(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.archive(&principal, &id).await?))
}

pub async fn reject(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.reject(&principal, &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CoordinatesBody {
    pub lat: f64,
    pub lng: f64,
}

pub async fn set_coordinates(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
    payload: Result<Json<CoordinatesBody>, JsonRejection>,
) -> Result<Json<Organization>, AppError> {
    let coords = body(payload)?;
    Ok(Json(
        service
            .set_coordinates(&principal, &id, coords.lat, coords.lng)
            .await?,
    ))
}

pub async fn geocode(
    Extension(principal): Extension<Principal>,
    Extension(service): Service,
    Path(id): Path<String>,
) -> Result<Json<Organization>, AppError> {
    Ok(Json(service.geocode(&principal, &id).await?))
}
