use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;

use crate::api::error::AppError;
use crate::auth::Authorizer;

/// Resolve the bearer token to an admin `Principal` and attach it to the request.
pub async fn require_admin(
    Extension(authorizer): Extension<Arc<Authorizer>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let principal = authorizer.authorize(header.as_deref()).await?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
