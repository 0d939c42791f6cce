//! Error kinds for the organization registry.
//!
//! Every failure the core can produce is one of a small, closed set of kinds.
//! The HTTP boundary maps kinds to status codes through [`RegistryError::http_status`]
//! and never looks at the message text.

use thiserror::Error;

use crate::models::OrganizationStatus;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("taxonomies unavailable: {0}")]
    TaxonomyUnavailable(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("publish validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        from: OrganizationStatus,
        to: OrganizationStatus,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    ConflictRequiresForce(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("geocoding unavailable: {0}")]
    GeocodingUnavailable(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RegistryError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::TaxonomyUnavailable(_) => 503,
            Self::Invalid(_) => 400,
            Self::ValidationFailed(_) => 422,
            Self::InvalidTransition { .. } => 409,
            Self::NotFound(_) => 404,
            Self::ConflictRequiresForce(_) => 409,
            Self::AlreadyExists(_) => 409,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::GeocodingUnavailable(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaxonomyUnavailable(_) => "taxonomy_unavailable",
            Self::Invalid(_) => "invalid",
            Self::ValidationFailed(_) => "validation_failed",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound(_) => "not_found",
            Self::ConflictRequiresForce(_) => "conflict_requires_force",
            Self::AlreadyExists(_) => "already_exists",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::GeocodingUnavailable(_) => "geocoding_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    pub fn validation_failed(reason: impl Into<String>) -> Self {
        Self::ValidationFailed(reason.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── http_status: exhaustive variant coverage ──────────────────

    #[test]
    fn http_status_by_kind() {
        let cases: Vec<(RegistryError, u16)> = vec![
            (RegistryError::TaxonomyUnavailable("db".into()), 503),
            (RegistryError::invalid("x"), 400),
            (RegistryError::validation_failed("x"), 422),
            (
                RegistryError::InvalidTransition {
                    from: OrganizationStatus::Archived,
                    to: OrganizationStatus::Draft,
                },
                409,
            ),
            (RegistryError::not_found("acme"), 404),
            (RegistryError::ConflictRequiresForce("acme".into()), 409),
            (RegistryError::AlreadyExists("acme".into()), 409),
            (RegistryError::Unauthorized("x".into()), 401),
            (RegistryError::Forbidden("x".into()), 403),
            (RegistryError::GeocodingUnavailable("x".into()), 502),
            (RegistryError::Internal(anyhow::anyhow!("boom")), 500),
        ];
        for (err, status) in cases {
            assert_eq!(err.http_status(), status, "{}", err.kind());
        }
    }

    #[test]
    fn display_invalid_transition() {
        let e = RegistryError::InvalidTransition {
            from: OrganizationStatus::Draft,
            to: OrganizationStatus::Published,
        };
        assert_eq!(e.to_string(), "invalid transition DRAFT -> PUBLISHED");
    }

    #[test]
    fn display_not_found() {
        let e = RegistryError::not_found("acme-labs");
        assert_eq!(e.to_string(), "not found: acme-labs");
    }

    #[test]
    fn conflict_kind_is_distinct_from_invalid() {
        let conflict = RegistryError::ConflictRequiresForce("acme".into());
        let invalid = RegistryError::invalid("acme");
        assert_ne!(conflict.kind(), invalid.kind());
        assert_ne!(conflict.http_status(), invalid.http_status());
    }
}
