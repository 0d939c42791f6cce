//! Authorization collaborator: who is calling, and may they mutate.
//!
//! The core only ever sees a resolved [`Principal`]. Credentials are either the
//! pre-shared admin token or a session token issued elsewhere and looked up in a
//! [`SessionStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::error::{RegistryError, Result};

pub const ROLE_ADMIN: &str = "admin";
/// Actor recorded when the system acts on a caller's behalf (forced archive on delete).
pub const SYSTEM_DELETE_ACTOR: &str = "system/delete-request";
/// Actor for the pre-shared admin credential.
pub const STATIC_ADMIN_ACTOR: &str = "admin-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub actor_id: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(actor_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            roles,
        }
    }

    pub fn admin(actor_id: impl Into<String>) -> Self {
        Self::new(actor_id, vec![ROLE_ADMIN.to_string()])
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(RegistryError::Forbidden(format!(
                "{} is not an admin",
                self.actor_id
            )))
        }
    }
}

// ── Sessions ──

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn lookup(&self, token: &str) -> anyhow::Result<Option<Principal>>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Principal>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session and return its bearer token.
    pub async fn issue(&self, principal: Principal) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), principal);
        token
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn lookup(&self, token: &str) -> anyhow::Result<Option<Principal>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}

// ── Authorizer ──

pub struct Authorizer {
    admin_token: Option<String>,
    sessions: Arc<dyn SessionStore>,
}

impl Authorizer {
    pub fn new(admin_token: Option<String>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            admin_token: admin_token.filter(|t| !t.is_empty()),
            sessions,
        }
    }

    /// Resolve an `Authorization` header value to an admin principal.
    pub async fn authorize(&self, header: Option<&str>) -> Result<Principal> {
        let token = bearer_token(header)
            .ok_or_else(|| RegistryError::Unauthorized("missing bearer token".into()))?;

        if self.admin_token.as_deref() == Some(token) {
            return Ok(Principal::admin(STATIC_ADMIN_ACTOR));
        }

        let principal = self
            .sessions
            .lookup(token)
            .await?
            .ok_or_else(|| {
                warn!("rejected unknown bearer token");
                RegistryError::Unauthorized("unknown token".into())
            })?;

        principal.require_admin().inspect_err(|_| {
            warn!(actor = %principal.actor_id, "rejected non-admin principal");
        })?;
        Ok(principal)
    }
}

/// `Bearer <token>`, scheme case-insensitive.
fn bearer_token(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn authorizer() -> (Authorizer, String, String) {
        let sessions = Arc::new(MemorySessionStore::new());
        let admin = sessions.issue(Principal::admin("maria")).await;
        let viewer = sessions
            .issue(Principal::new("pedro", vec!["viewer".into()]))
            .await;
        (
            Authorizer::new(Some("s3cret".into()), sessions),
            admin,
            viewer,
        )
    }

    #[tokio::test]
    async fn static_token_is_admin() {
        let (auth, _, _) = authorizer().await;
        let p = auth.authorize(Some("Bearer s3cret")).await.unwrap();
        assert!(p.is_admin());
        assert_eq!(p.actor_id, STATIC_ADMIN_ACTOR);

        let p = auth.authorize(Some("bearer s3cret")).await.unwrap();
        assert!(p.is_admin());
    }

    #[tokio::test]
    async fn session_admin_and_viewer() {
        let (auth, admin, viewer) = authorizer().await;
        let p = auth
            .authorize(Some(&format!("Bearer {}", admin)))
            .await
            .unwrap();
        assert_eq!(p.actor_id, "maria");

        let err = auth
            .authorize(Some(&format!("Bearer {}", viewer)))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_or_malformed_header() {
        let (auth, _, _) = authorizer().await;
        for header in [None, Some(""), Some("s3cret"), Some("Basic s3cret"), Some("Bearer a b")] {
            let err = auth.authorize(header).await.unwrap_err();
            assert!(matches!(err, RegistryError::Unauthorized(_)), "{:?}", header);
        }
        let err = auth.authorize(Some("Bearer nope")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn revoked_session_is_rejected() {
        let sessions = Arc::new(MemorySessionStore::new());
        let token = sessions.issue(Principal::admin("maria")).await;
        let auth = Authorizer::new(None, sessions.clone());
        assert!(auth.authorize(Some(&format!("Bearer {}", token))).await.is_ok());

        assert!(sessions.revoke(&token).await);
        assert!(auth.authorize(Some(&format!("Bearer {}", token))).await.is_err());
    }

    #[tokio::test]
    async fn empty_static_token_is_disabled() {
        let auth = Authorizer::new(Some(String::new()), Arc::new(MemorySessionStore::new()));
        assert!(auth.authorize(Some("Bearer ")).await.is_err());
    }

    #[test]
    fn require_admin_is_forbidden_for_others() {
        let p = Principal::new("pedro", vec![]);
        assert!(matches!(p.require_admin(), Err(RegistryError::Forbidden(_))));
        assert!(Principal::admin("maria").require_admin().is_ok());
    }
}
