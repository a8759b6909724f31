use axum::http::{header, request::Builder, StatusCode};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::dto::AuthResponse;
use crate::auth::repo_types::Role;
use crate::client::storage::{Session, SessionStorage};

/// Outcome of gating a client route on the stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Allow,
    RedirectToLogin,
    RedirectHome,
}

#[derive(Deserialize)]
struct RoleClaim {
    role: Role,
}

/// Reads the role claim without checking the signature. Only fit for UI
/// decisions; the server re-verifies every request.
pub fn unverified_role(token: &str) -> Option<Role> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<RoleClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims.role)
        .map_err(|e| debug!(error = %e, "stored token is not decodable"))
        .ok()
}

/// Client-side session, passed explicitly to whatever builds requests.
pub struct SessionState<S: SessionStorage> {
    storage: S,
    current: Option<Session>,
}

impl<S: SessionStorage> SessionState<S> {
    /// Picks up a session persisted by an earlier run.
    pub fn restore(storage: S) -> anyhow::Result<Self> {
        let current = storage.load()?;
        Ok(Self { storage, current })
    }

    /// Remembers token, role and id from a login or registration response.
    pub fn establish(&mut self, res: &AuthResponse) -> anyhow::Result<()> {
        let session = Session {
            token: res.token.clone(),
            role: res.user.role,
            user_id: res.user.id,
        };
        self.storage.save(&session)?;
        info!(user_id = %session.user_id, role = %session.role, "session established");
        self.current = Some(session);
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.as_ref().is_some_and(|s| !s.token.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|s| s.user_id)
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        self.token()
            .and_then(unverified_role)
            .is_some_and(|role| allowed.contains(&role))
    }

    pub fn route_access(&self, allowed: &[Role]) -> RouteAccess {
        if !self.is_authenticated() {
            RouteAccess::RedirectToLogin
        } else if !self.has_role(allowed) {
            RouteAccess::RedirectHome
        } else {
            RouteAccess::Allow
        }
    }

    /// Adds the bearer header when a session exists.
    pub fn authorize(&self, builder: Builder) -> Builder {
        match self.token() {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// A 401 means the server no longer accepts the session. Returns whether
    /// the session was ended.
    pub fn observe_status(&mut self, status: StatusCode) -> anyhow::Result<bool> {
        if status == StatusCode::UNAUTHORIZED && self.current.is_some() {
            self.logout()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Drops token, role and id together. The only way a session ends.
    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.storage.clear()?;
        if let Some(old) = self.current.take() {
            info!(user_id = %old.user_id, "session cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};

    use super::*;
    use crate::auth::dto::PublicUser;
    use crate::auth::jwt::JwtKeys;
    use crate::client::storage::{FileSessionStorage, MemorySessionStorage};
    use crate::config::JwtConfig;

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "server-only".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 5,
        })
    }

    fn response(role: Role) -> AuthResponse {
        let id = Uuid::new_v4();
        AuthResponse {
            token: keys().issue(id, role).unwrap(),
            user: PublicUser {
                id,
                role,
                name: "A".into(),
            },
        }
    }

    #[test]
    fn fresh_session_is_anonymous() {
        let session = SessionState::restore(MemorySessionStorage::new()).unwrap();
        assert!(!session.is_authenticated());
        assert!(!session.has_role(&[Role::User, Role::Admin]));
        assert_eq!(session.route_access(&[Role::User]), RouteAccess::RedirectToLogin);
    }

    #[test]
    fn role_gating_reads_token_claim() {
        let mut session = SessionState::restore(MemorySessionStorage::new()).unwrap();
        session.establish(&response(Role::User)).unwrap();

        assert!(session.is_authenticated());
        assert!(session.has_role(&[Role::User, Role::Admin]));
        assert!(!session.has_role(&[Role::Admin]));
        assert_eq!(session.route_access(&[Role::Admin]), RouteAccess::RedirectHome);
        assert_eq!(session.route_access(&[Role::User]), RouteAccess::Allow);
    }

    #[test]
    fn unverified_role_ignores_signature_but_not_garbage() {
        let res = response(Role::Admin);
        let mut parts: Vec<&str> = res.token.split('.').collect();
        parts[2] = "forged";
        assert_eq!(unverified_role(&parts.join(".")), Some(Role::Admin));
        assert_eq!(unverified_role("garbage"), None);
    }

    #[test]
    fn authorize_attaches_bearer_only_when_logged_in() {
        let mut session = SessionState::restore(MemorySessionStorage::new()).unwrap();
        let req: Request<Body> = session
            .authorize(Request::builder().uri("/api/resumes"))
            .body(Body::empty())
            .unwrap();
        assert!(req.headers().get(header::AUTHORIZATION).is_none());

        let res = response(Role::User);
        session.establish(&res).unwrap();
        let req: Request<Body> = session
            .authorize(Request::builder().uri("/api/resumes"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            req.headers()[header::AUTHORIZATION],
            format!("Bearer {}", res.token).as_str()
        );
    }

    #[test]
    fn logout_clears_everything_together() {
        let path = std::env::temp_dir().join(format!("resumed-session-{}.json", Uuid::new_v4()));
        let mut session = SessionState::restore(FileSessionStorage::new(&path)).unwrap();
        let res = response(Role::Admin);
        session.establish(&res).unwrap();

        let restored = SessionState::restore(FileSessionStorage::new(&path)).unwrap();
        assert_eq!(restored.token(), Some(res.token.as_str()));
        assert_eq!(restored.user_id(), Some(res.user.id));

        session.logout().unwrap();
        assert!(session.token().is_none());
        assert!(session.user_id().is_none());
        assert!(!session.has_role(&[Role::Admin]));

        let restored = SessionState::restore(FileSessionStorage::new(&path)).unwrap();
        assert!(!restored.is_authenticated());
        assert!(restored.user_id().is_none());
    }

    #[test]
    fn unauthorized_response_ends_session() {
        let mut session = SessionState::restore(MemorySessionStorage::new()).unwrap();
        session.establish(&response(Role::User)).unwrap();

        assert!(!session.observe_status(StatusCode::FORBIDDEN).unwrap());
        assert!(session.is_authenticated());

        assert!(session.observe_status(StatusCode::UNAUTHORIZED).unwrap());
        assert!(!session.is_authenticated());
        assert!(!session.observe_status(StatusCode::UNAUTHORIZED).unwrap());
    }
}
