use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuditLogger, SecurityError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Operator,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Default)]
pub struct SessionMetrics {
    pub sessions_started: AtomicU64,
    pub sessions_ended: AtomicU64,
    pub invalid_tokens: AtomicU64,
}

/// In-memory token -> [`User`] map enforcing role checks. Every denial and
/// unknown-token lookup is audited, not just successes.
pub struct SessionManager {
    audit: std::sync::Arc<AuditLogger>,
    sessions: Mutex<HashMap<String, User>>,
    pub metrics: SessionMetrics,
}

impl SessionManager {
    pub fn new(audit: std::sync::Arc<AuditLogger>) -> Self {
        Self {
            audit,
            sessions: Mutex::new(HashMap::new()),
            metrics: SessionMetrics::default(),
        }
    }

    pub fn login(&self, username: impl Into<String>, role: Role) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let user = User {
            username: username.into(),
            role,
        };
        self.sessions
            .lock()
            .expect("session map mutex poisoned")
            .insert(token.clone(), user.clone());
        self.metrics.sessions_started.fetch_add(1, Ordering::Relaxed);
        self.audit.log(
            Some(&user),
            "session_start",
            &serde_json::json!({ "token": token }),
            "started",
        );
        token
    }

    pub fn logout(&self, token: &str) -> Result<(), SecurityError> {
        let removed = self
            .sessions
            .lock()
            .expect("session map mutex poisoned")
            .remove(token);
        match removed {
            Some(user) => {
                self.metrics.sessions_ended.fetch_add(1, Ordering::Relaxed);
                self.audit.log(
                    Some(&user),
                    "session_end",
                    &serde_json::json!({ "token": token }),
                    "ended",
                );
                Ok(())
            }
            None => {
                self.metrics.invalid_tokens.fetch_add(1, Ordering::Relaxed);
                self.audit.log(
                    None,
                    "session_end",
                    &serde_json::json!({ "token": token }),
                    "unknown_session",
                );
                Err(SecurityError::InvalidSession)
            }
        }
    }

    pub fn require_role(&self, token: &str, allowed: &[Role]) -> Result<User, SecurityError> {
        let user = self
            .sessions
            .lock()
            .expect("session map mutex poisoned")
            .get(token)
            .cloned();

        let Some(user) = user else {
            self.metrics.invalid_tokens.fetch_add(1, Ordering::Relaxed);
            self.audit.log(
                None,
                "authorization",
                &serde_json::json!({ "token": token }),
                "unknown_session",
            );
            return Err(SecurityError::InvalidSession);
        };

        if !allowed.contains(&user.role) {
            self.audit.log(
                Some(&user),
                "authorization",
                &serde_json::json!({ "token": token, "allowed_roles": allowed }),
                "permission_denied",
            );
            return Err(SecurityError::PermissionDenied {
                username: user.username,
            });
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        let dir = tempfile::tempdir().unwrap();
        let audit = std::sync::Arc::new(AuditLogger::open(dir.path().join("audit.log")).unwrap());
        // Leak the tempdir for the duration of the test so the audit file stays put.
        std::mem::forget(dir);
        SessionManager::new(audit)
    }

    #[test]
    fn login_then_require_role_succeeds() {
        let manager = manager();
        let token = manager.login("alice", Role::Operator);
        let user = manager
            .require_role(&token, &[Role::Operator, Role::Admin])
            .unwrap();
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn insufficient_role_is_denied() {
        let manager = manager();
        let token = manager.login("bob", Role::Viewer);
        let err = manager.require_role(&token, &[Role::Admin]).unwrap_err();
        assert!(matches!(err, SecurityError::PermissionDenied { .. }));
    }

    #[test]
    fn unknown_token_is_invalid_session() {
        let manager = manager();
        let err = manager.require_role("bogus", &[Role::Viewer]).unwrap_err();
        assert!(matches!(err, SecurityError::InvalidSession));
    }

    #[test]
    fn logout_removes_session() {
        let manager = manager();
        let token = manager.login("carol", Role::Admin);
        manager.logout(&token).unwrap();
        assert!(matches!(
            manager.require_role(&token, &[Role::Admin]),
            Err(SecurityError::InvalidSession)
        ));
    }
}
