use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{AuditLogger, Role, SecurityError, SessionManager};

#[derive(Debug, Default)]
struct FacadeMetrics {
    start_attempts: AtomicU64,
    stop_attempts: AtomicU64,
    config_change_attempts: AtomicU64,
    permission_denied: AtomicU64,
}

/// Role-gated facade over machine start/stop/config actions. Mirrors the
/// original's `HeatingMachine`: every call, successful or denied, is
/// audited, and `running` is tracked purely in memory.
pub struct HeatingMachine {
    sessions: Arc<SessionManager>,
    audit: Arc<AuditLogger>,
    running: AtomicBool,
    config: Mutex<HashMap<String, f64>>,
    metrics: FacadeMetrics,
}

impl HeatingMachine {
    pub fn new(sessions: Arc<SessionManager>, audit: Arc<AuditLogger>) -> Self {
        let mut config = HashMap::new();
        config.insert("target_load".to_string(), 0.75);
        Self {
            sessions,
            audit,
            running: AtomicBool::new(false),
            config: Mutex::new(config),
            metrics: FacadeMetrics::default(),
        }
    }

    pub fn start(&self, token: &str) -> Result<&'static str, SecurityError> {
        self.metrics.start_attempts.fetch_add(1, Ordering::Relaxed);
        let user = self
            .sessions
            .require_role(token, &[Role::Operator, Role::Admin])
            .inspect_err(|_| {
                self.metrics.permission_denied.fetch_add(1, Ordering::Relaxed);
            })?;

        let outcome = if self.running.swap(true, Ordering::SeqCst) {
            "already_running"
        } else {
            "started"
        };
        self.audit.log(
            Some(&user),
            "heat_start",
            &serde_json::json!({ "running": self.running.load(Ordering::SeqCst) }),
            outcome,
        );
        Ok(outcome)
    }

    pub fn stop(&self, token: &str) -> Result<&'static str, SecurityError> {
        self.metrics.stop_attempts.fetch_add(1, Ordering::Relaxed);
        let user = self
            .sessions
            .require_role(token, &[Role::Operator, Role::Admin])
            .inspect_err(|_| {
                self.metrics.permission_denied.fetch_add(1, Ordering::Relaxed);
            })?;

        let outcome = if self.running.swap(false, Ordering::SeqCst) {
            "stopped"
        } else {
            "already_stopped"
        };
        self.audit.log(
            Some(&user),
            "heat_stop",
            &serde_json::json!({ "running": self.running.load(Ordering::SeqCst) }),
            outcome,
        );
        Ok(outcome)
    }

    pub fn update_config(
        &self,
        token: &str,
        updates: HashMap<String, f64>,
    ) -> Result<HashMap<String, f64>, SecurityError> {
        self.metrics
            .config_change_attempts
            .fetch_add(1, Ordering::Relaxed);
        let user = self
            .sessions
            .require_role(token, &[Role::Admin])
            .inspect_err(|_| {
                self.metrics.permission_denied.fetch_add(1, Ordering::Relaxed);
            })?;

        let mut config = self.config.lock().expect("config mutex poisoned");
        config.extend(updates.clone());
        let snapshot = config.clone();
        drop(config);

        self.audit.log(
            Some(&user),
            "config_change",
            &serde_json::to_value(&updates).unwrap_or(Value::Null),
            "updated",
        );
        Ok(snapshot)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config_snapshot(&self) -> HashMap<String, f64> {
        self.config.lock().expect("config mutex poisoned").clone()
    }
}
