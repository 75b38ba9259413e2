use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::{Role, User};

#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    timestamp: String,
    user: Option<&'a str>,
    role: Option<Role>,
    action: &'a str,
    parameters: &'a Value,
    outcome: &'a str,
}

/// Appends newline-delimited JSON audit records to a file. No fsync — this
/// mirrors an append-only log, not a durability guarantee.
pub struct AuditLogger {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl AuditLogger {
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self, user: Option<&User>, action: &str, parameters: &Value, outcome: &str) {
        let record = AuditRecord {
            timestamp: Utc::now().to_rfc3339(),
            user: user.map(|u| u.username.as_str()),
            role: user.map(|u| u.role),
            action,
            parameters,
            outcome,
        };
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize audit record");
                return;
            }
        };
        let mut file = self.file.lock().expect("audit log mutex poisoned");
        if let Err(err) = writeln!(file, "{line}") {
            tracing::error!(error = %err, path = %self.path.display(), "failed to append audit record");
        }
    }

    /// Reads back every record currently on disk. Intended for tests and
    /// operator tooling, not the hot path.
    pub fn read_all(&self) -> std::io::Result<Vec<Value>> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}
