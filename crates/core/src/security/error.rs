#[derive(Debug, Clone, thiserror::Error)]
pub enum SecurityError {
    #[error("session token is invalid or expired")]
    InvalidSession,

    #[error("user '{username}' lacks permission for this action")]
    PermissionDenied { username: String },
}
