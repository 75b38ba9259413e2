//! Environment variable constants used throughout the application.

/// Machine config file path override (CLI arg default env).
pub const HEATING_MACHINE_CONFIG: &str = "HEATING_MACHINE_CONFIG";

/// Canary environment profile map path override.
pub const HEATING_MACHINE_ENVIRONMENTS: &str = "HEATING_MACHINE_ENVIRONMENTS";

/// Audit log file path override.
pub const HEATING_MACHINE_AUDIT_LOG: &str = "HEATING_MACHINE_AUDIT_LOG";

/// Log level override, consumed by `tracing_subscriber::EnvFilter`.
pub const HEATING_MACHINE_LOG: &str = "HEATING_MACHINE_LOG";
