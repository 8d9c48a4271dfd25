//! Infrastructure configuration - fixed for the lifetime of the process.


/// Where the Computation Service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Full URL of the calculate endpoint.
    /// Default: http://127.0.0.1:5000/api/calculate
    pub url: String,

    /// Per-request timeout in milliseconds.
    /// Default: 10000
    pub timeout_ms: u64,
}

impl ServiceConfig {
    fn default_url() -> String {
        "http://127.0.0.1:5000/api/calculate".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10_000
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// Interactive session timing.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Quiescence window after the last continuous edit, in milliseconds.
    /// Default: 500
    pub debounce_ms: u64,
}

impl SessionConfig {
    fn default_debounce_ms() -> u64 {
        500
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Log filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` string).
    /// Default: info
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Infrastructure configuration - cannot change at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfraConfig {
    /// Computation Service endpoint.
    pub service: ServiceConfig,

    /// Session timing.
    pub session: SessionConfig,

    /// Logging.
    pub telemetry: TelemetryConfig,
}
