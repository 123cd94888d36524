use serde::{Deserialize, Serialize};

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server address
    pub http_addr: String,

    /// Bounded retries for punch writes racing on the same log
    pub max_conflict_retries: u32,

    /// Report generation timeout in seconds
    pub report_timeout_secs: u64,

    /// Service version
    pub version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            max_conflict_retries: 3,
            report_timeout_secs: 30,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            config.http_addr = addr;
        }

        if let Ok(retries) = std::env::var("MAX_CONFLICT_RETRIES") {
            if let Ok(n) = retries.parse() {
                config.max_conflict_retries = n;
            }
        }

        if let Ok(timeout) = std::env::var("REPORT_TIMEOUT_SECS") {
            if let Ok(n) = timeout.parse() {
                config.report_timeout_secs = n;
            }
        }

        config
    }

    /// Attendance service configuration derived from the gateway's
    pub fn attendance_config(&self) -> attendance_service::AttendanceConfig {
        attendance_service::AttendanceConfig {
            max_conflict_retries: self.max_conflict_retries,
            report_timeout_secs: self.report_timeout_secs,
        }
    }
}
