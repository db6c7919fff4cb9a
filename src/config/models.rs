use crate::humanize::HumanDuration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Directory of the Fjall keyspace holding session records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/livora")
}

/// Fee schedule and job policy for the wallet ledger
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Share of the offered payment charged as platform fee
    #[serde(default = "default_platform_fee_rate")]
    pub platform_fee_rate: Decimal,
    /// Charge per candidate notified by SMS
    #[serde(default = "default_sms_unit_cost")]
    pub sms_unit_cost: Decimal,
    #[serde(default = "default_max_selected_candidates")]
    pub max_selected_candidates: usize,
    /// How long a posting waits for confirmation before it may be refunded
    #[serde(default = "default_job_ttl")]
    pub job_ttl: HumanDuration,
    /// Upper bound on a single store commit; exceeding it fails the operation
    #[serde(default = "default_write_timeout")]
    pub write_timeout: HumanDuration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: default_platform_fee_rate(),
            sms_unit_cost: default_sms_unit_cost(),
            max_selected_candidates: default_max_selected_candidates(),
            job_ttl: default_job_ttl(),
            write_timeout: default_write_timeout(),
        }
    }
}

fn default_platform_fee_rate() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_sms_unit_cost() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_max_selected_candidates() -> usize {
    50
}

fn default_job_ttl() -> HumanDuration {
    HumanDuration::from_days(7)
}

fn default_write_timeout() -> HumanDuration {
    HumanDuration::from_secs(5)
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}
