use console_core::config::{configuration_directory, load_settings};
use console_core::error::AppError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub api: ApiSettings,
    pub processor: ProcessorSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub payment: PaymentSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser-facing origin used to build shareable payment links.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Browser origins allowed to call the console API.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![default_public_url()]
}

/// REST backend that owns invoices, customers, business owners and transactions.
#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_ms: default_api_timeout_ms(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_timeout_ms() -> u64 {
    15_000
}

/// Hosted card processor (Stripe).
#[derive(Deserialize, Clone, Debug)]
pub struct ProcessorSettings {
    /// Publishable key handed to the browser widget and used for confirmation calls.
    #[serde(default)]
    pub publishable_key: String,
    #[serde(default = "default_processor_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_processor_api_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct CacheSettings {
    /// How long a fetched read stays fresh before it is refetched.
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time_secs(),
        }
    }
}

fn default_stale_time_secs() -> u64 {
    300
}

impl CacheSettings {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct PaymentSettings {
    /// Time the success acknowledgment stays visible before the session closes itself.
    #[serde(default = "default_success_delay_ms")]
    pub success_delay_ms: u64,
    /// Delay before the second invalidation pass that absorbs webhook-driven settlement.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            success_delay_ms: default_success_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_success_delay_ms() -> u64 {
    2_000
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_retry_delay_ms() -> u64 {
    100
}

impl PaymentSettings {
    pub fn success_delay(&self) -> Duration {
        Duration::from_millis(self.success_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info,invoice_console=debug".to_string()
}

impl Settings {
    /// Fail fast on settings the console cannot run without.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.processor.publishable_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "processor.publishable_key must be set (APP_PROCESSOR__PUBLISHABLE_KEY)"
            )));
        }
        Ok(())
    }
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let directory = configuration_directory("invoice-console")?;
    let settings: Settings = load_settings(&directory)?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_key(key: &str) -> Settings {
        Settings {
            server: ServerSettings {
                host: default_host(),
                port: 0,
                public_url: default_public_url(),
                allowed_origins: default_allowed_origins(),
            },
            api: ApiSettings::default(),
            processor: ProcessorSettings {
                publishable_key: key.to_string(),
                api_base_url: default_processor_api_base_url(),
                timeout_ms: 1_000,
            },
            cache: CacheSettings::default(),
            payment: PaymentSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }

    #[test]
    fn missing_publishable_key_is_rejected() {
        assert!(settings_with_key("  ").validate().is_err());
        assert!(settings_with_key("pk_test_123").validate().is_ok());
    }

    #[test]
    fn defaults_match_console_timings() {
        let payment = PaymentSettings::default();
        assert_eq!(payment.success_delay(), Duration::from_millis(2_000));
        assert_eq!(payment.settle_delay(), Duration::from_millis(1_000));
        assert_eq!(ApiSettings::default().base_url, "http://localhost:8000");
        assert_eq!(CacheSettings::default().stale_time(), Duration::from_secs(300));
    }
}
