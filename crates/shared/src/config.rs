//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Ledger account names used by the posting engine.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Names of the nominal accounts the posting engine resolves at run time.
///
/// Names that no longer resolve fall back to `suspense_account`.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Account receiving the vat component of analysed lines.
    #[serde(default = "default_vat_account")]
    pub vat_account: String,
    /// Built-in account used when a configured account cannot be resolved.
    #[serde(default = "default_suspense_account")]
    pub suspense_account: String,
    /// Purchase ledger control (creditors) account.
    #[serde(default = "default_purchase_control_account")]
    pub purchase_control_account: String,
    /// Sales ledger control (debtors) account.
    #[serde(default = "default_sales_control_account")]
    pub sales_control_account: String,
}

fn default_vat_account() -> String {
    "Vat".to_string()
}

fn default_suspense_account() -> String {
    "System Suspense Account".to_string()
}

fn default_purchase_control_account() -> String {
    "Purchase Ledger Control".to_string()
}

fn default_sales_control_account() -> String {
    "Sales Ledger Control".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            vat_account: default_vat_account(),
            suspense_account: default_suspense_account(),
            purchase_control_account: default_purchase_control_account(),
            sales_control_account: default_sales_control_account(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "tallybook=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLYBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
