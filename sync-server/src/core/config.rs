/// Service configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/ozon-sync | working directory for the embedded stores |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | OZON_BASE_URL | https://api-seller.ozon.ru | Seller API endpoint |
/// | TOKENS_PATH | {WORK_DIR}/tokens.json | seller token registry |
/// | CATALOG_PATH | {WORK_DIR}/catalog.json | article catalog snapshot |
/// | NEW_ORDERS_POLL_SECS | 60 | new-order polling period |
/// | CANCEL_POLL_SECS | 60 | cancellation polling period |
///
/// Mutating marketplace calls only execute when `ENVIRONMENT=production`;
/// everywhere else they short-circuit to a benign success.
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for redb stores
    pub work_dir: String,
    /// Runtime environment: development | staging | production
    pub environment: String,
    /// Seller API base URL
    pub ozon_base_url: String,
    /// Path to the token registry file
    pub tokens_path: String,
    /// Path to the catalog snapshot file
    pub catalog_path: String,
    /// New-order polling period in seconds
    pub new_orders_poll_secs: u64,
    /// Cancellation polling period in seconds
    pub cancel_poll_secs: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults
    pub fn from_env() -> Self {
        let work_dir =
            std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/ozon-sync".into());

        Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            ozon_base_url: std::env::var("OZON_BASE_URL")
                .unwrap_or_else(|_| ozon_api::client::DEFAULT_BASE_URL.into()),
            tokens_path: std::env::var("TOKENS_PATH")
                .unwrap_or_else(|_| format!("{work_dir}/tokens.json")),
            catalog_path: std::env::var("CATALOG_PATH")
                .unwrap_or_else(|_| format!("{work_dir}/catalog.json")),
            new_orders_poll_secs: std::env::var("NEW_ORDERS_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            cancel_poll_secs: std::env::var("CANCEL_POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            work_dir,
        }
    }

    /// Whether this process may write to the live marketplace
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_gate() {
        let mut config = Config {
            work_dir: "/tmp/x".into(),
            environment: "development".into(),
            ozon_base_url: "http://localhost".into(),
            tokens_path: "/tmp/x/tokens.json".into(),
            catalog_path: "/tmp/x/catalog.json".into(),
            new_orders_poll_secs: 60,
            cancel_poll_secs: 60,
        };

        assert!(!config.is_production());
        config.environment = "production".into();
        assert!(config.is_production());
    }
}
