/// Client configuration
///
/// # Environment variables
///
/// All settings can be overridden through environment variables:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/kasir | Working directory for the local database |
/// | DB_NAMESPACE | kasir | SurrealDB namespace |
/// | DB_DATABASE | pos | SurrealDB database name |
/// | ENVIRONMENT | development | Runtime environment |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the on-disk document store
    pub work_dir: String,
    pub db_namespace: String,
    pub db_database: String,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/kasir".into()),
            db_namespace: std::env::var("DB_NAMESPACE").unwrap_or_else(|_| "kasir".into()),
            db_database: std::env::var("DB_DATABASE").unwrap_or_else(|_| "pos".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
