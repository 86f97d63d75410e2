use crate::catalogue::ProductField;
use crate::grid::{PluginKind, PluginMode, TableOptions};
use crate::grid::table::DEFAULT_PAGE_SIZE;
use crate::version_info::RuntimeEnv;
use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "prod")]
    Prod,
}

impl From<&Env> for RuntimeEnv {
    fn from(env: &Env) -> Self {
        match env {
            Env::Local => RuntimeEnv::Local,
            Env::Test => RuntimeEnv::Test,
            Env::Prod => RuntimeEnv::Prod,
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Test => write!(f, "test"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    database_url: String,
    server_addr: String,
    port: u16,
    // JWT secret for dashboard staff tokens
    jwt_secret: String,
    // Product grid switches
    attached_product_fields: Vec<ProductField>,
    disabled_plugins: Vec<PluginKind>,
    read_only_plugins: Vec<PluginKind>,
    page_size: u64,
}

// An intermediate struct for deserializing environment variables.
// List values are comma separated.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    database_url: String,
    server_addr: Option<String>,
    port: Option<u16>,
    jwt_secret: Option<String>,
    attached_product_fields: Option<String>,
    disabled_plugins: Option<String>,
    read_only_plugins: Option<String>,
    page_size: Option<u64>,
}

/// Splits a comma separated list, skipping blanks.
fn parse_list<T>(var: &str, raw: Option<&str>) -> anyhow::Result<Vec<T>>
where
    T: FromStr<Err = String> + PartialEq,
{
    let mut items = Vec::new();
    for code in raw.unwrap_or_default().split(',').map(str::trim) {
        if code.is_empty() {
            continue;
        }
        let item = code
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{var}: {e}"))?;
        if !items.contains(&item) {
            items.push(item);
        }
    }
    Ok(items)
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// This function is available for both unit tests and integration tests.
    /// It should not be used in production code.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            database_url: "postgres://localhost:5432/test".to_string(),
            server_addr: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: "test-jwt-secret-key-for-local-development".to_string(),
            attached_product_fields: Vec::new(),
            disabled_plugins: Vec::new(),
            read_only_plugins: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Test configuration with explicit grid switches.
    pub fn new_for_test_with_grid(
        attached_product_fields: Vec<ProductField>,
        disabled_plugins: Vec<PluginKind>,
        read_only_plugins: Vec<PluginKind>,
        page_size: u64,
    ) -> Self {
        Self {
            attached_product_fields,
            disabled_plugins,
            read_only_plugins,
            page_size,
            ..Self::new_for_test()
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self.env, Env::Prod)
    }

    /// Get the JWT secret for verifying staff tokens.
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn attached_product_fields(&self) -> &[ProductField] {
        &self.attached_product_fields
    }

    pub fn disabled_plugins(&self) -> &[PluginKind] {
        &self.disabled_plugins
    }

    pub fn read_only_plugins(&self) -> &[PluginKind] {
        &self.read_only_plugins
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// The grid switches as an explicit [`TableOptions`] value.
    ///
    /// A plugin listed as both disabled and read-only is disabled.
    pub fn table_options(&self) -> TableOptions {
        let mut options = TableOptions::default()
            .with_attached_fields(self.attached_product_fields.clone())
            .with_page_size(self.page_size);
        for kind in &self.read_only_plugins {
            options = options.with_mode(*kind, PluginMode::ReadOnly);
        }
        for kind in &self.disabled_plugins {
            options = options.with_mode(*kind, PluginMode::Disabled);
        }
        options
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
            attached_product_fields,
            disabled_plugins,
            read_only_plugins,
            page_size,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {}", addr);
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!(
                    "SERVER_ADDR not set, defaulting to {} for {} environment",
                    default_addr, env
                );
                default_addr.to_string()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        // JWT secret is required for production, optional for local/test
        let jwt_secret = match jwt_secret {
            Some(secret) => secret,
            None if matches!(env, Env::Local | Env::Test) => {
                info!("JWT_SECRET not set, using default for {} environment", env);
                "default-jwt-secret-for-local-development-only".to_string()
            }
            None => anyhow::bail!("JWT_SECRET must be set for {} environment", env),
        };

        let attached_product_fields =
            parse_list::<ProductField>("ATTACHED_PRODUCT_FIELDS", attached_product_fields.as_deref())?;
        let disabled_plugins =
            parse_list::<PluginKind>("DISABLED_PLUGINS", disabled_plugins.as_deref())?;
        let read_only_plugins =
            parse_list::<PluginKind>("READ_ONLY_PLUGINS", read_only_plugins.as_deref())?;

        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            anyhow::bail!("PAGE_SIZE must be greater than zero");
        }

        Ok(Config {
            env,
            database_url,
            server_addr,
            port,
            jwt_secret,
            attached_product_fields,
            disabled_plugins,
            read_only_plugins,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_env::from_iter;

    #[test]
    fn default_server_addr_for_prod_is_public() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "prod"),
            ("DATABASE_URL", "postgres://example"),
            ("PORT", "8080"),
            ("JWT_SECRET", "prod-secret"),
        ])
        .expect("RawConfig should deserialize");

        let config = Config::from_raw(raw).expect("prod config should build");
        assert_eq!(config.server_addr(), "0.0.0.0");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.jwt_secret(), "prod-secret");
        assert!(config.is_prod());
    }

    #[test]
    fn local_env_uses_defaults() {
        let raw: RawConfig = from_iter(vec![("ENV", "local"), ("DATABASE_URL", "postgres://example")])
            .expect("RawConfig should deserialize");

        let config = Config::from_raw(raw).expect("local config should build");
        assert_eq!(config.server_addr(), "127.0.0.1");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert!(config.attached_product_fields().is_empty());
        assert_eq!(config.table_options(), TableOptions::default());
    }

    #[test]
    fn prod_requires_port_and_jwt_secret() {
        let raw: RawConfig = from_iter(vec![("ENV", "prod"), ("DATABASE_URL", "postgres://example")])
            .expect("RawConfig should deserialize");
        let err = Config::from_raw(raw).unwrap_err().to_string();
        assert!(err.contains("PORT"));

        let raw: RawConfig = from_iter(vec![
            ("ENV", "prod"),
            ("DATABASE_URL", "postgres://example"),
            ("PORT", "8080"),
        ])
        .expect("RawConfig should deserialize");
        let err = Config::from_raw(raw).unwrap_err().to_string();
        assert!(err.contains("JWT_SECRET"));
    }

    #[test]
    fn grid_switches_become_table_options() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "test"),
            ("DATABASE_URL", "postgres://example"),
            ("PORT", "8080"),
            ("ATTACHED_PRODUCT_FIELDS", "description, is_public,,product_class"),
            ("DISABLED_PLUGINS", "partner"),
            ("READ_ONLY_PLUGINS", "attribute,partner"),
            ("PAGE_SIZE", "50"),
        ])
        .expect("RawConfig should deserialize");

        let config = Config::from_raw(raw).expect("test config should build");
        assert_eq!(
            config.attached_product_fields(),
            [
                ProductField::Description,
                ProductField::IsPublic,
                ProductField::ProductClass
            ]
        );

        let options = config.table_options();
        assert_eq!(options.page_size, 50);
        assert_eq!(options.mode(PluginKind::Attached), PluginMode::Enabled);
        assert_eq!(options.mode(PluginKind::Attribute), PluginMode::ReadOnly);
        assert_eq!(options.mode(PluginKind::Partner), PluginMode::Disabled);
    }

    #[test]
    fn unknown_codes_are_rejected() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "local"),
            ("DATABASE_URL", "postgres://example"),
            ("ATTACHED_PRODUCT_FIELDS", "weight"),
        ])
        .expect("RawConfig should deserialize");
        let err = Config::from_raw(raw).unwrap_err().to_string();
        assert!(err.contains("ATTACHED_PRODUCT_FIELDS"));
        assert!(err.contains("weight"));

        let raw: RawConfig = from_iter(vec![
            ("ENV", "local"),
            ("DATABASE_URL", "postgres://example"),
            ("DISABLED_PLUGINS", "prices"),
        ])
        .expect("RawConfig should deserialize");
        let err = Config::from_raw(raw).unwrap_err().to_string();
        assert!(err.contains("DISABLED_PLUGINS"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let raw: RawConfig = from_iter(vec![
            ("ENV", "local"),
            ("DATABASE_URL", "postgres://example"),
            ("PAGE_SIZE", "0"),
        ])
        .expect("RawConfig should deserialize");
        assert!(Config::from_raw(raw).is_err());
    }
}
