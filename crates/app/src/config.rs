//! App configuration loaded from environment variables.
//!
//! Everything is read once at start-up and is immutable for the lifetime of
//! the process.
//!
//! # Environment Variables
//!
//! ## Required
//! - `APP_BASE_URL` - Public URL of this app (used for the OAuth redirect URI
//!   and the webhook address registered with Shopify)
//! - `SHOPIFY_CLIENT_ID` - Shopify app client ID (API key)
//! - `SHOPIFY_CLIENT_SECRET` - Shopify app client secret (signs OAuth callbacks)
//!
//! ## Optional
//! - `APP_HOST` - Bind address (default: 127.0.0.1)
//! - `APP_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_SCOPES` - Comma-separated OAuth scopes (default: `write_discounts,write_orders`)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2024-04)
//! - `SHOPIFY_WEBHOOK_SECRET` - Webhook signing secret (default: client secret)
//! - `SHOPIFY_HMAC_CANONICAL_ORDER` - `received` or `sorted` (default: received)
//! - `HTTP_TIMEOUT_SECS` - Timeout for every outbound Shopify call (default: 10)
//! - `OAUTH_STATE_TTL_SECS` - Lifetime of an install's anti-CSRF state (default: 600)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::services::signature::QueryOrder;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SCOPES: &str = "write_discounts,write_orders";
const DEFAULT_API_VERSION: &str = "2024-04";

/// Path Shopify redirects back to after the merchant approves the install.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Path Shopify posts `orders/create` webhooks to.
pub const ORDERS_CREATE_WEBHOOK_PATH: &str = "/discount/webhook/orders/create";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// App configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the app, without trailing slash
    pub base_url: String,
    /// Shopify app credentials and API settings
    pub shopify: ShopifyAppConfig,
    /// Timeout applied to every outbound Shopify request
    pub http_timeout: Duration,
    /// How long an issued OAuth state stays valid
    pub oauth_state_ttl: Duration,
    /// Emit JSON logs instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify app configuration.
///
/// Implements `Debug` manually to redact the secrets.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// OAuth client ID (API key)
    pub client_id: String,
    /// OAuth client secret, also the key for OAuth callback HMACs
    pub client_secret: SecretString,
    /// Key for `X-Shopify-Hmac-Sha256` webhook signatures
    pub webhook_secret: SecretString,
    /// Requested OAuth scopes
    pub scopes: Vec<String>,
    /// Admin API version (e.g., 2024-04)
    pub api_version: String,
    /// Parameter order used when rebuilding the signed callback query
    pub hmac_canonical_order: QueryOrder,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("api_version", &self.api_version)
            .field("hmac_canonical_order", &self.hmac_canonical_order)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("APP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("APP_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("APP_PORT".to_string(), e.to_string()))?;
        let base_url = parse_base_url(&get_required_env("APP_BASE_URL")?)?;
        let shopify = ShopifyAppConfig::from_env()?;
        let http_timeout = Duration::from_secs(parse_seconds("HTTP_TIMEOUT_SECS", "10")?);
        let oauth_state_ttl = Duration::from_secs(parse_seconds("OAUTH_STATE_TTL_SECS", "600")?);
        let log_json = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            shopify,
            http_timeout,
            oauth_state_ttl,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Fixed OAuth redirect URI registered with Shopify.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.base_url)
    }

    /// Address Shopify should deliver `orders/create` webhooks to.
    #[must_use]
    pub fn orders_webhook_address(&self) -> String {
        format!("{}{ORDERS_CREATE_WEBHOOK_PATH}", self.base_url)
    }

    /// Whether the app is served over HTTPS (controls `Secure` cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let client_secret = get_validated_secret("SHOPIFY_CLIENT_SECRET")?;
        let webhook_secret = match get_optional_env("SHOPIFY_WEBHOOK_SECRET") {
            Some(value) => {
                validate_secret_strength(&value, "SHOPIFY_WEBHOOK_SECRET")?;
                SecretString::from(value)
            }
            None => client_secret.clone(),
        };
        let hmac_canonical_order = get_env_or_default("SHOPIFY_HMAC_CANONICAL_ORDER", "received")
            .parse::<QueryOrder>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPIFY_HMAC_CANONICAL_ORDER".to_string(), e))?;

        Ok(Self {
            client_id: get_required_env("SHOPIFY_CLIENT_ID")?,
            client_secret,
            webhook_secret,
            scopes: parse_scopes(&get_env_or_default("SHOPIFY_SCOPES", DEFAULT_SCOPES)),
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            hmac_canonical_order,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a positive number of seconds.
fn parse_seconds(key: &str, default: &str) -> Result<u64, ConfigError> {
    let secs = get_env_or_default(key, default)
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(secs)
}

/// Validate the base URL and strip any trailing slash.
fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("APP_BASE_URL".to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "APP_BASE_URL".to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Split a comma-separated scope list.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shopify_config() -> ShopifyAppConfig {
        ShopifyAppConfig {
            client_id: "test_client_id".to_string(),
            client_secret: SecretString::from("super_secret_client_secret"),
            webhook_secret: SecretString::from("super_secret_webhook_secret"),
            scopes: parse_scopes(DEFAULT_SCOPES),
            api_version: DEFAULT_API_VERSION.to_string(),
            hmac_canonical_order: QueryOrder::Received,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-client-secret", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("shpss_9f8A7b6C5d4E3f2G1h0IjKlMnOpQ", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes(" write_discounts, write_orders ,,"),
            vec!["write_discounts".to_string(), "write_orders".to_string()]
        );
    }

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        assert_eq!(
            parse_base_url("https://app.example.test/").unwrap(),
            "https://app.example.test"
        );
        assert!(parse_base_url("ftp://app.example.test").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_derived_urls() {
        let config = AppConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://discounts.example.test".to_string(),
            shopify: shopify_config(),
            http_timeout: Duration::from_secs(10),
            oauth_state_ttl: Duration::from_secs(600),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        assert_eq!(config.socket_addr().port(), 3000);
        assert_eq!(
            config.redirect_uri(),
            "https://discounts.example.test/auth/callback"
        );
        assert_eq!(
            config.orders_webhook_address(),
            "https://discounts.example.test/discount/webhook/orders/create"
        );
        assert!(config.is_secure());
    }

    #[test]
    fn test_shopify_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", shopify_config());

        assert!(debug_output.contains("test_client_id"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));
        assert!(!debug_output.contains("super_secret_webhook_secret"));
    }
}
