//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_STORE_URL` - Base URL of the cart document store
//! - `CART_STORE_API_KEY` - Bearer token for the cart document store
//!
//! ## Optional
//! - `CART_STORE_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `CART_OWNER_ID` - Default cart owner for the CLI
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use storefront_cart_core::OwnerId;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MIN_API_KEY_LENGTH: usize = 16;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

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
    "put-your",
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

/// Top-level cart configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Remote cart store connection
    pub store: CartStoreConfig,
    /// Owner used when none is given explicitly
    pub default_owner: Option<OwnerId>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

/// Remote cart store connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CartStoreConfig {
    /// Base URL; always ends with `/` so document paths can be joined.
    pub base_url: Url,
    /// Bearer token
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for CartStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CartConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        Ok(Self {
            store: CartStoreConfig::from_env(&env)?,
            default_owner: env.optional("CART_OWNER_ID").map(OwnerId::from),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

impl CartStoreConfig {
    fn from_env<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = parse_base_url("CART_STORE_URL", &env.required("CART_STORE_URL")?)?;
        let api_key = env.validated_secret("CART_STORE_API_KEY")?;

        let timeout_secs = env
            .or_default("CART_STORE_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CART_STORE_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_STORE_TIMEOUT_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Settings for a store at `base_url`, with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an
    /// absolute http(s) URL.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("base_url", base_url)?,
            api_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key.expose_secret())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

fn parse_base_url(var_name: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
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
    let len = s.chars().count() as f64;
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
    if secret.len() < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_API_KEY_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_KEY: &str = "aB3xY9mK2nL5pQ7rT0uW4zC6";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config() {
        let config = CartConfig::from_lookup(lookup(&[
            ("CART_STORE_URL", "https://carts.example.net/v1"),
            ("CART_STORE_API_KEY", GOOD_KEY),
        ]))
        .unwrap();

        assert_eq!(config.store.base_url.as_str(), "https://carts.example.net/v1/");
        assert_eq!(config.store.timeout, Duration::from_secs(10));
        assert!(config.default_owner.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_optional_values() {
        let config = CartConfig::from_lookup(lookup(&[
            ("CART_STORE_URL", "http://localhost:8080/"),
            ("CART_STORE_API_KEY", GOOD_KEY),
            ("CART_STORE_TIMEOUT_SECS", "3"),
            ("CART_OWNER_ID", "uid-9"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]))
        .unwrap();

        assert_eq!(config.store.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.store.timeout, Duration::from_secs(3));
        assert_eq!(config.default_owner, Some(OwnerId::new("uid-9")));
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_missing_url() {
        let err = CartConfig::from_lookup(lookup(&[("CART_STORE_API_KEY", GOOD_KEY)])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "CART_STORE_URL"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err = CartConfig::from_lookup(lookup(&[
            ("CART_STORE_URL", "https://carts.example.net"),
            ("CART_STORE_API_KEY", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "CART_STORE_API_KEY"));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = CartConfig::from_lookup(lookup(&[
            ("CART_STORE_URL", "ftp://carts.example.net"),
            ("CART_STORE_API_KEY", GOOD_KEY),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = CartConfig::from_lookup(lookup(&[
            ("CART_STORE_URL", "https://carts.example.net"),
            ("CART_STORE_API_KEY", GOOD_KEY),
            ("CART_STORE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "CART_STORE_TIMEOUT_SECS"));
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
        let result = validate_secret_strength("your-api-key-goes-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_too_short() {
        assert!(validate_secret_strength("aB3$xY9", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength(GOOD_KEY, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_store_config_debug_redacts_key() {
        let config =
            CartStoreConfig::new("https://carts.example.net", SecretString::from(GOOD_KEY)).unwrap();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("carts.example.net"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(GOOD_KEY));
    }
}
