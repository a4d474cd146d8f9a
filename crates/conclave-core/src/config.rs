use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConclaveError;

/// Top-level configuration loaded from `.conclave.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use conclave_core::ConclaveConfig;
///
/// let config = ConclaveConfig::default();
/// assert_eq!(config.review.timeout_secs, 300);
/// assert_eq!(config.gateway.url, "ws://127.0.0.1:8000/ws");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConclaveConfig {
    /// Review gateway connection settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl ConclaveConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConclaveError::Io`] if the file cannot be read, or
    /// [`ConclaveError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use conclave_core::ConclaveConfig;
    /// use std::path::Path;
    ///
    /// let config = ConclaveConfig::from_file(Path::new(".conclave.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ConclaveError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConclaveError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use conclave_core::ConclaveConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// timeout_secs = 120
    /// "#;
    /// let config = ConclaveConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.timeout_secs, 120);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ConclaveError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment-variable overrides on top of the loaded values.
    ///
    /// Recognized variables: `CONCLAVE_GATEWAY_URL`, `CONCLAVE_TIMEOUT_SECS`,
    /// and `DEBUG` (`"1"` enables debug output).
    ///
    /// # Examples
    ///
    /// ```
    /// use conclave_core::ConclaveConfig;
    ///
    /// let config = ConclaveConfig::default().with_env();
    /// assert!(!config.gateway.url.is_empty());
    /// ```
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("CONCLAVE_GATEWAY_URL") {
            if !url.is_empty() {
                self.gateway.url = url;
            }
        }
        if let Ok(secs) = std::env::var("CONCLAVE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.review.timeout_secs = secs;
            }
        }
        if std::env::var("DEBUG").as_deref() == Ok("1") {
            self.review.debug = true;
        }
        self
    }
}

/// Review gateway connection configuration.
///
/// # Examples
///
/// ```
/// use conclave_core::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.url, "ws://127.0.0.1:8000/ws");
/// assert!(config.app_id.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket endpoint of the review gateway.
    #[serde(default = "default_gateway_url")]
    pub url: String,
    /// Application id used for gateway authentication. Falls back to the
    /// gateway's built-in development identity when unset.
    pub app_id: Option<String>,
    /// Application secret paired with `app_id`.
    pub app_secret: Option<String>,
}

fn default_gateway_url() -> String {
    "ws://127.0.0.1:8000/ws".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            app_id: None,
            app_secret: None,
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use conclave_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.timeout_secs, 300);
/// assert!(!config.debug);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Deadline for a single review request, in seconds (default: 300).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Emit verbose diagnostics, including submitted code previews.
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = ConclaveConfig::default();
        assert_eq!(config.gateway.url, "ws://127.0.0.1:8000/ws");
        assert!(config.gateway.app_id.is_none());
        assert!(config.gateway.app_secret.is_none());
        assert_eq!(config.review.timeout_secs, 300);
        assert!(!config.review.debug);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[gateway]
url = "ws://review.internal:9000/ws"
"#;
        let config = ConclaveConfig::from_toml(toml).unwrap();
        assert_eq!(config.gateway.url, "ws://review.internal:9000/ws");
        assert_eq!(config.review.timeout_secs, 300);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[gateway]
url = "wss://gateway.example.com/ws"
app_id = "11111111-2222-3333-4444-555555555555"
app_secret = "s3cret"

[review]
timeout_secs = 120
debug = true
"#;
        let config = ConclaveConfig::from_toml(toml).unwrap();
        assert_eq!(config.gateway.url, "wss://gateway.example.com/ws");
        assert_eq!(
            config.gateway.app_id.as_deref(),
            Some("11111111-2222-3333-4444-555555555555")
        );
        assert_eq!(config.gateway.app_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.review.timeout_secs, 120);
        assert!(config.review.debug);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ConclaveConfig::from_toml("").unwrap();
        assert_eq!(config.review.timeout_secs, 300);
        assert_eq!(config.gateway.url, "ws://127.0.0.1:8000/ws");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = ConclaveConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }
}
