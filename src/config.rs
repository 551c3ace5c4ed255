use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TidewayError};
use crate::utils::{get_env_with_prefix, parse_env_with_prefix};
use crate::webhooks::{IdempotencyConfig, IdempotencyStore, Provider};

/// Default retention window for recorded event ids (10 minutes)
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(600);

/// Default bound on a single idempotency store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Secret material for one provider
///
/// For HMAC providers this is the signing key; for secret-hash providers it
/// is the hash string the provider echoes back. The secret is stored using
/// [`SecretString`] and is never printed by `Debug`.
#[derive(Clone)]
pub struct ProviderConfig {
    pub secret: SecretString,
    /// Header to read the signature from instead of the provider default
    pub signature_header: Option<String>,
}

impl ProviderConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            signature_header: None,
        }
    }

    pub fn with_signature_header(mut self, name: impl Into<String>) -> Self {
        self.signature_header = Some(name.into());
        self
    }

    /// Whether there is any secret material to verify against
    ///
    /// An empty or whitespace-only secret does not count: anyone can compute
    /// an HMAC with an empty key.
    pub fn has_secret(&self) -> bool {
        !self.secret.expose_secret().trim().is_empty()
    }

    /// Header this provider's signature is expected in
    pub fn signature_header_for(&self, provider: Provider) -> &str {
        self.signature_header
            .as_deref()
            .unwrap_or(provider.default_signature_header())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("secret", &"[REDACTED]")
            .field("signature_header", &self.signature_header)
            .finish()
    }
}

/// Everything the verification pipeline needs
///
/// A provider without a [`ProviderConfig`] is treated as unsupported: its
/// webhooks classify as `UNKNOWN_PROVIDER` even when its header is present.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tideway_webhooks::{PipelineConfig, webhooks::InMemoryIdempotencyStore};
///
/// let config = PipelineConfig::builder()
///     .paystack(paystack_secret_key)
///     .flutterwave(flutterwave_secret_hash)
///     .idempotency_store(Arc::new(InMemoryIdempotencyStore::new()))
///     .max_age(Duration::from_secs(300))
///     .build();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    pub paystack: Option<ProviderConfig>,
    pub flutterwave: Option<ProviderConfig>,
    pub idempotency_store: Option<Arc<dyn IdempotencyStore>>,
    pub idempotency_ttl: Duration,
    /// Reject events older than this; `None` disables the freshness gate
    pub max_age: Option<Duration>,
    /// Bound on each idempotency store call
    pub store_timeout: Duration,
    /// Parse verified bodies as JSON
    pub parse_json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paystack: None,
            flutterwave: None,
            idempotency_store: None,
            idempotency_ttl: DEFAULT_IDEMPOTENCY_TTL,
            max_age: None,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            parse_json: true,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Configuration for `provider`, if it has secret material
    ///
    /// A provider configured with an empty secret is treated as not configured.
    pub fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.raw_provider(provider)
            .filter(|config| config.has_secret())
    }

    fn raw_provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        match provider {
            Provider::Paystack => self.paystack.as_ref(),
            Provider::Flutterwave => self.flutterwave.as_ref(),
        }
    }

    /// Providers with secret material, in detection order
    pub fn configured_providers(&self) -> impl Iterator<Item = (Provider, &ProviderConfig)> {
        Provider::DETECTION_ORDER
            .into_iter()
            .filter_map(|provider| self.provider(provider).map(|config| (provider, config)))
    }

    /// Check the configuration can verify anything at all
    pub fn validate(&self) -> Result<()> {
        for provider in Provider::DETECTION_ORDER {
            if let Some(config) = self.raw_provider(provider) {
                if !config.has_secret() {
                    return Err(TidewayError::config(format!(
                        "{} is configured with an empty secret",
                        provider
                    )));
                }
            }
        }
        if self.configured_providers().next().is_none() {
            return Err(TidewayError::config("no webhook provider has a secret configured"));
        }
        if self.store_timeout.is_zero() {
            return Err(TidewayError::config("store_timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("paystack", &self.paystack)
            .field("flutterwave", &self.flutterwave)
            .field("idempotency_store", &self.idempotency_store.is_some())
            .field("idempotency_ttl", &self.idempotency_ttl)
            .field("max_age", &self.max_age)
            .field("store_timeout", &self.store_timeout)
            .field("parse_json", &self.parse_json)
            .finish()
    }
}

/// Builder for [`PipelineConfig`]
#[must_use = "builder does nothing until you call build()"]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Paystack secret key (HMAC-SHA512 signing key)
    pub fn paystack(self, secret_key: impl Into<String>) -> Self {
        self.provider(Provider::Paystack, ProviderConfig::new(secret_key))
    }

    /// Flutterwave secret hash (compared against `verif-hash`)
    pub fn flutterwave(self, secret_hash: impl Into<String>) -> Self {
        self.provider(Provider::Flutterwave, ProviderConfig::new(secret_hash))
    }

    pub fn provider(mut self, provider: Provider, config: ProviderConfig) -> Self {
        match provider {
            Provider::Paystack => self.config.paystack = Some(config),
            Provider::Flutterwave => self.config.flutterwave = Some(config),
        }
        self
    }

    pub fn idempotency_store(mut self, store: Arc<dyn IdempotencyStore>) -> Self {
        self.config.idempotency_store = Some(store);
        self
    }

    pub fn idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.config.idempotency_ttl = ttl;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.config.max_age = Some(max_age);
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout = timeout;
        self
    }

    pub fn parse_json(mut self, parse_json: bool) -> Self {
        self.config.parse_json = parse_json;
        self
    }

    /// Apply non-secret settings, e.g. loaded with [`WebhookSettings::from_env`]
    pub fn settings(mut self, settings: &WebhookSettings) -> Self {
        self.config.idempotency_ttl = Duration::from_secs(settings.idempotency_ttl_seconds);
        self.config.max_age = settings.max_age_seconds.map(Duration::from_secs);
        self.config.store_timeout = Duration::from_millis(settings.store_timeout_ms);
        self.config.parse_json = settings.parse_json;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-secret pipeline settings
///
/// Secrets are not read from the environment: the caller fetches them and hands them to
/// [`PipelineConfigBuilder`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookSettings {
    #[serde(default = "default_idempotency_ttl_seconds")]
    pub idempotency_ttl_seconds: u64,
    #[serde(default)]
    pub max_age_seconds: Option<u64>,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_parse_json")]
    pub parse_json: bool,
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            idempotency_ttl_seconds: default_idempotency_ttl_seconds(),
            max_age_seconds: None,
            store_timeout_ms: default_store_timeout_ms(),
            parse_json: default_parse_json(),
            idempotency: IdempotencyConfig::default(),
        }
    }
}

impl WebhookSettings {
    /// Load settings from `TIDEWAY_WEBHOOK_*` environment variables
    ///
    /// - `WEBHOOK_IDEMPOTENCY_TTL_SECONDS`
    /// - `WEBHOOK_MAX_AGE_SECONDS`
    /// - `WEBHOOK_STORE_TIMEOUT_MS`
    /// - `WEBHOOK_PARSE_JSON`
    ///
    /// plus everything [`IdempotencyConfig::from_env`] reads.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(ttl) = parse_env_with_prefix("WEBHOOK_IDEMPOTENCY_TTL_SECONDS") {
            settings.idempotency_ttl_seconds = ttl;
        }

        if let Some(max_age) = parse_env_with_prefix("WEBHOOK_MAX_AGE_SECONDS") {
            settings.max_age_seconds = Some(max_age);
        }

        if let Some(timeout) = parse_env_with_prefix("WEBHOOK_STORE_TIMEOUT_MS") {
            settings.store_timeout_ms = timeout;
        }

        if let Some(parse_json) = parse_env_with_prefix("WEBHOOK_PARSE_JSON") {
            settings.parse_json = parse_json;
        }

        settings.idempotency = IdempotencyConfig::from_env();
        settings
    }
}

fn default_idempotency_ttl_seconds() -> u64 {
    DEFAULT_IDEMPOTENCY_TTL.as_secs()
}

fn default_store_timeout_ms() -> u64 {
    DEFAULT_STORE_TIMEOUT.as_millis() as u64
}

fn default_parse_json() -> bool {
    true
}

/// Logging configuration used by [`init_tracing_with_config`](crate::init_tracing_with_config)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Load from `TIDEWAY_LOG_LEVEL` and `TIDEWAY_LOG_JSON`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            config.level = level;
        }
        if let Some(json) = parse_env_with_prefix("LOG_JSON") {
            config.json = json;
        }
        config
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
