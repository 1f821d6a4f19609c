use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.hollaex.com";
pub const DEFAULT_BASE_PATH: &str = "/v2";
pub const DEFAULT_STREAM_URL: &str = "wss://api.hollaex.com/stream";
pub const DEFAULT_API_EXPIRES_AFTER: u64 = 60;

#[derive(Debug, Clone)]
pub struct HollaexConfig {
    pub api_key: Secret<String>,
    pub api_secret: Secret<String>,
    pub api_url: String,
    pub base_path: String,
    pub stream_url: String,
    /// Seconds a signed request or stream handshake stays valid.
    pub api_expires_after: u64,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for HollaexConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("HollaexConfig", 6)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("api_secret", "[REDACTED]")?;
        state.serialize_field("api_url", &self.api_url)?;
        state.serialize_field("base_path", &self.base_path)?;
        state.serialize_field("stream_url", &self.stream_url)?;
        state.serialize_field("api_expires_after", &self.api_expires_after)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for HollaexConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct HollaexConfigHelper {
            #[serde(default)]
            api_key: String,
            #[serde(default)]
            api_secret: String,
            api_url: Option<String>,
            base_path: Option<String>,
            stream_url: Option<String>,
            api_expires_after: Option<u64>,
        }

        let helper = HollaexConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            api_secret: Secret::new(helper.api_secret),
            api_url: helper
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            base_path: helper
                .base_path
                .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string()),
            stream_url: helper
                .stream_url
                .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string()),
            api_expires_after: helper
                .api_expires_after
                .unwrap_or(DEFAULT_API_EXPIRES_AFTER),
        })
    }
}

impl HollaexConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            api_secret: Secret::new(api_secret),
            ..Self::read_only()
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY` (e.g., `HOLLAEX_API_KEY`)
    /// - `{PREFIX}_API_SECRET` (e.g., `HOLLAEX_API_SECRET`)
    /// - `{PREFIX}_API_URL` (optional)
    /// - `{PREFIX}_STREAM_URL` (optional)
    /// - `{PREFIX}_API_EXPIRES_AFTER` (optional, seconds)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let api_secret_var = format!("{}_API_SECRET", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;
        let api_secret = env::var(&api_secret_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_secret_var))?;

        let mut config = Self::new(api_key, api_secret);

        if let Ok(api_url) = env::var(format!("{}_API_URL", prefix)) {
            config.api_url = api_url;
        }
        if let Ok(stream_url) = env::var(format!("{}_STREAM_URL", prefix)) {
            config.stream_url = stream_url;
        }
        if let Ok(expires) = env::var(format!("{}_API_EXPIRES_AFTER", prefix)) {
            config.api_expires_after = expires.parse().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{}_API_EXPIRES_AFTER must be a whole number of seconds, got '{}'",
                    prefix, expires
                ))
            })?;
        }

        Ok(config)
    }

    /// Create configuration from a .env file and environment variables
    ///
    /// A missing file is not an error; system environment variables are used instead.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Configuration for public endpoints and the unauthenticated stream
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            api_secret: Secret::new(String::new()),
            api_url: DEFAULT_API_URL.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            api_expires_after: DEFAULT_API_EXPIRES_AFTER,
        }
    }

    /// Check if this configuration has valid credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.api_secret.expose_secret().is_empty()
    }

    #[must_use]
    pub fn api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    #[must_use]
    pub fn base_path(mut self, base_path: String) -> Self {
        self.base_path = base_path;
        self
    }

    #[must_use]
    pub fn stream_url(mut self, stream_url: String) -> Self {
        self.stream_url = stream_url;
        self
    }

    #[must_use]
    pub const fn api_expires_after(mut self, seconds: u64) -> Self {
        self.api_expires_after = seconds;
        self
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get API secret (use carefully - exposes secret)
    pub fn api_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }

    pub const fn expires_window(&self) -> Duration {
        Duration::from_secs(self.api_expires_after)
    }
}

/// Lifecycle policy for the streaming connection
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Reconnect automatically after a transport failure
    pub reconnect: bool,
    /// Fixed delay before each reconnect attempt
    pub reconnect_interval: Duration,
    /// Interval between `{"op":"ping"}` keep-alive frames, at least 100 ms
    pub ping_interval: Duration,
    /// How long an unanswered ping may stay unanswered before the session is
    /// dead, at least 100 ms
    pub pong_timeout: Duration,
    /// Upper bound on a single connection handshake
    pub connect_timeout: Duration,
    /// Capacity of the caller command queue
    pub command_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect: true,
            reconnect_interval: Duration::from_secs(5),
            ping_interval: Duration::from_secs(25),
            pong_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            command_buffer: 100,
        }
    }
}

impl StreamConfig {
    #[must_use]
    pub const fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
