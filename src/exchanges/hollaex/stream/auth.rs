use crate::core::config::ConfigError;
use crate::core::errors::HollaexError;
use crate::core::kernel::signer::{
    now_unix, HEADER_API_EXPIRES, HEADER_API_KEY, HEADER_API_SIGNATURE,
};
use crate::core::kernel::Signer;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

pub const STREAM_METHOD: &str = "CONNECT";
pub const STREAM_PATH: &str = "/stream";

/// Builds the connection URL for the stream endpoint
///
/// Called once per connection attempt so every attempt gets a fresh expiry.
#[derive(Clone)]
pub struct AuthQueryBuilder {
    stream_url: String,
    signer: Option<Arc<dyn Signer>>,
    expires_after: Duration,
}

impl std::fmt::Debug for AuthQueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthQueryBuilder")
            .field("stream_url", &self.stream_url)
            .field("authenticated", &self.signer.is_some())
            .field("expires_after", &self.expires_after)
            .finish()
    }
}

impl AuthQueryBuilder {
    pub fn new(stream_url: String) -> Self {
        Self {
            stream_url,
            signer: None,
            expires_after: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    #[must_use]
    pub fn with_expires_after(mut self, expires_after: Duration) -> Self {
        self.expires_after = expires_after;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Connection URL valid from now
    pub fn build_url(&self) -> Result<String, HollaexError> {
        self.build_url_at(now_unix())
    }

    /// Connection URL as of the unix time `now`
    ///
    /// Without a signer this is the bare stream URL.
    pub fn build_url_at(&self, now: u64) -> Result<String, HollaexError> {
        let Some(signer) = &self.signer else {
            return Ok(self.stream_url.clone());
        };

        let expires = now + self.expires_after.as_secs();
        let signature = signer.sign(STREAM_METHOD, STREAM_PATH, expires, None)?;

        let mut url = Url::parse(&self.stream_url).map_err(|e| {
            ConfigError::InvalidConfiguration(format!(
                "Invalid stream URL '{}': {}",
                self.stream_url, e
            ))
        })?;
        url.query_pairs_mut()
            .append_pair(HEADER_API_KEY, signer.api_key())
            .append_pair(HEADER_API_SIGNATURE, &signature)
            .append_pair(HEADER_API_EXPIRES, &expires.to_string());

        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::hollaex::HollaexSigner;

    #[test]
    fn test_public_url_is_bare() {
        let builder = AuthQueryBuilder::new("wss://api.hollaex.com/stream".to_string());
        assert!(!builder.is_authenticated());
        assert_eq!(builder.build_url().unwrap(), "wss://api.hollaex.com/stream");
    }

    #[test]
    fn test_authenticated_url_carries_signature() {
        let signer = Arc::new(HollaexSigner::new("key".to_string(), "secret".to_string()));
        let builder = AuthQueryBuilder::new("wss://api.hollaex.com/stream".to_string())
            .with_signer(signer.clone());

        let url = builder.build_url_at(1_700_000_000).unwrap();
        let expected_signature = signer
            .sign("CONNECT", "/stream", 1_700_000_060, None)
            .unwrap();

        assert_eq!(
            url,
            format!(
                "wss://api.hollaex.com/stream?api-key=key&api-signature={}&api-expires=1700000060",
                expected_signature
            )
        );
    }

    #[test]
    fn test_custom_expiry_window() {
        let signer = Arc::new(HollaexSigner::new("key".to_string(), "secret".to_string()));
        let builder = AuthQueryBuilder::new("wss://example.com/stream".to_string())
            .with_signer(signer)
            .with_expires_after(Duration::from_secs(5));

        let url = Url::parse(&builder.build_url_at(100).unwrap()).unwrap();
        let expires = url
            .query_pairs()
            .find(|(k, _)| k == "api-expires")
            .map(|(_, v)| v.into_owned());
        assert_eq!(expires.as_deref(), Some("105"));
    }

    #[test]
    fn test_build_url_expiry_matches_rest_clock() {
        let signer = Arc::new(HollaexSigner::new("key".to_string(), "secret".to_string()));
        let builder = AuthQueryBuilder::new("wss://example.com/stream".to_string())
            .with_signer(signer)
            .with_expires_after(Duration::from_secs(30));

        let before = crate::core::kernel::expires_at(Duration::from_secs(30));
        let url = Url::parse(&builder.build_url().unwrap()).unwrap();
        let after = crate::core::kernel::expires_at(Duration::from_secs(30));

        let expires: u64 = url
            .query_pairs()
            .find(|(k, _)| k == "api-expires")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        assert!((before..=after).contains(&expires));
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let signer = Arc::new(HollaexSigner::new("key".to_string(), "secret".to_string()));
        let builder = AuthQueryBuilder::new("not a url".to_string()).with_signer(signer);
        assert!(matches!(
            builder.build_url_at(0),
            Err(HollaexError::ConfigError(_))
        ));
    }
}
