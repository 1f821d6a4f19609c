use crate::core::config::ConfigError;
use crate::core::errors::HollaexError;
use crate::core::kernel::signer::{expires_at, Signer};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, trace};

/// REST client trait for making HTTP requests
///
/// There is deliberately no retry layer: every call is a single HTTP round trip.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request with strongly-typed response
    ///
    /// # Arguments
    /// * `endpoint` - Path below the API base path, e.g. `/ticker`
    /// * `query_params` - Query parameters as key-value pairs
    /// * `authenticated` - Whether to sign the request
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, HollaexError>;

    /// Make a POST request with a JSON body and strongly-typed response
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
        authenticated: bool,
    ) -> Result<T, HollaexError>;

    /// Make a DELETE request with strongly-typed response
    async fn delete_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, HollaexError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Scheme and host, e.g. `https://api.hollaex.com`
    pub base_url: String,
    /// Version prefix shared by every endpoint, e.g. `/v2`
    pub base_path: String,
    /// Venue name for logging and tracing
    pub venue: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Validity window of a request signature
    pub expires_after: Duration,
}

impl RestClientConfig {
    pub fn new(base_url: String, base_path: String, venue: String) -> Self {
        Self {
            base_url,
            base_path,
            venue,
            timeout_seconds: 30,
            user_agent: concat!("hollaex-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            expires_after: Duration::from_secs(60),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Set how long a request signature stays valid
    pub fn with_expires_after(mut self, expires_after: Duration) -> Self {
        self.expires_after = expires_after;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, HollaexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    /// Build the full URL for an endpoint, query string included
    pub(crate) fn build_url(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<Url, HollaexError> {
        let raw = format!(
            "{}{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.base_path,
            endpoint
        );
        let mut url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidConfiguration(format!("Invalid request URL '{}': {}", raw, e))
        })?;

        if !query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(query_params);
        }
        Ok(url)
    }

    /// Attach `api-key`, `api-signature` and `api-expires` headers
    ///
    /// The signed path is exactly what goes on the wire: path plus query string.
    pub(crate) fn sign(
        &self,
        mut request: RequestBuilder,
        method: &Method,
        url: &Url,
        body: Option<&str>,
    ) -> Result<RequestBuilder, HollaexError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            HollaexError::AuthError("Authentication required but no signer provided".to_string())
        })?;

        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let expires = expires_at(self.config.expires_after);
        let headers = signer.sign_request(method.as_str(), &path, expires, body)?;

        for (key, value) in headers {
            request = request.header(key, value);
        }
        Ok(request)
    }

    /// Handle the response and extract JSON
    #[instrument(skip(self, response), fields(venue = %self.config.venue, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, HollaexError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            HollaexError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            Ok(serde_json::from_str(&response_text)?)
        } else {
            Err(HollaexError::ApiError {
                code: status.as_u16(),
                message: response_text,
            })
        }
    }

    /// Make a request with the given parameters
    #[instrument(skip(self, body, query_params), fields(venue = %self.config.venue, method = %method, endpoint = %endpoint))]
    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: Option<String>,
        authenticated: bool,
    ) -> Result<Value, HollaexError> {
        let url = self.build_url(endpoint, query_params)?;
        let mut request = self.client.request(method.clone(), url.clone());

        if authenticated {
            request = self.sign(request, &method, &url, body.as_deref())?;
        }

        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HollaexError::NetworkError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, HollaexError> {
        let value = self
            .make_request(Method::GET, endpoint, query_params, None, authenticated)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
        authenticated: bool,
    ) -> Result<T, HollaexError> {
        let body = serde_json::to_string(body)?;
        let value = self
            .make_request(Method::POST, endpoint, &[], Some(body), authenticated)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn delete_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<T, HollaexError> {
        let value = self
            .make_request(Method::DELETE, endpoint, query_params, None, authenticated)
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}
