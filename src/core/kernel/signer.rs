use crate::core::errors::HollaexError;
use std::collections::HashMap;
use std::time::Duration;

pub const HEADER_API_KEY: &str = "api-key";
pub const HEADER_API_SIGNATURE: &str = "api-signature";
pub const HEADER_API_EXPIRES: &str = "api-expires";

/// Result type for signing operations: header name to value
pub type SignatureResult = Result<HashMap<String, String>, HollaexError>;

/// Signer trait for request authentication
///
/// The signing scheme itself is opaque to the transport. A signer turns
/// `(method, path, expires, body)` into a signature; the REST client and the
/// stream handshake both attach the result under the same three names.
pub trait Signer: Send + Sync {
    /// API key sent alongside every signature
    fn api_key(&self) -> &str;

    /// Sign a request
    ///
    /// # Arguments
    /// * `method` - HTTP verb, or `CONNECT` for the stream handshake
    /// * `path` - Request path including the query string
    /// * `expires` - Unix timestamp in seconds after which the signature is rejected
    /// * `body` - JSON body, when the request carries one
    fn sign(
        &self,
        method: &str,
        path: &str,
        expires: u64,
        body: Option<&str>,
    ) -> Result<String, HollaexError>;

    /// Produce the `api-key`, `api-signature` and `api-expires` values for a request
    fn sign_request(
        &self,
        method: &str,
        path: &str,
        expires: u64,
        body: Option<&str>,
    ) -> SignatureResult {
        let signature = self.sign(method, path, expires, body)?;

        let mut headers = HashMap::with_capacity(3);
        headers.insert(HEADER_API_KEY.to_string(), self.api_key().to_string());
        headers.insert(HEADER_API_SIGNATURE.to_string(), signature);
        headers.insert(HEADER_API_EXPIRES.to_string(), expires.to_string());
        Ok(headers)
    }
}

/// Current unix time in seconds
pub fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Unix timestamp `window` seconds from now
pub fn expires_at(window: Duration) -> u64 {
    now_unix() + window.as_secs()
}
