use crate::core::errors::HollaexError;
use crate::core::kernel::Signer;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HollaEx HMAC-SHA256 signer
///
/// signature = hex(HMAC-SHA256(secret, method + path + expires + body))
pub struct HollaexSigner {
    api_key: String,
    api_secret: Secret<String>,
}

impl HollaexSigner {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret: Secret::new(api_secret),
        }
    }
}

impl std::fmt::Debug for HollaexSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HollaexSigner")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl Signer for HollaexSigner {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn sign(
        &self,
        method: &str,
        path: &str,
        expires: u64,
        body: Option<&str>,
    ) -> Result<String, HollaexError> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.expose_secret().as_bytes())
            .map_err(|e| HollaexError::AuthError(format!("Invalid secret key: {}", e)))?;

        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(expires.to_string().as_bytes());
        if let Some(body) = body {
            mac.update(body.as_bytes());
        }

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
