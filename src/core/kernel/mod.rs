/// Kernel - venue-agnostic transport layer
///
/// The kernel holds only transport logic and the seams venue code plugs into:
///
/// ## Transport Layer
/// - `RestClient`: HTTP client interface, one round trip per call
/// - `WsConnector` / `WsConnection`: websocket connection factory and handle
///
/// ## Authentication
/// - `Signer`: pluggable request signing, shared by REST and the stream handshake
///
/// ## Message Handling
/// - `WsCodec`: venue-specific message encoding/decoding
///
/// Nothing here reconnects or retries. Reconnection is a stream-level policy and
/// lives with the connection supervisor.
///
/// # Example
/// ```rust,no_run
/// use hollaex::core::kernel::*;
/// use hollaex::exchanges::hollaex::HollaexSigner;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), hollaex::HollaexError> {
/// let config = RestClientConfig::new(
///     "https://api.hollaex.com".to_string(),
///     "/v2".to_string(),
///     "hollaex".to_string(),
/// );
/// let signer = Arc::new(HollaexSigner::new("api_key".to_string(), "api_secret".to_string()));
/// let rest = RestClientBuilder::new(config).with_signer(signer).build()?;
/// # let _ = rest;
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod rest;
pub mod signer;
pub mod ws;

pub use codec::WsCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{expires_at, now_unix, SignatureResult, Signer};
pub use ws::{TungsteniteConnector, TungsteniteWs, WsConnection, WsConnector};
