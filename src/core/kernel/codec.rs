use crate::core::errors::HollaexError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for handling venue-specific WebSocket message encoding/decoding
///
/// This trait defines the contract for converting between raw WebSocket messages
/// and typed messages. Close frames never reach the codec; the session handles
/// them.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed inbound messages
    type Message: Send + Sync;

    /// Encode a subscription request for the given stream identifiers
    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, HollaexError>;

    /// Encode an unsubscription request for the given stream identifiers
    fn encode_unsubscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, HollaexError>;

    /// Encode the application-level keep-alive frame
    fn encode_ping(&self) -> Result<Message, HollaexError>;

    /// Decode a raw data message
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored by the codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, HollaexError>;
}
