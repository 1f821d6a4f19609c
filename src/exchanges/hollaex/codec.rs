use crate::core::errors::HollaexError;
use crate::core::kernel::WsCodec;
use crate::exchanges::hollaex::stream::registry::{WireAction, WireOp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Inbound stream messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HollaexWsMessage {
    /// Server reply to `{"op":"ping"}`
    Pong,
    /// Any other frame, forwarded unparsed
    Frame(String),
}

/// Client → server request
#[derive(Debug, Serialize)]
struct HollaexRequest<'a> {
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,
}

/// Typed view of a server data frame
///
/// The stream forwards frames as raw text; callers that want structure can
/// parse them with [`StreamFrame::parse`].
#[derive(Debug, Clone, Deserialize)]
pub struct StreamFrame {
    pub topic: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub time: Option<i64>,
}

impl StreamFrame {
    pub fn parse(text: &str) -> Result<Self, HollaexError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// HollaEx WebSocket codec implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct HollaexCodec;

impl HollaexCodec {
    pub const fn new() -> Self {
        Self
    }

    /// Encode one planned wire operation
    pub fn encode_op(&self, op: &WireOp) -> Result<Message, HollaexError> {
        let arg = [op.key.to_string()];
        match op.action {
            WireAction::Subscribe => self.encode_subscription(&arg),
            WireAction::Unsubscribe => self.encode_unsubscription(&arg),
        }
    }

    fn encode(op: &str, args: Option<Vec<String>>) -> Result<Message, HollaexError> {
        let json = serde_json::to_string(&HollaexRequest { op, args })?;
        Ok(Message::Text(json))
    }

    fn is_pong(text: &str) -> bool {
        serde_json::from_str::<Value>(text).map_or(false, |value| {
            value.get("message").and_then(Value::as_str) == Some("pong")
                || value.get("op").and_then(Value::as_str) == Some("pong")
        })
    }

    fn decode_text(text: String) -> HollaexWsMessage {
        if Self::is_pong(&text) {
            HollaexWsMessage::Pong
        } else {
            HollaexWsMessage::Frame(text)
        }
    }
}

impl WsCodec for HollaexCodec {
    type Message = HollaexWsMessage;

    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, HollaexError> {
        let args = streams.iter().map(|s| s.as_ref().to_string()).collect();
        Self::encode(WireAction::Subscribe.as_str(), Some(args))
    }

    fn encode_unsubscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Message, HollaexError> {
        let args = streams.iter().map(|s| s.as_ref().to_string()).collect();
        Self::encode(WireAction::Unsubscribe.as_str(), Some(args))
    }

    fn encode_ping(&self) -> Result<Message, HollaexError> {
        Self::encode("ping", None)
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, HollaexError> {
        match message {
            Message::Text(text) => Ok(Some(Self::decode_text(text))),
            Message::Binary(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    HollaexError::NetworkError(format!("Binary frame is not UTF-8: {}", e))
                })?;
                Ok(Some(Self::decode_text(text)))
            }
            Message::Pong(_) => Ok(Some(HollaexWsMessage::Pong)),
            _ => Ok(None),
        }
    }
}
