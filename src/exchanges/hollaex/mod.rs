pub mod builder;
pub mod codec;
pub mod rest;
pub mod signer;
pub mod stream;
pub mod types;

/// Venue name carried by the transport clients for logging
pub(crate) const VENUE: &str = "hollaex";

// Re-export main types for easier importing
pub use builder::{build_auth_query, build_rest_client, build_stream_client};
pub use codec::{HollaexCodec, HollaexWsMessage, StreamFrame};
pub use rest::HollaexRest;
pub use signer::HollaexSigner;
pub use stream::{ConnectionState, EventKind, StreamClient, StreamEvent, SubscriptionKey, Topic};
pub use types::{
    HollaexOrder, HollaexOrderBook, HollaexOrderBooks, HollaexOrderPage, HollaexPriceLevel,
    HollaexTicker, HollaexTrade, HollaexTrades, OrderRequest, OrderSide, OrderType,
};
