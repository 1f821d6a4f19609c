pub mod core;
pub mod exchanges;

pub use crate::core::{
    config::{HollaexConfig, StreamConfig},
    errors::HollaexError,
};
pub use exchanges::hollaex::{
    build_rest_client, build_stream_client, ConnectionState, EventKind, HollaexRest,
    StreamClient, StreamEvent,
};
