//! HollaEx streaming connection.
//!
//! [`StreamClient`] is the caller surface. Behind it a single supervisor task
//! owns the [`SubscriptionRegistry`] and at most one socket session, replays
//! the desired subscriptions whenever a session opens, and reconnects after
//! transport failures until the caller disconnects.

pub mod auth;
pub mod client;
pub mod dispatcher;
pub mod registry;
mod session;
pub mod supervisor;
pub mod topic;

pub use auth::AuthQueryBuilder;
pub use client::StreamClient;
pub use dispatcher::{EventDispatcher, EventHandler, EventKind, HandlerId, StreamEvent};
pub use registry::{SubscriptionRegistry, WireAction, WireOp};
pub use supervisor::ConnectionState;
pub use topic::{parse_keys, Symbol, SubscriptionKey, Topic};
