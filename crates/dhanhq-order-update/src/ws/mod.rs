/*
[INPUT]:  Credentials, transport and session configuration
[OUTPUT]: Order alerts routed to the update handler or observation sink
[POS]:    WebSocket layer - order update feed
[UPDATE]: When adding message types or changing connection logic
*/

pub mod client;
pub mod dispatch;
pub mod message;
pub mod reconnect;
pub mod transport;

pub use client::{ORDER_FEED_WSS, OrderUpdate, SessionEnd, SessionStats, SessionSummary};
pub use dispatch::{
    BoxError, Dispatcher, HandlerResult, ObservationSink, Routed, TracingSink, UpdateHandler,
};
pub use message::{InboundMessage, LoginRequest, Observation};
pub use reconnect::{ReconnectSupervisor, SupervisorSummary};
pub use transport::{Connection, Frame, Transport, TungsteniteTransport};
