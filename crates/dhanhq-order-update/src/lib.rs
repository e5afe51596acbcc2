/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Dhan order update crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod config;
pub mod context;
pub mod error;
pub mod ws;

pub use config::{FramePolicy, RetryConfig, SessionConfig};
pub use context::{CredentialProvider, Credentials};
pub use error::{OrderUpdateError, Result, TimeoutStage};

// Re-export commonly used types from ws
pub use ws::{
    Connection,
    Frame,
    HandlerResult,
    InboundMessage,
    ORDER_FEED_WSS,
    Observation,
    ObservationSink,
    OrderUpdate,
    ReconnectSupervisor,
    SessionEnd,
    SessionStats,
    SessionSummary,
    SupervisorSummary,
    TracingSink,
    Transport,
    TungsteniteTransport,
};
