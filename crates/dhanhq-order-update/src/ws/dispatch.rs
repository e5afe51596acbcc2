/*
[INPUT]:  Parsed InboundMessage, optional update handler, observation sink
[OUTPUT]: Handler invocation or one Observation per frame
[POS]:    WebSocket layer - frame classification and routing
[UPDATE]: When adding message types or changing routing order
*/

use std::error::Error as StdError;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{OrderUpdateError, Result};
use crate::ws::message::{InboundMessage, Observation};

const RAW_LOG_MAX_BYTES: usize = 1024;

/// Error type update handlers may return
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Result of one update handler call
pub type HandlerResult = std::result::Result<(), BoxError>;

/// Callback that absorbs every order alert once registered
pub type UpdateHandler = Box<dyn Fn(&InboundMessage) -> HandlerResult + Send + Sync>;

/// Receives the observations the dispatcher produces
pub trait ObservationSink: Send + Sync {
    fn observe(&self, observation: Observation);
}

/// Default presentation: one log line per observation
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn observe(&self, observation: Observation) {
        match observation {
            Observation::Unknown { message } => {
                let preview = truncate_for_log(&message.to_string(), RAW_LOG_MAX_BYTES);
                info!(message = %preview, "unknown message received");
            }
            Observation::OrderStatus {
                status,
                order_id,
                data,
            } => {
                let preview = truncate_for_log(&data.to_string(), RAW_LOG_MAX_BYTES);
                info!(%status, %order_id, data = %preview, "order status update");
            }
            Observation::OrderUpdate { data } => {
                let preview = truncate_for_log(&data.to_string(), RAW_LOG_MAX_BYTES);
                info!(data = %preview, "order update received");
            }
        }
    }
}

impl ObservationSink for mpsc::UnboundedSender<Observation> {
    fn observe(&self, observation: Observation) {
        if self.send(observation).is_err() {
            debug!("observation receiver dropped");
        }
    }
}

/// How a frame was routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// An observation went to the sink
    Observed,
    /// The update handler took the frame
    Handled,
}

/// Routes one message at a time; borrows the handler and sink for a session
pub struct Dispatcher<'a> {
    handler: Option<&'a UpdateHandler>,
    sink: &'a dyn ObservationSink,
}

impl<'a> Dispatcher<'a> {
    pub fn new(handler: Option<&'a UpdateHandler>, sink: &'a dyn ObservationSink) -> Self {
        Self { handler, sink }
    }

    /// Classify and route a message. First match wins:
    /// non order alerts are observed raw, then the handler if registered,
    /// then the default order alert presentation.
    pub fn dispatch(&self, message: &InboundMessage) -> Result<Routed> {
        if !message.is_order_alert() {
            self.sink.observe(Observation::Unknown {
                message: message.as_value().clone(),
            });
            return Ok(Routed::Observed);
        }

        if let Some(handler) = self.handler {
            return handler(message)
                .map(|()| Routed::Handled)
                .map_err(|err| OrderUpdateError::HandlerFault(err.to_string()));
        }

        self.sink.observe(Observation::from_order_alert(message));
        Ok(Routed::Observed)
    }
}

pub(crate) fn preview_value(value: &Value) -> String {
    truncate_for_log(&value.to_string(), RAW_LOG_MAX_BYTES)
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut cut = max_len;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = String::with_capacity(cut + 3);
    out.push_str(&value[..cut]);
    out.push_str("...");
    out
}
