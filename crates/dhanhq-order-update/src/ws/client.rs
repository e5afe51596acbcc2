/*
[INPUT]:  Credential provider, transport, session config, update handler
[OUTPUT]: One authenticated session dispatching frames until it ends
[POS]:    WebSocket layer - session handshake and dispatch loop
[UPDATE]: When changing the login handshake or session exit handling
*/

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{FramePolicy, SessionConfig};
use crate::context::CredentialProvider;
use crate::error::{OrderUpdateError, Result, TimeoutStage};
use crate::ws::dispatch::{
    Dispatcher, HandlerResult, ObservationSink, Routed, TracingSink, UpdateHandler, preview_value,
    truncate_for_log,
};
use crate::ws::message::{InboundMessage, LoginRequest};
use crate::ws::transport::{Connection, Frame, Transport, TungsteniteTransport};

/// Order update feed endpoint
pub const ORDER_FEED_WSS: &str = "wss://api-order-update.dhan.co";

const MALFORMED_LOG_MAX_BYTES: usize = 256;

/// How a session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server sent a close frame
    ServerClosed,
    /// Frame sequence ended without a close frame
    StreamEnded,
    /// Caller cancelled the session
    Cancelled,
}

/// Per-session counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub frames_received: u64,
    pub observations: u64,
    pub handler_calls: u64,
    pub malformed_skipped: u64,
    pub handler_faults_skipped: u64,
}

/// Report of a session that ended cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub stats: SessionStats,
    pub end: SessionEnd,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Counters and outcome of a session, whichever way it ended
#[derive(Debug)]
pub(crate) struct SessionReport {
    pub(crate) stats: SessionStats,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: DateTime<Utc>,
    pub(crate) outcome: Result<SessionEnd>,
}

impl SessionReport {
    pub(crate) fn into_result(self) -> Result<SessionSummary> {
        let end = self.outcome?;
        Ok(SessionSummary {
            stats: self.stats,
            end,
            started_at: self.started_at,
            ended_at: self.ended_at,
        })
    }
}

/// Client for the order update WebSocket feed
pub struct OrderUpdate<T: Transport = TungsteniteTransport> {
    client_id: String,
    access_token: String,
    transport: T,
    config: SessionConfig,
    on_update: Option<UpdateHandler>,
    sink: Arc<dyn ObservationSink>,
}

impl OrderUpdate<TungsteniteTransport> {
    /// Create a client reading the credentials from `context` once
    pub fn new(context: &impl CredentialProvider) -> Self {
        Self::with_transport(context, TungsteniteTransport)
    }
}

impl<T: Transport> OrderUpdate<T> {
    /// Create a client over a custom transport
    pub fn with_transport(context: &impl CredentialProvider, transport: T) -> Self {
        Self {
            client_id: context.client_id(),
            access_token: context.access_token(),
            transport,
            config: SessionConfig::default(),
            on_update: None,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default log-line presentation
    pub fn with_sink(mut self, sink: impl ObservationSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Register the update handler. Takes `&mut self`, so it cannot change
    /// while a session borrows the client.
    pub fn set_on_update<F>(&mut self, handler: F)
    where
        F: Fn(&InboundMessage) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_update = Some(Box::new(handler));
    }

    pub fn clear_on_update(&mut self) {
        self.on_update = None;
    }

    pub fn has_update_handler(&self) -> bool {
        self.on_update.is_some()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn endpoint(&self) -> &'static str {
        ORDER_FEED_WSS
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connect, log in and dispatch frames until the connection ends
    pub async fn connect_order_update(&self) -> Result<SessionSummary> {
        self.run_until_cancelled(&CancellationToken::new()).await
    }

    /// Same as [`connect_order_update`](Self::connect_order_update), ending
    /// with [`SessionEnd::Cancelled`] once `shutdown` fires
    pub async fn run_until_cancelled(&self, shutdown: &CancellationToken) -> Result<SessionSummary> {
        self.run_session(shutdown).await.into_result()
    }

    /// Blocking entry point. Runs the session on a dedicated thread with its
    /// own current-thread runtime and reports any failure through the log
    /// instead of returning it. Safe to call from inside an async context.
    pub fn connect_to_dhan_websocket_sync(&self) {
        // block_on panics on a thread that already drives a runtime
        let joined = std::thread::scope(|scope| scope.spawn(|| self.block_on_session()).join());
        if joined.is_err() {
            error!("Error in connect_to_dhan_websocket: session thread panicked");
        }
    }

    fn block_on_session(&self) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(error = %err, "Error in connect_to_dhan_websocket");
                return;
            }
        };

        match runtime.block_on(self.connect_order_update()) {
            Ok(summary) => info!(
                end = ?summary.end,
                frames = summary.stats.frames_received,
                "order update session ended"
            ),
            Err(err) => error!(error = %err, "Error in connect_to_dhan_websocket"),
        }
    }

    pub(crate) async fn run_session(&self, shutdown: &CancellationToken) -> SessionReport {
        let started_at = Utc::now();
        let mut stats = SessionStats::default();

        let outcome = match self.config.validate() {
            Ok(()) => self.open_and_dispatch(shutdown, &mut stats).await,
            Err(err) => Err(err),
        };

        SessionReport {
            stats,
            started_at,
            ended_at: Utc::now(),
            outcome,
        }
    }

    async fn open_and_dispatch(
        &self,
        shutdown: &CancellationToken,
        stats: &mut SessionStats,
    ) -> Result<SessionEnd> {
        let mut connection = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(SessionEnd::Cancelled),
            opened = self.open_transport() => opened?,
        };

        // from here on every path goes through the close below
        let login = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            sent = self.send_login(&mut connection) => Some(sent),
        };

        let outcome = match login {
            None => {
                debug!("order update session cancelled during login");
                Ok(SessionEnd::Cancelled)
            }
            Some(Err(err)) => Err(err),
            Some(Ok(())) => self.dispatch_loop(&mut connection, shutdown, stats).await,
        };

        if let Err(err) = connection.close().await {
            debug!(error = %err, "order update connection close failed");
        }
        debug!(?stats, "order update connection released");

        outcome
    }

    async fn open_transport(&self) -> Result<T::Connection> {
        info!(endpoint = ORDER_FEED_WSS, client_id = %self.client_id, "connecting to order update feed");

        let connect = self.transport.connect(ORDER_FEED_WSS);
        match self.config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| OrderUpdateError::Timeout {
                    stage: TimeoutStage::Connect,
                    duration_secs: limit.as_secs(),
                })?,
            None => connect.await,
        }
    }

    async fn send_login(&self, connection: &mut T::Connection) -> Result<()> {
        let login = LoginRequest::new(&self.client_id, &self.access_token);
        let payload = login.to_json().map_err(|err| {
            OrderUpdateError::ConnectionFailed(format!("serialize login request: {err}"))
        })?;

        connection
            .send_text(payload)
            .await
            .map_err(|err| OrderUpdateError::ConnectionFailed(format!("send login request: {err}")))?;

        // no acknowledgment is awaited; the session is live once this is sent
        info!(client_id = %self.client_id, "login request sent");
        Ok(())
    }

    async fn dispatch_loop(
        &self,
        connection: &mut T::Connection,
        shutdown: &CancellationToken,
        stats: &mut SessionStats,
    ) -> Result<SessionEnd> {
        let dispatcher = Dispatcher::new(self.on_update.as_ref(), self.sink.as_ref());

        loop {
            let frame = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("order update session cancelled");
                    return Ok(SessionEnd::Cancelled);
                }
                frame = self.next_frame(connection) => frame?,
            };

            let text = match frame {
                None => {
                    info!(frames = stats.frames_received, "order update stream ended");
                    return Ok(SessionEnd::StreamEnded);
                }
                Some(Frame::Close) => {
                    info!(frames = stats.frames_received, "order update feed closed by server");
                    return Ok(SessionEnd::ServerClosed);
                }
                Some(Frame::Text(text)) => Ok(text),
                Some(Frame::Binary(bytes)) => {
                    String::from_utf8(bytes).map_err(|err| {
                        OrderUpdateError::malformed(err.utf8_error(), err.as_bytes().len())
                    })
                }
            };

            stats.frames_received += 1;
            self.handle_frame(&dispatcher, text, stats)?;
        }
    }

    async fn next_frame(&self, connection: &mut T::Connection) -> Result<Option<Frame>> {
        match self.config.idle_timeout() {
            Some(limit) => tokio::time::timeout(limit, connection.next_frame())
                .await
                .map_err(|_| OrderUpdateError::Timeout {
                    stage: TimeoutStage::Idle,
                    duration_secs: limit.as_secs(),
                })?
                .transpose(),
            None => connection.next_frame().await.transpose(),
        }
    }

    fn handle_frame(
        &self,
        dispatcher: &Dispatcher<'_>,
        text: Result<String>,
        stats: &mut SessionStats,
    ) -> Result<()> {
        let message = match text.and_then(|text| {
            InboundMessage::parse(&text).inspect_err(|err| {
                debug!(
                    error = %err,
                    frame = %truncate_for_log(&text, MALFORMED_LOG_MAX_BYTES),
                    "ws message parse failed"
                );
            })
        }) {
            Ok(message) => message,
            Err(err) => {
                return skip_or_abort(self.config.malformed_frames, err, &mut stats.malformed_skipped);
            }
        };

        match dispatcher.dispatch(&message) {
            Ok(Routed::Observed) => stats.observations += 1,
            Ok(Routed::Handled) => stats.handler_calls += 1,
            Err(err) => {
                stats.handler_calls += 1;
                debug!(message = %preview_value(message.as_value()), "update handler rejected message");
                return skip_or_abort(self.config.handler_errors, err, &mut stats.handler_faults_skipped);
            }
        }

        Ok(())
    }
}

fn skip_or_abort(policy: FramePolicy, err: OrderUpdateError, skipped: &mut u64) -> Result<()> {
    match policy {
        FramePolicy::Skip => {
            *skipped += 1;
            warn!(error = %err, skipped = *skipped, "skipping frame");
            Ok(())
        }
        FramePolicy::Abort => {
            warn!(error = %err, "ending order update session");
            Err(err)
        }
    }
}
