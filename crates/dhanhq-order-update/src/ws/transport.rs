/*
[INPUT]:  Endpoint URL, outbound text frames
[OUTPUT]: Open connection yielding inbound frames in receipt order
[POS]:    WebSocket layer - transport seam and tokio-tungstenite implementation
[UPDATE]: When swapping the WebSocket stack or changing frame handling
*/

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

use crate::error::{OrderUpdateError, Result};

/// Data frame handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Server sent a close frame
    Close,
}

/// Opens connections to a URL
#[async_trait]
pub trait Transport: Send + Sync {
    type Connection: Connection;

    /// Errors must be reported as `OrderUpdateError::ConnectionFailed`
    async fn connect(&self, url: &str) -> Result<Self::Connection>;
}

/// One open, bidirectional frame channel
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next data frame; `None` once the stream is exhausted
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Release the connection. Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;
}

/// Default transport backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

#[async_trait]
impl Transport for TungsteniteTransport {
    type Connection = TungsteniteConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection> {
        // Err only means a provider is already installed
        let _ = rustls::crypto::ring::default_provider().install_default();

        let url = Url::parse(url).map_err(|err| {
            OrderUpdateError::ConnectionFailed(format!("invalid endpoint {url}: {err}"))
        })?;

        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|err| OrderUpdateError::ConnectionFailed(err.to_string()))?;
        debug!(status = %response.status(), endpoint = %url, "ws handshake complete");

        Ok(TungsteniteConnection { stream })
    }
}

pub struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for TungsteniteConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|err| OrderUpdateError::Transport(err.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => return Some(Ok(Frame::Text(text.to_string()))),
                Ok(WsMessage::Binary(bytes)) => return Some(Ok(Frame::Binary(bytes.to_vec()))),
                Ok(WsMessage::Close(close)) => {
                    debug!(?close, "ws close frame received");
                    return Some(Ok(Frame::Close));
                }
                // tungstenite answers pings itself
                Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => continue,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                Err(err) => return Some(Err(OrderUpdateError::Transport(err.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(OrderUpdateError::Transport(err.to_string())),
        }
    }
}
