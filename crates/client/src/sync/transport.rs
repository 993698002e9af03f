// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the real-time channel.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing

use std::future::Future;
use std::pin::Pin;

use fieldsync_core::{ClientFrame, DisconnectReason, ServerFrame};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// What `recv` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Frame(ServerFrame),
    /// The connection is gone. The transport is disconnected afterwards.
    Closed(DisconnectReason),
}

/// Transport trait for the duplex real-time connection.
pub trait Transport: Send + Sync {
    /// Connect and authenticate with `token`.
    fn connect<'a>(
        &'a mut self,
        url: &'a str,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + 'a>>;

    /// Disconnect from the server.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Send a frame to the server.
    fn send(
        &mut self,
        frame: ClientFrame,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Receive the next frame, or learn that the connection closed.
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<Inbound>> + Send + '_>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport implementation using tokio-tungstenite.
pub struct WebSocketTransport {
    ws: Option<WebSocketConnection>,
}

struct WebSocketConnection {
    sink: futures_util::stream::SplitSink<WsStream, tokio_tungstenite::tungstenite::Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect<'a>(
        &'a mut self,
        url: &'a str,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + 'a>> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::client::IntoClientRequest;
            use tokio_tungstenite::tungstenite::http::{header, HeaderValue};

            let mut request = url
                .into_client_request()
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            request.headers_mut().insert(header::AUTHORIZATION, bearer);

            let (ws_stream, _) = tokio_tungstenite::connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.ws = Some(WebSocketConnection { sink, stream });

            // The server expects the auth frame before anything else.
            if let Err(e) = self.send(ClientFrame::auth(token)).await {
                self.ws = None;
                return Err(TransportError::ConnectionFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                use futures_util::SinkExt;
                let _ = ws.sink.close().await;
            }
            Ok(())
        })
    }

    fn send(
        &mut self,
        frame: ClientFrame,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            let json = frame
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;

            if let Err(e) = ws.sink.send(Message::Text(json.into())).await {
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }

            if let Err(e) = ws.sink.flush().await {
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }

            Ok(())
        })
    }

    fn recv(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<Inbound>> + Send + '_>> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let frame = ServerFrame::from_json(&text)
                            .map_err(|e| TransportError::SerializationError(e.to_string()))?;
                        if let ServerFrame::Disconnect { .. } = frame {
                            self.ws = None;
                            return Ok(Inbound::Closed(DisconnectReason::ServerInitiated));
                        }
                        return Ok(Inbound::Frame(frame));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.ws = None;
                        return Ok(Inbound::Closed(DisconnectReason::TransportClose));
                    }
                    Some(Ok(_)) => {
                        // Ping/pong and binary frames carry nothing for us
                        continue;
                    }
                    Some(Err(e)) => {
                        tracing::debug!("websocket receive failed: {}", e);
                        self.ws = None;
                        return Ok(Inbound::Closed(DisconnectReason::TransportError));
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
