//! Physical connection seam.
//!
//! The reconnecting client only ever talks to a [`Transport`] obtained from a
//! [`Connector`]. The production pair wraps `tokio-tungstenite`; tests swap
//! in an in-memory double.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::TransportError;

/// A raw application frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Opens new physical connections
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// One physical duplex connection
///
/// `recv` must be cancel-safe: the client polls it inside `tokio::select!`.
#[async_trait]
pub trait Transport: Send {
    /// Write one text frame
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next application frame, `None` once the connection has ended
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Close gracefully; errors are ignored since the session is over anyway
    async fn close(&mut self, code: u16, reason: &str);
}

/// [`Connector`] backed by `tokio-tungstenite`
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _) = connect_async(endpoint).await.map_err(|e| match e {
            WsError::Http(response) if response.status().as_u16() == 418 => {
                TransportError::Maintenance
            }
            other => TransportError::Connect(other.to_string()),
        })?;

        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text))),
                Ok(Message::Binary(bytes)) => return Some(Ok(Frame::Binary(bytes))),
                // tungstenite queues the pong itself and flushes it on the next read or write
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    if let Some(frame) = frame {
                        debug!(code = %frame.code, reason = %frame.reason, "Server closed websocket");
                    }
                    return Some(Err(TransportError::Closed));
                }
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                    return Some(Err(TransportError::Closed))
                }
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Cow::Owned(reason.to_string()),
        };
        if let Err(e) = self.stream.close(Some(frame)).await {
            debug!(error = %e, "Error while closing websocket");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    const WAIT: Duration = Duration::from_secs(2);

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("ws://{}/connect", listener.local_addr().unwrap());
        (listener, endpoint)
    }

    #[tokio::test]
    async fn test_server_ping_is_answered_once() {
        let (listener, endpoint) = listen().await;
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            ws.send(Message::Ping(b"hb".to_vec())).await.unwrap();
            ws.send(Message::Text("hello".to_string())).await.unwrap();

            let mut received = Vec::new();
            while let Some(Ok(message)) = ws.next().await {
                let done = matches!(message, Message::Text(_));
                received.push(message);
                if done {
                    break;
                }
            }
            received
        });

        let mut transport = WsConnector.connect(&endpoint).await.unwrap();
        let frame = tokio::time::timeout(WAIT, transport.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(frame, Frame::Text("hello".to_string()));
        transport.send("after".to_string()).await.unwrap();

        let received = tokio::time::timeout(WAIT, server).await.unwrap().unwrap();
        assert_eq!(
            received,
            vec![
                Message::Pong(b"hb".to_vec()),
                Message::Text("after".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_teapot_handshake_is_maintenance() {
        let (listener, endpoint) = listen().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 418 I'm a teapot\r\nContent-Length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let result = tokio::time::timeout(WAIT, WsConnector.connect(&endpoint))
            .await
            .unwrap();
        assert!(matches!(result, Err(TransportError::Maintenance)));
    }
}
