//! In-memory [`Connector`] for exercising the client without a network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use super::transport::{Connector, Frame, Transport};
use crate::error::TransportError;
use crate::types::ClientMessage;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Script {
    failures: VecDeque<TransportError>,
    endpoints: Vec<String>,
}

/// Client half: hand to [`ReconnectingClient::connect_with`](super::ReconnectingClient::connect_with)
pub(crate) struct MockConnector {
    gate: Arc<Semaphore>,
    script: Arc<Mutex<Script>>,
    sessions: mpsc::UnboundedSender<MockSession>,
}

/// Server half: decides when connections are accepted and hands out sessions
pub(crate) struct MockServer {
    gate: Arc<Semaphore>,
    script: Arc<Mutex<Script>>,
    sessions: mpsc::UnboundedReceiver<MockSession>,
}

pub(crate) fn pair() -> (MockConnector, MockServer) {
    let gate = Arc::new(Semaphore::new(0));
    let script = Arc::new(Mutex::new(Script::default()));
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MockConnector {
            gate: gate.clone(),
            script: script.clone(),
            sessions: tx,
        },
        MockServer {
            gate,
            script,
            sessions: rx,
        },
    )
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
        let failure = {
            let mut script = self.script.lock().unwrap();
            script.endpoints.push(endpoint.to_string());
            script.failures.pop_front()
        };
        if let Some(err) = failure {
            return Err(err);
        }

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| TransportError::Connect("mock server gone".to_string()))?;
        permit.forget();

        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, from_server) = mpsc::unbounded_channel();
        let closed = Arc::new(Mutex::new(None));

        let session = MockSession {
            sent: from_client,
            inbound: Some(to_client),
            closed: closed.clone(),
        };
        self.sessions
            .send(session)
            .map_err(|_| TransportError::Connect("mock server gone".to_string()))?;

        Ok(Box::new(MockTransport {
            outbound: to_server,
            inbound: from_server,
            closed,
        }))
    }
}

impl MockServer {
    /// Let `n` more connection attempts through
    pub(crate) fn accept(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Make the next attempt fail without consuming a permit
    pub(crate) fn fail_next(&self, err: TransportError) {
        self.script.lock().unwrap().failures.push_back(err);
    }

    pub(crate) fn endpoints(&self) -> Vec<String> {
        self.script.lock().unwrap().endpoints.clone()
    }

    /// Wait for the client to open its next session
    pub(crate) async fn next_session(&mut self) -> MockSession {
        tokio::time::timeout(RECV_TIMEOUT, self.sessions.recv())
            .await
            .expect("timed out waiting for a session")
            .expect("connector dropped")
    }

    /// Accept one connection and wait for it
    pub(crate) async fn accept_session(&mut self) -> MockSession {
        self.accept(1);
        self.next_session().await
    }
}

/// The server's view of one connection
pub(crate) struct MockSession {
    sent: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<Result<Frame, TransportError>>>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockSession {
    /// Next frame written by the client
    pub(crate) async fn next_sent(&mut self) -> ClientMessage {
        let text = tokio::time::timeout(RECV_TIMEOUT, self.sent.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client transport dropped");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Next `count` frames written by the client
    pub(crate) async fn take_sent(&mut self, count: usize) -> Vec<ClientMessage> {
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            frames.push(self.next_sent().await);
        }
        frames
    }

    /// Everything the client wrote that has not been read yet
    pub(crate) fn drain_sent(&mut self) -> Vec<ClientMessage> {
        let mut frames = Vec::new();
        while let Ok(text) = self.sent.try_recv() {
            frames.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
        }
        frames
    }

    pub(crate) fn push(&self, value: serde_json::Value) {
        self.push_text(&value.to_string());
    }

    pub(crate) fn push_text(&self, text: &str) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Ok(Frame::Text(text.to_string())));
        }
    }

    /// Terminate the connection with a transport error
    pub(crate) fn fail(&self, err: TransportError) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Err(err));
        }
    }

    /// End the inbound stream as if the socket had been torn down
    pub(crate) fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Close code and reason the client sent, if it closed gracefully
    pub(crate) fn closed_with(&self) -> Option<(u16, String)> {
        self.closed.lock().unwrap().clone()
    }
}

struct MockTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .map_err(|_| TransportError::Send("mock session dropped".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self, code: u16, reason: &str) {
        *self.closed.lock().unwrap() = Some((code, reason.to_string()));
    }
}
