use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::chat::message::{ChatBatch, OutboundFrame, ServerMessage, SERVE_HISTORY};
use crate::crypto::PUBLIC_KEY_HEADER;

use super::{ChatTransport, TransportError};

/// Push transport over a pair of channels.
///
/// Whatever drives the socket (or the in-memory [`MemoryRelay`]) reads
/// [`OutboundFrame`]s from the sending side and feeds decoded
/// [`ServerMessage`]s into the receiving side. Reconnecting means building
/// a new transport and calling
/// [`EncryptedChat::on_reconnect`](crate::chat::EncryptedChat::on_reconnect).
#[derive(Debug, Clone)]
pub struct PushTransport {
    outbound: flume::Sender<OutboundFrame>,
    inbound: flume::Receiver<ServerMessage>,
}

impl PushTransport {
    pub fn new(outbound: flume::Sender<OutboundFrame>, inbound: flume::Receiver<ServerMessage>) -> Self {
        Self { outbound, inbound }
    }

    async fn push(&self, message: &str, nick: &str) -> Result<Option<ChatBatch>, TransportError> {
        self.outbound
            .send_async(OutboundFrame::message(message, nick))
            .await
            .map_err(|_| TransportError::Closed)?;
        Ok(None)
    }
}

#[async_trait]
impl ChatTransport for PushTransport {
    async fn announce(
        &self,
        public_key: &str,
        nick: &str,
    ) -> Result<Option<ChatBatch>, TransportError> {
        self.push(public_key, nick).await
    }

    async fn send(
        &self,
        message: &str,
        nick: &str,
        _offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError> {
        self.push(message, nick).await
    }

    // the relay replays everything, dedup happens on our side
    async fn request_history(
        &self,
        nick: &str,
        _offset: f64,
    ) -> Result<Option<ChatBatch>, TransportError> {
        self.push(SERVE_HISTORY, nick).await
    }

    async fn recv(&self, _offset: f64) -> Result<ChatBatch, TransportError> {
        let message = self
            .inbound
            .recv_async()
            .await
            .map_err(|_| TransportError::Closed)?;
        Ok(ChatBatch::single(message))
    }
}

struct RelayClient {
    id: u64,
    nick: String,
    inbound: flume::Sender<ServerMessage>,
}

#[derive(Default)]
struct RelayInner {
    clients: Vec<RelayClient>,
    // latest announced key per nick
    keys: HashMap<String, String>,
    history: Vec<ServerMessage>,
    last_index: u64,
    next_client: u64,
}

impl RelayInner {
    fn peer_connected(&self, nick: &str) -> bool {
        self.clients.iter().any(|client| client.nick != nick)
    }

    fn deliver(&self, client: &RelayClient, message: &ServerMessage) {
        let mut message = message.clone();
        message.peer_connected = Some(self.peer_connected(&client.nick));
        // a dropped client is cleaned up when its task ends
        let _ = client.inbound.send(message);
    }

    fn broadcast(&self, message: &ServerMessage) {
        for client in &self.clients {
            self.deliver(client, message);
        }
    }
}

/// In-memory stand-in for the coordinator's chat socket.
///
/// Assigns indices, keeps the encrypted history, relays announced keys and
/// answers history requests. Needs a tokio runtime: every connected
/// transport is served by a spawned task.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    inner: Arc<Mutex<RelayInner>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, nick: &str) -> PushTransport {
        let (outbound_tx, outbound_rx) = flume::unbounded::<OutboundFrame>();
        let (inbound_tx, inbound_rx) = flume::unbounded::<ServerMessage>();

        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_client;
            inner.next_client += 1;
            inner.clients.push(RelayClient {
                id,
                nick: nick.to_string(),
                inbound: inbound_tx,
            });
            id
        };

        let relay = self.clone();
        tokio::spawn(async move {
            while let Ok(frame) = outbound_rx.recv_async().await {
                relay.handle(id, frame);
            }
            relay.inner.lock().clients.retain(|client| client.id != id);
        });

        PushTransport::new(outbound_tx, inbound_rx)
    }

    /// Messages stored so far, in index order
    pub fn history(&self) -> Vec<ServerMessage> {
        self.inner.lock().history.clone()
    }

    /// Deliver a raw frame to every client, bypassing indexing
    pub fn inject(&self, message: ServerMessage) {
        self.inner.lock().broadcast(&message);
    }

    fn handle(&self, client_id: u64, frame: OutboundFrame) {
        let mut inner = self.inner.lock();
        let Some(position) = inner.clients.iter().position(|c| c.id == client_id) else {
            return;
        };
        let nick = inner.clients[position].nick.clone();
        let time = chrono::Utc::now().to_rfc3339();

        if frame.message == SERVE_HISTORY {
            let client = &inner.clients[position];
            for message in &inner.history {
                inner.deliver(client, message);
            }
            return;
        }

        if frame.message.starts_with(PUBLIC_KEY_HEADER) {
            inner.keys.insert(nick.clone(), frame.message.clone());
            let announcement = ServerMessage {
                message: frame.message,
                nick: nick.clone(),
                index: 0.0,
                time,
                peer_connected: None,
            };
            inner.broadcast(&announcement);

            // late joiners still learn keys announced before they connected
            let client = &inner.clients[position];
            for (owner, key) in inner.keys.iter().filter(|(owner, _)| **owner != nick) {
                inner.deliver(
                    client,
                    &ServerMessage {
                        message: key.clone(),
                        nick: owner.clone(),
                        index: 0.0,
                        time: announcement.time.clone(),
                        peer_connected: None,
                    },
                );
            }
            return;
        }

        inner.last_index += 1;
        let message = ServerMessage {
            message: frame.message,
            nick,
            index: inner.last_index as f64,
            time,
            peer_connected: None,
        };
        // the # channel is relayed but never logged
        if !message.message.starts_with('#') {
            inner.history.push(message.clone());
        }
        inner.broadcast(&message);
    }
}
