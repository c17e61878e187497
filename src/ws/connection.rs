/// Connection lifecycle: connect, authenticated handshake, reconnect, teardown
use crate::error::{ChatError, Result};
use crate::ws::backoff::ReconnectBackoff;
use crate::ws::protocol::{ClientEnvelope, ServerEnvelope};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state machine: Idle -> Connecting -> Open -> Closed, with
/// Closed -> Connecting on reconnect. Logout and auth rejection terminate
/// at Idle and schedule no reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Events delivered to the single dispatch loop, in transport order
#[derive(Debug)]
pub enum TransportEvent {
    Opened,
    Envelope(ServerEnvelope),
    Closed,
    /// Handshake rejected with 401/403: session is over, no reconnect
    AuthRejected,
}

/// Owns the WebSocket to the chat server. No other component touches the
/// socket; they observe state and request `send` / `close`.
#[derive(Clone)]
pub struct ConnectionManager {
    url: String,
    state: Arc<RwLock<ConnectionState>>,
    backoff: Arc<RwLock<ReconnectBackoff>>,
    teardown: Arc<RwLock<bool>>,
    teardown_notify: Arc<Notify>,
    outbound_tx: mpsc::UnboundedSender<String>,
}

impl ConnectionManager {
    /// Start the connection task. The session token rides as a query
    /// parameter; there is no in-band re-authentication.
    pub fn connect(
        server_url: &str,
        token: &str,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let url = format!("{}?token={}", server_url, urlencoding::encode(token));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let manager = Self {
            url,
            state: Arc::new(RwLock::new(ConnectionState::Idle)),
            backoff: Arc::new(RwLock::new(ReconnectBackoff::new())),
            teardown: Arc::new(RwLock::new(false)),
            teardown_notify: Arc::new(Notify::new()),
            outbound_tx,
        };

        let runner = manager.clone();
        tokio::spawn(async move { runner.run(outbound_rx, event_tx).await });

        (manager, event_rx)
    }

    /// Transmit an envelope. Outside `Open` the envelope is dropped at the
    /// transport boundary; the caller decides whether that matters.
    pub async fn send(&self, envelope: &ClientEnvelope) -> Result<()> {
        if *self.state.read().await != ConnectionState::Open {
            warn!("dropping {} envelope: connection not open", envelope.kind());
            return Ok(());
        }
        let text = serde_json::to_string(envelope)?;
        self.outbound_tx
            .send(text)
            .map_err(|_| ChatError::Transport("connection task gone".to_string()))?;
        Ok(())
    }

    /// Explicit teardown (logout): close the socket and schedule no further
    /// reconnects. Idempotent.
    pub async fn close(&self) {
        *self.teardown.write().await = true;
        self.teardown_notify.notify_one();
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn reconnect_attempt(&self) -> u32 {
        self.backoff.read().await.attempt()
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    async fn run(
        self,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) {
        loop {
            if *self.teardown.read().await {
                break;
            }

            self.set_state(ConnectionState::Connecting).await;
            debug!("connecting to {}", self.url);

            let attempt = tokio::select! {
                result = connect_async(self.url.as_str()) => Some(result),
                _ = self.teardown_notify.notified() => None,
            };
            let Some(result) = attempt else { break };

            match result {
                Ok((stream, _response)) => {
                    self.backoff.write().await.reset();
                    self.set_state(ConnectionState::Open).await;
                    info!("connected to chat server");
                    let _ = events.send(TransportEvent::Opened);

                    let torn_down = self.drive(stream, &mut outbound_rx, &events).await;

                    self.set_state(ConnectionState::Closed).await;
                    let _ = events.send(TransportEvent::Closed);
                    if torn_down {
                        break;
                    }
                }
                Err(tungstenite::Error::Http(response))
                    if response.status().as_u16() == 401 || response.status().as_u16() == 403 =>
                {
                    error!("handshake rejected: HTTP {}", response.status());
                    let _ = events.send(TransportEvent::AuthRejected);
                    self.set_state(ConnectionState::Idle).await;
                    return;
                }
                Err(e) => {
                    // Transient failure: stay on the backoff path, never surfaced
                    warn!("connect failed: {}", e);
                    self.set_state(ConnectionState::Closed).await;
                }
            }

            if *self.teardown.read().await {
                break;
            }
            let delay = self.backoff.write().await.next_delay();
            debug!("reconnect scheduled in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.teardown_notify.notified() => break,
            }
        }

        self.set_state(ConnectionState::Idle).await;
        debug!("connection task stopped");
    }

    /// Pump one open socket until it closes. Returns true when the close
    /// was an explicit teardown.
    async fn drive(
        &self,
        stream: WsStream,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        events: &mpsc::UnboundedSender<TransportEvent>,
    ) -> bool {
        let (mut sink, mut source) = stream.split();

        loop {
            tokio::select! {
                _ = self.teardown_notify.notified() => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return true;
                }
                outbound = outbound_rx.recv() => match outbound {
                    Some(text) => {
                        if let Err(e) = sink.send(WsMessage::Text(text)).await {
                            warn!("send failed: {}", e);
                            return false;
                        }
                    }
                    // All senders dropped: the client itself is gone
                    None => return true,
                },
                frame = source.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ServerEnvelope>(&text) {
                            Ok(envelope) => {
                                debug!("received {}", envelope.kind());
                                let _ = events.send(TransportEvent::Envelope(envelope));
                            }
                            Err(e) => debug!("undecodable envelope: {}", e),
                        }
                    }
                    Some(Ok(WsMessage::Ping(payload))) => {
                        let _ = sink.send(WsMessage::Pong(payload)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!("connection closed by server");
                        return *self.teardown.read().await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("transport error: {}", e);
                        return *self.teardown.read().await;
                    }
                },
            }
        }
    }
}
