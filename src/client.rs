/// Chat client: session, connection, and the single dispatch loop
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::events::RenderEvent;
use crate::inbound::InboundDispatcher;
use crate::ledger::MessageLedger;
use crate::message::ConversationKey;
use crate::outbound::OutboundDispatcher;
use crate::rest::{Friend, RestClient, UploadedFile};
use crate::session::SessionContext;
use crate::ws::connection::{ConnectionManager, ConnectionState, TransportEvent};
use crate::ws::protocol::MessagePayload;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, info};

/// Real-time chat client core.
///
/// Created on successful login or session restore; `logout` is the single
/// cancellation point and destroys it for good. A token change requires a
/// fresh client.
pub struct ChatClient {
    session: Arc<RwLock<SessionContext>>,
    ledger: Arc<RwLock<MessageLedger>>,
    outbound: Mutex<OutboundDispatcher>,
    inbound: Arc<Mutex<InboundDispatcher>>,
    connection: ConnectionManager,
    rest: RestClient,
    events: broadcast::Sender<RenderEvent>,
}

impl ChatClient {
    /// Open the connection and start the dispatch loop.
    pub fn connect(config: Config) -> Self {
        let mut session = SessionContext::new(config.token.clone(), config.user_id.clone());
        session.selection = config.target.clone();
        let session = Arc::new(RwLock::new(session));
        let ledger = Arc::new(RwLock::new(MessageLedger::new()));
        let inbound = Arc::new(Mutex::new(InboundDispatcher::new()));
        let (events, _) = broadcast::channel(256);

        let (connection, transport_rx) =
            ConnectionManager::connect(&config.server_url, &config.token);

        tokio::spawn(dispatch_loop(
            transport_rx,
            session.clone(),
            ledger.clone(),
            inbound.clone(),
            events.clone(),
        ));

        let rest = RestClient::new(&config.api_url, &config.token);
        info!("chat client started for user {}", config.user_id);

        Self {
            session,
            ledger,
            outbound: Mutex::new(OutboundDispatcher::new()),
            inbound,
            connection,
            rest,
            events,
        }
    }

    /// Subscribe to render events
    pub fn subscribe(&self) -> broadcast::Receiver<RenderEvent> {
        self.events.subscribe()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.connection.state().await
    }

    pub async fn reconnect_attempt(&self) -> u32 {
        self.connection.reconnect_attempt().await
    }

    // ─── Conversation selection & settings ───────────────────────────────

    /// Changing the visible conversation drops the previous peer's typing
    /// flag; it must not linger over the new pane.
    pub async fn select_friend(&self, friend_id: impl Into<String>) {
        self.session.write().await.select_friend(friend_id);
        self.clear_typing().await;
    }

    pub async fn select_group(&self, group_id: impl Into<String>) {
        self.session.write().await.select_group(group_id);
        self.clear_typing().await;
    }

    pub async fn clear_selection(&self) {
        self.session.write().await.clear_selection();
        self.clear_typing().await;
    }

    async fn clear_typing(&self) {
        if let Some(event) = self.inbound.lock().await.reset_typing() {
            let _ = self.events.send(event);
        }
    }

    pub async fn set_sound_enabled(&self, enabled: bool) {
        self.session.write().await.settings.enabled = enabled;
    }

    pub async fn set_dnd_enabled(&self, enabled: bool) {
        self.session.write().await.settings.dnd_enabled = enabled;
    }

    // ─── Sending ─────────────────────────────────────────────────────────

    /// Send a text message to the selected conversation: validate, render
    /// the optimistic row, then transmit. The render always precedes the
    /// network round-trip.
    pub async fn send_text(&self, content: &str) -> Result<()> {
        let session = self.session.read().await.clone();
        let conversation = session.selection.clone().ok_or(ChatError::MissingTarget)?;
        let (message, envelope) = self.outbound.lock().await.compose_text(
            &session,
            &conversation,
            content,
            Utc::now(),
        )?;

        self.ledger.write().await.render_pending(message.clone());
        let _ = self.events.send(RenderEvent::MessagePending { message });

        self.connection.send(&envelope).await
    }

    /// Send previously uploaded media by URL
    pub async fn send_media(&self, url: &str, mime: &str) -> Result<()> {
        let session = self.session.read().await.clone();
        let conversation = session.selection.clone().ok_or(ChatError::MissingTarget)?;
        let (message, envelope) = self.outbound.lock().await.compose_media(
            &session,
            &conversation,
            url,
            mime,
            Utc::now(),
        )?;

        self.ledger.write().await.render_pending(message.clone());
        let _ = self.events.send(RenderEvent::MessagePending { message });

        self.connection.send(&envelope).await
    }

    /// Upload a file then send its URL as a media message
    pub async fn upload_and_send(&self, file_name: &str, bytes: Vec<u8>, mime: &str) -> Result<()> {
        let uploaded = self.guard_auth(self.rest.upload_file(file_name, bytes, mime).await).await?;
        self.send_media(&uploaded.url, mime).await
    }

    /// Rate-limited typing notification for the selected 1:1 conversation
    pub async fn send_typing(&self) -> Result<()> {
        let conversation = {
            let session = self.session.read().await;
            session.selection.clone()
        };
        let Some(conversation) = conversation else {
            return Ok(());
        };
        let envelope = self
            .outbound
            .lock()
            .await
            .compose_typing(&conversation, Instant::now());
        match envelope {
            Some(envelope) => self.connection.send(&envelope).await,
            None => Ok(()),
        }
    }

    // ─── REST collaborators ──────────────────────────────────────────────

    pub async fn fetch_history(&self) -> Result<Vec<MessagePayload>> {
        let conversation = self
            .session
            .read()
            .await
            .selection
            .clone()
            .ok_or(ChatError::MissingTarget)?;
        self.guard_auth(self.rest.fetch_history(&conversation).await)
            .await
    }

    pub async fn fetch_friends(&self) -> Result<Vec<Friend>> {
        self.guard_auth(self.rest.fetch_friends().await).await
    }

    pub async fn upload_file(&self, file_name: &str, bytes: Vec<u8>, mime: &str) -> Result<UploadedFile> {
        self.guard_auth(self.rest.upload_file(file_name, bytes, mime).await)
            .await
    }

    /// An auth rejection from any REST call is fatal to the session
    async fn guard_auth<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(ChatError::Auth(_)) = &result {
            self.session_expired().await;
        }
        result
    }

    // ─── Teardown ────────────────────────────────────────────────────────

    /// Explicit logout: close the connection with no further reconnects and
    /// drop the session token. Late acks are ignored once the dispatch loop
    /// drains out.
    pub async fn logout(&self) {
        info!("logging out");
        self.connection.close().await;
        self.session.write().await.token.clear();
    }

    async fn session_expired(&self) {
        self.connection.close().await;
        self.session.write().await.token.clear();
        let _ = self.events.send(RenderEvent::SessionExpired);
    }

    /// Snapshot of rendered messages, oldest first (for tests and tooling)
    pub async fn rendered_messages(&self) -> Vec<crate::message::Message> {
        self.ledger.read().await.entries().to_vec()
    }
}

/// The single dispatch loop: consumes transport events in delivery order.
/// The inbound dispatcher is shared with the client so selection changes can
/// drop the typing flag. Ends when the connection task drops its sender,
/// which happens only at teardown.
async fn dispatch_loop(
    mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    session: Arc<RwLock<SessionContext>>,
    ledger: Arc<RwLock<MessageLedger>>,
    dispatcher: Arc<Mutex<InboundDispatcher>>,
    events: broadcast::Sender<RenderEvent>,
) {
    loop {
        let deadline = dispatcher.lock().await.typing_deadline();
        let event = match deadline {
            Some(deadline) => {
                tokio::select! {
                    event = transport_rx.recv() => event,
                    _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                        if let Some(render) = dispatcher.lock().await.expire_typing(Instant::now()) {
                            let _ = events.send(render);
                        }
                        continue;
                    }
                }
            }
            None => transport_rx.recv().await,
        };
        let Some(event) = event else { break };

        match event {
            TransportEvent::Opened => {
                let _ = events.send(RenderEvent::Connection {
                    state: ConnectionState::Open,
                });
            }
            TransportEvent::Closed => {
                if let Some(render) = dispatcher.lock().await.reset_typing() {
                    let _ = events.send(render);
                }
                let _ = events.send(RenderEvent::Connection {
                    state: ConnectionState::Closed,
                });
            }
            TransportEvent::AuthRejected => {
                session.write().await.token.clear();
                let _ = events.send(RenderEvent::Connection {
                    state: ConnectionState::Idle,
                });
                let _ = events.send(RenderEvent::SessionExpired);
            }
            TransportEvent::Envelope(envelope) => {
                let session = session.read().await.clone();
                let mut ledger = ledger.write().await;
                if let Some(render) = dispatcher.lock().await.dispatch(
                    &mut ledger,
                    &session,
                    envelope,
                    Instant::now(),
                ) {
                    let _ = events.send(render);
                }
            }
        }
    }

    debug!("dispatch loop ended");
}
