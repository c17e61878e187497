/// Render events streamed to the UI layer
use crate::message::Message;
use crate::ws::connection::ConnectionState;
use serde::Serialize;

/// What the render sink should do next. Consumed by the UI; this core only
/// decides, it never draws or plays audio itself.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    /// A locally originated message was rendered optimistically
    MessagePending { message: Message },
    /// A pending row was confirmed in place (server id + timestamp attached)
    MessageConfirmed { message: Message },
    /// A broadcast message was rendered into the active conversation
    MessageReceived {
        message: Message,
        play_cue: bool,
        autoscroll: bool,
    },
    /// The selected friend started typing
    TypingStarted { user_id: String },
    /// The typing window elapsed
    TypingStopped,
    /// Latest server-reported online count
    OnlineCount { count: u32 },
    /// Connection state transition (connectivity indicator)
    Connection { state: ConnectionState },
    /// Authentication was rejected; the session is over
    SessionExpired,
}
