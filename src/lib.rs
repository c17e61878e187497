/// Chatlink - real-time chat client core
///
/// Owns the persistent WebSocket connection to a messaging server: optimistic
/// sends reconciled against server acknowledgements, replay deduplication,
/// and automatic reconnect with exponential backoff.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod inbound;
pub mod ledger;
pub mod message;
pub mod outbound;
pub mod presence;
pub mod rest;
pub mod session;
pub mod sound;
pub mod typing;
pub mod ws;

pub use client::ChatClient;
pub use config::Config;
pub use error::{ChatError, Result};
pub use events::RenderEvent;
