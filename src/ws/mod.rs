/// WebSocket transport to the chat server
pub mod backoff;
pub mod connection;
pub mod protocol;

pub use backoff::ReconnectBackoff;
pub use connection::{ConnectionManager, ConnectionState, TransportEvent};
