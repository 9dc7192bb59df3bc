// pulseboard-api: wire plumbing for the realtime dashboard (push feed + record listing)

pub mod endpoint;
pub mod error;
pub mod records;
pub mod transport;
pub mod websocket;
pub mod wire;

pub use error::Error;
pub use records::{RawRecord, RecordsClient};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{LinkState, ReconnectConfig, TransportEvent, WebSocketHandle};
pub use wire::{Command, DecodeError, Notification};
