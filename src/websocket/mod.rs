pub mod binance;
pub mod connection;
pub mod types;

pub use connection::ConnectionManager;
pub use types::{ConnectionStats, ConnectionStatus, StreamSubscription, WebSocketError};
