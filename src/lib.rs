pub mod api;
pub mod candles;
pub mod logging;
pub mod scanner;
pub mod signal;
pub mod universe;
pub mod websocket;
