use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::websocket::types::{
    ConnectionStats, ConnectionStatus, StreamSubscription, WebSocketError,
};

/// Connection manager for Binance Futures kline streams.
#[derive(Clone)]
pub struct ConnectionManager {
    base_url: String,
    stats: ConnectionStats,
    status: ConnectionStatus,
    max_reconnect_attempts: u32,
    reconnect_delay: Duration,
}

impl ConnectionManager {
    /// Create a new connection manager for Binance futures
    pub fn new_binance_futures() -> Self {
        Self::new("wss://fstream.binance.com".to_string())
    }

    /// Create a new connection manager with a custom endpoint
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            stats: ConnectionStats::new(),
            status: ConnectionStatus::Disconnected,
            max_reconnect_attempts: 10,
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Build the combined-stream URL for a batch subscription
    pub fn build_multi_stream_url(
        &self,
        subscription: &StreamSubscription,
    ) -> Result<String, WebSocketError> {
        let streams = subscription.binance_streams();
        if streams.is_empty() {
            return Err(WebSocketError::Subscription(
                "At least one symbol required".to_string(),
            ));
        }

        Ok(format!(
            "{}/stream?streams={}",
            self.base_url,
            streams.join("/")
        ))
    }

    /// Connect and pump messages, reconnecting on failure.
    ///
    /// Returns when the server closes the stream cleanly or the attempt
    /// budget is exhausted. The caller aborts the surrounding task to
    /// unsubscribe, so this loop never needs to be told to stop.
    pub async fn connect_with_retry<F, Fut>(
        &mut self,
        url: &str,
        mut message_handler: F,
    ) -> Result<(), WebSocketError>
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = Result<(), WebSocketError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.status = if attempt == 1 {
                ConnectionStatus::Connecting
            } else {
                ConnectionStatus::Reconnecting { attempt }
            };

            match self.connect_once(url, &mut message_handler).await {
                Ok(_) => {
                    info!("WebSocket connection closed normally");
                    return Ok(());
                }
                Err(e) => {
                    if attempt >= self.max_reconnect_attempts {
                        let error = format!(
                            "Max reconnection attempts ({}) exceeded: {}",
                            self.max_reconnect_attempts, e
                        );
                        self.status = ConnectionStatus::Failed {
                            error: error.clone(),
                        };
                        return Err(WebSocketError::Connection(error));
                    }

                    warn!(
                        "WebSocket connection failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt, self.max_reconnect_attempts, e, self.reconnect_delay
                    );

                    sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    /// Single connection attempt and message loop
    async fn connect_once<F, Fut>(
        &mut self,
        url: &str,
        message_handler: &mut F,
    ) -> Result<(), WebSocketError>
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = Result<(), WebSocketError>>,
    {
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| WebSocketError::Connection(format!("Handshake failed: {}", e)))?;

        let (mut write, mut read) = ws_stream.split();

        self.status = ConnectionStatus::Connected;
        self.stats.record_connection();
        info!("✅ WebSocket connected");

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    self.stats.record_message();

                    match message_handler(text).await {
                        Ok(_) => self.stats.record_parsed(),
                        Err(e) => {
                            self.stats.record_parse_error();
                            warn!("Failed to handle message: {}", e);
                        }
                    }
                }
                Ok(Message::Ping(payload)) => {
                    debug!("Received ping, sending pong");
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        warn!("Failed to send pong: {}", e);
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!("WebSocket closed by server: {:?}", frame);
                    break;
                }
                Ok(_) => {
                    debug!("Ignoring non-text frame");
                }
                Err(e) => {
                    self.status = ConnectionStatus::Disconnected;
                    return Err(WebSocketError::Connection(format!("Stream error: {}", e)));
                }
            }
        }

        self.status = ConnectionStatus::Disconnected;
        info!("WebSocket disconnected");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_manager_creation() {
        let manager = ConnectionManager::new_binance_futures();
        assert_eq!(manager.base_url, "wss://fstream.binance.com");
        assert!(matches!(manager.status, ConnectionStatus::Disconnected));
    }

    #[test]
    fn test_build_multi_stream_url() {
        let manager = ConnectionManager::new_binance_futures();
        let subscription = StreamSubscription::new(
            vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            "5m".to_string(),
        );

        let url = manager.build_multi_stream_url(&subscription).unwrap();
        assert_eq!(
            url,
            "wss://fstream.binance.com/stream?streams=btcusdt@kline_5m/ethusdt@kline_5m"
        );
    }

    #[test]
    fn test_build_multi_stream_url_rejects_empty_batch() {
        let manager = ConnectionManager::new_binance_futures();
        let subscription = StreamSubscription::new(Vec::new(), "5m".to_string());
        assert!(manager.build_multi_stream_url(&subscription).is_err());
    }
}
