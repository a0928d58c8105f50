use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kline stream subscription for one batch of symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSubscription {
    pub symbols: Vec<String>,
    pub interval: String,
}

impl StreamSubscription {
    pub fn new(symbols: Vec<String>, interval: String) -> Self {
        Self { symbols, interval }
    }

    /// Generate Binance WebSocket stream names for this subscription
    pub fn binance_streams(&self) -> Vec<String> {
        self.symbols
            .iter()
            .map(|symbol| format!("{}@kline_{}", symbol.to_lowercase(), self.interval))
            .collect()
    }
}

/// WebSocket connection status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { error: String },
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Reconnecting { attempt } => {
                write!(f, "Reconnecting (attempt {})", attempt)
            }
            ConnectionStatus::Failed { error } => write!(f, "Failed: {}", error),
        }
    }
}

/// WebSocket error types
#[derive(Error, Debug, Clone)]
pub enum WebSocketError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Subscription error: {0}")]
    Subscription(String),
}

impl WebSocketError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WebSocketError::Connection(_))
    }
}

/// Connection statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub messages_received: u64,
    pub messages_parsed: u64,
    pub parse_errors: u64,
    pub connection_count: u32,
    pub last_message_time: Option<i64>,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message(&mut self) {
        self.messages_received += 1;
        self.last_message_time = Some(chrono::Utc::now().timestamp_millis());
    }

    pub fn record_parsed(&mut self) {
        self.messages_parsed += 1;
    }

    pub fn record_parse_error(&mut self) {
        self.parse_errors += 1;
    }

    pub fn record_connection(&mut self) {
        self.connection_count += 1;
    }

    pub fn parse_success_rate(&self) -> f64 {
        if self.messages_received == 0 {
            0.0
        } else {
            self.messages_parsed as f64 / self.messages_received as f64
        }
    }
}

/// Validate symbol format before it is interpolated into a stream URL
pub fn validate_symbol(symbol: &str) -> Result<(), WebSocketError> {
    if symbol.is_empty() {
        return Err(WebSocketError::InvalidSymbol(
            "Symbol cannot be empty".to_string(),
        ));
    }

    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(WebSocketError::InvalidSymbol(format!(
            "Symbol '{}' contains invalid characters",
            symbol
        )));
    }

    Ok(())
}

/// Validate and uppercase a symbol list
pub fn normalize_symbols(symbols: &[String]) -> Result<Vec<String>, WebSocketError> {
    let mut normalized = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        validate_symbol(symbol)?;
        normalized.push(symbol.to_uppercase());
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_subscription_names() {
        let subscription = StreamSubscription::new(
            vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            "5m".to_string(),
        );

        let streams = subscription.binance_streams();
        assert_eq!(streams, vec!["btcusdt@kline_5m", "ethusdt@kline_5m"]);
    }

    #[test]
    fn test_validate_symbol() {
        assert!(validate_symbol("BTCUSDT").is_ok());
        assert!(validate_symbol("").is_err());
        assert!(validate_symbol("BTC-USDT").is_err());
        assert!(validate_symbol("BTC/USDT").is_err());
    }

    #[test]
    fn test_normalize_symbols() {
        let symbols = vec!["btcusdt".to_string(), "ETHUSDT".to_string()];
        let normalized = normalize_symbols(&symbols).unwrap();
        assert_eq!(normalized, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_connection_stats() {
        let mut stats = ConnectionStats::new();

        stats.record_message();
        stats.record_parsed();
        assert_eq!(stats.parse_success_rate(), 1.0);

        stats.record_message();
        stats.record_parse_error();
        assert_eq!(stats.parse_success_rate(), 0.5);
    }
}
