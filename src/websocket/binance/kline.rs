use serde::{Deserialize, Serialize};

use crate::candles::structs::FuturesOHLCVCandle;
use crate::websocket::types::WebSocketError;

/// Binance kline WebSocket event
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BinanceKlineEvent {
    /// Event type - "kline"
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (milliseconds)
    #[serde(rename = "E")]
    pub event_time: i64,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Kline data
    #[serde(rename = "k")]
    pub kline: BinanceKlineData,
}

/// Kline payload; prices and volumes are string-encoded on the wire
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BinanceKlineData {
    /// Kline start time (milliseconds)
    #[serde(rename = "t")]
    pub start_time: i64,

    /// Kline close time (milliseconds)
    #[serde(rename = "T")]
    pub close_time: i64,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Interval
    #[serde(rename = "i")]
    pub interval: String,

    /// Open price
    #[serde(rename = "o")]
    pub open: String,

    /// Close price
    #[serde(rename = "c")]
    pub close: String,

    /// High price
    #[serde(rename = "h")]
    pub high: String,

    /// Low price
    #[serde(rename = "l")]
    pub low: String,

    /// Base asset volume
    #[serde(rename = "v")]
    pub volume: String,

    /// Number of trades
    #[serde(rename = "n")]
    pub number_of_trades: i64,

    /// Whether this kline bucket is complete
    #[serde(rename = "x")]
    pub is_kline_closed: bool,

    /// Taker buy base asset volume
    #[serde(rename = "V")]
    pub taker_buy_base_asset_volume: String,
}

impl BinanceKlineData {
    /// Convert the wire payload into a candle
    pub fn to_futures_candle(&self) -> Result<FuturesOHLCVCandle, WebSocketError> {
        let open = parse_price(&self.open, "open")?;
        let high = parse_price(&self.high, "high")?;
        let low = parse_price(&self.low, "low")?;
        let close = parse_price(&self.close, "close")?;
        let volume = parse_price(&self.volume, "volume")?;
        let taker_buy_base_asset_volume =
            parse_price(&self.taker_buy_base_asset_volume, "taker buy volume")?;

        Ok(FuturesOHLCVCandle {
            open_time: self.start_time,
            close_time: self.close_time,
            open,
            high,
            low,
            close,
            volume,
            number_of_trades: self.number_of_trades as u64,
            taker_buy_base_asset_volume,
            closed: self.is_kline_closed,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.is_kline_closed
    }
}

fn parse_price(value: &str, field: &str) -> Result<f64, WebSocketError> {
    value
        .parse::<f64>()
        .map_err(|_| WebSocketError::Parse(format!("Invalid {}: {}", field, value)))
}

/// Combined-stream envelope (`/stream?streams=...` delivery format)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BinanceCombinedStreamMessage {
    /// Stream name, e.g. "btcusdt@kline_5m"
    pub stream: String,

    /// The wrapped kline event
    pub data: BinanceKlineEvent,
}

/// Parse either the combined-stream envelope or a direct kline event
pub fn parse_any_kline_message(payload: &str) -> Result<BinanceKlineEvent, WebSocketError> {
    if let Ok(combined) = serde_json::from_str::<BinanceCombinedStreamMessage>(payload) {
        return Ok(combined.data);
    }

    serde_json::from_str(payload)
        .map_err(|e| WebSocketError::Parse(format!("Failed to parse kline message: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECT_EVENT: &str = r#"{
        "e": "kline",
        "E": 1672531200000,
        "s": "BTCUSDT",
        "k": {
            "t": 1672531140000,
            "T": 1672531199999,
            "s": "BTCUSDT",
            "i": "5m",
            "f": 123456789,
            "L": 123456799,
            "o": "16800.00",
            "c": "16850.00",
            "h": "16860.00",
            "l": "16795.00",
            "v": "12.5",
            "n": 150,
            "x": true,
            "q": "210625.00",
            "V": "8.2",
            "B": "0"
        }
    }"#;

    #[test]
    fn test_parse_direct_kline_event() {
        let event = parse_any_kline_message(DIRECT_EVENT).unwrap();
        assert_eq!(event.event_type, "kline");
        assert_eq!(event.symbol, "BTCUSDT");
        assert_eq!(event.kline.interval, "5m");
        assert!(event.kline.is_completed());
    }

    #[test]
    fn test_parse_combined_stream_message() {
        let json = format!(
            r#"{{"stream": "btcusdt@kline_5m", "data": {}}}"#,
            DIRECT_EVENT
        );

        let event = parse_any_kline_message(&json).unwrap();
        assert_eq!(event.symbol, "BTCUSDT");
        assert_eq!(event.kline.number_of_trades, 150);
    }

    #[test]
    fn test_kline_to_futures_candle() {
        let event = parse_any_kline_message(DIRECT_EVENT).unwrap();
        let candle = event.kline.to_futures_candle().unwrap();

        assert_eq!(candle.open_time, 1_672_531_140_000);
        assert_eq!(candle.open, 16800.0);
        assert_eq!(candle.high, 16860.0);
        assert_eq!(candle.low, 16795.0);
        assert_eq!(candle.close, 16850.0);
        assert_eq!(candle.volume, 12.5);
        assert!(candle.closed);
    }

    #[test]
    fn test_malformed_price_is_rejected() {
        let event = parse_any_kline_message(DIRECT_EVENT).unwrap();
        let mut kline = event.kline;
        kline.close = "not-a-number".to_string();

        assert!(kline.to_futures_candle().is_err());
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        assert!(parse_any_kline_message("{\"ping\": 1}").is_err());
        assert!(parse_any_kline_message("not json").is_err());
    }
}
