use thiserror::Error;

use crate::candles::structs::TimestampMS;

/// Binance Futures REST endpoints used by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiEndpoint {
    /// Kline/candlestick data
    Klines,
    /// Exchange metadata (tradable contracts)
    ExchangeInfo,
}

impl ApiEndpoint {
    /// Get the Binance Futures API path for this endpoint
    pub fn binance_path(&self) -> &'static str {
        match self {
            ApiEndpoint::Klines => "/fapi/v1/klines",
            ApiEndpoint::ExchangeInfo => "/fapi/v1/exchangeInfo",
        }
    }
}

/// API request configuration
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub endpoint: ApiEndpoint,
    pub symbol: String,
    pub interval: String,
    pub start_time: Option<TimestampMS>,
    pub end_time: Option<TimestampMS>,
    pub limit: Option<u32>,
}

impl ApiRequest {
    pub fn new_klines(symbol: String, interval: String) -> Self {
        Self {
            endpoint: ApiEndpoint::Klines,
            symbol,
            interval,
            start_time: None,
            end_time: None,
            limit: None,
        }
    }

    pub fn with_time_range(mut self, start_time: TimestampMS, end_time: TimestampMS) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// API error types
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

impl ApiError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Timeout(_) | ApiError::Http(_) | ApiError::RateLimit(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(ApiEndpoint::Klines.binance_path(), "/fapi/v1/klines");
        assert_eq!(
            ApiEndpoint::ExchangeInfo.binance_path(),
            "/fapi/v1/exchangeInfo"
        );
    }

    #[test]
    fn test_klines_request_builder() {
        let request = ApiRequest::new_klines("BTCUSDT".to_string(), "5m".to_string())
            .with_time_range(1_640_995_200_000, 1_641_081_600_000)
            .with_limit(100);

        assert_eq!(request.endpoint, ApiEndpoint::Klines);
        assert_eq!(request.symbol, "BTCUSDT");
        assert_eq!(request.interval, "5m");
        assert_eq!(request.start_time, Some(1_640_995_200_000));
        assert_eq!(request.end_time, Some(1_641_081_600_000));
        assert_eq!(request.limit, Some(100));
    }

    #[test]
    fn test_error_classification() {
        assert!(ApiError::Network("connection refused".to_string()).is_recoverable());
        assert!(ApiError::Timeout("10s elapsed".to_string()).is_recoverable());
        assert!(ApiError::RateLimit("retry after 60s".to_string()).is_recoverable());
        assert!(!ApiError::Parse("bad payload".to_string()).is_recoverable());
    }
}
