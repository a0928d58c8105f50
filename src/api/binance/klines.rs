use std::time::Duration;

use tracing::debug;

use crate::api::types::{ApiError, ApiRequest};
use crate::candles::structs::{FuturesOHLCVCandle, TimestampMS};

/// Binance Futures API client for klines data.
///
/// Methods take `&self` so the client can be cloned into detached fetch
/// tasks; the underlying `reqwest::Client` shares its connection pool
/// across clones.
#[derive(Clone)]
pub struct BinanceKlinesClient {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceKlinesClient {
    /// Create a new Binance klines client with a bounded request timeout
    pub fn new(base_url: String) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Fetch klines from the Binance Futures API
    pub async fn fetch_klines(
        &self,
        request: &ApiRequest,
    ) -> Result<Vec<FuturesOHLCVCandle>, ApiError> {
        let url = self.build_klines_url(request);
        debug!("Fetching klines from: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(format!("Klines request timed out: {}", e))
            } else {
                ApiError::Network(format!("Request failed: {}", e))
            }
        })?;

        if response.status().as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(ApiError::RateLimit(format!(
                "Rate limit exceeded, retry after {} seconds",
                retry_after
            )));
        }

        if !response.status().is_success() {
            return Err(ApiError::Http(format!("HTTP {}", response.status())));
        }

        let raw_klines: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse klines JSON: {}", e)))?;

        let candles = parse_klines_response(raw_klines)?;
        debug!(
            "Fetched {} klines for {} {}",
            candles.len(),
            request.symbol,
            request.interval
        );

        Ok(candles)
    }

    /// Build the complete URL for a klines request
    fn build_klines_url(&self, request: &ApiRequest) -> String {
        let mut url = format!(
            "{}{}?symbol={}&interval={}",
            self.base_url,
            request.endpoint.binance_path(),
            request.symbol,
            request.interval
        );

        if let Some(start_time) = request.start_time {
            url.push_str(&format!("&startTime={}", start_time));
        }

        if let Some(end_time) = request.end_time {
            url.push_str(&format!("&endTime={}", end_time));
        }

        if let Some(limit) = request.limit {
            // Binance allows max 1000 klines per request
            let limit = std::cmp::min(limit, 1000);
            url.push_str(&format!("&limit={}", limit));
        }

        url
    }
}

/// Parse the Binance kline-array response into candles.
///
/// Each kline is a 12-element array; prices and volumes are string-encoded.
fn parse_klines_response(
    raw_klines: Vec<serde_json::Value>,
) -> Result<Vec<FuturesOHLCVCandle>, ApiError> {
    let mut candles = Vec::with_capacity(raw_klines.len());

    for kline_array in raw_klines {
        let array = kline_array
            .as_array()
            .ok_or_else(|| ApiError::Parse("Expected kline to be an array".to_string()))?;

        if array.len() < 12 {
            return Err(ApiError::Parse(format!(
                "Expected at least 12 elements in kline array, got {}",
                array.len()
            )));
        }

        candles.push(FuturesOHLCVCandle {
            open_time: parse_timestamp(&array[0])?,
            close_time: parse_timestamp(&array[6])?,
            open: parse_f64(&array[1])?,
            high: parse_f64(&array[2])?,
            low: parse_f64(&array[3])?,
            close: parse_f64(&array[4])?,
            volume: parse_f64(&array[5])?,
            number_of_trades: parse_u64(&array[8])?,
            taker_buy_base_asset_volume: parse_f64(&array[9])?,
            closed: true, // API data is always complete candles
        });
    }

    Ok(candles)
}

fn parse_timestamp(value: &serde_json::Value) -> Result<TimestampMS, ApiError> {
    value
        .as_i64()
        .ok_or_else(|| ApiError::Parse(format!("Expected timestamp to be i64, got: {:?}", value)))
}

fn parse_f64(value: &serde_json::Value) -> Result<f64, ApiError> {
    match value {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| ApiError::Parse(format!("Failed to parse '{}' as f64", s))),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ApiError::Parse(format!("Failed to convert number to f64: {:?}", n))),
        _ => Err(ApiError::Parse(format!(
            "Expected string or number, got: {:?}",
            value
        ))),
    }
}

fn parse_u64(value: &serde_json::Value) -> Result<u64, ApiError> {
    match value {
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| ApiError::Parse(format!("Failed to parse '{}' as u64", s))),
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ApiError::Parse(format!("Failed to convert number to u64: {:?}", n))),
        _ => Err(ApiError::Parse(format!(
            "Expected string or number, got: {:?}",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_klines_url() {
        let client = BinanceKlinesClient::new("https://fapi.binance.com".to_string()).unwrap();

        let request = ApiRequest::new_klines("BTCUSDT".to_string(), "5m".to_string())
            .with_time_range(1_640_995_200_000, 1_641_081_600_000)
            .with_limit(100);

        let url = client.build_klines_url(&request);
        assert!(url.starts_with("https://fapi.binance.com/fapi/v1/klines?"));
        assert!(url.contains("symbol=BTCUSDT"));
        assert!(url.contains("interval=5m"));
        assert!(url.contains("startTime=1640995200000"));
        assert!(url.contains("endTime=1641081600000"));
        assert!(url.contains("limit=100"));
    }

    #[test]
    fn test_limit_is_capped_at_1000() {
        let client = BinanceKlinesClient::new("https://fapi.binance.com".to_string()).unwrap();
        let request =
            ApiRequest::new_klines("BTCUSDT".to_string(), "1m".to_string()).with_limit(5000);

        let url = client.build_klines_url(&request);
        assert!(url.contains("limit=1000"));
    }

    #[test]
    fn test_parse_klines_response() {
        let raw_response = r#"[
            [
                1640995200000,
                "46222.01",
                "46271.02",
                "46222.01",
                "46271.02",
                "3.45",
                1640995259999,
                "159633.38",
                10,
                "1.72",
                "79516.69",
                "0"
            ]
        ]"#;

        let raw_klines: Vec<serde_json::Value> = serde_json::from_str(raw_response).unwrap();
        let candles = parse_klines_response(raw_klines).unwrap();

        assert_eq!(candles.len(), 1);
        let candle = &candles[0];
        assert_eq!(candle.open_time, 1_640_995_200_000);
        assert_eq!(candle.open, 46222.01);
        assert_eq!(candle.volume, 3.45);
        assert_eq!(candle.number_of_trades, 10);
        assert!(candle.closed);
    }

    #[test]
    fn test_parse_rejects_short_kline_array() {
        let raw_klines: Vec<serde_json::Value> =
            serde_json::from_str(r#"[[1640995200000, "1.0"]]"#).unwrap();
        assert!(parse_klines_response(raw_klines).is_err());
    }
}
