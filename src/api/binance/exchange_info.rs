use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::types::{ApiEndpoint, ApiError};

/// Exchange metadata returned by `/fapi/v1/exchangeInfo`.
///
/// Only the fields the universe builder consumes are deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

/// Tradable contract metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub contract_type: String,
    pub quote_asset: String,
}

impl SymbolInfo {
    /// An actively trading USDT-quoted perpetual contract
    pub fn is_tradable_perpetual(&self, quote_asset: &str) -> bool {
        self.status == "TRADING"
            && self.contract_type == "PERPETUAL"
            && self.quote_asset == quote_asset
    }
}

/// Client for the Binance Futures exchange-info endpoint
#[derive(Clone)]
pub struct ExchangeInfoClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExchangeInfoClient {
    pub fn new(base_url: String) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Fetch the tradable-contract list
    pub async fn fetch_exchange_info(&self) -> Result<ExchangeInfo, ApiError> {
        let url = format!("{}{}", self.base_url, ApiEndpoint::ExchangeInfo.binance_path());

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(format!("Exchange info request timed out: {}", e))
            } else {
                ApiError::Network(format!("Request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(ApiError::Http(format!("HTTP {}", response.status())));
        }

        let exchange_info: ExchangeInfo = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse exchange info: {}", e)))?;

        info!(
            "✅ Fetched exchange info with {} symbols",
            exchange_info.symbols.len()
        );

        Ok(exchange_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exchange_info() {
        let json = r#"{
            "timezone": "UTC",
            "serverTime": 1672531200000,
            "symbols": [
                {
                    "symbol": "BTCUSDT",
                    "status": "TRADING",
                    "contractType": "PERPETUAL",
                    "quoteAsset": "USDT",
                    "baseAsset": "BTC",
                    "pricePrecision": 2
                },
                {
                    "symbol": "BTCUSDT_230331",
                    "status": "TRADING",
                    "contractType": "CURRENT_QUARTER",
                    "quoteAsset": "USDT",
                    "baseAsset": "BTC",
                    "pricePrecision": 2
                }
            ]
        }"#;

        let info: ExchangeInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.symbols.len(), 2);
        assert_eq!(info.symbols[0].symbol, "BTCUSDT");
        assert_eq!(info.symbols[0].contract_type, "PERPETUAL");
    }

    #[test]
    fn test_is_tradable_perpetual() {
        let perpetual = SymbolInfo {
            symbol: "ETHUSDT".to_string(),
            status: "TRADING".to_string(),
            contract_type: "PERPETUAL".to_string(),
            quote_asset: "USDT".to_string(),
        };
        assert!(perpetual.is_tradable_perpetual("USDT"));
        assert!(!perpetual.is_tradable_perpetual("BUSD"));

        let delisted = SymbolInfo {
            status: "SETTLING".to_string(),
            ..perpetual.clone()
        };
        assert!(!delisted.is_tradable_perpetual("USDT"));

        let quarterly = SymbolInfo {
            contract_type: "CURRENT_QUARTER".to_string(),
            ..perpetual
        };
        assert!(!quarterly.is_tradable_perpetual("USDT"));
    }
}
