pub mod binance;
pub mod types;

pub use binance::exchange_info::{ExchangeInfo, ExchangeInfoClient, SymbolInfo};
pub use binance::klines::BinanceKlinesClient;
pub use types::{ApiEndpoint, ApiError, ApiRequest};
