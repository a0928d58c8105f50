use tracing::{error, info};

use crate::api::binance::exchange_info::ExchangeInfoClient;
use crate::api::types::ApiError;

/// Base assets listed ahead of the rest of the universe, in this order of
/// the filtered symbol list.
pub const PRIORITY_BASE_ASSETS: [&str; 10] = [
    "BTC", "ETH", "BNB", "ADA", "DOT", "LINK", "SOL", "MATIC", "AVAX", "ATOM",
];

/// Symbols used when the exchange metadata fetch fails.
pub const FALLBACK_SYMBOLS: [&str; 10] = [
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "ADAUSDT", "DOTUSDT", "LINKUSDT", "SOLUSDT", "MATICUSDT",
    "AVAXUSDT", "ATOMUSDT",
];

/// Ordered symbol universe partitioned into fixed-size subscription batches.
///
/// Batch membership and order are fixed for the lifetime of a scanner
/// instance; the last batch may be smaller than the configured size.
#[derive(Debug, Clone)]
pub struct SymbolUniverse {
    symbols: Vec<String>,
    batches: Vec<Vec<String>>,
}

impl SymbolUniverse {
    pub fn new(symbols: Vec<String>, batch_size: usize) -> Self {
        let batches = partition_batches(&symbols, batch_size);
        Self { symbols, batches }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn batches(&self) -> &[Vec<String>] {
        &self.batches
    }

    pub fn total_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

fn partition_batches(symbols: &[String], batch_size: usize) -> Vec<Vec<String>> {
    symbols
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Builds the tradable perpetual-contract universe from exchange metadata.
pub struct UniverseBuilder {
    client: ExchangeInfoClient,
    quote_asset: String,
}

impl UniverseBuilder {
    pub fn new(base_url: String, quote_asset: String) -> Result<Self, ApiError> {
        Ok(Self {
            client: ExchangeInfoClient::new(base_url)?,
            quote_asset,
        })
    }

    /// Fetch, filter, order and partition the symbol universe.
    ///
    /// Never fails: a metadata fetch or parse error degrades to the
    /// hardcoded fallback list.
    pub async fn build(&self, batch_size: usize) -> SymbolUniverse {
        let symbols = match self.client.fetch_exchange_info().await {
            Ok(info) => {
                let filtered: Vec<String> = info
                    .symbols
                    .iter()
                    .filter(|s| s.is_tradable_perpetual(&self.quote_asset))
                    .map(|s| s.symbol.clone())
                    .collect();

                info!(
                    "Universe: {} tradable {} perpetuals",
                    filtered.len(),
                    self.quote_asset
                );
                order_with_priority(filtered)
            }
            Err(e) => {
                error!("Failed to fetch exchange info: {}. Using fallback universe", e);
                FALLBACK_SYMBOLS.iter().map(|s| s.to_string()).collect()
            }
        };

        SymbolUniverse::new(symbols, batch_size)
    }
}

/// Order symbols so priority base assets come first, both groups keeping
/// their relative order from the filtered list.
fn order_with_priority(symbols: Vec<String>) -> Vec<String> {
    let (mut priority, other): (Vec<String>, Vec<String>) = symbols
        .into_iter()
        .partition(|s| PRIORITY_BASE_ASSETS.iter().any(|base| s.contains(base)));

    priority.extend(other);
    priority
}
