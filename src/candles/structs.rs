use serde::{Deserialize, Serialize};

pub type TimestampMS = i64;

/// Single OHLCV candle for a perpetual futures contract.
///
/// Both the REST kline endpoint and the kline WebSocket stream produce this
/// shape. `closed` is false only for the in-progress candle of the current
/// timeframe bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesOHLCVCandle {
    pub open_time: TimestampMS,
    pub close_time: TimestampMS,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: f64,
    pub closed: bool,
}

impl FuturesOHLCVCandle {
    #[allow(clippy::too_many_arguments)]
    pub fn new_from_values(
        open_time: TimestampMS,
        close_time: TimestampMS,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        number_of_trades: u64,
        taker_buy_base_asset_volume: f64,
        closed: bool,
    ) -> Self {
        Self {
            open_time,
            close_time,
            open,
            high,
            low,
            close,
            volume,
            number_of_trades,
            taker_buy_base_asset_volume,
            closed,
        }
    }

    pub fn open_time(&self) -> TimestampMS {
        self.open_time
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Convert a Binance interval string ("1m", "5m", "1h", ...) to seconds.
///
/// Unknown intervals fall back to 5 minutes, the scanner's default timeframe.
pub fn interval_to_seconds(interval: &str) -> u64 {
    match interval {
        "1m" => 60,
        "3m" => 180,
        "5m" => 300,
        "15m" => 900,
        "30m" => 1800,
        "1h" => 3600,
        "2h" => 7200,
        "4h" => 14400,
        "6h" => 21600,
        "8h" => 28800,
        "12h" => 43200,
        "1d" => 86400,
        _ => 300,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_to_seconds() {
        assert_eq!(interval_to_seconds("1m"), 60);
        assert_eq!(interval_to_seconds("5m"), 300);
        assert_eq!(interval_to_seconds("1h"), 3600);
        assert_eq!(interval_to_seconds("1d"), 86400);
        // unknown intervals fall back to the default timeframe
        assert_eq!(interval_to_seconds("7m"), 300);
    }

    #[test]
    fn test_candle_accessors() {
        let candle = FuturesOHLCVCandle::new_from_values(
            1_672_531_140_000,
            1_672_531_199_999,
            16800.0,
            16860.0,
            16795.0,
            16850.0,
            12.5,
            150,
            8.2,
            true,
        );
        assert_eq!(candle.open_time(), 1_672_531_140_000);
        assert_eq!(candle.close(), 16850.0);
        assert_eq!(candle.volume(), 12.5);
        assert!(candle.closed);
    }
}
