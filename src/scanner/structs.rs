use std::collections::HashMap;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::candles::series::CandleSeries;
use crate::candles::structs::{interval_to_seconds, FuturesOHLCVCandle, TimestampMS};
use crate::signal::engine::{SignalVerdict, TrendState, VolumeStatus};
use crate::universe::SymbolUniverse;

/// How long a detected signal stays reportable.
pub const SIGNAL_VALIDITY_MS: i64 = 5 * 60 * 1000;

/// Streamed bars required before a symbol is analyzed at all.
pub const ANALYSIS_MIN_STREAMED_BARS: usize = 100;

/// Historical window fetched for each merge.
pub const HISTORICAL_FETCH_LIMIT: u32 = 100;

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Kline interval, e.g. "5m"
    pub interval: String,
    /// Interval in seconds, derived from `interval`
    pub timeframe_seconds: u64,
    /// Symbols subscribed per batch
    pub batch_size: usize,
    /// How long each batch stays live
    pub rotation_interval: Duration,
    /// Settlement asset the universe is quoted against
    pub quote_asset: String,
    /// Binance Futures REST endpoint
    pub rest_base_url: String,
    /// Binance Futures WebSocket endpoint
    pub ws_base_url: String,
}

impl ScannerConfig {
    pub fn new(interval: &str, batch_size: usize) -> Self {
        Self {
            interval: interval.to_string(),
            timeframe_seconds: interval_to_seconds(interval),
            batch_size,
            ..Self::default()
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: "5m".to_string(),
            timeframe_seconds: 300,
            batch_size: 10,
            rotation_interval: Duration::from_secs(10),
            quote_asset: "USDT".to_string(),
            rest_base_url: "https://fapi.binance.com".to_string(),
            ws_base_url: "wss://fstream.binance.com".to_string(),
        }
    }
}

/// An active trade signal for one symbol.
///
/// Exists only while at least one flag is set and the record is younger
/// than [`SIGNAL_VALIDITY_MS`]; expiry is enforced lazily on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub symbol: String,
    pub buy_signal: bool,
    pub pump_signal: bool,
    pub sell_signal: bool,
    pub rsi: f64,
    pub price: f64,
    pub price_change: f64,
    pub trend: TrendState,
    pub volume_status: VolumeStatus,
    pub detected_at: TimestampMS,
}

impl SignalRecord {
    pub fn from_verdict(symbol: String, verdict: &SignalVerdict, detected_at: TimestampMS) -> Self {
        Self {
            symbol,
            buy_signal: verdict.buy_signal,
            pump_signal: verdict.pump_signal,
            sell_signal: verdict.sell_signal,
            rsi: verdict.rsi,
            price: verdict.price,
            price_change: verdict.price_change,
            trend: verdict.trend,
            volume_status: verdict.volume_status,
            detected_at,
        }
    }

    pub fn is_valid_at(&self, now: TimestampMS) -> bool {
        now - self.detected_at <= SIGNAL_VALIDITY_MS
    }

    /// Signal kinds for log lines, e.g. "BUY + PUMP"
    pub fn kinds(&self) -> String {
        let mut kinds = Vec::new();
        if self.buy_signal {
            kinds.push("BUY");
        }
        if self.pump_signal {
            kinds.push("PUMP");
        }
        if self.sell_signal {
            kinds.push("SELL");
        }
        kinds.join(" + ")
    }
}

/// Scanner status snapshot for consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerStatus {
    pub scanning: bool,
    pub current_batch: usize,
    pub active_symbols: usize,
    pub total_symbols: usize,
    pub signal_count: usize,
    pub timeframe: String,
}

/// Mutable scanner state: batch cursor, per-symbol candle series and the
/// active-signal map. Exclusively owned by the scanner actor; every read
/// leaves through a clone.
#[derive(Debug)]
pub struct ScannerState {
    scanning: bool,
    current_batch: usize,
    universe: SymbolUniverse,
    series: FxHashMap<String, CandleSeries>,
    signals: FxHashMap<String, SignalRecord>,
}

impl ScannerState {
    pub fn new(universe: SymbolUniverse) -> Self {
        Self {
            scanning: false,
            current_batch: 0,
            universe,
            series: FxHashMap::default(),
            signals: FxHashMap::default(),
        }
    }

    pub fn scanning(&self) -> bool {
        self.scanning
    }

    pub fn current_batch(&self) -> usize {
        self.current_batch
    }

    pub fn batch_count(&self) -> usize {
        self.universe.batch_count()
    }

    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    /// Transition idle → scanning. Returns false when already scanning.
    /// Starting begins cold: batch cursor, candle stores and signals from a
    /// previous run are discarded.
    pub fn start(&mut self) -> bool {
        if self.scanning {
            return false;
        }
        self.scanning = true;
        self.current_batch = 0;
        self.series.clear();
        self.signals.clear();
        true
    }

    /// Transition scanning → idle. Returns false when already idle.
    pub fn stop(&mut self) -> bool {
        if !self.scanning {
            return false;
        }
        self.scanning = false;
        self.current_batch = 0;
        self.series.clear();
        self.signals.clear();
        true
    }

    /// Symbols of the currently live batch.
    pub fn active_symbols(&self) -> &[String] {
        self.universe
            .batches()
            .get(self.current_batch)
            .map(|batch| batch.as_slice())
            .unwrap_or(&[])
    }

    /// Advance the batch cursor circularly and return the new live batch.
    pub fn advance_batch(&mut self) -> &[String] {
        let count = self.universe.batch_count();
        if count > 0 {
            self.current_batch = (self.current_batch + 1) % count;
        }
        self.active_symbols()
    }

    pub fn apply_tick(&mut self, symbol: &str, candle: FuturesOHLCVCandle) {
        self.series
            .entry(symbol.to_string())
            .or_insert_with(CandleSeries::new)
            .apply_tick(candle);
    }

    pub fn series(&self, symbol: &str) -> Option<&CandleSeries> {
        self.series.get(symbol)
    }

    pub fn series_len(&self, symbol: &str) -> usize {
        self.series.get(symbol).map(CandleSeries::len).unwrap_or(0)
    }

    /// Unified series for evaluation: streamed tail merged over the fetched
    /// historical window. An empty historical window (fetch failure)
    /// degrades to the streamed series alone.
    pub fn merged_series(
        &self,
        symbol: &str,
        historical: &[FuturesOHLCVCandle],
    ) -> Vec<FuturesOHLCVCandle> {
        match self.series.get(symbol) {
            Some(series) => series.merge_with_historical(historical),
            None => historical.to_vec(),
        }
    }

    /// Write an evaluation result into the signal map: replace on any set
    /// flag, remove otherwise — a signal is transient per bar, not
    /// accumulated.
    pub fn commit_verdict(&mut self, symbol: &str, verdict: &SignalVerdict, now: TimestampMS) {
        if verdict.has_signal() {
            self.signals.insert(
                symbol.to_string(),
                SignalRecord::from_verdict(symbol.to_string(), verdict, now),
            );
        } else {
            self.signals.remove(symbol);
        }
    }

    pub fn signal(&self, symbol: &str) -> Option<&SignalRecord> {
        self.signals.get(symbol)
    }

    /// Signals still inside the validity window. Expired records are
    /// dropped here, on read.
    pub fn active_signals(&mut self, now: TimestampMS) -> HashMap<String, SignalRecord> {
        self.signals.retain(|_, record| record.is_valid_at(now));
        self.signals
            .iter()
            .map(|(symbol, record)| (symbol.clone(), record.clone()))
            .collect()
    }

    pub fn status(&mut self, now: TimestampMS, timeframe: &str) -> ScannerStatus {
        self.signals.retain(|_, record| record.is_valid_at(now));
        ScannerStatus {
            scanning: self.scanning,
            current_batch: self.current_batch,
            active_symbols: self.active_symbols().len(),
            total_symbols: self.universe.total_symbols(),
            signal_count: self.signals.len(),
            timeframe: timeframe.to_string(),
        }
    }
}
