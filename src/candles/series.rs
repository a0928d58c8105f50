use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::candles::structs::FuturesOHLCVCandle;

/// Maximum number of candles retained per symbol.
pub const MAX_SERIES_LEN: usize = 200;

/// How many historical candles participate in a merge (most recent first).
pub const HISTORICAL_MERGE_TAKE: usize = 150;

/// How many streamed candles participate in a merge (most recent first).
pub const STREAMED_MERGE_TAKE: usize = 50;

/// Bounded per-symbol candle history fed by streamed kline ticks.
///
/// Timestamps are non-decreasing and at most the trailing candle has
/// `closed == false`. A tick for the trailing candle's bucket replaces it
/// in place (last write wins); a tick for a new bucket appends and evicts
/// the oldest candle beyond the cap.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: VecDeque<FuturesOHLCVCandle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self {
            candles: VecDeque::with_capacity(MAX_SERIES_LEN),
        }
    }

    /// Apply a streamed tick to the series.
    ///
    /// Ticks older than the trailing bucket are dropped: the stream delivers
    /// per-symbol updates in order, so an older timestamp is a replay.
    pub fn apply_tick(&mut self, candle: FuturesOHLCVCandle) {
        match self.candles.back_mut() {
            Some(last) if last.open_time == candle.open_time => {
                *last = candle;
            }
            Some(last) if last.open_time > candle.open_time => {
                debug!(
                    "Dropping stale tick at {} (trailing bucket is {})",
                    candle.open_time, last.open_time
                );
            }
            _ => {
                // A new bucket implies the previous one is done, even if its
                // closing tick was lost during a batch rotation.
                if let Some(last) = self.candles.back_mut() {
                    last.closed = true;
                }
                self.candles.push_back(candle);
                while self.candles.len() > MAX_SERIES_LEN {
                    self.candles.pop_front();
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Snapshot of the streamed series, oldest first.
    pub fn candles(&self) -> Vec<FuturesOHLCVCandle> {
        self.candles.iter().cloned().collect()
    }

    /// Reconcile a REST-fetched historical window with the streamed tail.
    ///
    /// Takes the most recent `HISTORICAL_MERGE_TAKE` historical candles and
    /// the most recent `STREAMED_MERGE_TAKE` streamed candles, deduplicates
    /// by open time keeping the streamed value, and returns the unified
    /// series in timestamp order. The stream has no backfill, so a freshly
    /// subscribed symbol needs this merge to reach the signal engine's
    /// minimum sample size.
    pub fn merge_with_historical(
        &self,
        historical: &[FuturesOHLCVCandle],
    ) -> Vec<FuturesOHLCVCandle> {
        let mut merged: BTreeMap<i64, FuturesOHLCVCandle> = BTreeMap::new();

        let hist_skip = historical.len().saturating_sub(HISTORICAL_MERGE_TAKE);
        for candle in &historical[hist_skip..] {
            merged.insert(candle.open_time, candle.clone());
        }

        let stream_skip = self.candles.len().saturating_sub(STREAMED_MERGE_TAKE);
        for candle in self.candles.iter().skip(stream_skip) {
            merged.insert(candle.open_time, candle.clone());
        }

        merged.into_values().collect()
    }
}
