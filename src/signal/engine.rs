use serde::{Deserialize, Serialize};

use crate::candles::structs::FuturesOHLCVCandle;
use crate::signal::indicators::{
    ema, macd, pivot_high, pivot_low, rolling_max, rsi, shift, shift_bool, sma,
};

/// Minimum series length the pipeline accepts; shorter input yields the
/// neutral verdict instead of an error.
pub const MIN_BARS: usize = 200;

// Calibration constants. Fixed design values, not statistically derived;
// kept in one block so a later move into configuration stays mechanical.
const LOW_TF_SECONDS: u64 = 300;
const GOLDEN_RATIO_INVERSE: f64 = 0.618;
const GOLDEN_ZONE_TOLERANCE: f64 = 0.08;
const GOLDEN_LOOKBACK: usize = 89;
const EMA_FAST: usize = 12;
const EMA_MEDIUM: usize = 26;
const EMA_SLOW: usize = 50;
const EMA_LONG: usize = 100;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const PIVOT_LOOKBACK_LOW_TF: usize = 5;
const PIVOT_LOOKBACK_HIGH_TF: usize = 8;
const STRONG_PIVOT_VOLUME_MULT: f64 = 1.2;
const VOLUME_SURGE_MULT_LOW_TF: f64 = 2.0;
const VOLUME_SURGE_MULT_HIGH_TF: f64 = 1.8;
const VOLUME_ABOVE_NORMAL_MULT: f64 = 1.4;
const VOLUME_DECLINING_MULT: f64 = 0.7;
const BIG_VOLUME_MULT: f64 = 2.5;
const PUMP_PRICE_CHANGE_LOW_TF: f64 = 1.2;
const PUMP_PRICE_CHANGE_HIGH_TF: f64 = 0.8;
const PUMP_FAST_EMA_MULT: f64 = 1.008;
const GOLDEN_PUMP_VOLUME_MULT: f64 = 1.6;
const BUY_OVEREXTENDED_MULT: f64 = 1.05;
const SELL_OVEREXTENDED_MULT: f64 = 0.95;
const VOLUME_STATUS_HIGH_MULT: f64 = 1.5;
const VOLUME_STATUS_LOW_MULT: f64 = 0.8;

/// Trend classification for the most recent bar. States are mutually
/// exclusive by construction; precedence strong before weak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendState {
    StrongUp,
    StrongDown,
    WeakUp,
    WeakDown,
    Sideways,
    InsufficientData,
}

impl std::fmt::Display for TrendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendState::StrongUp => write!(f, "strong-up"),
            TrendState::StrongDown => write!(f, "strong-down"),
            TrendState::WeakUp => write!(f, "weak-up"),
            TrendState::WeakDown => write!(f, "weak-down"),
            TrendState::Sideways => write!(f, "sideways"),
            TrendState::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

/// Volume regime of the most recent bar relative to its 20-bar average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeStatus {
    High,
    Low,
    Normal,
    Unknown,
}

impl std::fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeStatus::High => write!(f, "high"),
            VolumeStatus::Low => write!(f, "low"),
            VolumeStatus::Normal => write!(f, "normal"),
            VolumeStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Most-recent-bar verdict of the signal pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalVerdict {
    pub buy_signal: bool,
    pub pump_signal: bool,
    pub sell_signal: bool,
    pub rsi: f64,
    pub trend: TrendState,
    pub volume_status: VolumeStatus,
    pub price: f64,
    pub price_change: f64,
}

impl SignalVerdict {
    /// Neutral verdict for series below the minimum sample size.
    pub fn insufficient_data() -> Self {
        Self {
            buy_signal: false,
            pump_signal: false,
            sell_signal: false,
            rsi: 0.0,
            trend: TrendState::InsufficientData,
            volume_status: VolumeStatus::Unknown,
            price: 0.0,
            price_change: 0.0,
        }
    }

    pub fn has_signal(&self) -> bool {
        self.buy_signal || self.pump_signal || self.sell_signal
    }
}

/// Stateless multi-factor signal detector.
///
/// `evaluate` is a pure function of its input series: it recomputes the
/// full rolling history on every call and reads the verdict off the final
/// bar, so callers may later swap in incremental indicator updates without
/// touching the interface.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    timeframe_seconds: u64,
}

impl SignalEngine {
    pub fn new(timeframe_seconds: u64) -> Self {
        Self { timeframe_seconds }
    }

    pub fn evaluate(&self, candles: &[FuturesOHLCVCandle]) -> SignalVerdict {
        let n = candles.len();
        if n < MIN_BARS {
            return SignalVerdict::insufficient_data();
        }

        let open: Vec<f64> = candles.iter().map(|c| c.open).collect();
        let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volume: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let is_low_tf = self.timeframe_seconds <= LOW_TF_SECONDS;

        // Derived series
        let volume_avg = sma(&volume, 20);
        let _volume_avg_short = sma(&volume, 10);
        let price_change: Vec<f64> = close
            .iter()
            .zip(&open)
            .map(|(c, o)| (c - o) / o * 100.0)
            .collect();

        // Golden-ratio zone against the 89-bar high
        let highest = rolling_max(&high, GOLDEN_LOOKBACK);
        let golden_zone: Vec<bool> = (0..n)
            .map(|i| {
                let ratio = close[i] / highest[i];
                ratio >= GOLDEN_RATIO_INVERSE - GOLDEN_ZONE_TOLERANCE
                    && ratio <= GOLDEN_RATIO_INVERSE + GOLDEN_ZONE_TOLERANCE
            })
            .collect();

        // Multi-EMA trend machine
        let ema_fast = ema(&close, EMA_FAST);
        let ema_medium = ema(&close, EMA_MEDIUM);
        let ema_slow = ema(&close, EMA_SLOW);
        let ema_long = ema(&close, EMA_LONG);

        let mut strong_uptrend = vec![false; n];
        let mut strong_downtrend = vec![false; n];
        let mut weak_uptrend = vec![false; n];
        let mut weak_downtrend = vec![false; n];
        let mut sideways = vec![false; n];
        for i in 0..n {
            strong_uptrend[i] = ema_fast[i] > ema_medium[i]
                && ema_medium[i] > ema_slow[i]
                && ema_slow[i] > ema_long[i]
                && close[i] > ema_fast[i];
            strong_downtrend[i] = ema_fast[i] < ema_medium[i]
                && ema_medium[i] < ema_slow[i]
                && ema_slow[i] < ema_long[i]
                && close[i] < ema_fast[i];
            weak_uptrend[i] =
                ema_fast[i] > ema_medium[i] && close[i] > ema_fast[i] && !strong_uptrend[i];
            weak_downtrend[i] =
                ema_fast[i] < ema_medium[i] && close[i] < ema_fast[i] && !strong_downtrend[i];
            sideways[i] = !strong_uptrend[i]
                && !strong_downtrend[i]
                && !weak_uptrend[i]
                && !weak_downtrend[i];
        }

        // One-bar-lagged trend transitions
        let weak_downtrend_prev = shift_bool(&weak_downtrend, 1);
        let weak_uptrend_prev = shift_bool(&weak_uptrend, 1);
        let trend_change_up: Vec<bool> = (0..n)
            .map(|i| weak_downtrend_prev[i] && (sideways[i] || weak_uptrend[i]))
            .collect();
        let trend_change_down: Vec<bool> = (0..n)
            .map(|i| weak_uptrend_prev[i] && (sideways[i] || weak_downtrend[i]))
            .collect();

        // Momentum
        let rsi_series = rsi(&close, RSI_PERIOD);
        let (macd_line, signal_line, histogram) = macd(&close, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let histogram_prev = shift(&histogram, 1);
        let macd_bullish: Vec<bool> = (0..n)
            .map(|i| macd_line[i] > signal_line[i] && histogram[i] > histogram_prev[i])
            .collect();
        let macd_bearish: Vec<bool> = (0..n)
            .map(|i| macd_line[i] < signal_line[i] && histogram[i] < histogram_prev[i])
            .collect();

        // Extremum detection. A pivot needs `lookback` confirming bars on
        // the right, so the final bars can only qualify via the V-shape.
        let lookback = if is_low_tf {
            PIVOT_LOOKBACK_LOW_TF
        } else {
            PIVOT_LOOKBACK_HIGH_TF
        };
        let pivot_highs = pivot_high(&high, lookback, lookback);
        let pivot_lows = pivot_low(&low, lookback, lookback);

        let mut perfect_dip = vec![false; n];
        let mut perfect_peak = vec![false; n];
        for i in 0..n {
            let strong_dip = pivot_lows[i] && volume[i] > volume_avg[i] * STRONG_PIVOT_VOLUME_MULT;
            let strong_peak =
                pivot_highs[i] && volume[i] > volume_avg[i] * STRONG_PIVOT_VOLUME_MULT;

            let v_shape_dip = i >= 2
                && low[i - 2] > low[i - 1]
                && low[i - 1] > low[i]
                && volume[i] > volume_avg[i];
            let inverted_v_peak = i >= 2
                && high[i - 2] < high[i - 1]
                && high[i - 1] < high[i]
                && volume[i] > volume_avg[i];

            perfect_dip[i] = strong_dip || v_shape_dip;
            perfect_peak[i] = strong_peak || inverted_v_peak;
        }

        // Volume regimes
        let surge_mult = if is_low_tf {
            VOLUME_SURGE_MULT_LOW_TF
        } else {
            VOLUME_SURGE_MULT_HIGH_TF
        };
        let volume_surge: Vec<bool> = (0..n)
            .map(|i| volume[i] > volume_avg[i] * surge_mult)
            .collect();
        let volume_above_normal: Vec<bool> = (0..n)
            .map(|i| volume[i] > volume_avg[i] * VOLUME_ABOVE_NORMAL_MULT)
            .collect();
        let _volume_declining: Vec<bool> = (0..n)
            .map(|i| volume[i] < volume_avg[i] * VOLUME_DECLINING_MULT)
            .collect();

        let big_volume_up: Vec<bool> = (0..n)
            .map(|i| {
                close[i] > open[i]
                    && volume[i] > volume_avg[i] * BIG_VOLUME_MULT
                    && i > 0
                    && close[i] > close[i - 1]
            })
            .collect();
        let big_volume_down: Vec<bool> = (0..n)
            .map(|i| {
                close[i] < open[i]
                    && volume[i] > volume_avg[i] * BIG_VOLUME_MULT
                    && i > 0
                    && close[i] < close[i - 1]
            })
            .collect();

        // Composite signals, read from the final bar
        let last = n - 1;
        let last_rsi = rsi_series[last];

        let buy_condition_1 = perfect_dip[last]
            && (strong_downtrend[last] || weak_downtrend[last])
            && last_rsi < 40.0
            && volume_above_normal[last];
        let buy_condition_2 = trend_change_up[last]
            && macd_bullish[last]
            && last_rsi < 50.0
            && volume_surge[last];
        let buy_condition_3 =
            sideways[last] && perfect_dip[last] && last_rsi < 35.0 && big_volume_up[last];
        let avoid_buy = strong_uptrend[last]
            || last_rsi > 60.0
            || close[last] > ema_long[last] * BUY_OVEREXTENDED_MULT;
        let buy_signal = (buy_condition_1 || buy_condition_2 || buy_condition_3) && !avoid_buy;

        let perfect_dip_prev = shift_bool(&perfect_dip, 1);
        let pump_price_change_gate = if is_low_tf {
            PUMP_PRICE_CHANGE_LOW_TF
        } else {
            PUMP_PRICE_CHANGE_HIGH_TF
        };
        let pump_condition_1 = perfect_dip_prev[last]
            && close[last] > high[last - 1]
            && volume_surge[last]
            && price_change[last] > pump_price_change_gate;
        let pump_condition_2 = trend_change_up[last]
            && big_volume_up[last]
            && close[last] > ema_fast[last] * PUMP_FAST_EMA_MULT;
        let pump_condition_3 = golden_zone[last]
            && macd_bullish[last]
            && volume[last] > volume_avg[last] * GOLDEN_PUMP_VOLUME_MULT
            && close[last] > open[last];
        let avoid_pump = strong_uptrend[last] && last_rsi > 70.0;
        let pump_signal =
            (pump_condition_1 || pump_condition_2 || pump_condition_3) && !avoid_pump;

        let sell_condition_1 = perfect_peak[last]
            && (strong_uptrend[last] || weak_uptrend[last])
            && last_rsi > 65.0
            && volume_above_normal[last];
        let sell_condition_2 = trend_change_down[last]
            && macd_bearish[last]
            && last_rsi > 50.0
            && volume_surge[last];
        let sell_condition_3 =
            sideways[last] && perfect_peak[last] && last_rsi > 70.0 && big_volume_down[last];
        let avoid_sell = strong_downtrend[last]
            || last_rsi < 40.0
            || close[last] < ema_long[last] * SELL_OVEREXTENDED_MULT;
        let sell_signal = (sell_condition_1 || sell_condition_2 || sell_condition_3) && !avoid_sell;

        let trend = if strong_uptrend[last] {
            TrendState::StrongUp
        } else if strong_downtrend[last] {
            TrendState::StrongDown
        } else if weak_uptrend[last] {
            TrendState::WeakUp
        } else if weak_downtrend[last] {
            TrendState::WeakDown
        } else {
            TrendState::Sideways
        };

        let volume_status = if volume[last] > volume_avg[last] * VOLUME_STATUS_HIGH_MULT {
            VolumeStatus::High
        } else if volume[last] < volume_avg[last] * VOLUME_STATUS_LOW_MULT {
            VolumeStatus::Low
        } else {
            VolumeStatus::Normal
        };

        SignalVerdict {
            buy_signal,
            pump_signal,
            sell_signal,
            rsi: last_rsi,
            trend,
            volume_status,
            price: close[last],
            price_change: price_change[last],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> FuturesOHLCVCandle {
        let open_time = i as i64 * 300_000;
        FuturesOHLCVCandle::new_from_values(
            open_time,
            open_time + 299_999,
            open,
            high,
            low,
            close,
            volume,
            100,
            volume / 2.0,
            true,
        )
    }

    fn rising_series(bars: usize) -> Vec<FuturesOHLCVCandle> {
        (0..bars)
            .map(|i| {
                let price = 100.0 + i as f64 * 0.5;
                candle(i, price - 0.2, price + 0.1, price - 0.3, price, 100.0)
            })
            .collect()
    }

    fn falling_series(bars: usize) -> Vec<FuturesOHLCVCandle> {
        (0..bars)
            .map(|i| {
                let price = 500.0 - i as f64 * 0.5;
                candle(i, price + 0.2, price + 0.3, price - 0.1, price, 100.0)
            })
            .collect()
    }

    fn flat_series(bars: usize) -> Vec<FuturesOHLCVCandle> {
        (0..bars)
            .map(|i| candle(i, 100.0, 100.0, 100.0, 100.0, 100.0))
            .collect()
    }

    #[test]
    fn test_short_series_yields_neutral_verdict() {
        let engine = SignalEngine::new(300);
        let verdict = engine.evaluate(&rising_series(199));

        assert_eq!(verdict.trend, TrendState::InsufficientData);
        assert_eq!(verdict.volume_status, VolumeStatus::Unknown);
        assert!(!verdict.has_signal());
        assert_eq!(verdict.price, 0.0);
    }

    #[test]
    fn test_exactly_min_bars_is_evaluated() {
        let engine = SignalEngine::new(300);
        let verdict = engine.evaluate(&rising_series(MIN_BARS));
        assert_ne!(verdict.trend, TrendState::InsufficientData);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let engine = SignalEngine::new(300);
        let series = rising_series(250);

        let first = engine.evaluate(&series);
        let second = engine.evaluate(&series);
        assert_eq!(first, second);
    }

    #[test]
    fn test_strong_uptrend_is_detected() {
        let engine = SignalEngine::new(300);
        let verdict = engine.evaluate(&rising_series(250));

        assert_eq!(verdict.trend, TrendState::StrongUp);
        assert!(verdict.rsi > 60.0);
    }

    #[test]
    fn test_strong_uptrend_suppresses_buy() {
        // an overextended uptrend with overbought RSI must never flag a buy,
        // whatever the underlying dip conditions look like
        let engine = SignalEngine::new(300);
        let verdict = engine.evaluate(&rising_series(250));

        assert!(verdict.rsi > 70.0);
        assert!(!verdict.buy_signal);
    }

    #[test]
    fn test_strong_downtrend_is_detected() {
        let engine = SignalEngine::new(300);
        let verdict = engine.evaluate(&falling_series(250));

        assert_eq!(verdict.trend, TrendState::StrongDown);
        assert!(verdict.rsi < 40.0);
        // the mirrored suppression blocks sells in an oversold downtrend
        assert!(!verdict.sell_signal);
    }

    #[test]
    fn test_flat_series_is_sideways_normal_volume() {
        let engine = SignalEngine::new(300);
        let verdict = engine.evaluate(&flat_series(250));

        assert_eq!(verdict.trend, TrendState::Sideways);
        assert_eq!(verdict.volume_status, VolumeStatus::Normal);
        assert!(!verdict.has_signal());
        assert_eq!(verdict.price, 100.0);
        assert_eq!(verdict.price_change, 0.0);
    }

    #[test]
    fn test_volume_spike_reports_high_status() {
        let engine = SignalEngine::new(300);
        let mut series = flat_series(250);
        series.last_mut().unwrap().volume = 400.0;

        let verdict = engine.evaluate(&series);
        assert_eq!(verdict.volume_status, VolumeStatus::High);
    }

    #[test]
    fn test_low_volume_reports_low_status() {
        let engine = SignalEngine::new(300);
        let mut series = flat_series(250);
        series.last_mut().unwrap().volume = 10.0;

        let verdict = engine.evaluate(&series);
        assert_eq!(verdict.volume_status, VolumeStatus::Low);
    }

    #[test]
    fn test_price_change_is_percent_of_open() {
        let engine = SignalEngine::new(300);
        let mut series = flat_series(250);
        let last = series.last_mut().unwrap();
        last.open = 100.0;
        last.close = 102.0;
        last.high = 102.0;

        let verdict = engine.evaluate(&series);
        assert!((verdict.price_change - 2.0).abs() < 1e-9);
        assert_eq!(verdict.price, 102.0);
    }
}
