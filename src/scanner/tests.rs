use crate::candles::structs::FuturesOHLCVCandle;
use crate::scanner::structs::{ScannerState, SignalRecord, SIGNAL_VALIDITY_MS};
use crate::signal::engine::{SignalVerdict, TrendState, VolumeStatus};
use crate::universe::SymbolUniverse;

fn universe_of(count: usize, batch_size: usize) -> SymbolUniverse {
    let symbols: Vec<String> = (0..count).map(|i| format!("SYM{}USDT", i)).collect();
    SymbolUniverse::new(symbols, batch_size)
}

fn tick(open_time: i64, close: f64) -> FuturesOHLCVCandle {
    FuturesOHLCVCandle::new_from_values(
        open_time,
        open_time + 299_999,
        close,
        close,
        close,
        close,
        1.0,
        10,
        0.5,
        true,
    )
}

fn verdict(buy: bool, sell: bool) -> SignalVerdict {
    SignalVerdict {
        buy_signal: buy,
        pump_signal: false,
        sell_signal: sell,
        rsi: 35.0,
        trend: TrendState::WeakDown,
        volume_status: VolumeStatus::Normal,
        price: 100.0,
        price_change: -0.5,
    }
}

#[test]
fn test_rotation_is_circular() {
    let mut state = ScannerState::new(universe_of(25, 10));
    state.start();
    assert_eq!(state.current_batch(), 0);
    assert_eq!(state.batch_count(), 3);

    state.advance_batch();
    assert_eq!(state.current_batch(), 1);
    state.advance_batch();
    assert_eq!(state.current_batch(), 2);
    assert_eq!(state.active_symbols().len(), 5);
    state.advance_batch();
    assert_eq!(state.current_batch(), 0);
}

#[test]
fn test_start_is_rejected_while_scanning() {
    let mut state = ScannerState::new(universe_of(5, 10));
    assert!(state.start());
    assert!(!state.start());
    assert!(state.scanning());
}

#[test]
fn test_stop_is_rejected_while_idle() {
    let mut state = ScannerState::new(universe_of(5, 10));
    assert!(!state.stop());
    state.start();
    assert!(state.stop());
    assert!(!state.scanning());
}

#[test]
fn test_restart_resets_batch_and_signals() {
    let mut state = ScannerState::new(universe_of(25, 10));
    state.start();
    state.advance_batch();
    state.commit_verdict("SYM0USDT", &verdict(true, false), 1_000);
    state.apply_tick("SYM0USDT", tick(0, 100.0));

    state.stop();
    state.start();

    assert_eq!(state.current_batch(), 0);
    assert!(state.active_signals(1_000).is_empty());
    assert_eq!(state.series_len("SYM0USDT"), 0);
}

#[test]
fn test_signal_expiry_is_lazy() {
    let mut state = ScannerState::new(universe_of(5, 10));
    state.start();

    let detected_at = 1_000_000;
    state.commit_verdict("SYM0USDT", &verdict(true, false), detected_at);

    let just_valid = state.active_signals(detected_at + SIGNAL_VALIDITY_MS);
    assert!(just_valid.contains_key("SYM0USDT"));

    let expired = state.active_signals(detected_at + SIGNAL_VALIDITY_MS + 1);
    assert!(expired.is_empty());
    // the expired record was pruned, not just filtered from the reply
    assert!(state.signal("SYM0USDT").is_none());
}

#[test]
fn test_flagless_verdict_removes_signal() {
    let mut state = ScannerState::new(universe_of(5, 10));
    state.start();

    state.commit_verdict("SYM0USDT", &verdict(true, false), 1_000);
    assert!(state.signal("SYM0USDT").is_some());

    state.commit_verdict("SYM0USDT", &verdict(false, false), 2_000);
    assert!(state.signal("SYM0USDT").is_none());
}

#[test]
fn test_reanalysis_refreshes_detected_at() {
    let mut state = ScannerState::new(universe_of(5, 10));
    state.start();

    state.commit_verdict("SYM0USDT", &verdict(true, false), 1_000);
    state.commit_verdict("SYM0USDT", &verdict(false, true), 5_000);

    let record = state.signal("SYM0USDT").unwrap();
    assert_eq!(record.detected_at, 5_000);
    assert!(record.sell_signal);
    assert!(!record.buy_signal);
}

#[test]
fn test_status_snapshot() {
    let mut state = ScannerState::new(universe_of(25, 10));
    state.start();
    state.advance_batch();
    state.advance_batch();
    state.commit_verdict("SYM0USDT", &verdict(true, false), 1_000);

    let status = state.status(2_000, "5m");
    assert!(status.scanning);
    assert_eq!(status.current_batch, 2);
    assert_eq!(status.active_symbols, 5);
    assert_eq!(status.total_symbols, 25);
    assert_eq!(status.signal_count, 1);
    assert_eq!(status.timeframe, "5m");
}

#[test]
fn test_status_prunes_expired_signals() {
    let mut state = ScannerState::new(universe_of(5, 10));
    state.start();
    state.commit_verdict("SYM0USDT", &verdict(true, false), 0);

    let status = state.status(SIGNAL_VALIDITY_MS + 1, "5m");
    assert_eq!(status.signal_count, 0);
}

#[test]
fn test_merged_series_without_streamed_data() {
    let state = ScannerState::new(universe_of(5, 10));
    let historical = vec![tick(0, 100.0), tick(300_000, 101.0)];

    let merged = state.merged_series("SYM0USDT", &historical);
    assert_eq!(merged.len(), 2);
}

#[test]
fn test_merged_series_prefers_streamed_tail() {
    let mut state = ScannerState::new(universe_of(5, 10));
    state.start();
    state.apply_tick("SYM0USDT", tick(300_000, 200.0));

    let historical = vec![tick(0, 100.0), tick(300_000, 101.0)];
    let merged = state.merged_series("SYM0USDT", &historical);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[1].close, 200.0);
}

#[test]
fn test_signal_record_kinds_label() {
    let mut record = SignalRecord::from_verdict("BTCUSDT".to_string(), &verdict(true, false), 0);
    assert_eq!(record.kinds(), "BUY");

    record.pump_signal = true;
    assert_eq!(record.kinds(), "BUY + PUMP");
}
