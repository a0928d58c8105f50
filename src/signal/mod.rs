pub mod engine;
pub mod indicators;

pub use engine::{SignalEngine, SignalVerdict, TrendState, VolumeStatus};
