pub mod series;
pub mod structs;

pub use series::CandleSeries;
pub use structs::{interval_to_seconds, FuturesOHLCVCandle, TimestampMS};
