pub mod exchange_info;
pub mod klines;
