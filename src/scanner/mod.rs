pub mod actor;
pub mod structs;

#[cfg(test)]
mod tests;

pub use actor::{ScannerActor, ScannerAsk, ScannerReply, ScannerTell};
pub use structs::{ScannerConfig, ScannerState, ScannerStatus, SignalRecord};
