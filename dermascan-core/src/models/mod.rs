pub mod history;
pub mod prediction;

pub use history::{HistoryEntry, HistoryItem};
pub use prediction::{iso_millis, PredictionRecord, UnknownVerdict, Verdict};
