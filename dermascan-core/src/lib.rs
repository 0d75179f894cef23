pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use classifier::{create_classifier, Classifier, ClassifierError, FixedClassifier, RandomClassifier};
pub use config::DermascanConfig;
pub use error::DermascanError;
pub use models::{HistoryItem, PredictionRecord, Verdict};
pub use store::{create_store, MemoryRecordStore, PgRecordStore, RecordStore, StoreError};
