use chrono::{DateTime, Utc};
use serde::Serialize;

use super::prediction::{iso_millis, PredictionRecord, Verdict};

/// One entry of `GET /predict/histories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    pub id: String,
    pub history: HistoryEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub result: Verdict,
    #[serde(serialize_with = "iso_millis::serialize")]
    pub created_at: DateTime<Utc>,
    pub suggestion: String,
    pub id: String,
}

impl From<PredictionRecord> for HistoryItem {
    fn from(record: PredictionRecord) -> Self {
        Self {
            id: record.id.clone(),
            history: HistoryEntry {
                result: record.result,
                created_at: record.created_at,
                suggestion: record.suggestion,
                id: record.id,
            },
        }
    }
}
