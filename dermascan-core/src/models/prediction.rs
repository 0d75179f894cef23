use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification outcome for a single image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Cancer")]
    Cancer,
    #[serde(rename = "Non-cancer")]
    NonCancer,
}

impl Verdict {
    pub fn from_is_cancer(is_cancer: bool) -> Self {
        if is_cancer {
            Verdict::Cancer
        } else {
            Verdict::NonCancer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Cancer => "Cancer",
            Verdict::NonCancer => "Non-cancer",
        }
    }

    /// Advice shown to the user alongside the verdict.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Verdict::Cancer => "Segera periksa ke dokter!",
            Verdict::NonCancer => "Penyakit kanker tidak terdeteksi.",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVerdict(pub String);

impl fmt::Display for UnknownVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown verdict '{}'", self.0)
    }
}

impl std::error::Error for UnknownVerdict {}

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cancer" => Ok(Verdict::Cancer),
            "Non-cancer" => Ok(Verdict::NonCancer),
            other => Err(UnknownVerdict(other.to_string())),
        }
    }
}

/// A stored prediction. Written once per successful upload, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: String,
    pub result: Verdict,
    pub suggestion: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Build a record for `result` with a fresh id, stamped now.
    pub fn new(result: Verdict) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), result, Utc::now())
    }

    pub fn with_id(id: String, result: Verdict, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            result,
            suggestion: result.suggestion().to_string(),
            // Millisecond precision survives every store round-trip unchanged.
            created_at: created_at.trunc_subsecs(3),
        }
    }
}

/// `createdAt` wire format: `2026-10-17T08:15:30.123Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_suggestion_mapping() {
        assert_eq!(Verdict::Cancer.suggestion(), "Segera periksa ke dokter!");
        assert_eq!(Verdict::NonCancer.suggestion(), "Penyakit kanker tidak terdeteksi.");
    }

    #[test]
    fn test_from_is_cancer() {
        assert_eq!(Verdict::from_is_cancer(true), Verdict::Cancer);
        assert_eq!(Verdict::from_is_cancer(false), Verdict::NonCancer);
    }

    #[test]
    fn test_verdict_wire_names() {
        assert_eq!(serde_json::to_value(Verdict::Cancer).unwrap(), "Cancer");
        assert_eq!(serde_json::to_value(Verdict::NonCancer).unwrap(), "Non-cancer");
        assert_eq!("Non-cancer".parse::<Verdict>().unwrap(), Verdict::NonCancer);
        assert!("non-cancer".parse::<Verdict>().is_err(), "parsing is case-sensitive");
    }

    #[test]
    fn test_new_records_get_distinct_ids() {
        let a = PredictionRecord::new(Verdict::Cancer);
        let b = PredictionRecord::new(Verdict::Cancer);
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_suggestion_follows_result() {
        let record = PredictionRecord::new(Verdict::NonCancer);
        assert_eq!(record.suggestion, Verdict::NonCancer.suggestion());
    }

    #[test]
    fn test_record_json_shape() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 17, 8, 15, 30).unwrap()
            + chrono::Duration::microseconds(123_456);
        let record = PredictionRecord::with_id("abc".to_string(), Verdict::Cancer, ts);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["result"], "Cancer");
        assert_eq!(json["suggestion"], "Segera periksa ke dokter!");
        assert_eq!(json["createdAt"], "2026-10-17T08:15:30.123Z");
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_record_deserializes_from_wire_form() {
        let json = serde_json::json!({
            "id": "xyz",
            "result": "Non-cancer",
            "suggestion": "Penyakit kanker tidak terdeteksi.",
            "createdAt": "2026-01-02T03:04:05.006Z"
        });
        let record: PredictionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.result, Verdict::NonCancer);
        assert_eq!(iso_millis::format(&record.created_at), "2026-01-02T03:04:05.006Z");
    }
}
