use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(with = "iso_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HistoricalValues {
    pub now: Option<HistoryEntry>,
    pub yesterday: Option<HistoryEntry>,
    pub last_week: Option<HistoryEntry>,
    pub last_month: Option<HistoryEntry>,
}

impl HistoricalValues {
    pub fn slots(&self) -> [(&'static str, Option<&HistoryEntry>); 4] {
        [
            ("Now", self.now.as_ref()),
            ("Yesterday", self.yesterday.as_ref()),
            ("Last week", self.last_week.as_ref()),
            ("Last month", self.last_month.as_ref()),
        ]
    }
}

/// ISO-8601 on disk. Older logs wrote naive local timestamps without an offset
/// (`2026-01-27T10:00:00.123456`); those are read back as UTC.
pub(crate) mod iso_timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn reads_offset_and_naive_timestamps() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 27, 10, 0, 0).unwrap();
        assert_eq!(iso_timestamp::parse("2026-01-27T10:00:00Z"), Some(expected));
        assert_eq!(iso_timestamp::parse("2026-01-27T19:00:00+09:00"), Some(expected));
        assert_eq!(iso_timestamp::parse("2026-01-27T10:00:00"), Some(expected));
        assert_eq!(iso_timestamp::parse("yesterday"), None);
    }

    #[test]
    fn writes_timestamp_as_iso_string() {
        let entry = HistoryEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 27, 10, 0, 0).unwrap(),
            score: 42.5,
            status: "Risk Off".to_string(),
            message: "m".to_string(),
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["timestamp"], json!("2026-01-27T10:00:00.000000Z"));
    }

    #[test]
    fn rejects_garbage_timestamp() {
        let v = json!({"timestamp": "not a date", "score": 1.0, "status": "x", "message": "y"});
        assert!(serde_json::from_value::<HistoryEntry>(v).is_err());
    }
}
