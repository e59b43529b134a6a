use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Status names the SDK waits on
pub mod names {
    pub const EXECUTING: &str = "Executing";
    pub const COMPLETED: &str = "Completed";
    pub const STARTED: &str = "Started";
    pub const STOPPED: &str = "Stopped";
}

/// One entry of a status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: String,
    #[serde(
        rename = "statusDate",
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_date: Option<DateTime<Utc>>,
    #[serde(
        rename = "statusReason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusRecord {
    pub fn is(&self, status: &str) -> bool {
        self.status == status
    }
}

/// Accept RFC 3339 dates and the zone-less form some endpoints emit;
/// anything else becomes `None`.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_status_date))
}

pub(crate) fn parse_status_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Helpers over a collected status history.
///
/// Histories are used in server order (newest first) by default; these
/// helpers are for callers that want to check the dates themselves.
pub trait StatusHistory {
    /// Record with the latest `statusDate`, ignoring undated records
    fn latest_by_date(&self) -> Option<&StatusRecord>;

    /// Record with the earliest `statusDate`, ignoring undated records
    fn earliest_by_date(&self) -> Option<&StatusRecord>;

    /// Whether any record has the given status
    fn contains_status(&self, status: &str) -> bool;
}

impl StatusHistory for [StatusRecord] {
    fn latest_by_date(&self) -> Option<&StatusRecord> {
        self.iter()
            .filter(|r| r.status_date.is_some())
            .max_by_key(|r| r.status_date)
    }

    fn earliest_by_date(&self) -> Option<&StatusRecord> {
        self.iter()
            .filter(|r| r.status_date.is_some())
            .min_by_key(|r| r.status_date)
    }

    fn contains_status(&self, status: &str) -> bool {
        self.iter().any(|r| r.is(status))
    }
}
