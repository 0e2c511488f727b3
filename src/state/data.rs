/// Shared data structures for the application state
///
/// These types represent the data model that flows between
/// the backend layer, the view synchronizer and the UI layer.
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Backend-assigned identifier of a record.
///
/// Opaque to the client. The backend may send it as a JSON number or a
/// string; both are kept as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::new(id)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId(id.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(id) => RecordId::from(id),
            Raw::Text(id) => RecordId(id),
        })
    }
}

/// Direction of the hand-over a test case belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[serde(rename = "Quotation to Pricing")]
    QuotationToPricing,
    #[serde(rename = "Pricing to Quotation")]
    PricingToQuotation,
}

impl Team {
    pub fn label(self) -> &'static str {
        match self {
            Team::QuotationToPricing => "Quotation to Pricing",
            Team::PricingToQuotation => "Pricing to Quotation",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted status of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    New,
    #[serde(rename = "In progress")]
    InProgress,
    Done,
    #[serde(rename = "Not impacted")]
    NotImpacted,
}

impl Status {
    #[cfg(test)]
    pub const ALL: [Status; 4] = [
        Status::New,
        Status::InProgress,
        Status::Done,
        Status::NotImpacted,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::New => "New",
            Status::InProgress => "In progress",
            Status::Done => "Done",
            Status::NotImpacted => "Not impacted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the per-item status control offers.
///
/// `Delete` is an action, not a status: it is never written to the
/// `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChoice {
    Set(Status),
    Delete,
}

impl StatusChoice {
    pub const ALL: [StatusChoice; 5] = [
        StatusChoice::Set(Status::New),
        StatusChoice::Set(Status::InProgress),
        StatusChoice::Set(Status::Done),
        StatusChoice::Set(Status::NotImpacted),
        StatusChoice::Delete,
    ];
}

impl fmt::Display for StatusChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusChoice::Set(status) => status.fmt(f),
            StatusChoice::Delete => f.write_str("Delete"),
        }
    }
}

/// A test case row as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: RecordId,
    /// User-supplied number, display only (not unique)
    pub test_case_id: i64,
    pub team: Team,
    pub description: String,
    pub status: Status,
    /// Insert time, the sort key of the initial load
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    /// Header line, e.g. "ID: 42 – Quotation to Pricing"
    pub fn heading(&self) -> String {
        format!("ID: {} – {}", self.test_case_id, self.team)
    }

    /// Creation time in local time, day first
    pub fn added_on(&self) -> String {
        let local = self.created_at.with_timezone(&Local);
        format!("Added on {}", local.format("%d/%m/%Y, %H:%M:%S"))
    }
}

/// Payload of an insert request; `id` and `created_at` come from the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTestCase {
    pub test_case_id: i64,
    pub team: Team,
    pub description: String,
    pub status: Status,
}

/// Strip control characters (keeping line breaks and tabs) from text shown
/// in the list. The text widget never interprets markup.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Accepts RFC 3339 timestamps (`timestamptz`) as well as zone-less ones
/// (`timestamp`), the latter being taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Postgres short offsets such as "+00"
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_record_id_accepts_numbers_and_strings() {
        let from_int: RecordId = serde_json::from_value(json!(17)).unwrap();
        let from_str: RecordId = serde_json::from_value(json!("9b2f")).unwrap();
        assert_eq!(from_int, RecordId::from(17));
        assert_eq!(from_str.as_str(), "9b2f");
    }

    #[test]
    fn test_decode_row() {
        let row = json!({
            "id": 3,
            "test_case_id": 42,
            "team": "Pricing to Quotation",
            "description": "Check rounding",
            "status": "Not impacted",
            "created_at": "2024-03-01T10:15:30.123456+00:00"
        });
        let record: TestCase = serde_json::from_value(row).unwrap();
        assert_eq!(record.id, RecordId::from(3));
        assert_eq!(record.team, Team::PricingToQuotation);
        assert_eq!(record.status, Status::NotImpacted);
        assert_eq!(record.created_at.timestamp(), 1_709_288_130);
        assert_eq!(record.heading(), "ID: 42 – Pricing to Quotation");
    }

    #[test]
    fn test_delete_is_not_a_status() {
        let row = json!({
            "id": 1,
            "test_case_id": 1,
            "team": "Quotation to Pricing",
            "description": "x",
            "status": "Delete",
            "created_at": "2024-03-01T10:15:30Z"
        });
        assert!(serde_json::from_value::<TestCase>(row).is_err());
        assert_eq!(StatusChoice::ALL.len(), 5);
        assert_eq!(StatusChoice::Delete.to_string(), "Delete");
    }

    #[test]
    fn test_new_test_case_serializes_labels() {
        let new = NewTestCase {
            test_case_id: 42,
            team: Team::QuotationToPricing,
            description: "x".into(),
            status: Status::New,
        };
        assert_eq!(
            serde_json::to_value(&new).unwrap(),
            json!({
                "test_case_id": 42,
                "team": "Quotation to Pricing",
                "description": "x",
                "status": "New"
            })
        );
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 30).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:15:30Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T11:15:30+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 10:15:30+00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:15:30"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize("a\u{0007}b\nc\td"), "ab\nc\td");
        assert_eq!(sanitize("<b>bold</b>"), "<b>bold</b>");
    }
}
