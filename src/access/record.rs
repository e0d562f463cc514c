use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;

/// One request, as the access log sees it.
///
/// Serializes to compact JSON: empty strings, zero numbers, an absent body,
/// an absent error and an empty `params` map are all left out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccessRecord {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_id: String,

    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote_ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub referer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub status: u16,
    /// Seconds, ceil-rounded to microseconds.
    #[serde(skip_serializing_if = "is_zero")]
    pub latency: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub request_length: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub bytes_sent: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<CapturedBody>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub controller: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(rename = "userId", skip_serializing_if = "is_zero")]
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AccessRecord {
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// A request body snapshot, already redacted.
///
/// Valid JSON is kept token-for-token (numbers are not re-encoded); anything
/// else is kept as text.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CapturedBody {
    Json(Box<RawValue>),
    Text(String),
}

impl CapturedBody {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Json(raw) => raw.get(),
            Self::Text(text) => text,
        }
    }
}

fn is_zero<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted() {
        let record = AccessRecord {
            request_id: "abc".into(),
            method: "GET".into(),
            status: 200,
            ..AccessRecord::default()
        };
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["request_id"], "abc");
        assert_eq!(obj["status"], 200);
        assert!(obj.contains_key("timestamp"));
        for absent in ["session_id", "body", "params", "userId", "error", "latency", "controller"] {
            assert!(!obj.contains_key(absent), "{absent} should be omitted");
        }
    }

    #[test]
    fn json_body_keeps_number_tokens() {
        let raw = RawValue::from_string(r#"{"amount":12.50000000000000001}"#.to_owned()).unwrap();
        let record = AccessRecord {
            body: Some(CapturedBody::Json(raw)),
            user_id: 7,
            ..AccessRecord::default()
        };
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains(r#""body":{"amount":12.50000000000000001}"#), "{line}");
        assert!(line.contains(r#""userId":7"#));
    }

    #[test]
    fn blank_error_is_not_an_error() {
        let mut record = AccessRecord::default();
        assert!(!record.has_error());
        record.error = Some(String::new());
        assert!(!record.has_error());
        record.error = Some("boom".into());
        assert!(record.has_error());
    }
}
