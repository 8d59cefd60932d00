//! Wire types shared by the transport layer.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Operation parameters as sent on the wire (form-encoded).
pub type Params = BTreeMap<String, String>;

/// Response envelope returned by every remote operation.
///
/// The remote side always answers HTTP 200 with this shape; failures are
/// communicated through `success == false` plus `error_message` and an
/// optional machine-readable `error_code`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default)]
    pub answer: Option<Value>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<String>,
}

impl ApiResponse {
    /// Interpret `answer` as a boolean.
    ///
    /// The remote is sloppy about types here and may send a bool or one of
    /// the strings "true"/"1"/"yes". Anything else is treated as false.
    pub fn answer_as_bool(&self) -> bool {
        match &self.answer {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => {
                matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
            }
            _ => false,
        }
    }

    /// Interpret `answer` as a string, if it is one.
    pub fn answer_as_str(&self) -> Option<&str> {
        match &self.answer {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ApiResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_success_envelope() {
        let resp = parse(r#"{"success": true, "answer": "sess-abc123"}"#);
        assert!(resp.success);
        assert_eq!(resp.answer_as_str(), Some("sess-abc123"));
        assert!(resp.error_message.is_none());
    }

    #[test]
    fn test_failure_envelope() {
        let resp = parse(
            r#"{"success": false, "errorMessage": "Session expired", "errorCode": "bad_session"}"#,
        );
        assert!(!resp.success);
        assert_eq!(resp.error_message.as_deref(), Some("Session expired"));
        assert_eq!(resp.error_code.as_deref(), Some("bad_session"));
    }

    #[test]
    fn test_answer_as_bool_accepts_bool_and_strings() {
        assert!(parse(r#"{"success": true, "answer": true}"#).answer_as_bool());
        assert!(parse(r#"{"success": true, "answer": "true"}"#).answer_as_bool());
        assert!(parse(r#"{"success": true, "answer": "1"}"#).answer_as_bool());
        assert!(parse(r#"{"success": true, "answer": "Yes"}"#).answer_as_bool());

        assert!(!parse(r#"{"success": true, "answer": false}"#).answer_as_bool());
        assert!(!parse(r#"{"success": true, "answer": "no"}"#).answer_as_bool());
        assert!(!parse(r#"{"success": true, "answer": 7}"#).answer_as_bool());
        assert!(!parse(r#"{"success": true}"#).answer_as_bool());
    }
}
