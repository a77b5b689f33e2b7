use serde::{Deserialize, Serialize};

/// Error payload returned by the audit backend on non-success statuses.
///
/// `detail` is either a plain string or a list of validation entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationEntry>),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEntry {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: ErrorDetail::Message(detail.into()),
        }
    }

    /// Best-effort extraction of a display line from a raw error body.
    /// Returns `None` when the body is empty, not JSON, or carries no usable text.
    pub fn describe(raw: &[u8]) -> Option<String> {
        let body: ErrorBody = serde_json::from_slice(raw).ok()?;
        let text = match body.detail {
            ErrorDetail::Message(message) => message,
            ErrorDetail::Validation(entries) => entries
                .into_iter()
                .map(|entry| match entry.loc.last() {
                    Some(serde_json::Value::String(field)) => format!("{field}: {}", entry.msg),
                    _ => entry.msg,
                })
                .collect::<Vec<_>>()
                .join("; "),
            ErrorDetail::Other(serde_json::Value::Null) => return None,
            ErrorDetail::Other(value) => value.to_string(),
        };
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_plain_string_detail() {
        assert_eq!(
            ErrorBody::describe(br#"{"detail":"An internal server error occurred: boom"}"#),
            Some("An internal server error occurred: boom".to_string())
        );
    }

    #[test]
    fn describes_validation_detail_list() {
        let raw = br#"{"detail":[{"loc":["body","message"],"msg":"field required","type":"value_error.missing"}]}"#;
        assert_eq!(
            ErrorBody::describe(raw),
            Some("message: field required".to_string())
        );
    }

    #[test]
    fn unparseable_or_blank_bodies_yield_none() {
        assert_eq!(ErrorBody::describe(b""), None);
        assert_eq!(ErrorBody::describe(b"<html>Bad Gateway</html>"), None);
        assert_eq!(ErrorBody::describe(br#"{"detail":"   "}"#), None);
        assert_eq!(ErrorBody::describe(br#"{"detail":null}"#), None);
        assert_eq!(ErrorBody::describe(br#"{"message":"no detail field"}"#), None);
    }
}
