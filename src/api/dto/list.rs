//! DTOs for the token listing endpoint.

use serde::Serialize;

use crate::domain::entities::TokenEntry;

/// One live token as returned by `GET /v1/list`.
#[derive(Debug, Serialize)]
pub struct TokenEntryDto {
    pub token: String,
    pub target: String,

    /// Derived object name, present only for object-backed tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Remaining lifetime in seconds. Absent for mappings without an expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl From<TokenEntry> for TokenEntryDto {
    fn from(entry: TokenEntry) -> Self {
        Self {
            token: entry.token,
            target: entry.target,
            object: entry.object,
            ttl_seconds: entry.ttl_remaining.map(|ttl| ttl.as_secs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_object_and_ttl_are_omitted_when_absent() {
        let dto = TokenEntryDto::from(TokenEntry {
            token: "abc".to_string(),
            target: "https://example.com".to_string(),
            object: None,
            ttl_remaining: None,
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"token": "abc", "target": "https://example.com"})
        );
    }

    #[test]
    fn test_ttl_serializes_in_whole_seconds() {
        let dto = TokenEntryDto::from(TokenEntry {
            token: "abc".to_string(),
            target: "https://minio.test/bucket/report.pdf".to_string(),
            object: Some("report.pdf".to_string()),
            ttl_remaining: Some(Duration::from_secs(90)),
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["object"], "report.pdf");
        assert_eq!(json["ttl_seconds"], 90);
    }
}
