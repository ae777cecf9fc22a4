use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DatadogMcpError, Result};

/// Raw `search-logs` arguments as the MCP host sends them. Field names are
/// the tool's wire names; everything is optional at this level so that
/// validation, not deserialization, reports the missing pieces.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchLogsParams {
    pub filter_query: String,
    pub filter_from: Option<String>,
    pub filter_to: Option<String>,
    pub cursor: Option<String>,
}

/// Validated request: query known non-empty, window bounds parsed. The
/// cursor stays opaque; it is whatever a previous response handed out.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub from: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
    pub cursor: Option<String>,
}

impl SearchLogsParams {
    /// Pure shape check; no network is touched here. Errors name the
    /// offending field and the violated constraint.
    pub fn validate(self) -> Result<SearchRequest> {
        if self.filter_query.is_empty() {
            return Err(DatadogMcpError::InvalidParams {
                field: "filterQuery",
                reason: "must be a non-empty string".to_string(),
            });
        }
        let from = parse_bound("filterFrom", self.filter_from)?;
        let to = parse_bound("filterTo", self.filter_to)?;
        Ok(SearchRequest {
            query: self.filter_query,
            from,
            to,
            cursor: self.cursor,
        })
    }
}

fn parse_bound(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<FixedOffset>>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(&raw)
        .map(Some)
        .map_err(|e| DatadogMcpError::InvalidParams {
            field,
            reason: format!("{raw:?} is not an ISO-8601 date-time: {e}"),
        })
}

/// Adapter output: the payload to relay (already policy-filtered) plus the
/// continuation token from the upstream pagination metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> SearchLogsParams {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn full_arguments_validate() {
        let req = params(json!({
            "filterQuery": "service:web status:error",
            "filterFrom": "2024-01-01T00:00:00Z",
            "filterTo": "2024-01-02T00:00:00+09:00",
            "cursor": "eyJhZnRlciI6ImFiYzEyMyJ9",
        }))
        .validate()
        .unwrap();

        assert_eq!(req.query, "service:web status:error");
        assert!(req.from.is_some());
        assert!(req.to.is_some());
        assert_eq!(req.cursor.as_deref(), Some("eyJhZnRlciI6ImFiYzEyMyJ9"));
    }

    #[test]
    fn missing_and_empty_query_fail_the_same_way() {
        for input in [json!({}), json!({ "filterQuery": "" })] {
            let err = params(input).validate().unwrap_err().to_string();
            assert!(err.contains("filterQuery"), "got: {err}");
            assert!(err.contains("non-empty"), "got: {err}");
        }
    }

    #[test]
    fn malformed_from_names_the_field() {
        let err = params(json!({
            "filterQuery": "service:web",
            "filterFrom": "yesterday",
        }))
        .validate()
        .unwrap_err()
        .to_string();
        assert!(err.contains("filterFrom"), "got: {err}");
        assert!(err.contains("ISO-8601"), "got: {err}");
    }

    #[test]
    fn malformed_to_names_the_field() {
        let err = params(json!({
            "filterQuery": "service:web",
            "filterTo": "2024-13-45T99:00:00Z",
        }))
        .validate()
        .unwrap_err()
        .to_string();
        assert!(err.contains("filterTo"), "got: {err}");
    }

    #[test]
    fn date_only_strings_are_rejected() {
        // the upstream schema wants full date-times, not bare dates
        let err = params(json!({
            "filterQuery": "service:web",
            "filterFrom": "2024-01-01",
        }))
        .validate()
        .unwrap_err()
        .to_string();
        assert!(err.contains("filterFrom"), "got: {err}");
    }

    #[test]
    fn cursor_is_opaque() {
        let req = params(json!({
            "filterQuery": "*",
            "cursor": "anything goes // even ~this~",
        }))
        .validate()
        .unwrap();
        assert_eq!(req.cursor.as_deref(), Some("anything goes // even ~this~"));
    }

    #[test]
    fn search_result_omits_absent_cursor() {
        let without = SearchResult {
            body: json!({ "data": [] }),
            next_cursor: None,
        };
        let v = serde_json::to_value(&without).unwrap();
        assert!(v.get("nextCursor").is_none());

        let with = SearchResult {
            body: json!({ "data": [] }),
            next_cursor: Some("abc123".to_string()),
        };
        let v = serde_json::to_value(&with).unwrap();
        assert_eq!(v["nextCursor"], "abc123");
    }
}
