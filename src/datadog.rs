use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::DatadogConfig;
use crate::error::{DatadogMcpError, Result};
use crate::model::SearchRequest;

/// Handle over the hosted logs-search endpoint (`GET /api/v2/logs/events`).
/// Built once at startup from config and shared read-only across calls.
#[derive(Debug, Clone)]
pub struct LogsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    app_key: Option<String>,
}

impl LogsClient {
    pub fn new(cfg: &DatadogConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if cfg.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(cfg.request_timeout_ms));
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url(),
            api_key: cfg.api_key.clone(),
            app_key: cfg.app_key.clone(),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.app_key.is_some()
    }

    /// Full request URL for one page of the search. Bounds go out
    /// normalized to UTC; an absent bound leaves that side of the window
    /// open. Pure, so the mapping is testable without a network.
    pub fn events_url(&self, request: &SearchRequest) -> String {
        let mut url = format!(
            "{}/api/v2/logs/events?filter[query]={}",
            self.base_url,
            urlencoding::encode(&request.query)
        );
        if let Some(from) = &request.from {
            url.push_str("&filter[from]=");
            url.push_str(&urlencoding::encode(&format_bound(from)));
        }
        if let Some(to) = &request.to {
            url.push_str("&filter[to]=");
            url.push_str(&urlencoding::encode(&format_bound(to)));
        }
        if let Some(cursor) = &request.cursor {
            url.push_str("&page[cursor]=");
            url.push_str(&urlencoding::encode(cursor));
        }
        url
    }

    /// Issue the one upstream call for a page of results. No retries; a
    /// failed call surfaces as an error for the boundary to report.
    pub async fn list_logs(&self, request: &SearchRequest) -> Result<Value> {
        let url = self.events_url(request);
        debug!(%url, "querying datadog logs");

        let mut call = self.http.get(&url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            call = call.header("DD-API-KEY", key);
        }
        if let Some(key) = &self.app_key {
            call = call.header("DD-APPLICATION-KEY", key);
        }

        let response = call.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DatadogMcpError::Upstream {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| DatadogMcpError::Decode(e.to_string()))
    }
}

/// The hosted API wants instants, not offsets: bounds are forwarded as UTC
/// RFC 3339 with millisecond precision, the format the service itself emits.
fn format_bound(ts: &DateTime<FixedOffset>) -> String {
    ts.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Continuation token from the response's pagination metadata
/// (`meta.page.after`), if the service issued one. An empty token counts
/// as no token at all.
pub fn next_cursor(body: &Value) -> Option<String> {
    body.get("meta")?
        .get("page")?
        .get("after")?
        .as_str()
        .filter(|after| !after.is_empty())
        .map(str::to_string)
}

/// Error text for a non-2xx reply. Datadog wraps failures in an
/// `{"errors": [...]}` envelope whose entries are strings or objects; when
/// the body is anything else, relay its serialized form as-is.
pub fn extract_error_message(body: &str) -> String {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return body.to_string(),
    };
    let Some(errors) = parsed.get("errors").and_then(Value::as_array) else {
        return parsed.to_string();
    };
    let messages: Vec<String> = errors
        .iter()
        .map(|entry| match entry {
            Value::String(s) => s.clone(),
            other => other
                .get("detail")
                .or_else(|| other.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        })
        .collect();
    if messages.is_empty() {
        parsed.to_string()
    } else {
        messages.join("; ")
    }
}
