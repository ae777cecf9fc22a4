use serde_json::Value;
use tracing::debug;

use crate::config::PayloadMode;
use crate::datadog::{next_cursor, LogsClient};
use crate::error::Result;
use crate::model::{SearchRequest, SearchResult};

/// Search adapter: one validated request in, one upstream page out.
/// Paging through results is the caller's job; each invocation fetches
/// exactly the page its cursor points at.
pub struct SearchAdapter {
    client: LogsClient,
    payload: PayloadMode,
}

impl SearchAdapter {
    pub fn new(client: LogsClient, payload: PayloadMode) -> Self {
        Self { client, payload }
    }

    pub fn has_credentials(&self) -> bool {
        self.client.has_credentials()
    }

    pub async fn execute(&self, request: &SearchRequest) -> Result<SearchResult> {
        let body = self.client.list_logs(request).await?;
        let cursor = next_cursor(&body);
        debug!(has_next_page = cursor.is_some(), "search page complete");
        Ok(SearchResult {
            body: apply_payload_policy(self.payload, body),
            next_cursor: cursor,
        })
    }
}

/// `Entries` keeps only the log events; a response without a `data` array
/// (error-shaped or future-shaped) is relayed whole rather than dropped.
fn apply_payload_policy(mode: PayloadMode, body: Value) -> Value {
    match mode {
        PayloadMode::Full => body,
        PayloadMode::Entries => match body.get("data") {
            Some(data) => data.clone(),
            None => body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_mode_keeps_pagination_metadata() {
        let body = json!({
            "data": [{ "id": "log-1" }],
            "meta": { "page": { "after": "abc123" } }
        });
        let kept = apply_payload_policy(PayloadMode::Full, body.clone());
        assert_eq!(kept, body);
    }

    #[test]
    fn entries_mode_extracts_the_data_array() {
        let body = json!({
            "data": [{ "id": "log-1" }, { "id": "log-2" }],
            "meta": { "page": { "after": "abc123" } }
        });
        let entries = apply_payload_policy(PayloadMode::Entries, body);
        assert_eq!(entries, json!([{ "id": "log-1" }, { "id": "log-2" }]));
    }

    #[test]
    fn entries_mode_without_data_relays_the_whole_body() {
        let body = json!({ "meta": { "status": "ok" } });
        let kept = apply_payload_policy(PayloadMode::Entries, body.clone());
        assert_eq!(kept, body);
    }
}
