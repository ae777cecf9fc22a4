//! MCP server exposing Datadog log search as a tool.
//!
//! The `search-logs` tool wraps the Datadog Logs API v2 events endpoint and
//! is reachable over stdio (line-delimited JSON-RPC) or HTTP/SSE.

pub mod config;
pub mod datadog;
pub mod error;
pub mod http;
pub mod mcp;
pub mod model;
pub mod search;
