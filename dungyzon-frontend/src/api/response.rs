use dungyzon_common::SearchResultItem;
use serde_json::Value;

/// Keys the API has used for the total result count
const TOTAL_KEYS: [&str; 3] = ["total", "totalResults", "total_results"];

/// Items of one result page plus the server's total, if it sent one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub items: Vec<SearchResultItem>,
    pub total: Option<u64>,
}

/// Parses a search response body.
///
/// Accepts `{"results": [...], "total": n}` or a bare array. A body without
/// results, or one that is not JSON at all, is an empty page rather than an
/// error.
pub fn parse_search_body(body: &str) -> SearchPage {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Search response is not valid JSON, treating as empty: {}", e);
            return SearchPage::default();
        }
    };

    match value {
        Value::Array(items) => SearchPage {
            items: items.into_iter().map(SearchResultItem::from).collect(),
            total: None,
        },
        Value::Object(mut map) => {
            let total = TOTAL_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(total_value));
            let items = match map.remove("results") {
                Some(Value::Array(items)) => items.into_iter().map(SearchResultItem::from).collect(),
                _ => {
                    tracing::debug!("Search response has no results array");
                    Vec::new()
                }
            };
            SearchPage { items, total }
        }
        _ => SearchPage::default(),
    }
}

fn total_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Message from a JSON error body: `message`, `error`, or `error.message`.
pub fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| value.get("error").and_then(Value::as_str))
        .or_else(|| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })?;

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}
