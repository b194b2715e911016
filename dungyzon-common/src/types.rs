use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One product entry from a search page.
///
/// The record is kept exactly as the API sent it; the accessors below only
/// read the handful of fields that favorites and the terminal view need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResultItem(Value);

impl SearchResultItem {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// The raw JSON record
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }

    /// Amazon product identifier, used as the favorite id and detail key
    pub fn asin(&self) -> Option<&str> {
        self.str_field("asin")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn image(&self) -> Option<&str> {
        self.str_field("image")
    }

    pub fn price_string(&self) -> Option<&str> {
        self.str_field("price_string")
    }

    pub fn url(&self) -> Option<&str> {
        self.str_field("url")
    }

    pub fn original_price_string(&self) -> Option<&str> {
        self.0
            .get("original_price")
            .and_then(|p| p.get("price_string"))
            .and_then(Value::as_str)
    }

    pub fn stars(&self) -> Option<f64> {
        self.0.get("stars").and_then(lenient_f64)
    }

    pub fn total_reviews(&self) -> Option<u64> {
        self.0.get("total_reviews").and_then(lenient_u64)
    }

    pub fn is_best_seller(&self) -> bool {
        self.flag("is_best_seller")
    }

    pub fn has_prime(&self) -> bool {
        self.flag("has_prime")
    }

    pub fn is_amazon_choice(&self) -> bool {
        self.flag("is_amazon_choice")
    }

    pub fn is_limited_deal(&self) -> bool {
        self.flag("is_limited_deal")
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl From<Value> for SearchResultItem {
    fn from(raw: Value) -> Self {
        Self(raw)
    }
}

/// Shape of the current result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub page: u32,
    pub total_pages: u32,
    /// Server-reported count, or the size of the current page when the
    /// server does not report one
    pub total: u64,
    pub has_more: bool,
    pub items_per_page: u32,
}

impl PaginationState {
    /// State before any search has produced results
    pub fn empty(items_per_page: u32) -> Self {
        Self {
            page: 1,
            total_pages: 0,
            total: 0,
            has_more: false,
            items_per_page,
        }
    }
}

/// Error surfaced to consumers of the search state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchError {
    pub message: String,
    /// HTTP status of the failed response, if the request got that far
    pub code: Option<u16>,
}

impl SearchError {
    pub fn new(message: impl Into<String>, code: Option<u16>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for SearchError {}

/// Reads a number that the scraper may send either as a JSON number or as
/// a numeric string ("4.5", "1,234").
pub(crate) fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

pub(crate) fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}
