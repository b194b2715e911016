///! Product detail payload returned by `/products/{id}`
///!
///! The scraper is loose with types (ratings arrive as numbers or strings,
///! prices as strings or numbers), so the numeric and price fields go
///! through lenient deserializers instead of failing the whole payload.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::display::format_review_date;
use crate::types::{lenient_f64, lenient_u64};

/// How many recent reviews are shown when no top reviews are available
pub const RECENT_REVIEW_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(default)]
    pub details: Option<ProductInfo>,
    #[serde(default, rename = "topPositiveReview")]
    pub top_positive_review: Option<Review>,
    #[serde(default, rename = "topCriticalReview")]
    pub top_critical_review: Option<Review>,
    /// Anything else the API sent (customer insights, quick-view fields)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductDetails {
    /// The top positive and critical review when the API picked both,
    /// otherwise the most recent reviews.
    pub fn reviews_to_show(&self) -> Vec<&Review> {
        if let (Some(positive), Some(critical)) = (&self.top_positive_review, &self.top_critical_review) {
            return vec![positive, critical];
        }

        self.details
            .as_ref()
            .map(|d| d.reviews.iter().take(RECENT_REVIEW_LIMIT).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub pricing: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub original_price: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub shipping_price: Option<String>,
    #[serde(default)]
    pub shipping_time: Option<String>,
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub average_rating: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub total_ratings: Option<u64>,
    #[serde(default)]
    pub full_description: Option<String>,
    #[serde(default)]
    pub feature_bullets: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub product_information: Option<Map<String, Value>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "de_bool")]
    pub is_coupon_exists: bool,
    #[serde(default, deserialize_with = "de_customers_say")]
    pub customers_say: Option<CustomersSay>,
    /// Fields without a typed home, including `{1..5}_star_percentage`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProductInfo {
    /// Share of ratings with `star` stars, 0 when the API left it out
    pub fn star_percentage(&self, star: u8) -> f64 {
        self.extra
            .get(&format!("{}_star_percentage", star))
            .and_then(lenient_f64)
            .unwrap_or(0.0)
    }

    /// Percentages for 5 stars down to 1
    pub fn star_percentages(&self) -> [(u8, f64); 5] {
        [5, 4, 3, 2, 1].map(|star| (star, self.star_percentage(star)))
    }
}

/// Amazon's AI review summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomersSay {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub select_to_learn_more: BTreeMap<String, FeedbackCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCount {
    #[serde(default, deserialize_with = "de_u64")]
    pub positive: u64,
    #[serde(default, deserialize_with = "de_u64")]
    pub total: u64,
}

impl FeedbackCount {
    pub fn positive_percent(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        Some((self.positive as f64 / self.total as f64 * 100.0).round() as u32)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub stars: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "de_bool")]
    pub verified_purchase: bool,
}

impl Review {
    /// Title without the "4.0 out of 5 stars" prefix Amazon puts in front
    pub fn display_title(&self) -> String {
        static STARS_PREFIX: OnceLock<Regex> = OnceLock::new();
        let re = STARS_PREFIX.get_or_init(|| {
            Regex::new(r"^\d+\.\d+\s+out\s+of\s+\d+\s+stars\s*").expect("valid stars-prefix regex")
        });

        match self.title.as_deref() {
            Some(title) if !title.is_empty() => re.replace(title, "").into_owned(),
            _ => "Review".to_string(),
        }
    }

    pub fn author(&self) -> &str {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Anonymous")
    }

    pub fn formatted_date(&self) -> String {
        format_review_date(self.date.as_deref())
    }
}

fn de_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient_f64))
}

fn de_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient_u64))
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(de_opt_u64(deserializer)?.unwrap_or(0))
}

/// A malformed insights block is dropped instead of failing the details.
fn de_customers_say<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<CustomersSay>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn de_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn de_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}
