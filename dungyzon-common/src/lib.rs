///! Data types shared between the Dungyzon search front-end and its tools
///!
///! Everything here mirrors what the scraping API sends over the wire;
///! nothing in this crate performs I/O.

pub mod display;
pub mod product;
pub mod types;

pub use display::{StarFill, discount_percent, format_review_date, star_breakdown, truncate_title};
pub use product::{CustomersSay, FeedbackCount, ProductDetails, ProductInfo, Review};
pub use types::{PaginationState, SearchError, SearchResultItem};
