///! Access to the Dungyzon scraping API
///!
///! The controller only sees the [`SearchApi`] trait; [`ApiClient`] is the
///! reqwest-backed implementation used by the binary.

mod client;
mod error;
mod response;

pub use client::ApiClient;
pub use error::ApiError;
pub use response::{SearchPage, parse_search_body, server_message};

use async_trait::async_trait;
use dungyzon_common::ProductDetails;

/// One page of search results
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ApiError>;
}

/// Product detail lookups used by the detail view
#[async_trait]
pub trait ProductApi: Send + Sync {
    /// Full detail record, `GET /products/{id}`
    async fn product_details(&self, id: &str) -> Result<ProductDetails, ApiError>;

    /// Reduced record, `GET /products/{id}/quick`
    async fn quick_product(&self, id: &str) -> Result<ProductDetails, ApiError>;
}
