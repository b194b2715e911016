use anyhow::{Context, Result};
use async_trait::async_trait;
use dungyzon_common::ProductDetails;
use reqwest::Client;
use std::time::Duration;

use super::error::ApiError;
use super::response::{SearchPage, parse_search_body, server_message};
use super::{ProductApi, SearchApi};

const USER_AGENT: &str = "Mozilla/5.0 Dungyzon/0.1";

/// HTTP client for the scraping API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn search_url(&self, query: &str, page: u32) -> String {
        format!("{}/search/{}?page={}", self.base_url, urlencoding::encode(query), page)
    }

    pub fn product_url(&self, id: &str) -> String {
        format!("{}/products/{}", self.base_url, urlencoding::encode(id))
    }

    /// GET `url` and return the body of a 2xx response
    async fn get_body(&self, url: &str) -> Result<String, ApiError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let message = server_message(&body)
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn get_product(&self, url: &str) -> Result<ProductDetails, ApiError> {
        let body = self.get_body(url).await?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(ApiError::NotFound("No product details found".to_string()));
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout.as_millis() as u64)
        } else {
            ApiError::Transport(err)
        }
    }
}

#[async_trait]
impl SearchApi for ApiClient {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ApiError> {
        let body = self.get_body(&self.search_url(query, page)).await?;
        let page_data = parse_search_body(&body);
        tracing::debug!(
            "Search '{}' page {} returned {} item(s), total {:?}",
            query,
            page,
            page_data.items.len(),
            page_data.total
        );
        Ok(page_data)
    }
}

#[async_trait]
impl ProductApi for ApiClient {
    async fn product_details(&self, id: &str) -> Result<ProductDetails, ApiError> {
        self.get_product(&self.product_url(id)).await
    }

    async fn quick_product(&self, id: &str) -> Result<ProductDetails, ApiError> {
        self.get_product(&format!("{}/quick", self.product_url(id))).await
    }
}
