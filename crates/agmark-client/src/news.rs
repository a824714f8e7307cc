use agri_core::AgriError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/everything";

const NEWS_QUERY: &str = "Agriculture AND Maharashtra";
const PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub source: Option<NewsSource>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: String,
    #[serde(default)]
    articles: Vec<NewsArticle>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct NewsClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl NewsClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        }
    }

    /// Latest English-language agriculture headlines for the region
    pub async fn latest(&self) -> Result<Vec<NewsArticle>, AgriError> {
        let page_size = PAGE_SIZE.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", NEWS_QUERY),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))?;

        let body: NewsResponse = response
            .json()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))?;

        parse_articles(body)
    }
}

fn parse_articles(body: NewsResponse) -> Result<Vec<NewsArticle>, AgriError> {
    if body.status != "ok" {
        return Err(AgriError::ApiError(
            body.message.unwrap_or_else(|| "Failed to fetch news".to_string()),
        ));
    }
    Ok(body.articles)
}
