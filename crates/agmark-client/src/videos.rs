use agri_core::AgriError;
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/search";

const RESULTS_PER_QUERY: u32 = 5;
const MAX_VIDEOS: usize = 10;

/// A search hit, flattened from the YouTube search payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub channel: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    #[serde(default)]
    medium: Option<Thumbnail>,
    #[serde(default, rename = "default")]
    fallback: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl SearchItem {
    fn into_video(self) -> Option<VideoItem> {
        let video_id = self.id.video_id?;
        let thumbnail = self
            .snippet
            .thumbnails
            .medium
            .or(self.snippet.thumbnails.fallback)
            .map(|t| t.url);
        Some(VideoItem {
            video_id,
            title: self.snippet.title,
            description: self.snippet.description,
            thumbnail,
            channel: self.snippet.channel_title,
            published_at: self.snippet.published_at,
        })
    }
}

/// Marathi search phrasings for a crop: cultivation, farming, agriculture
pub fn crop_queries(crop: &str) -> [String; 3] {
    [
        format!("{} पिकाची लागवड", crop),
        format!("{} शेती", crop),
        format!("{} कृषी", crop),
    ]
}

/// Drop repeated video ids, keeping first occurrences, and truncate to `limit`
pub fn dedupe_videos(videos: Vec<VideoItem>, limit: usize) -> Vec<VideoItem> {
    let mut seen = HashSet::new();
    videos
        .into_iter()
        .filter(|v| seen.insert(v.video_id.clone()))
        .take(limit)
        .collect()
}

#[derive(Clone)]
pub struct VideoClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl VideoClient {
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

    async fn search(&self, query: &str) -> Result<Vec<VideoItem>, AgriError> {
        let max_results = RESULTS_PER_QUERY.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("relevanceLanguage", "mr"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgriError::ApiError(format!("HTTP {}", response.status())));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AgriError::ApiError(e.to_string()))?;

        Ok(body.items.into_iter().filter_map(SearchItem::into_video).collect())
    }

    /// Search the crop phrasings concurrently and merge the results.
    /// A failing phrasing is skipped; all failing yields an empty list.
    pub async fn search_crop(&self, crop: &str) -> Vec<VideoItem> {
        let queries = crop_queries(crop);
        let results = join_all(queries.iter().map(|q| self.search(q))).await;

        let mut merged = Vec::new();
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(videos) => merged.extend(videos),
                Err(e) => tracing::warn!("Video search '{}' failed: {}", query, e),
            }
        }
        dedupe_videos(merged, MAX_VIDEOS)
    }
}
