//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, AssistantResult};
use crate::image::InlineImage;
use crate::provider::AssistantProvider;
use crate::AssistantConfig;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Debug, Serialize)]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn build_request(prompt: &str, image: Option<&InlineImage>) -> GenerateContentRequest {
    let mut parts = vec![Part::Text { text: prompt.to_string() }];
    if let Some(image) = image {
        parts.push(Part::InlineData {
            inline_data: Blob {
                mime_type: image.mime_type.to_string(),
                data: image.to_base64(),
            },
        });
    }
    GenerateContentRequest {
        contents: vec![Content { role: "user", parts }],
    }
}

/// Concatenated text of the first candidate
fn extract_text(response: GenerateContentResponse) -> AssistantResult<String> {
    if let Some(err) = response.error {
        return Err(AssistantError::Api(err.message));
    }
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(AssistantError::EmptyResponse);
    }
    Ok(text)
}

pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl AssistantProvider for GeminiClient {
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> AssistantResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AssistantError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        tracing::debug!("Gemini request to {} (image: {})", self.model, image.is_some());

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&build_request(prompt, image))
            .send()
            .await?;

        let status = response.status();
        let body: GenerateContentResponse = response.json().await?;
        if !status.is_success() && body.error.is_none() {
            return Err(AssistantError::Api(format!("HTTP {}", status)));
        }
        extract_text(body)
    }

    fn backend_name(&self) -> &'static str {
        "gemini"
    }
}
