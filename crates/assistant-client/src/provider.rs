use async_trait::async_trait;

use crate::error::AssistantResult;
use crate::image::InlineImage;
use crate::prompts;

/// Backend-agnostic interface to a generative text model.
///
/// Implementors provide `generate`; the farming-specific requests are built on top of it.
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    /// Send a prompt, optionally with one image, and return the generated text verbatim
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> AssistantResult<String>;

    fn backend_name(&self) -> &'static str;

    async fn ask(&self, message: &str) -> AssistantResult<String> {
        self.generate(&prompts::chat_prompt(message), None).await
    }

    async fn diagnose_image(&self, question: Option<&str>, image: &InlineImage) -> AssistantResult<String> {
        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(prompts::DEFAULT_IMAGE_QUESTION);
        self.generate(&prompts::diagnosis_prompt(question), Some(image)).await
    }

    async fn fertilizer_plan(
        &self,
        crop: &str,
        soil_type: Option<&str>,
        growth_stage: Option<&str>,
    ) -> AssistantResult<String> {
        let prompt = prompts::fertilizer_prompt(
            crop,
            soil_type.unwrap_or(prompts::DEFAULT_SOIL_TYPE),
            growth_stage.unwrap_or(prompts::DEFAULT_GROWTH_STAGE),
        );
        self.generate(&prompt, None).await
    }

    async fn quick_tips(&self, month: &str) -> AssistantResult<String> {
        self.generate(&prompts::quick_tips_prompt(month), None).await
    }
}
