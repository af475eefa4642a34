//! Generate magic prompt use case
//!
//! Derives a system prompt from a form's question titles.

use crate::ports::provider::{ProviderClient, ProviderError};
use docfiller_domain::{FieldType, MagicPrompt, Prompt, PromptTemplate};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum MagicPromptError {
    #[error("No questions to derive a prompt from")]
    NoQuestions,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Unusable reply: {0}")]
    InvalidReply(String),
}

pub struct GenerateMagicPromptUseCase;

impl GenerateMagicPromptUseCase {
    pub async fn execute(
        client: &dyn ProviderClient,
        questions: &[String],
    ) -> Result<MagicPrompt, MagicPromptError> {
        if questions.is_empty() {
            return Err(MagicPromptError::NoQuestions);
        }

        info!(
            "Generating system prompt from {} questions via {}",
            questions.len(),
            client.provider()
        );

        let prompt = Prompt::new(PromptTemplate::magic_prompt_request(questions))
            .with_system(PromptTemplate::magic_prompt_system());
        let raw = client.invoke(&prompt, FieldType::Paragraph).await?;

        let generated: MagicPrompt = serde_json::from_value(raw.into_value())
            .map_err(|e| MagicPromptError::InvalidReply(e.to_string()))?;

        if generated.system_prompt.trim().is_empty() {
            return Err(MagicPromptError::InvalidReply(
                "empty system prompt".to_string(),
            ));
        }

        debug!(
            "Magic prompt: subject '{}', expertise '{}'",
            generated.subject_context, generated.expertise_level
        );
        Ok(generated)
    }
}
