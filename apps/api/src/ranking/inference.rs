//! InferenceClient: sends a `RankingPrompt` to the process-wide generation
//! handle and returns the raw text. No parsing, no retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::TextGenerator;
use crate::ranking::parser::RawModelOutput;
use crate::ranking::prompts::RankingPrompt;

#[derive(Clone)]
pub struct InferenceClient {
    generator: Arc<dyn TextGenerator>,
    max_new_tokens: u32,
    timeout: Duration,
    /// Bounds in-flight generation calls. One permit serialises access.
    permits: Arc<Semaphore>,
}

impl InferenceClient {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        max_new_tokens: u32,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            generator,
            max_new_tokens,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub async fn generate(&self, prompt: &RankingPrompt) -> Result<RawModelOutput, AppError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AppError::Inference("generation handle has shut down".to_string()))?;

        debug!(
            "Generating with {} (max_new_tokens={}, prompt_chars={})",
            self.generator.model(),
            self.max_new_tokens,
            prompt.user_message.len()
        );

        let call = self.generator.generate(
            &prompt.system_directive,
            &prompt.user_message,
            self.max_new_tokens,
        );
        let text = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                AppError::Inference(format!("generation exceeded {}s", self.timeout.as_secs()))
            })?
            .map_err(|e| AppError::Inference(e.to_string()))?;

        info!("Generation returned {} characters", text.len());
        Ok(RawModelOutput::from(text))
    }
}
