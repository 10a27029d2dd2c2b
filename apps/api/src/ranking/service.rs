//! Ranking pipeline: orchestrates the end-to-end `rank(url, resume)` operation.
//!
//! Flow: extract posting text → build prompt → generate → parse.
//!
//! Only `MalformedOutput` is ever retried, and only the generate + parse pair is
//! repeated; the page is fetched once. With `max_attempts == 1` (the default)
//! every failure propagates on first occurrence.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::extraction::ContentExtractor;
use crate::ranking::inference::InferenceClient;
use crate::ranking::parser::{self, RankingResult};
use crate::ranking::prompts::{self, RankingPrompt};

pub struct RankingService {
    extractor: ContentExtractor,
    inference: InferenceClient,
    max_attempts: u32,
}

impl RankingService {
    pub fn new(extractor: ContentExtractor, inference: InferenceClient, max_attempts: u32) -> Self {
        Self {
            extractor,
            inference,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn model(&self) -> &str {
        self.inference.model()
    }

    /// Ranks how well `resume` fits the job posting at `url`.
    pub async fn rank(&self, url: &str, resume: &str) -> Result<RankingResult, AppError> {
        if resume.trim().is_empty() {
            return Err(AppError::Validation("resume cannot be empty".to_string()));
        }

        // Step 1: Fetch posting text
        let posting = self.extractor.extract(url).await?;

        // Step 2: Build the instruction
        let prompt = prompts::build(&posting.text, resume);

        // Steps 3 and 4: Generate and parse
        let result = self.generate_ranking(&prompt).await?;
        info!(
            "Ranked resume against '{}' at {}: {:.2}",
            result.position_title, result.company_name, result.rank
        );
        Ok(result)
    }

    async fn generate_ranking(&self, prompt: &RankingPrompt) -> Result<RankingResult, AppError> {
        let mut attempt = 1;
        loop {
            let raw = self.inference.generate(prompt).await?;
            match parser::parse(&raw) {
                Ok(result) => return Ok(result),
                Err(AppError::MalformedOutput(reason)) if attempt < self.max_attempts => {
                    warn!(
                        "Attempt {attempt}/{} produced malformed output ({reason}); regenerating",
                        self.max_attempts
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
