// Fit ranking: prompt construction, generation, tolerant parsing, orchestration.
// All generation calls go through llm_client via InferenceClient.

pub mod handlers;
pub mod inference;
pub mod parser;
pub mod prompts;
pub mod service;
