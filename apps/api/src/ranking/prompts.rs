// Prompt constants and the PromptBuilder for fit ranking.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_RULES;

/// Role statement for the ranking call. `JSON_ONLY_RULES` is appended at build time.
pub const RANKING_SYSTEM: &str = "You are an expert career coach and job posting analyst. \
    You compare a candidate's resume against a job posting and report how well they fit.";

/// Rank ceiling and per-gap decrement written into the instruction text.
pub const RANK_CEILING: f64 = 1.0;
pub const RANK_STEP: f64 = 0.1;

/// Format template only. Every value is deliberately fictitious.
pub const EXAMPLE_OUTPUT: &str = r#"{
  "companyName": "Example Company Name",
  "positionTitle": "Example Position Title",
  "rank": 0.5,
  "feedback": "Example feedback: name the specific missing requirements and what to add to the resume for each."
}"#;

/// Ranking prompt template.
/// Replace: {job_posting}, {resume}, {rank_ceiling}, {rank_step}, {example_output}
pub const RANKING_PROMPT_TEMPLATE: &str = r#"Analyze the job posting and the resume below, then return a JSON object that identifies the role and ranks how well the resume fits it.

**Job Posting:**
{job_posting}

**Resume:**
{resume}

Follow these guidelines strictly:
1. "companyName": the exact name of the company offering the job, taken ONLY from the job posting. NEVER take it from the resume, even if the resume mentions a company that looks more specific.
2. "positionTitle": the exact title of the advertised position, taken ONLY from the job posting. NEVER take it from the resume, even if the resume lists a title that looks more specific.
3. "rank": a number between 0.0 and 1.0 measuring how well the resume's skills and experience align with the posting's requirements. Start at {rank_ceiling} and subtract {rank_step} for each requirement of the posting that the resume does not meet. Never go below 0.0.
4. "feedback": specific, actionable advice for improving the resume's alignment with this posting. Name the missing requirements. Do NOT give generic praise.

Output format:
- Return exactly one JSON object with exactly these four keys: "companyName", "positionTitle", "rank", "feedback".
- Return nothing else: no markdown, no code fences, no text before or after the object.
- The example below shows the FORMAT ONLY. Its values are placeholders; do NOT copy them.

Example format:
{example_output}"#;

/// Ordered instruction pair sent to the generation capability.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingPrompt {
    pub system_directive: String,
    pub user_message: String,
}

/// Builds the ranking instruction. Pure and deterministic.
pub fn build(job_posting: &str, resume: &str) -> RankingPrompt {
    let rank_ceiling = format!("{RANK_CEILING:.1}");
    let rank_step = format!("{RANK_STEP:.1}");

    RankingPrompt {
        system_directive: format!("{RANKING_SYSTEM} {JSON_ONLY_RULES}"),
        user_message: fill_template(
            RANKING_PROMPT_TEMPLATE,
            &[
                ("{job_posting}", job_posting),
                ("{resume}", resume),
                ("{rank_ceiling}", &rank_ceiling),
                ("{rank_step}", &rank_step),
                ("{example_output}", EXAMPLE_OUTPUT),
            ],
        ),
    }
}

/// Single-pass placeholder substitution. Substituted text is never rescanned,
/// so a posting or resume that happens to contain `{resume}` stays verbatim.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
