//! Response parser: turns free-form model output into a validated `RankingResult`.
//!
//! Generation output is not guaranteed to be well-formed JSON. Observed shapes:
//! code-fenced JSON, commentary before or after the object, an object that is
//! cut off by the token budget, and an object closed too early with the model
//! carrying on writing feedback after the closing brace.
//!
//! Algorithm:
//! 1. Strip code-fence markers (with or without a language tag).
//! 2. Scan from the first `{` with a brace-depth / in-string / escape state
//!    machine until depth returns to zero. That substring is the candidate.
//! 3. Parse the candidate. An unterminated candidate is repaired by closing
//!    the open string and appending one `}` per open level.
//! 4. Text after the candidate is continuation content and is appended to
//!    `feedback`.
//! 5. Validate: four keys present, strings trimmed and non-empty, `rank`
//!    coerced to f64 and clamped to [0.0, 1.0].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::AppError;

/// Unstructured text produced by the generation capability.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelOutput {
    pub text: String,
}

impl From<String> for RawModelOutput {
    fn from(text: String) -> Self {
        Self { text }
    }
}

/// The contract returned to callers: exactly four fields on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResult {
    pub company_name: String,
    pub position_title: String,
    /// In [0.0, 1.0].
    pub rank: f64,
    pub feedback: String,
}

/// Loose view of the candidate object before validation.
#[derive(Debug, Deserialize)]
struct CandidateFields {
    #[serde(rename = "companyName", alias = "company_name", alias = "company")]
    company_name: Option<Value>,
    #[serde(rename = "positionTitle", alias = "position_title", alias = "title")]
    position_title: Option<Value>,
    rank: Option<Value>,
    feedback: Option<Value>,
}

/// Where the first `{` led the brace scan.
#[derive(Debug, PartialEq)]
enum Scan {
    /// `text[start..end]` is a balanced object.
    Balanced { start: usize, end: usize },
    /// Input ended with `depth` objects still open. `escaped` means the last
    /// character was a backslash that had not yet escaped anything.
    Unterminated {
        start: usize,
        depth: usize,
        in_string: bool,
        escaped: bool,
    },
}

/// Parses raw model output into a validated ranking.
pub fn parse(raw: &RawModelOutput) -> Result<RankingResult, AppError> {
    let text = strip_code_fences(&raw.text);

    let scan = scan_first_object(&text).ok_or_else(|| {
        AppError::MalformedOutput("no JSON object found in model output".to_string())
    })?;

    let (mut object, leftover) = match scan {
        Scan::Balanced { start, end } => (parse_object(&text[start..end])?, &text[end..]),
        Scan::Unterminated {
            start,
            depth,
            in_string,
            escaped,
        } => {
            let repaired = close_truncated(&text[start..], depth, in_string, escaped);
            debug!("Model output was truncated; retrying with {depth} synthesized closing brace(s)");
            (parse_object(&repaired)?, "")
        }
    };

    let continuation = continuation_text(leftover);
    if !continuation.is_empty() {
        if let Some(Value::String(feedback)) = object.get_mut("feedback") {
            debug!(
                "Appending {} characters of trailing text to feedback",
                continuation.len()
            );
            *feedback = join_feedback(feedback, continuation);
        }
    }

    validate(object)
}

/// Removes code-fence markers wherever they sit on their own line, plus an
/// inline opening/closing fence around the whole text.
fn strip_code_fences(text: &str) -> String {
    let text = text.trim();
    let text = match text.strip_prefix("```") {
        Some(rest) => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        None => text,
    };
    let text = text.strip_suffix("```").unwrap_or(text);

    text.lines()
        .filter(|line| !is_fence_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_fence_line(line: &str) -> bool {
    line.trim()
        .strip_prefix("```")
        .map(|tag| {
            tag.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .unwrap_or(false)
}

/// Brace-balancing scan from the first `{`. Braces inside string literals
/// (including escaped quotes) do not affect depth.
fn scan_first_object(text: &str) -> Option<Scan> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(Scan::Balanced {
                        start,
                        end: start + offset + 1,
                    });
                }
            }
            _ => {}
        }
    }

    Some(Scan::Unterminated {
        start,
        depth,
        in_string,
        escaped,
    })
}

/// Synthesizes the closing tokens a truncated object is missing.
fn close_truncated(candidate: &str, depth: usize, in_string: bool, escaped: bool) -> String {
    let mut repaired = candidate.trim_end().to_string();
    if in_string {
        // A dangling escape would swallow the synthesized quote.
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }
    while repaired.ends_with(',') || repaired.ends_with(':') {
        repaired.pop();
        repaired.truncate(repaired.trim_end().len());
    }
    repaired.extend(std::iter::repeat('}').take(depth));
    repaired
}

fn parse_object(candidate: &str) -> Result<serde_json::Map<String, Value>, AppError> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::MalformedOutput(
            "candidate is not a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::MalformedOutput(format!(
            "candidate object is not valid JSON: {e}"
        ))),
    }
}

/// Trailing text after the candidate, minus stray closing braces.
fn continuation_text(leftover: &str) -> &str {
    leftover
        .trim_start_matches(|c: char| c == '}' || c.is_whitespace())
        .trim()
}

fn join_feedback(feedback: &str, continuation: &str) -> String {
    let feedback = feedback.trim();
    if feedback.is_empty() {
        continuation.to_string()
    } else {
        format!("{feedback} {continuation}")
    }
}

fn validate(object: serde_json::Map<String, Value>) -> Result<RankingResult, AppError> {
    let fields: CandidateFields = serde_json::from_value(Value::Object(object))
        .map_err(|e| AppError::MalformedOutput(format!("unexpected field shape: {e}")))?;

    let company_name = required_text(fields.company_name, "companyName")?;
    let position_title = required_text(fields.position_title, "positionTitle")?;
    let rank = coerce_rank(fields.rank)?;
    let feedback = required_text(fields.feedback, "feedback")?;

    Ok(RankingResult {
        company_name,
        position_title,
        rank,
        feedback,
    })
}

fn required_text(value: Option<Value>, field: &str) -> Result<String, AppError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(AppError::MalformedOutput(format!("'{field}' is empty"))),
        Some(Value::Null) | None => {
            Err(AppError::MalformedOutput(format!("'{field}' is missing")))
        }
        Some(other) => Err(AppError::MalformedOutput(format!(
            "'{field}' must be a string, got {other}"
        ))),
    }
}

/// Accepts a JSON number or a numeric string; clamps into [0.0, 1.0].
fn coerce_rank(value: Option<Value>) -> Result<f64, AppError> {
    let rank = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Null) | None => {
            return Err(AppError::MalformedOutput("'rank' is missing".to_string()))
        }
        Some(_) => None,
    };

    match rank {
        Some(r) if r.is_finite() => Ok(r.clamp(0.0, 1.0)),
        _ => Err(AppError::MalformedOutput(
            "'rank' is not a finite number".to_string(),
        )),
    }
}
