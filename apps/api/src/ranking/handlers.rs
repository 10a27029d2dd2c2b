//! Axum route handlers for the Ranking API.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Json,
};
use serde::Deserialize;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ranking::parser::RankingResult;
use crate::resume::{extract_pdf_text, is_pdf};
use crate::state::AppState;

/// Upper bound for multipart uploads (PDF resumes).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub url: String,
    pub resume: String,
}

/// POST /api/v1/rank
///
/// Fetches the posting at `url` and ranks the plain-text `resume` against it.
/// The resume reaches the prompt exactly as submitted.
pub async fn handle_rank(
    State(state): State<AppState>,
    payload: Result<Json<RankRequest>, JsonRejection>,
) -> Result<Json<RankingResult>, AppError> {
    let Json(request) = payload.map_err(invalid_json)?;
    run_ranking(&state, &request.url, &request.resume).await
}

/// POST /api/v1/rank/upload
///
/// Multipart variant: a `url` text field plus a `resume` field holding either
/// a PDF file or plain UTF-8 text.
pub async fn handle_rank_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<RankingResult>, AppError> {
    let mut url: Option<String> = None;
    let mut resume: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("url") => url = Some(field.text().await.map_err(invalid_multipart)?),
            Some("resume") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                resume = Some(resume_from_upload(content_type.as_deref(), bytes.to_vec()).await?);
            }
            _ => {}
        }
    }

    let url = url.ok_or_else(|| AppError::Validation("missing 'url' field".to_string()))?;
    let resume = resume.ok_or_else(|| AppError::Validation("missing 'resume' field".to_string()))?;
    run_ranking(&state, &url, &resume).await
}

async fn run_ranking(
    state: &AppState,
    url: &str,
    resume: &str,
) -> Result<Json<RankingResult>, AppError> {
    let request_id = Uuid::new_v4();
    let result = state
        .ranking
        .rank(url, resume)
        .instrument(info_span!("rank", %request_id, model = state.ranking.model()))
        .await?;
    Ok(Json(result))
}

async fn resume_from_upload(content_type: Option<&str>, bytes: Vec<u8>) -> Result<String, AppError> {
    if is_pdf(content_type, &bytes) {
        return extract_pdf_text(bytes).await;
    }
    String::from_utf8(bytes)
        .map_err(|_| AppError::Validation("resume must be a PDF or UTF-8 text".to_string()))
}

fn invalid_json(rejection: JsonRejection) -> AppError {
    AppError::Validation(format!("invalid request body: {}", rejection.body_text()))
}

fn invalid_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart body: {e}"))
}
