//! Axum route handlers for the Interview API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::{AppJson, AppPath};
use crate::interview::follow_up::{generate_follow_up, remaining_follow_ups};
use crate::interview::generator::{generate_questions, CreateInterviewRequest};
use crate::interview::media::{owns_media_key, upload_answer_media};
use crate::interview::results::{compute_results, render_results_md, InterviewResults};
use crate::interview::scoring::{compose_answer_text, score_answer, ScoringContext};
use crate::interview::session::{build_session, SessionState};
use crate::interview::store::{self, AnswerTarget, NewAnswer};
use crate::interview::view::{assemble_view, InterviewView, MainQuestionView, QuestionKind};
use crate::models::interview::{FollowUpQuestionRow, InterviewRow, MainQuestionRow, UserAnswerRow};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FollowUpRequest {
    pub answer_text: String,
}

#[derive(Debug, Serialize)]
pub struct FollowUpResponse {
    pub follow_up: Option<FollowUpQuestionRow>,
    pub remaining: i64,
}

/// Body of `POST /api/v1/answers`. Fields default so omissions surface as 400s.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitAnswerRequest {
    pub question_id: Option<String>,
    pub question_kind: QuestionKind,
    pub answer_text: Option<String>,
    pub transcript: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct ValidatedAnswer {
    pub target: AnswerTarget,
    pub text: String,
    pub media_url: Option<String>,
}

impl SubmitAnswerRequest {
    pub fn validate(self, user_id: &str) -> Result<ValidatedAnswer, AppError> {
        let raw_id = self
            .question_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("question_id is required".to_string()))?;
        let question_id = Uuid::parse_str(raw_id)
            .map_err(|_| AppError::Validation("question_id must be a UUID".to_string()))?;

        let text = compose_answer_text(self.answer_text.as_deref(), self.transcript.as_deref())
            .ok_or_else(|| {
                AppError::Validation("answer_text or transcript is required".to_string())
            })?;

        let media_url = self
            .media_url
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if let Some(key) = &media_url {
            if !owns_media_key(user_id, key) {
                return Err(AppError::Validation(
                    "media_url must be a key returned by the media upload endpoint".to_string(),
                ));
            }
        }

        Ok(ValidatedAnswer {
            target: AnswerTarget::new(self.question_kind, question_id),
            text,
            media_url,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub answer: UserAnswerRow,
    pub follow_up: Option<FollowUpQuestionRow>,
    /// Aggregate percentage after this answer.
    pub interview_score: i32,
}

#[derive(Debug, Serialize)]
pub struct MediaUploadResponse {
    pub media_url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn owned_view(state: &AppState, id: Uuid, user: &AuthUser) -> Result<InterviewView, AppError> {
    let interview = store::get_owned_interview(&state.db, id, &user.user_id).await?;
    store::load_interview_view(&state.db, interview).await
}

async fn main_question_or_404(state: &AppState, id: Uuid) -> Result<MainQuestionRow, AppError> {
    store::get_main_question(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Interviews
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/interviews
///
/// Validates the role description, generates main questions and stores them.
pub async fn handle_create_interview(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<CreateInterviewRequest>,
) -> Result<(StatusCode, Json<InterviewView>), AppError> {
    let spec = request.validate()?;
    let drafts = generate_questions(&state.llm, &spec).await?;
    let (interview, questions) =
        store::create_interview(&state.db, &user.user_id, &spec, &drafts).await?;

    Ok((
        StatusCode::CREATED,
        Json(assemble_view(interview, questions, vec![], vec![])),
    ))
}

/// GET /api/v1/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<InterviewRow>>, AppError> {
    Ok(Json(store::list_interviews(&state.db, &user.user_id).await?))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<InterviewView>, AppError> {
    Ok(Json(owned_view(&state, id, &user).await?))
}

/// DELETE /api/v1/interviews/:id
pub async fn handle_delete_interview(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    store::get_owned_interview(&state.db, id, &user.user_id).await?;
    store::delete_interview(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Questions
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/interviews/:id/questions
///
/// Main questions in creation order, each with its follow-ups.
pub async fn handle_list_questions(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Vec<MainQuestionView>>, AppError> {
    Ok(Json(owned_view(&state, id, &user).await?.questions))
}

/// POST /api/v1/questions/:id/follow-ups
///
/// Explicitly asks for a follow-up to main question `:id` based on `answer_text`.
pub async fn handle_request_follow_up(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(question_id): AppPath<Uuid>,
    AppJson(request): AppJson<FollowUpRequest>,
) -> Result<Json<FollowUpResponse>, AppError> {
    let answer_text = request.answer_text.trim();
    if answer_text.is_empty() {
        return Err(AppError::Validation("answer_text is required".to_string()));
    }

    let main = main_question_or_404(&state, question_id).await?;
    let interview = store::get_owned_interview(&state.db, main.interview_id, &user.user_id).await?;

    let follow_up = generate_follow_up(
        &state.db,
        &state.llm,
        &interview.job_title,
        &main,
        answer_text,
        true,
    )
    .await?;
    let existing = store::list_follow_ups(&state.db, main.id).await?.len() as i64;

    Ok(Json(FollowUpResponse {
        follow_up,
        remaining: remaining_follow_ups(existing),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Answers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/answers
///
/// Scores an answer with the model, upserts it together with the refreshed
/// interview score, and may attach the next follow-up question.
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let answer = request.validate(&user.user_id)?;

    // Resolve the answered question and the main question it hangs off.
    let (main, follow_up) = match answer.target {
        AnswerTarget::Main(id) => (main_question_or_404(&state, id).await?, None),
        AnswerTarget::FollowUp(id) => {
            let follow_up = store::get_follow_up(&state.db, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Follow-up question {id} not found")))?;
            (
                main_question_or_404(&state, follow_up.main_question_id).await?,
                Some(follow_up),
            )
        }
    };
    let interview = store::get_owned_interview(&state.db, main.interview_id, &user.user_id).await?;

    let ctx = match &follow_up {
        Some(f) => ScoringContext {
            job_title: &interview.job_title,
            question_text: &f.question_text,
            key_points: &f.key_points,
            max_score: f.max_score,
        },
        None => ScoringContext {
            job_title: &interview.job_title,
            question_text: &main.question_text,
            key_points: &main.key_points,
            max_score: main.max_score,
        },
    };
    let assessment = score_answer(&state.llm, &ctx, &answer.text).await?;

    let (stored, interview_score) = store::record_answer(
        &state.db,
        interview.id,
        answer.target,
        NewAnswer {
            answer_text: &answer.text,
            media_url: answer.media_url.as_deref(),
            score: assessment.score,
            feedback: &assessment.feedback,
            key_points_covered: &assessment.key_points_covered,
        },
    )
    .await?;

    info!(
        "Answer {} scored {}/{} (interview {} now {interview_score}%)",
        stored.id, stored.score, ctx.max_score, interview.id
    );

    let next_follow_up = match generate_follow_up(
        &state.db,
        &state.llm,
        &interview.job_title,
        &main,
        &answer.text,
        false,
    )
    .await
    {
        Ok(f) => f,
        Err(e) => {
            warn!("Follow-up generation skipped for question {}: {e}", main.id);
            None
        }
    };

    Ok(Json(SubmitAnswerResponse {
        answer: stored,
        follow_up: next_follow_up,
        interview_score,
    }))
}

/// POST /api/v1/answers/media
///
/// Multipart upload of a recorded answer (field `file`). Returns the key to send
/// as `media_url` with the answer.
pub async fn handle_upload_media(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<MediaUploadResponse>), AppError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file part has no content type".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        let media_url = upload_answer_media(
            &state.s3,
            &state.config.s3_bucket,
            &user.user_id,
            &content_type,
            data,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(MediaUploadResponse { media_url })));
    }

    Err(AppError::Validation("multipart field 'file' is required".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Results & session
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/interviews/:id/results
pub async fn handle_get_results(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<InterviewResults>, AppError> {
    let view = owned_view(&state, id, &user).await?;
    Ok(Json(compute_results(&view)))
}

/// GET /api/v1/interviews/:id/report
///
/// The results as a Markdown document.
pub async fn handle_get_report(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = owned_view(&state, id, &user).await?;
    let md = render_results_md(&compute_results(&view));
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], md))
}

/// GET /api/v1/interviews/:id/session
///
/// Chat transcript so far plus the next question to ask.
pub async fn handle_get_session(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<SessionState>, AppError> {
    let view = owned_view(&state, id, &user).await?;
    Ok(Json(build_session(&view)))
}
