use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::session_dto::{AnswerRequest, BookmarkRequest, NavigateRequest, NavigateResponse, StartQuizRequest};
use crate::dto::question_dto::ToggleBookmarkResponse;
use crate::error::Error;
use crate::routes::current_identity;
use crate::services::session_service::select_questions;
use crate::AppState;

/// 404 rather than 403 so session ids are not probeable across identities.
fn check_owner(state: &AppState, session_id: Uuid) -> crate::error::Result<()> {
    let owner = current_identity(state)?;
    let session_owner = state.sessions.owner_of(session_id)?;
    if session_owner != owner.id {
        return Err(Error::NotFound("Quiz session not found".to_string()));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn start_quiz(
    State(state): State<AppState>,
    Json(req): Json<StartQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let owner = current_identity(&state)?;

    let all = state.question_store.list_all(&owner.id).await?;
    let bookmarked = if req.bookmarked_only {
        Some(state.question_store.bookmarked_ids(&owner.id).await?)
    } else {
        None
    };

    let selected = select_questions(all, req.topic.as_deref(), bookmarked.as_ref(), req.count);
    let topic_label = req.topic.unwrap_or_else(|| "Mixed".to_string());
    let snapshot = state.sessions.start(&owner.id, topic_label, selected).await?;
    Ok(Json(snapshot).into_response())
}

#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    check_owner(&state, session_id)?;
    let snapshot = state.sessions.snapshot(session_id)?;
    Ok(Json(snapshot).into_response())
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> crate::error::Result<Response> {
    check_owner(&state, session_id)?;
    state.sessions.answer(session_id, req.question_id, req.option)?;
    Ok(Json(json!({ "saved": true, "question_id": req.question_id })).into_response())
}

#[axum::debug_handler]
pub async fn navigate(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> crate::error::Result<Response> {
    check_owner(&state, session_id)?;
    let current_index = state.sessions.navigate(session_id, req.index)?;
    Ok(Json(NavigateResponse { current_index }).into_response())
}

#[axum::debug_handler]
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<BookmarkRequest>,
) -> crate::error::Result<Response> {
    check_owner(&state, session_id)?;
    let bookmarked = state
        .sessions
        .toggle_bookmark(session_id, req.question_id)
        .await?;
    Ok(Json(ToggleBookmarkResponse {
        question_id: req.question_id,
        bookmarked,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    check_owner(&state, session_id)?;
    match state.sessions.submit(session_id).await? {
        Some(result) => Ok(Json(result).into_response()),
        None => Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "already_submitted",
                "message": "Quiz has already been submitted"
            })),
        )
            .into_response()),
    }
}

#[axum::debug_handler]
pub async fn exit_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    check_owner(&state, session_id)?;
    state.sessions.exit(session_id)?;
    Ok(Json(json!({ "status": "exited" })).into_response())
}
