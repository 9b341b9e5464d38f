use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::dto::session_dto::ReviewResponse;
use crate::routes::current_identity;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_history(State(state): State<AppState>) -> crate::error::Result<Response> {
    let owner = current_identity(&state)?;
    let results = state.history_store.list(&owner.id).await?;
    Ok(Json(results).into_response())
}

#[axum::debug_handler]
pub async fn review_result(
    State(state): State<AppState>,
    Path(result_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let owner = current_identity(&state)?;
    let result = state.history_store.get(&owner.id, result_id).await?;
    let questions = state.review.questions_for_result(&result).await?;
    Ok(Json(ReviewResponse { result, questions }).into_response())
}
