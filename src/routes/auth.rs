use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::dto::auth_dto::{AuthStatusResponse, SignInResponse};
use crate::AppState;

#[axum::debug_handler]
pub async fn continue_as_guest(State(state): State<AppState>) -> crate::error::Result<Response> {
    let identity = state.reconciler.continue_as_guest();
    Ok(Json(identity).into_response())
}

#[axum::debug_handler]
pub async fn sign_in(State(state): State<AppState>) -> crate::error::Result<Response> {
    let identity = state.reconciler.sign_in().await?;
    Ok(Json(SignInResponse {
        signed_in: identity.is_some(),
        identity,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn sign_out(State(state): State<AppState>) -> crate::error::Result<Response> {
    state.reconciler.sign_out().await?;
    Ok(Json(json!({ "status": "signed_out" })).into_response())
}

#[axum::debug_handler]
pub async fn me(State(state): State<AppState>) -> crate::error::Result<Response> {
    Ok(Json(AuthStatusResponse {
        identity: state.reconciler.current_or_restored(),
    })
    .into_response())
}
