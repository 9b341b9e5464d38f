use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json, Response},
};
use base64::Engine;
use uuid::Uuid;
use validator::Validate;

use crate::dto::question_dto::{
    GenerateQuestionsRequest, ImportResponse, QuestionListResponse, ToggleBookmarkResponse,
};
use crate::error::Error;
use crate::routes::current_identity;
use crate::services::generation_service::GenerationSource;
use crate::AppState;

fn image_mime(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn source_from_request(req: &GenerateQuestionsRequest) -> crate::error::Result<GenerationSource> {
    if let Some(text) = req.text.as_ref().filter(|t| !t.trim().is_empty()) {
        return Ok(GenerationSource::Text(text.clone()));
    }
    if let Some(base64) = req.image_base64.as_ref().filter(|b| !b.is_empty()) {
        return Ok(GenerationSource::Image {
            base64: base64.clone(),
            mime: req
                .image_mime
                .clone()
                .unwrap_or_else(|| "image/png".to_string()),
        });
    }
    Err(Error::BadRequest(
        "Provide either source text or an image".to_string(),
    ))
}

#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let owner = current_identity(&state)?;
    let config = crate::config::get_config();
    let count = req.count.min(config.max_import_questions);
    let source = source_from_request(&req)?;

    let questions = state
        .importer
        .generate_and_import(&owner.id, &source, &req.subject, &req.topic, count)
        .await?;
    state.artifacts.invalidate_questions();

    Ok(Json(ImportResponse {
        imported: questions.len(),
        questions,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn generate_questions_from_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> crate::error::Result<Response> {
    let owner = current_identity(&state)?;
    let config = crate::config::get_config();

    let mut subject = String::new();
    let mut topic = String::new();
    let mut count: usize = 0;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "subject" => subject = field.text().await?,
            "topic" => topic = field.text().await?,
            "count" => {
                count = field
                    .text()
                    .await?
                    .trim()
                    .parse()
                    .map_err(|_| Error::BadRequest("Invalid question count".to_string()))?;
            }
            "file" => {
                let filename = field.file_name().unwrap_or("source").to_string();
                let data = field.bytes().await?;
                if !data.is_empty() {
                    file = Some((filename, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    if subject.trim().is_empty() || topic.trim().is_empty() || count == 0 {
        return Err(Error::BadRequest(
            "subject, topic and a positive count are required".to_string(),
        ));
    }
    let (name, bytes) =
        file.ok_or_else(|| Error::BadRequest("No source file provided".to_string()))?;

    // Image uploads go through the vision path, everything else as raw text.
    let source = match image_mime(&name) {
        Some(mime) => GenerationSource::Image {
            base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
            mime: mime.to_string(),
        },
        None => GenerationSource::File { name, bytes },
    };
    let questions = state
        .importer
        .generate_and_import(
            &owner.id,
            &source,
            subject.trim(),
            topic.trim(),
            count.min(config.max_import_questions),
        )
        .await?;
    state.artifacts.invalidate_questions();

    Ok(Json(ImportResponse {
        imported: questions.len(),
        questions,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn list_questions(State(state): State<AppState>) -> crate::error::Result<Response> {
    let owner = current_identity(&state)?;

    // Read-through the local artifact cache; it is cleared on every
    // identity transition and on import, so a hit is always owner-fresh.
    let questions = match state.artifacts.cached_questions(&owner.id) {
        Some(cached) => cached,
        None => {
            let fresh = state.question_store.list_all(&owner.id).await?;
            state.artifacts.cache_questions(&owner.id, fresh.clone());
            fresh
        }
    };
    let bookmarked = state.question_store.bookmarked_ids(&owner.id).await?;

    Ok(Json(QuestionListResponse {
        questions,
        bookmarked: bookmarked.into_iter().collect(),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let owner = current_identity(&state)?;
    let bookmarked = state
        .question_store
        .toggle_bookmark(&owner.id, question_id)
        .await?;
    Ok(Json(ToggleBookmarkResponse {
        question_id,
        bookmarked,
    })
    .into_response())
}
