use crate::models::question::Question;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuestionsRequest {
    #[validate(length(min = 1))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub topic: String,
    #[validate(range(min = 1))]
    pub count: usize,
    /// Plain source material; mutually exclusive with the image fields.
    pub text: Option<String>,
    pub image_base64: Option<String>,
    pub image_mime: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionListResponse {
    pub questions: Vec<Question>,
    pub bookmarked: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleBookmarkResponse {
    pub question_id: Uuid,
    pub bookmarked: bool,
}
