use crate::models::question::Question;
use crate::models::quiz_result::QuizResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartQuizRequest {
    pub topic: Option<String>,
    #[serde(default)]
    pub bookmarked_only: bool,
    #[validate(range(min = 1))]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub question_id: Uuid,
    pub option: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NavigateRequest {
    pub index: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmarkRequest {
    pub question_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavigateResponse {
    pub current_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub result: QuizResult,
    /// Question records in the stored detail order; ids that no longer
    /// resolve are absent.
    pub questions: Vec<Question>,
}
