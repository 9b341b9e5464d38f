use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-question outcome of a completed attempt, in original question order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub question_id: Uuid,
    pub selected_option: Option<String>,
    pub correct_answer_text: String,
    pub is_correct: bool,
}

/// Immutable record of one completed quiz attempt. Invariants: `score`
/// equals the number of correct details and `details` covers every question
/// of the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: Uuid,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub score: u32,
    pub total_questions: u32,
    pub topic: String,
    pub details: Vec<AnswerDetail>,
}

impl QuizResult {
    pub fn new(owner_id: String, topic: String, details: Vec<AnswerDetail>) -> Self {
        let score = details.iter().filter(|d| d.is_correct).count() as u32;
        Self {
            id: Uuid::new_v4(),
            owner_id,
            created_at: Utc::now(),
            score,
            total_questions: details.len() as u32,
            topic,
            details,
        }
    }
}
