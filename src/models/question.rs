use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// The owner-scoped question body as stored in the JSONB document column.
/// Deserialization doubles as the strict schema check at the store boundary:
/// rows that do not conform (e.g. an array written where a single question
/// belongs) fail here and are skipped on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDoc {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub topic: String,
    pub subject: String,
}

/// A stored question. Ids are assigned by the store on import and never
/// trusted from callers; the record is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub topic: String,
    pub subject: String,
}

impl Question {
    pub fn from_doc(id: Uuid, doc: QuestionDoc) -> Self {
        Self {
            id,
            text: doc.text,
            options: doc.options,
            correct_answer: doc.correct_answer,
            topic: doc.topic,
            subject: doc.subject,
        }
    }

    pub fn doc(&self) -> QuestionDoc {
        QuestionDoc {
            text: self.text.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_answer.clone(),
            topic: self.topic.clone(),
            subject: self.subject.clone(),
        }
    }

    /// The correct answer as literal option text. Stored questions carry the
    /// answer either verbatim or as a single letter (`A`-`D`) indexing into
    /// `options`; both conventions must score identically, so every
    /// correctness comparison goes through this resolution.
    pub fn resolved_correct_answer(&self) -> &str {
        let raw = self.correct_answer.trim();
        let mut chars = raw.chars();
        if let (Some(letter), None) = (chars.next(), chars.next()) {
            let upper = letter.to_ascii_uppercase();
            if ('A'..='D').contains(&upper) {
                let idx = (upper as u8 - b'A') as usize;
                if let Some(option) = self.options.get(idx) {
                    return option;
                }
            }
        }
        raw
    }
}

/// An untrusted candidate question as returned by the generation adapter.
/// Validated before entering the import pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RawQuestion {
    #[validate(length(min = 1))]
    pub text: String,
    #[validate(length(min = 2))]
    pub options: Vec<String>,
    #[validate(length(min = 1))]
    pub correct_answer: String,
}
