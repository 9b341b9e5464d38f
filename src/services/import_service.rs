use crate::error::{ImportError, Result};
use crate::models::question::{Question, QuestionDoc, RawQuestion};
use crate::services::generation_service::{GenerationSource, QuestionGenerator};
use crate::services::question_service::QuestionStore;
use crate::utils::normalize::normalized_text;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

/// Import pipeline sitting between the generation adapter and the question
/// store: validate untrusted candidates, dedupe by normalized text, truncate
/// to the requested count, and only then write. Zero surviving candidates
/// aborts the import with nothing written.
pub struct ImportService {
    generator: Arc<dyn QuestionGenerator>,
    store: Arc<dyn QuestionStore>,
}

impl ImportService {
    pub fn new(generator: Arc<dyn QuestionGenerator>, store: Arc<dyn QuestionStore>) -> Self {
        Self { generator, store }
    }

    pub async fn generate_and_import(
        &self,
        owner_id: &str,
        source: &GenerationSource,
        subject: &str,
        topic: &str,
        count: usize,
    ) -> Result<Vec<Question>> {
        let candidates = self.generator.generate(source, subject, topic, count).await?;
        self.import(owner_id, candidates, subject, topic, count).await
    }

    pub async fn import(
        &self,
        owner_id: &str,
        candidates: Vec<RawQuestion>,
        subject: &str,
        topic: &str,
        count: usize,
    ) -> Result<Vec<Question>> {
        let total = candidates.len();
        let docs = prepare_candidates(candidates, subject, topic, count);
        if docs.is_empty() {
            tracing::warn!(owner_id, total, "import aborted, no unique candidates");
            return Err(ImportError::NoUniqueCandidates.into());
        }

        tracing::info!(
            owner_id,
            total,
            unique = docs.len(),
            "importing generated questions"
        );
        self.store.bulk_insert(owner_id, docs).await
    }
}

/// The pure part of the pipeline: drop malformed candidates, dedupe by
/// case/whitespace-insensitive text keeping the first occurrence, truncate
/// to the requested count. Exact-text dedup deliberately treats paraphrases
/// as distinct questions.
pub fn prepare_candidates(
    candidates: Vec<RawQuestion>,
    subject: &str,
    topic: &str,
    count: usize,
) -> Vec<QuestionDoc> {
    let mut seen = HashSet::new();
    let mut docs = Vec::new();

    for candidate in candidates {
        if docs.len() == count {
            break;
        }
        if candidate.validate().is_err() {
            tracing::warn!("dropping malformed generated question");
            continue;
        }
        let options: Vec<String> = candidate
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .collect();
        let distinct: HashSet<String> = options.iter().map(|o| normalized_text(o)).collect();
        if distinct.len() != options.len() {
            tracing::warn!("dropping generated question with duplicate options");
            continue;
        }

        let text = candidate.text.trim().to_string();
        if !seen.insert(normalized_text(&text)) {
            continue;
        }

        docs.push(QuestionDoc {
            text,
            options,
            correct_answer: candidate.correct_answer.trim().to_string(),
            topic: topic.to_string(),
            subject: subject.to_string(),
        });
    }

    docs
}
