use crate::error::Result;
use crate::models::question::Question;
use crate::models::quiz_result::QuizResult;
use crate::services::question_service::QuestionStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a completed result's question ids back into full records, kept
/// in the stored detail order. Ids that no longer resolve (the store may
/// have changed since the attempt) are dropped.
pub struct ReviewService {
    store: Arc<dyn QuestionStore>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    pub async fn questions_for_result(&self, result: &QuizResult) -> Result<Vec<Question>> {
        let ids: Vec<_> = result.details.iter().map(|d| d.question_id).collect();
        let found = self.store.lookup_by_ids(&result.owner_id, &ids).await?;
        let mut by_id: HashMap<_, _> = found.into_iter().map(|q| (q.id, q)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}
