#![allow(dead_code)]

use async_trait::async_trait;
use quizcraft_backend::error::{Error, Result};
use quizcraft_backend::models::question::{Question, QuestionDoc, RawQuestion};
use quizcraft_backend::models::quiz_result::QuizResult;
use quizcraft_backend::services::generation_service::{GenerationSource, QuestionGenerator};
use quizcraft_backend::services::history_service::HistoryStore;
use quizcraft_backend::services::question_service::QuestionStore;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

/// Store double with the same contract as the Postgres implementation:
/// fresh ids on insert, per-owner scoping, idempotent bookmark flips.
#[derive(Default)]
pub struct InMemoryQuestionStore {
    questions: Mutex<HashMap<String, Vec<Question>>>,
    bookmarks: Mutex<HashMap<String, HashSet<Uuid>>>,
}

#[async_trait]
impl QuestionStore for InMemoryQuestionStore {
    async fn bulk_insert(&self, owner_id: &str, docs: Vec<QuestionDoc>) -> Result<Vec<Question>> {
        let inserted: Vec<Question> = docs
            .into_iter()
            .map(|doc| Question::from_doc(Uuid::new_v4(), doc))
            .collect();
        self.questions
            .lock()
            .unwrap()
            .entry(owner_id.to_string())
            .or_default()
            .extend(inserted.clone());
        Ok(inserted)
    }

    async fn list_all(&self, owner_id: &str) -> Result<Vec<Question>> {
        Ok(self
            .questions
            .lock()
            .unwrap()
            .get(owner_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn lookup_by_ids(&self, owner_id: &str, ids: &[Uuid]) -> Result<Vec<Question>> {
        let wanted: HashSet<_> = ids.iter().copied().collect();
        Ok(self
            .questions
            .lock()
            .unwrap()
            .get(owner_id)
            .map(|qs| {
                qs.iter()
                    .filter(|q| wanted.contains(&q.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn toggle_bookmark(&self, owner_id: &str, question_id: Uuid) -> Result<bool> {
        let mut bookmarks = self.bookmarks.lock().unwrap();
        let set = bookmarks.entry(owner_id.to_string()).or_default();
        if set.remove(&question_id) {
            Ok(false)
        } else {
            set.insert(question_id);
            Ok(true)
        }
    }

    async fn bookmarked_ids(&self, owner_id: &str) -> Result<HashSet<Uuid>> {
        Ok(self
            .bookmarks
            .lock()
            .unwrap()
            .get(owner_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    results: Mutex<Vec<QuizResult>>,
}

impl InMemoryHistoryStore {
    pub fn all(&self) -> Vec<QuizResult> {
        self.results.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, result: &QuizResult) -> Result<()> {
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<QuizResult>> {
        let mut results: Vec<QuizResult> = self
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    async fn get(&self, owner_id: &str, id: Uuid) -> Result<QuizResult> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.owner_id == owner_id && r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Quiz result not found".to_string()))
    }
}

/// History store whose writes always fail, for the submission path that
/// must keep the in-memory result anyway.
pub struct FailingHistoryStore;

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn append(&self, _result: &QuizResult) -> Result<()> {
        Err(Error::Internal("simulated history write failure".to_string()))
    }

    async fn list(&self, _owner_id: &str) -> Result<Vec<QuizResult>> {
        Ok(vec![])
    }

    async fn get(&self, _owner_id: &str, _id: Uuid) -> Result<QuizResult> {
        Err(Error::NotFound("Quiz result not found".to_string()))
    }
}

/// Generator double returning a canned candidate list.
pub struct StubGenerator {
    pub candidates: Vec<RawQuestion>,
}

#[async_trait]
impl QuestionGenerator for StubGenerator {
    async fn generate(
        &self,
        _source: &GenerationSource,
        _subject: &str,
        _topic: &str,
        _count: usize,
    ) -> Result<Vec<RawQuestion>> {
        Ok(self.candidates.clone())
    }
}

pub fn raw(text: &str, options: &[&str], correct: &str) -> RawQuestion {
    RawQuestion {
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: correct.to_string(),
    }
}

pub fn question(text: &str, options: &[&str], correct: &str, topic: &str) -> Question {
    Question {
        id: Uuid::new_v4(),
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: correct.to_string(),
        topic: topic.to_string(),
        subject: "General".to_string(),
    }
}
