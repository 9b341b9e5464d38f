use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::quiz_result::{AnswerDetail, QuizResult};
use crate::services::history_service::HistoryStore;
use crate::services::question_service::QuestionStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const SECONDS_PER_QUESTION: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    InProgress,
    Submitting,
    Complete,
}

/// One in-flight quiz attempt. Lives only in memory; destroyed on
/// submission or explicit exit, never persisted mid-attempt.
pub struct QuizSession {
    pub id: Uuid,
    pub owner_id: String,
    pub topic: String,
    /// Frozen for the attempt, even if the store is imported into meanwhile.
    pub questions: Vec<Question>,
    pub answers: HashMap<Uuid, String>,
    pub current_index: usize,
    pub remaining_seconds: i64,
    pub deadline: DateTime<Utc>,
    pub bookmarked: HashSet<Uuid>,
    pub state: SessionState,
    ticker: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionQuestion {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
    pub topic: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub topic: String,
    pub state: SessionState,
    pub current_index: usize,
    pub remaining_seconds: i64,
    pub deadline: DateTime<Utc>,
    pub total_questions: usize,
    pub questions_answered: usize,
    pub questions: Vec<SessionQuestion>,
    pub answers: HashMap<Uuid, String>,
    pub bookmarked: Vec<Uuid>,
}

fn snapshot_of(session: &QuizSession) -> SessionSnapshot {
    SessionSnapshot {
        id: session.id,
        topic: session.topic.clone(),
        state: session.state,
        current_index: session.current_index,
        remaining_seconds: session.remaining_seconds,
        deadline: session.deadline,
        total_questions: session.questions.len(),
        questions_answered: session.answers.len(),
        questions: session
            .questions
            .iter()
            .map(|q| SessionQuestion {
                id: q.id,
                text: q.text.clone(),
                options: q.options.clone(),
                topic: q.topic.clone(),
                subject: q.subject.clone(),
            })
            .collect(),
        answers: session.answers.clone(),
        bookmarked: session.bookmarked.iter().copied().collect(),
    }
}

/// Builds the frozen question list for an attempt: optional topic filter,
/// optional restriction to bookmarked questions, shuffle, truncate.
pub fn select_questions(
    mut all: Vec<Question>,
    topic: Option<&str>,
    bookmarked: Option<&HashSet<Uuid>>,
    count: Option<usize>,
) -> Vec<Question> {
    if let Some(topic) = topic {
        all.retain(|q| q.topic.eq_ignore_ascii_case(topic));
    }
    if let Some(bookmarked) = bookmarked {
        all.retain(|q| bookmarked.contains(&q.id));
    }
    all.shuffle(&mut rand::thread_rng());
    if let Some(count) = count {
        all.truncate(count);
    }
    all
}

/// Owns every in-flight attempt. The session map lock is never held across
/// an await; submission atomicity comes from the check-and-set on
/// `SessionState` under that lock, shared by the manual and timer paths.
pub struct SessionManager {
    sessions: Mutex<HashMap<Uuid, QuizSession>>,
    questions: Arc<dyn QuestionStore>,
    history: Arc<dyn HistoryStore>,
}

impl SessionManager {
    pub fn new(questions: Arc<dyn QuestionStore>, history: Arc<dyn HistoryStore>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            questions,
            history,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, QuizSession>> {
        self.sessions.lock().expect("session mutex poisoned")
    }

    /// Starts an attempt over a frozen question list. The bookmark view is
    /// loaded through a suspension point; if the session is exited while the
    /// load is in flight, the stale result is discarded.
    pub async fn start(
        self: &Arc<Self>,
        owner_id: &str,
        topic: String,
        questions: Vec<Question>,
    ) -> Result<SessionSnapshot> {
        if questions.is_empty() {
            return Err(Error::BadRequest(
                "Cannot start a quiz with no questions".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let total = questions.len() as i64;
        let remaining = SECONDS_PER_QUESTION * total;
        let question_ids: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();

        {
            let mut sessions = self.lock();
            sessions.insert(
                id,
                QuizSession {
                    id,
                    owner_id: owner_id.to_string(),
                    topic,
                    questions,
                    answers: HashMap::new(),
                    current_index: 0,
                    remaining_seconds: remaining,
                    deadline: Utc::now() + ChronoDuration::seconds(remaining),
                    bookmarked: HashSet::new(),
                    state: SessionState::Loading,
                    ticker: None,
                },
            );
        }

        // Suspension point: the session may be exited before this resolves.
        let bookmarked = match self.questions.bookmarked_ids(owner_id).await {
            Ok(ids) => ids,
            Err(err) => {
                self.lock().remove(&id);
                return Err(err);
            }
        };

        let ticker = self.spawn_ticker(id);
        let mut sessions = self.lock();
        let Some(session) = sessions.get_mut(&id) else {
            ticker.abort();
            return Err(Error::NotFound("Quiz session no longer exists".to_string()));
        };
        session.bookmarked = bookmarked
            .into_iter()
            .filter(|qid| question_ids.contains(qid))
            .collect();
        session.state = SessionState::InProgress;
        session.ticker = Some(ticker);
        tracing::info!(session_id = %id, total, "quiz session started");
        Ok(snapshot_of(session))
    }

    fn spawn_ticker(self: &Arc<Self>, session_id: Uuid) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let expired = {
                    let mut sessions = manager.lock();
                    let Some(session) = sessions.get_mut(&session_id) else {
                        break;
                    };
                    if session.state != SessionState::InProgress {
                        break;
                    }
                    session.remaining_seconds -= 1;
                    session.remaining_seconds <= 0
                };
                if expired {
                    tracing::info!(session_id = %session_id, "quiz timer expired, auto-submitting");
                    if let Err(err) = manager.submit(session_id).await {
                        tracing::error!(session_id = %session_id, error = ?err, "auto-submit failed");
                    }
                    break;
                }
            }
        })
    }

    pub fn snapshot(&self, session_id: Uuid) -> Result<SessionSnapshot> {
        let sessions = self.lock();
        let session = sessions
            .get(&session_id)
            .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))?;
        Ok(snapshot_of(session))
    }

    /// Records the selection for one question, overwriting any prior
    /// selection for that question only.
    pub fn answer(&self, session_id: Uuid, question_id: Uuid, option: String) -> Result<()> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))?;
        if matches!(session.state, SessionState::Submitting | SessionState::Complete) {
            return Err(Error::BadRequest("Quiz already submitted".to_string()));
        }
        if !session.questions.iter().any(|q| q.id == question_id) {
            return Err(Error::BadRequest(
                "Question does not belong to this quiz".to_string(),
            ));
        }
        session.answers.insert(question_id, option);
        Ok(())
    }

    /// Moves the cursor; out-of-range targets are clamped, not errors.
    pub fn navigate(&self, session_id: Uuid, index: i64) -> Result<usize> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))?;
        let max = session.questions.len() as i64 - 1;
        session.current_index = index.clamp(0, max) as usize;
        Ok(session.current_index)
    }

    /// Flips the bookmark through the store and updates the session's local
    /// view from the returned membership, so the view never drifts from the
    /// durable set. Store failures are surfaced.
    pub async fn toggle_bookmark(&self, session_id: Uuid, question_id: Uuid) -> Result<bool> {
        let owner_id = {
            let sessions = self.lock();
            let session = sessions
                .get(&session_id)
                .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))?;
            if !session.questions.iter().any(|q| q.id == question_id) {
                return Err(Error::BadRequest(
                    "Question does not belong to this quiz".to_string(),
                ));
            }
            session.owner_id.clone()
        };

        let added = self.questions.toggle_bookmark(&owner_id, question_id).await?;

        // The session may have ended while the toggle was in flight; the
        // durable set is already consistent, only the view update is skipped.
        let mut sessions = self.lock();
        if let Some(session) = sessions.get_mut(&session_id) {
            if added {
                session.bookmarked.insert(question_id);
            } else {
                session.bookmarked.remove(&question_id);
            }
        }
        Ok(added)
    }

    /// Submission, shared by the manual route and the expired timer. The
    /// first caller to win the check-and-set produces the attempt's single
    /// result; later callers get `Ok(None)`. A failed history write is
    /// logged but never withholds the in-memory result from the caller.
    pub async fn submit(&self, session_id: Uuid) -> Result<Option<QuizResult>> {
        let (owner_id, topic, questions, answers) = {
            let mut sessions = self.lock();
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))?;
            match session.state {
                SessionState::Submitting | SessionState::Complete => return Ok(None),
                _ => session.state = SessionState::Submitting,
            }
            (
                session.owner_id.clone(),
                session.topic.clone(),
                session.questions.clone(),
                session.answers.clone(),
            )
        };

        let details: Vec<AnswerDetail> = questions
            .iter()
            .map(|q| {
                let selected = answers.get(&q.id).cloned();
                let resolved = q.resolved_correct_answer().to_string();
                let is_correct = selected.as_deref() == Some(resolved.as_str());
                AnswerDetail {
                    question_id: q.id,
                    selected_option: selected,
                    correct_answer_text: resolved,
                    is_correct,
                }
            })
            .collect();

        let result = QuizResult::new(owner_id, topic, details);
        tracing::info!(
            session_id = %session_id,
            score = result.score,
            total = result.total_questions,
            "quiz submitted"
        );

        if let Err(err) = self.history.append(&result).await {
            // Losing the user's completed attempt view is worse than losing
            // one history write.
            tracing::error!(
                session_id = %session_id,
                error = ?err,
                "failed to persist quiz result, returning in-memory result"
            );
        }

        let mut sessions = self.lock();
        if let Some(mut session) = sessions.remove(&session_id) {
            session.state = SessionState::Complete;
            session.ticker.take();
        }
        Ok(Some(result))
    }

    /// Discards the attempt without producing a result and stops the timer.
    pub fn exit(&self, session_id: Uuid) -> Result<()> {
        let mut sessions = self.lock();
        let session = sessions
            .remove(&session_id)
            .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))?;
        if let Some(ticker) = session.ticker {
            ticker.abort();
        }
        tracing::info!(session_id = %session_id, "quiz session exited");
        Ok(())
    }

    /// Owner check for route-level scoping.
    pub fn owner_of(&self, session_id: Uuid) -> Result<String> {
        let sessions = self.lock();
        sessions
            .get(&session_id)
            .map(|s| s.owner_id.clone())
            .ok_or_else(|| Error::NotFound("Quiz session not found".to_string()))
    }
}
