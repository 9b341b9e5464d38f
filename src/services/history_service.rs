use crate::error::{Error, Result};
use crate::models::quiz_result::{AnswerDetail, QuizResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Append-only, owner-scoped store of completed quiz results.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, result: &QuizResult) -> Result<()>;
    async fn list(&self, owner_id: &str) -> Result<Vec<QuizResult>>;
    async fn get(&self, owner_id: &str, id: Uuid) -> Result<QuizResult>;
}

#[derive(Clone)]
pub struct HistoryService {
    pool: PgPool,
}

impl HistoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type ResultRow = (Uuid, String, String, i32, i32, serde_json::Value, DateTime<Utc>);

fn row_to_result(row: ResultRow) -> Result<QuizResult> {
    let (id, owner_id, topic, score, total_questions, details, created_at) = row;
    let details: Vec<AnswerDetail> = serde_json::from_value(details)?;
    Ok(QuizResult {
        id,
        owner_id,
        created_at,
        score: score as u32,
        total_questions: total_questions as u32,
        topic,
        details,
    })
}

#[async_trait]
impl HistoryStore for HistoryService {
    async fn append(&self, result: &QuizResult) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_results (id, owner_id, topic, score, total_questions, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(result.id)
        .bind(&result.owner_id)
        .bind(&result.topic)
        .bind(result.score as i32)
        .bind(result.total_questions as i32)
        .bind(serde_json::to_value(&result.details)?)
        .bind(result.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<QuizResult>> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT id, owner_id, topic, score, total_questions, details, created_at
            FROM quiz_results WHERE owner_id = $1 ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_result).collect()
    }

    async fn get(&self, owner_id: &str, id: Uuid) -> Result<QuizResult> {
        let row = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT id, owner_id, topic, score, total_questions, details, created_at
            FROM quiz_results WHERE owner_id = $1 AND id = $2
            "#,
        )
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Quiz result not found".to_string()))?;

        row_to_result(row)
    }
}
