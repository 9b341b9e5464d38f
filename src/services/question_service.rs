use crate::error::Result;
use crate::models::question::{Question, QuestionDoc};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// Durable, owner-scoped question collection plus the per-owner bookmark
/// set. The backing store gives per-document atomicity only; `bulk_insert`
/// fans out one write per question and is explicitly not all-or-nothing.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Writes each document under a freshly assigned store-unique id.
    /// Stops at the first failed row; rows already written stay written.
    async fn bulk_insert(&self, owner_id: &str, docs: Vec<QuestionDoc>) -> Result<Vec<Question>>;

    /// Every well-formed question for the owner. Documents that fail the
    /// schema check are skipped, never a read failure.
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Question>>;

    /// The subset of `ids` that still resolve. Order is not guaranteed.
    async fn lookup_by_ids(&self, owner_id: &str, ids: &[Uuid]) -> Result<Vec<Question>>;

    /// Idempotent membership flip; returns whether the id is now present.
    /// The first toggle for an owner lazily creates the bookmark set.
    async fn toggle_bookmark(&self, owner_id: &str, question_id: Uuid) -> Result<bool>;

    async fn bookmarked_ids(&self, owner_id: &str) -> Result<HashSet<Uuid>>;
}

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_row(owner_id: &str, id: Uuid, doc: serde_json::Value) -> Option<Question> {
        match serde_json::from_value::<QuestionDoc>(doc) {
            Ok(doc) => Some(Question::from_doc(id, doc)),
            Err(err) => {
                tracing::warn!(owner_id, question_id = %id, %err, "skipping malformed question document");
                None
            }
        }
    }
}

#[async_trait]
impl QuestionStore for QuestionService {
    async fn bulk_insert(&self, owner_id: &str, docs: Vec<QuestionDoc>) -> Result<Vec<Question>> {
        let mut inserted = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = Uuid::new_v4();
            sqlx::query(
                r#"INSERT INTO questions (id, owner_id, doc) VALUES ($1, $2, $3)"#,
            )
            .bind(id)
            .bind(owner_id)
            .bind(serde_json::to_value(&doc)?)
            .execute(&self.pool)
            .await?;
            inserted.push(Question::from_doc(id, doc));
        }
        tracing::info!(owner_id, count = inserted.len(), "questions imported");
        Ok(inserted)
    }

    async fn list_all(&self, owner_id: &str) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, (Uuid, serde_json::Value)>(
            r#"SELECT id, doc FROM questions WHERE owner_id = $1 ORDER BY created_at"#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, doc)| Self::parse_row(owner_id, id, doc))
            .collect())
    }

    async fn lookup_by_ids(&self, owner_id: &str, ids: &[Uuid]) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, (Uuid, serde_json::Value)>(
            r#"SELECT id, doc FROM questions WHERE owner_id = $1 AND id = ANY($2)"#,
        )
        .bind(owner_id)
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, doc)| Self::parse_row(owner_id, id, doc))
            .collect())
    }

    async fn toggle_bookmark(&self, owner_id: &str, question_id: Uuid) -> Result<bool> {
        // Single statement so the flip stays atomic at document granularity.
        let added = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO bookmarks (owner_id, question_ids, updated_at)
            VALUES ($1, jsonb_build_array($2::text), NOW())
            ON CONFLICT (owner_id) DO UPDATE SET
                question_ids = CASE
                    WHEN bookmarks.question_ids @> jsonb_build_array($2::text)
                        THEN bookmarks.question_ids - $2::text
                    ELSE bookmarks.question_ids || jsonb_build_array($2::text)
                END,
                updated_at = NOW()
            RETURNING question_ids @> jsonb_build_array($2::text)
            "#,
        )
        .bind(owner_id)
        .bind(question_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(added)
    }

    async fn bookmarked_ids(&self, owner_id: &str) -> Result<HashSet<Uuid>> {
        let row = sqlx::query_scalar::<_, serde_json::Value>(
            r#"SELECT question_ids FROM bookmarks WHERE owner_id = $1"#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        let mut ids = HashSet::new();
        if let Some(value) = row {
            let raw: Vec<String> = serde_json::from_value(value).unwrap_or_default();
            for s in raw {
                match s.parse::<Uuid>() {
                    Ok(id) => {
                        ids.insert(id);
                    }
                    Err(_) => {
                        tracing::warn!(owner_id, raw = %s, "skipping malformed bookmark id");
                    }
                }
            }
        }
        Ok(ids)
    }
}
