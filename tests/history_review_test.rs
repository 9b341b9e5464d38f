mod common;

use common::{question, InMemoryHistoryStore, InMemoryQuestionStore};
use quizcraft_backend::error::Error;
use quizcraft_backend::models::quiz_result::{AnswerDetail, QuizResult};
use quizcraft_backend::services::history_service::HistoryStore;
use quizcraft_backend::services::question_service::QuestionStore;
use quizcraft_backend::services::review_service::ReviewService;
use std::sync::Arc;
use uuid::Uuid;

const OWNER: &str = "owner-1";

fn detail(question_id: Uuid, correct: &str) -> AnswerDetail {
    AnswerDetail {
        question_id,
        selected_option: Some(correct.to_string()),
        correct_answer_text: correct.to_string(),
        is_correct: true,
    }
}

#[tokio::test]
async fn review_preserves_attempt_order_and_drops_unresolvable_ids() {
    let store = Arc::new(InMemoryQuestionStore::default());
    let inserted = store
        .bulk_insert(
            OWNER,
            vec![
                question("Q1", &["a", "b"], "a", "Misc").doc(),
                question("Q2", &["a", "b"], "a", "Misc").doc(),
                question("Q3", &["a", "b"], "a", "Misc").doc(),
            ],
        )
        .await
        .unwrap();
    let review = ReviewService::new(store.clone());

    // Attempt saw the questions shuffled; one id no longer resolves.
    let result = QuizResult::new(
        OWNER.to_string(),
        "Misc".to_string(),
        vec![
            detail(inserted[2].id, "a"),
            detail(Uuid::new_v4(), "a"),
            detail(inserted[0].id, "a"),
        ],
    );

    let questions = review.questions_for_result(&result).await.unwrap();

    let ids: Vec<_> = questions.iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![inserted[2].id, inserted[0].id]);
}

#[tokio::test]
async fn review_is_scoped_to_the_result_owner() {
    let store = Arc::new(InMemoryQuestionStore::default());
    let theirs = store
        .bulk_insert("owner-2", vec![question("Q", &["a", "b"], "a", "Misc").doc()])
        .await
        .unwrap();
    let review = ReviewService::new(store);

    let result = QuizResult::new(
        OWNER.to_string(),
        "Misc".to_string(),
        vec![detail(theirs[0].id, "a")],
    );

    let questions = review.questions_for_result(&result).await.unwrap();
    assert!(questions.is_empty());
}

#[tokio::test]
async fn history_is_owner_scoped_and_newest_first() {
    let history = InMemoryHistoryStore::default();
    let attempt = |owner: &str| {
        QuizResult::new(
            owner.to_string(),
            "Misc".to_string(),
            vec![detail(Uuid::new_v4(), "a")],
        )
    };
    let first = attempt(OWNER);
    let mut second = attempt(OWNER);
    second.created_at = first.created_at + chrono::Duration::seconds(1);
    let other = attempt("owner-2");

    history.append(&first).await.unwrap();
    history.append(&second).await.unwrap();
    history.append(&other).await.unwrap();

    let listed = history.list(OWNER).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);

    assert_eq!(history.get(OWNER, first.id).await.unwrap().id, first.id);
    assert!(matches!(
        history.get(OWNER, other.id).await,
        Err(Error::NotFound(_))
    ));
}
