pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    generation_service::OpenAiGenerator,
    history_service::{HistoryService, HistoryStore},
    identity_service::{ArtifactCache, HttpIdentityProvider, IdentityReconciler},
    import_service::ImportService,
    question_service::{QuestionService, QuestionStore},
    review_service::ReviewService,
    session_service::SessionManager,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub question_store: Arc<dyn QuestionStore>,
    pub history_store: Arc<dyn HistoryStore>,
    pub artifacts: Arc<ArtifactCache>,
    pub reconciler: Arc<IdentityReconciler>,
    pub sessions: Arc<SessionManager>,
    pub importer: Arc<ImportService>,
    pub review: Arc<ReviewService>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();

        let question_store: Arc<dyn QuestionStore> =
            Arc::new(QuestionService::new(pool.clone()));
        let history_store: Arc<dyn HistoryStore> = Arc::new(HistoryService::new(pool.clone()));

        let artifacts = Arc::new(ArtifactCache::default());
        let provider = Arc::new(HttpIdentityProvider::new(
            http_client.clone(),
            config.auth_broker_url.clone(),
            config.app_origin.clone(),
        ));
        let reconciler = Arc::new(IdentityReconciler::new(provider, Arc::clone(&artifacts)));

        let generator = Arc::new(OpenAiGenerator::new(
            config.openai_api_key.clone(),
            http_client,
        ));
        let importer = Arc::new(ImportService::new(generator, Arc::clone(&question_store)));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&question_store),
            Arc::clone(&history_store),
        ));
        let review = Arc::new(ReviewService::new(Arc::clone(&question_store)));

        Self {
            pool,
            question_store,
            history_store,
            artifacts,
            reconciler,
            sessions,
            importer,
            review,
        }
    }
}
