use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use quizcraft_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // The reconciler is the only component acting on provider pushes.
    let _push_listener = app_state.reconciler.clone().listen_for_pushes();

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let api = Router::new()
        .route("/api/auth/guest", post(routes::auth::continue_as_guest))
        .route("/api/auth/signin", post(routes::auth::sign_in))
        .route("/api/auth/signout", post(routes::auth::sign_out))
        .route("/api/auth/me", get(routes::auth::me))
        .route(
            "/api/questions",
            get(routes::questions::list_questions),
        )
        .route(
            "/api/questions/generate",
            post(routes::questions::generate_questions),
        )
        .route(
            "/api/questions/generate-file",
            post(routes::questions::generate_questions_from_file),
        )
        .route(
            "/api/questions/:id/bookmark",
            post(routes::questions::toggle_bookmark),
        )
        .route("/api/quiz/start", post(routes::session::start_quiz))
        .route(
            "/api/quiz/:id",
            get(routes::session::get_quiz).delete(routes::session::exit_quiz),
        )
        .route("/api/quiz/:id/answer", patch(routes::session::save_answer))
        .route("/api/quiz/:id/navigate", post(routes::session::navigate))
        .route(
            "/api/quiz/:id/bookmark",
            post(routes::session::toggle_bookmark),
        )
        .route("/api/quiz/:id/submit", post(routes::session::submit_quiz))
        .route("/api/history", get(routes::history::list_history))
        .route(
            "/api/history/:id/review",
            get(routes::history::review_result),
        )
        .layer(axum::middleware::from_fn_with_state(
            quizcraft_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            quizcraft_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
