use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use partybox::{api, config::ServerConfig, content::Content, state::AppState, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "partybox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting partybox...");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let content = match Content::load(&config.content_dir) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("Failed to load content: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Content loaded: {} questions, {} topic pairs, {} sekai prompts, {} sekai words, {} ito topics",
        content.questions.len(),
        content.word_wolf_topics.len(),
        content.sekai_questions.len(),
        content.sekai_words.len(),
        content.ito_topics.len()
    );

    let state = match config.rng_seed {
        Some(seed) => AppState::with_seed(content, seed),
        None => AppState::new(content),
    }
    .with_operator_http_views(config.operator_http_views);
    if config.operator_http_views {
        tracing::warn!("OPERATOR_HTTP_VIEWS set, /api/rooms/{{id}}/view serves host projections");
    }

    let app = Router::new()
        .route("/ws/{room_id}/{client_id}", get(ws::ws_handler))
        .route("/api/rooms", get(api::list_rooms))
        .route("/api/rooms/{room_id}/view", get(api::room_view))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", config.bind_addr);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
