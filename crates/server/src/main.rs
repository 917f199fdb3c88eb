use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use server_api::ApiContext;
use shared::{
    domain::{Card, CardId, Deck, DeckId},
    error::{ApiError, ErrorCode},
    protocol::{CardDraft, DeckDraft},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_database_url};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type HttpResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/decks", get(http_list_decks).post(http_create_deck))
        .route(
            "/decks/:deck_id",
            get(http_read_deck)
                .put(http_update_deck)
                .delete(http_delete_deck),
        )
        .route("/decks/:deck_id/cards", post(http_create_card))
        .route(
            "/cards/:card_id",
            get(http_read_card)
                .put(http_update_card)
                .delete(http_delete_card),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.api.storage.health_check().await.map_err(|error| {
        error!(%error, "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_list_decks(State(state): State<Arc<AppState>>) -> HttpResult<Json<Vec<Deck>>> {
    server_api::list_decks(&state.api)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_create_deck(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<DeckDraft>,
) -> HttpResult<(StatusCode, Json<Deck>)> {
    let deck = server_api::create_deck(&state.api, draft)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(deck)))
}

async fn http_read_deck(
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<i64>,
) -> HttpResult<Json<Deck>> {
    server_api::read_deck(&state.api, DeckId(deck_id))
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_update_deck(
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<i64>,
    Json(deck): Json<Deck>,
) -> HttpResult<Json<Deck>> {
    server_api::update_deck(&state.api, DeckId(deck_id), deck)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_delete_deck(
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<i64>,
) -> HttpResult<StatusCode> {
    server_api::delete_deck(&state.api, DeckId(deck_id))
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_create_card(
    State(state): State<Arc<AppState>>,
    Path(deck_id): Path<i64>,
    Json(draft): Json<CardDraft>,
) -> HttpResult<(StatusCode, Json<Card>)> {
    let card = server_api::create_card(&state.api, DeckId(deck_id), draft)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(card)))
}

async fn http_read_card(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
) -> HttpResult<Json<Card>> {
    server_api::read_card(&state.api, CardId(card_id))
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_update_card(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
    Json(card): Json<Card>,
) -> HttpResult<Json<Card>> {
    server_api::update_card(&state.api, CardId(card_id), card)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_delete_card(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
) -> HttpResult<StatusCode> {
    server_api::delete_card(&state.api, CardId(card_id))
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    }
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
