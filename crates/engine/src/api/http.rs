//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::{delete, get, post},
    Form, Json, Router,
};
use std::sync::Arc;

use faramita_shared::{
    ActiveCharacterDto, ChapterSummaryDto, ChatRequest, ChatResponse, ErrorResponse,
    HistoryEntryDto, PendingCheckDto, RollOutcomeDto, RollRequest, RollResultDto, WorldSummaryDto,
};

use super::page::render_chat_page;
use crate::app::App;
use crate::use_cases::RollOutcome;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(chat_page).post(submit_message))
        .route("/clear", post(clear_from_page))
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/history", get(history).delete(clear_history))
        .route("/api/history/{turn}", delete(rollback_history))
        .route("/api/roll", post(roll))
        .route("/api/world", get(world_summary))
        .fallback(not_found)
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

// =============================================================================
// Page
// =============================================================================

async fn chat_page(State(app): State<Arc<App>>) -> Html<String> {
    let (name, description) = app
        .world
        .read(|world| (world.meta().name.clone(), world.meta().description.clone()))
        .await;
    let transcript = app.use_cases.chat.transcript().await;
    let pending = app.use_cases.chat.pending_check().await;
    Html(render_chat_page(
        &name,
        &description,
        &transcript,
        pending.as_ref(),
    ))
}

async fn submit_message(
    State(app): State<Arc<App>>,
    Form(form): Form<ChatRequest>,
) -> Redirect {
    app.use_cases.chat.handle_message(&form.message).await;
    Redirect::to("/")
}

async fn clear_from_page(State(app): State<Arc<App>>) -> Redirect {
    app.use_cases.chat.clear().await;
    Redirect::to("/")
}

// =============================================================================
// Chat
// =============================================================================

fn roll_outcome_dto(outcome: &RollOutcome) -> RollOutcomeDto {
    match &outcome.result {
        Ok(result) => RollOutcomeDto {
            source: outcome.source.clone(),
            result: Some(RollResultDto::from(result)),
            error: None,
        },
        Err(e) => RollOutcomeDto {
            source: outcome.source.clone(),
            result: None,
            error: Some(e.to_string()),
        },
    }
}

async fn chat(
    State(app): State<Arc<App>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    let reply = app.use_cases.chat.handle_message(&request.message).await;
    Ok(Json(ChatResponse {
        reply: reply.text,
        rolls: reply.rolls.iter().map(roll_outcome_dto).collect(),
        notifications: reply.notifications,
    }))
}

async fn history(State(app): State<Arc<App>>) -> Json<Vec<HistoryEntryDto>> {
    let entries = app.use_cases.chat.history().await;
    Json(entries.iter().map(HistoryEntryDto::from).collect())
}

async fn clear_history(State(app): State<Arc<App>>) -> StatusCode {
    app.use_cases.chat.clear().await;
    StatusCode::NO_CONTENT
}

async fn rollback_history(State(app): State<Arc<App>>, Path(turn): Path<u32>) -> StatusCode {
    app.use_cases.chat.rollback(turn).await;
    StatusCode::NO_CONTENT
}

async fn roll(
    State(app): State<Arc<App>>,
    Json(request): Json<RollRequest>,
) -> Result<Json<RollResultDto>, ApiError> {
    let result = app
        .use_cases
        .dice
        .roll(&request.formula)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(RollResultDto::from(&result)))
}

// =============================================================================
// World
// =============================================================================

async fn world_summary(State(app): State<Arc<App>>) -> Json<WorldSummaryDto> {
    let pending_check = app
        .use_cases
        .chat
        .pending_check()
        .await
        .as_ref()
        .map(PendingCheckDto::from);

    let summary = app
        .world
        .read(|world| WorldSummaryDto {
            name: world.meta().name.clone(),
            description: world.meta().description.clone(),
            active_chapter: world.active_chapter().map(|chapter| ChapterSummaryDto {
                id: chapter.id.to_string(),
                title: chapter.title.clone(),
                objective: chapter.objective.clone(),
            }),
            active_characters: world
                .active_characters()
                .into_iter()
                .map(|character| ActiveCharacterDto {
                    id: character.id.to_string(),
                    name: character.name.clone(),
                    title: world.character_title(character),
                    level: character.level,
                })
                .collect(),
            pending_check,
        })
        .await;
    Json(summary)
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
