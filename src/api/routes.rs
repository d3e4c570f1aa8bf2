use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::{admin::require_admin, error::ApiError};
use crate::{
    catalog::{Catalog, GameCatalog, GameUpdate, NewGame},
    error::LedgerError,
    ledger::{BetRequest, LedgerService, LedgerStore},
    middleware::request_logging,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub ledger: LedgerService,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        games: Arc<dyn GameCatalog>,
        ledgers: Arc<dyn LedgerStore>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            catalog: Catalog::new(games.clone()),
            ledger: LedgerService::new(games, ledgers),
            admin_token: admin_token
                .filter(|t| !t.trim().is_empty())
                .map(Arc::from),
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState, body_limit: usize) -> Router {
    let admin_routes = Router::new()
        .route("/game", post(create_game))
        .route("/game/:id", put(edit_game).delete(delete_game))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/game", get(list_games))
        .route("/game/:id", get(get_game))
        .route("/game/play/:id", post(play_game))
        .route("/game/addUserGame", post(add_user_game))
        .route("/game/getUserGame", post(get_user_game));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /game (admin)
async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<NewGame>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(input) = payload?;
    let game = state.catalog.create(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": game }))))
}

/// PUT /game/:id (admin)
async fn edit_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<GameUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(input) = payload?;
    let game = state.catalog.edit(&id, input).await?;
    Ok(Json(json!({ "success": true, "data": game })))
}

/// DELETE /game/:id (admin)
async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.catalog.delete(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Game deleted successfully" })))
}

/// GET /game
async fn list_games(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let games = state.catalog.list().await?;
    Ok(Json(json!({ "success": true, "data": games })))
}

/// GET /game/:id
async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let game = state.catalog.get_by_id(&id).await?;
    Ok(Json(json!({ "success": true, "data": game })))
}

/// POST /game/play/:id
async fn play_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let bet_amount = Amount::required(req.bet_amount)?;
    state.catalog.join(&id, &req.user_id, bet_amount).await?;
    Ok(Json(json!({ "success": true, "message": "Game played successfully" })))
}

/// POST /game/addUserGame
async fn add_user_game(
    State(state): State<AppState>,
    payload: Result<Json<AddUserGameRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let bet = BetRequest {
        bet_amount: Amount::required(req.bet_amount)?,
        user_id: req.user_id,
        game_id: req.game_id,
        game_type: req.game_type,
        name: req.name,
        description: req.description,
    };
    state.ledger.record_bet(bet).await?;
    Ok(Json(json!({ "success": true, "message": "Bet recorded successfully" })))
}

/// POST /game/getUserGame
async fn get_user_game(
    State(state): State<AppState>,
    payload: Result<Json<UserGameQuery>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let view = state.ledger.get_ledger(&req.user_id).await?;
    Ok(Json(json!({ "success": true, "data": view })))
}

// ===== Request/Response Types =====

/// Clients send amounts either as JSON numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn required(amount: Option<Amount>) -> Result<f64, LedgerError> {
        match amount {
            Some(Amount::Number(n)) => Ok(n),
            Some(Amount::Text(raw)) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| LedgerError::validation(format!("betAmount is not a number: {:?}", raw))),
            None => Err(LedgerError::validation("betAmount is required")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayRequest {
    #[serde(default)]
    user_id: String,
    bet_amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddUserGameRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    game_id: String,
    #[serde(default)]
    game_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    bet_amount: Option<Amount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserGameQuery {
    #[serde(default)]
    user_id: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
