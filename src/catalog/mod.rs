//! Game Catalog
//! Mission: Store administrator-defined games and their active windows

pub mod clock;

use crate::error::{LedgerError, Result};
use crate::models::{
    parse_id, validate_bet_amount, validate_game_fields, Game, GameDraft, GamePatch, Participant,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub use clock::{clock_to_instant, parse_time_input};

/// Storage seam for games
#[async_trait]
pub trait GameCatalog: Send + Sync {
    async fn insert_game(&self, game: Game) -> Result<()>;

    /// Returns `None` when no game has this id
    async fn update_game(&self, id: Uuid, patch: GamePatch) -> Result<Option<Game>>;

    /// Returns `false` when no game has this id
    async fn delete_game(&self, id: Uuid) -> Result<bool>;

    async fn list_games(&self) -> Result<Vec<Game>>;

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>>;

    async fn add_participant(&self, id: Uuid, participant: Participant) -> Result<Option<Game>>;

    /// Batch lookup; ids with no game are simply absent from the map
    async fn get_games(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Game>> {
        let mut out = HashMap::with_capacity(ids.len());
        for id in ids {
            if out.contains_key(id) {
                continue;
            }
            if let Some(game) = self.get_game(*id).await? {
                out.insert(*id, game);
            }
        }
        Ok(out)
    }
}

/// Create request; times are clock strings or RFC 3339
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_time: String,
    pub end_time: String,
}

/// Partial edit request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Catalog operations over an injected store
#[derive(Clone)]
pub struct Catalog {
    games: Arc<dyn GameCatalog>,
}

impl Catalog {
    pub fn new(games: Arc<dyn GameCatalog>) -> Self {
        Self { games }
    }

    pub async fn create(&self, input: NewGame) -> Result<Game> {
        let now = Utc::now();
        let draft = GameDraft {
            name: input.name.trim().to_string(),
            description: input.description,
            start_time: parse_time_input(&input.start_time, now)?,
            end_time: parse_time_input(&input.end_time, now)?,
        };
        validate_game_fields(&draft.name, draft.start_time, draft.end_time)?;

        let game = draft.into_game();
        self.games.insert_game(game.clone()).await?;

        info!(game_id = %game.id, name = %game.name, "🎲 Game created");
        Ok(game)
    }

    pub async fn edit(&self, id: &str, input: GameUpdate) -> Result<Game> {
        let id = parse_id("game", id)?;
        let now = Utc::now();
        let patch = GamePatch {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            start_time: input
                .start_time
                .map(|t| parse_time_input(&t, now))
                .transpose()?,
            end_time: input
                .end_time
                .map(|t| parse_time_input(&t, now))
                .transpose()?,
        };

        let game = self
            .games
            .update_game(id, patch)
            .await?
            .ok_or_else(|| LedgerError::not_found("Game"))?;

        info!(game_id = %game.id, "✏️  Game updated");
        Ok(game)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_id("game", id)?;
        if !self.games.delete_game(id).await? {
            return Err(LedgerError::not_found("Game"));
        }
        info!(game_id = %id, "🗑️  Game deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Game>> {
        self.games.list_games().await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Game> {
        let id = parse_id("game", id)?;
        self.games
            .get_game(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Game"))
    }

    /// Record a user's participation on the game itself
    pub async fn join(&self, game_id: &str, user_id: &str, bet_amount: f64) -> Result<Game> {
        let game_id = parse_id("game", game_id)?;
        let user_id = parse_id("user", user_id)?;
        let bet_amount = validate_bet_amount(bet_amount)?;

        let participant = Participant {
            user_id,
            bet_amount,
            joined_at: Utc::now(),
        };
        let game = self
            .games
            .add_participant(game_id, participant)
            .await?
            .ok_or_else(|| LedgerError::not_found("Game"))?;

        info!(game_id = %game_id, user_id = %user_id, bet_amount, "🎯 Player joined game");
        Ok(game)
    }
}
