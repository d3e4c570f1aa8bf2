//! Ledger Query
//! Mission: Hand out a user's ledger with every game reference resolved
//!
//! Games are joined at read time, so edits show up on historical bets. A game
//! deleted after the bet resolves to `game: None`; the entry keeps its `gameId`.

use super::LedgerService;
use crate::error::{LedgerError, Result};
use crate::models::{parse_id, LedgerView, ResolvedEntry};
use tracing::debug;
use uuid::Uuid;

impl LedgerService {
    pub async fn get_ledger(&self, user_id: &str) -> Result<LedgerView> {
        let user_id = parse_id("user", user_id)?;

        let ledger = self
            .ledgers
            .load_ledger(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Ledger"))?;

        let ids: Vec<Uuid> = ledger.entries.iter().map(|e| e.game_id).collect();
        let games = self.games.get_games(&ids).await?;

        let resolved: Vec<ResolvedEntry> = ledger
            .entries
            .into_iter()
            .map(|entry| ResolvedEntry {
                game: games.get(&entry.game_id).cloned(),
                game_id: entry.game_id,
                game_type: entry.game_type,
                name: entry.name,
                description: entry.description,
                bet_amount: entry.bet_amount,
                result: entry.result,
                status: entry.status,
                created_at: entry.created_at,
            })
            .collect();

        let dangling = resolved.iter().filter(|e| e.game.is_none()).count();
        if dangling > 0 {
            debug!(user_id = %user_id, dangling, "Ledger references deleted games");
        }

        Ok(LedgerView {
            user_id,
            total_bet_amount: ledger.total_bet_amount,
            created_at: ledger.created_at,
            games: resolved,
        })
    }
}
