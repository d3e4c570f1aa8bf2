//! In-memory store
//!
//! Games sit behind one `RwLock`. Each ledger has its own `Mutex`, so bets for
//! different users only share the brief map lookup. Lock order is games, then
//! the ledger map, then a single ledger.

use crate::catalog::GameCatalog;
use crate::error::{LedgerError, Result};
use crate::ledger::LedgerStore;
use crate::models::{Game, GamePatch, Ledger, LedgerEntry, Participant};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{hash_map::Entry, HashMap};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    games: RwLock<Vec<Game>>, // insertion order
    ledgers: RwLock<HashMap<Uuid, Arc<Mutex<Ledger>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger_slot(&self, user_id: &Uuid) -> Option<Arc<Mutex<Ledger>>> {
        self.ledgers.read().get(user_id).cloned()
    }
}

#[async_trait]
impl GameCatalog for MemoryStore {
    async fn insert_game(&self, game: Game) -> Result<()> {
        self.games.write().push(game);
        Ok(())
    }

    async fn update_game(&self, id: Uuid, patch: GamePatch) -> Result<Option<Game>> {
        let mut games = self.games.write();
        let Some(slot) = games.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };

        let mut updated = slot.clone();
        patch.apply(&mut updated)?;
        *slot = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_game(&self, id: Uuid) -> Result<bool> {
        let mut games = self.games.write();
        let before = games.len();
        games.retain(|g| g.id != id);
        Ok(games.len() != before)
    }

    async fn list_games(&self) -> Result<Vec<Game>> {
        Ok(self.games.read().clone())
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>> {
        Ok(self.games.read().iter().find(|g| g.id == id).cloned())
    }

    async fn add_participant(&self, id: Uuid, participant: Participant) -> Result<Option<Game>> {
        let mut games = self.games.write();
        Ok(games.iter_mut().find(|g| g.id == id).map(|game| {
            game.participants.push(participant);
            game.clone()
        }))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append_entry(&self, user_id: Uuid, entry: LedgerEntry) -> Result<()> {
        // Held until the entry lands so a delete cannot race the existence check
        let games = self.games.read();
        if !games.iter().any(|g| g.id == entry.game_id) {
            return Err(LedgerError::not_found("Game"));
        }

        if let Some(slot) = self.ledger_slot(&user_id) {
            return slot.lock().append(entry);
        }

        // Re-check under the write lock: another bet may have opened it meanwhile
        let result = match self.ledgers.write().entry(user_id) {
            Entry::Occupied(slot) => slot.get().lock().append(entry),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Ledger::open(user_id, entry))));
                Ok(())
            }
        };
        drop(games);
        result
    }

    async fn load_ledger(&self, user_id: Uuid) -> Result<Option<Ledger>> {
        Ok(self.ledger_slot(&user_id).map(|slot| slot.lock().clone()))
    }
}
