//! Ledger Store
//! Mission: Record every bet a user places and keep their running total exact
//!
//! The store seam owns atomicity: `append_entry` must check the game, then
//! create-or-append and bump the total, as one step per user, so concurrent bets
//! never lose an update and never land on a game deleted mid-bet.

pub mod query;

use crate::catalog::GameCatalog;
use crate::error::{LedgerError, Result};
use crate::models::{parse_id, validate_bet_amount, Ledger, LedgerEntry};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Storage seam for per-user ledgers
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append to the user's ledger, creating it if absent, and add the entry's
    /// amount to the running total. Serialized per user.
    ///
    /// Fails with `NotFound` when `entry.game_id` names no game at write time,
    /// and with `Validation` when the total would stop being finite. Either way
    /// nothing is written.
    async fn append_entry(&self, user_id: Uuid, entry: LedgerEntry) -> Result<()>;

    /// Entries in insertion order with a total consistent with them
    async fn load_ledger(&self, user_id: Uuid) -> Result<Option<Ledger>>;
}

/// A bet as received from the boundary; ids are still raw strings
#[derive(Debug, Clone)]
pub struct BetRequest {
    pub user_id: String,
    pub game_id: String,
    pub game_type: String,
    pub name: String,
    pub description: String,
    pub bet_amount: f64,
}

/// Ledger operations over injected catalog and ledger stores
#[derive(Clone)]
pub struct LedgerService {
    games: Arc<dyn GameCatalog>,
    ledgers: Arc<dyn LedgerStore>,
}

impl LedgerService {
    pub fn new(games: Arc<dyn GameCatalog>, ledgers: Arc<dyn LedgerStore>) -> Self {
        Self { games, ledgers }
    }

    /// Record one bet against an existing game.
    ///
    /// Ids are checked for well-formedness before any storage access. A missing
    /// game fails with `NotFound` and leaves the ledger untouched.
    pub async fn record_bet(&self, bet: BetRequest) -> Result<()> {
        let user_id = parse_id("user", &bet.user_id)?;
        let game_id = parse_id("game", &bet.game_id)?;
        let bet_amount = validate_bet_amount(bet.bet_amount)?;

        let entry = LedgerEntry {
            game_id,
            game_type: bet.game_type,
            name: bet.name,
            description: bet.description,
            bet_amount,
            result: None,
            status: None,
            created_at: Utc::now(),
        };
        if let Err(err) = self.ledgers.append_entry(user_id, entry).await {
            if matches!(err, LedgerError::NotFound(_)) {
                debug!(user_id = %user_id, game_id = %game_id, "Bet rejected: unknown game");
            }
            return Err(err);
        }

        info!(user_id = %user_id, game_id = %game_id, bet_amount, "💰 Bet recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, NewGame};
    use crate::models::{Game, GamePatch, Participant};
    use crate::store::MemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn setup() -> (LedgerService, Arc<MemoryStore>, Game) {
        let store = Arc::new(MemoryStore::new());
        let game = Catalog::new(store.clone())
            .create(NewGame {
                name: "Single Digit".to_string(),
                description: String::new(),
                start_time: "09:00:00 AM".to_string(),
                end_time: "09:00:00 PM".to_string(),
            })
            .await
            .unwrap();
        (LedgerService::new(store.clone(), store.clone()), store, game)
    }

    fn bet(user: Uuid, game: Uuid, amount: f64) -> BetRequest {
        BetRequest {
            user_id: user.to_string(),
            game_id: game.to_string(),
            game_type: "Single Digit".to_string(),
            name: "Single Digit".to_string(),
            description: String::new(),
            bet_amount: amount,
        }
    }

    #[tokio::test]
    async fn test_first_bet_opens_ledger() {
        let (service, store, game) = setup().await;
        let user = Uuid::new_v4();

        service.record_bet(bet(user, game.id, 50.0)).await.unwrap();

        let ledger = store.load_ledger(user).await.unwrap().unwrap();
        assert_eq!(ledger.entries.len(), 1);
        assert_eq!(ledger.total_bet_amount, 50.0);
        assert_eq!(ledger.entries[0].game_id, game.id);
        assert_eq!(ledger.entries[0].result, None);
        assert_eq!(ledger.entries[0].status, None);
    }

    #[tokio::test]
    async fn test_bets_append_in_call_order() {
        let (service, store, game) = setup().await;
        let user = Uuid::new_v4();
        let amounts = [50.0, 30.0, 12.5, 7.25, 100.0];

        for amount in amounts {
            service.record_bet(bet(user, game.id, amount)).await.unwrap();
        }

        let ledger = store.load_ledger(user).await.unwrap().unwrap();
        let recorded: Vec<f64> = ledger.entries.iter().map(|e| e.bet_amount).collect();
        assert_eq!(recorded, amounts);
        assert_eq!(ledger.total_bet_amount, amounts.iter().sum::<f64>());
    }

    #[tokio::test]
    async fn test_unknown_game_leaves_ledger_untouched() {
        let (service, store, game) = setup().await;
        let user = Uuid::new_v4();
        service.record_bet(bet(user, game.id, 10.0)).await.unwrap();

        let err = service
            .record_bet(bet(user, Uuid::new_v4(), 99.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let ledger = store.load_ledger(user).await.unwrap().unwrap();
        assert_eq!(ledger.entries.len(), 1);
        assert_eq!(ledger.total_bet_amount, 10.0);

        // A brand-new user with a bad game never gets a ledger at all
        let stranger = Uuid::new_v4();
        assert!(service.record_bet(bet(stranger, Uuid::new_v4(), 5.0)).await.is_err());
        assert!(store.load_ledger(stranger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bet_on_deleted_game_is_not_found() {
        let (service, store, game) = setup().await;
        let user = Uuid::new_v4();
        service.record_bet(bet(user, game.id, 10.0)).await.unwrap();

        assert!(store.delete_game(game.id).await.unwrap());
        let err = service.record_bet(bet(user, game.id, 10.0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert_eq!(store.load_ledger(user).await.unwrap().unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let (service, store, game) = setup().await;
        let user = Uuid::new_v4();

        for amount in [0.0, -1.0, f64::NAN] {
            let err = service.record_bet(bet(user, game.id, amount)).await.unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
        assert!(store.load_ledger(user).await.unwrap().is_none());
    }

    /// Counts every storage call and fails all of them
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn hit<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::storage("unavailable"))
        }
    }

    #[async_trait]
    impl GameCatalog for CountingStore {
        async fn insert_game(&self, _game: Game) -> Result<()> {
            self.hit()
        }
        async fn update_game(&self, _id: Uuid, _patch: GamePatch) -> Result<Option<Game>> {
            self.hit()
        }
        async fn delete_game(&self, _id: Uuid) -> Result<bool> {
            self.hit()
        }
        async fn list_games(&self) -> Result<Vec<Game>> {
            self.hit()
        }
        async fn get_game(&self, _id: Uuid) -> Result<Option<Game>> {
            self.hit()
        }
        async fn add_participant(&self, _id: Uuid, _p: Participant) -> Result<Option<Game>> {
            self.hit()
        }
        async fn get_games(&self, _ids: &[Uuid]) -> Result<HashMap<Uuid, Game>> {
            self.hit()
        }
    }

    #[async_trait]
    impl LedgerStore for CountingStore {
        async fn append_entry(&self, _user_id: Uuid, _entry: LedgerEntry) -> Result<()> {
            self.hit()
        }
        async fn load_ledger(&self, _user_id: Uuid) -> Result<Option<Ledger>> {
            self.hit()
        }
    }

    #[tokio::test]
    async fn test_malformed_ids_fail_before_storage() {
        let store = Arc::new(CountingStore::default());
        let service = LedgerService::new(store.clone(), store.clone());

        let mut request = bet(Uuid::new_v4(), Uuid::new_v4(), 10.0);
        request.user_id = "not-a-user".to_string();
        let err = service.record_bet(request).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidReference { kind: "user", .. }));

        let mut request = bet(Uuid::new_v4(), Uuid::new_v4(), 10.0);
        request.game_id = "64b7f0c2e1a2b3c4d5e6f708".to_string();
        let err = service.record_bet(request).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidReference { kind: "game", .. }));

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let store = Arc::new(CountingStore::default());
        let service = LedgerService::new(store.clone(), store.clone());

        let err = service
            .record_bet(bet(Uuid::new_v4(), Uuid::new_v4(), 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }
}
