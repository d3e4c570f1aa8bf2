//! SQLite store
//! Mission: Durable games and ledgers with atomic upsert-and-increment bets
//!
//! Every call opens its own connection on the blocking pool. WAL keeps readers
//! off the writers' path; each bet is one IMMEDIATE transaction that checks the
//! game still exists, upserts the ledger row with its new total and inserts the
//! entry together.

use crate::catalog::GameCatalog;
use crate::error::{LedgerError, Result};
use crate::ledger::LedgerStore;
use crate::models::{next_total, Game, GamePatch, Ledger, LedgerEntry, Participant};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const GAME_COLUMNS: &str = "id, name, description, start_time, end_time, created_at, updated_at";

/// SQLite-backed catalog and ledger store
#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<str>,
}

impl SqliteStore {
    /// Open (or create) the database and initialize the schema
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: Arc::from(db_path),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS game_participants (
                game_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                bet_amount REAL NOT NULL,
                joined_at TEXT NOT NULL,
                PRIMARY KEY (game_id, seq)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ledgers (
                user_id TEXT PRIMARY KEY,
                total_bet_amount REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // No foreign key to games: entries outlive deleted games
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ledger_entries (
                user_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                game_id TEXT NOT NULL,
                game_type TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                bet_amount REAL NOT NULL,
                result TEXT,
                status TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, seq),
                FOREIGN KEY (user_id) REFERENCES ledgers(user_id)
            )",
            [],
        )?;

        info!("📒 Ledger database ready at: {}", self.db_path);
        Ok(())
    }

    /// Run `f` against a fresh connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open_connection(&path)?;
            f(&mut conn)
        })
        .await?
    }
}

fn open_connection(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn uuid_col(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn game_from_row(row: &Row) -> rusqlite::Result<Game> {
    Ok(Game {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        start_time: time_col(row, 3)?,
        end_time: time_col(row, 4)?,
        participants: Vec::new(),
        created_at: time_col(row, 5)?,
        updated_at: time_col(row, 6)?,
    })
}

fn participants_of(conn: &Connection, game_id: &str) -> rusqlite::Result<Vec<Participant>> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id, bet_amount, joined_at FROM game_participants
         WHERE game_id = ?1 ORDER BY seq ASC",
    )?;
    let rows = stmt.query_map(params![game_id], |row| {
        Ok(Participant {
            user_id: uuid_col(row, 0)?,
            bet_amount: row.get(1)?,
            joined_at: time_col(row, 2)?,
        })
    })?;
    let participants = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(participants)
}

fn load_game(conn: &Connection, id: &Uuid) -> rusqlite::Result<Option<Game>> {
    let id = id.to_string();
    let game = conn
        .query_row(
            &format!("SELECT {} FROM games WHERE id = ?1", GAME_COLUMNS),
            params![id],
            game_from_row,
        )
        .optional()?;

    match game {
        Some(mut game) => {
            game.participants = participants_of(conn, &id)?;
            Ok(Some(game))
        }
        None => Ok(None),
    }
}

fn game_exists(conn: &Connection, game_id: &str) -> rusqlite::Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM games WHERE id = ?1", params![game_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn write_game(conn: &Connection, game: &Game) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO games (id, name, description, start_time, end_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            updated_at = excluded.updated_at",
        params![
            game.id.to_string(),
            game.name,
            game.description,
            game.start_time.to_rfc3339(),
            game.end_time.to_rfc3339(),
            game.created_at.to_rfc3339(),
            game.updated_at.to_rfc3339(),
        ],
    )
}

#[async_trait]
impl GameCatalog for SqliteStore {
    async fn insert_game(&self, game: Game) -> Result<()> {
        self.with_conn(move |conn| {
            write_game(conn, &game)?;
            Ok(())
        })
        .await
    }

    async fn update_game(&self, id: Uuid, patch: GamePatch) -> Result<Option<Game>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut game) = load_game(&tx, &id)? else {
                return Ok(None);
            };
            patch.apply(&mut game)?;
            write_game(&tx, &game)?;
            tx.commit()?;
            Ok(Some(game))
        })
        .await
    }

    async fn delete_game(&self, id: Uuid) -> Result<bool> {
        self.with_conn(move |conn| {
            let id = id.to_string();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM game_participants WHERE game_id = ?1", params![id])?;
            let removed = tx.execute("DELETE FROM games WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_games(&self) -> Result<Vec<Game>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut games = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {} FROM games ORDER BY rowid ASC",
                    GAME_COLUMNS
                ))?;
                let rows = stmt.query_map([], game_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            for game in games.iter_mut() {
                game.participants = participants_of(&tx, &game.id.to_string())?;
            }
            tx.commit()?;
            Ok(games)
        })
        .await
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>> {
        self.with_conn(move |conn| Ok(load_game(conn, &id)?)).await
    }

    async fn add_participant(&self, id: Uuid, participant: Participant) -> Result<Option<Game>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let game_id = id.to_string();
            if !game_exists(&tx, &game_id)? {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO game_participants (game_id, seq, user_id, bet_amount, joined_at)
                 VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM game_participants WHERE game_id = ?1), ?2, ?3, ?4)",
                params![
                    game_id,
                    participant.user_id.to_string(),
                    participant.bet_amount,
                    participant.joined_at.to_rfc3339(),
                ],
            )?;
            let game = load_game(&tx, &id)?;
            tx.commit()?;
            Ok(game)
        })
        .await
    }

    async fn get_games(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Game>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut out = HashMap::with_capacity(ids.len());
            for id in ids {
                if out.contains_key(&id) {
                    continue;
                }
                if let Some(game) = load_game(&tx, &id)? {
                    out.insert(id, game);
                }
            }
            tx.commit()?;
            Ok(out)
        })
        .await
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn append_entry(&self, user_id: Uuid, entry: LedgerEntry) -> Result<()> {
        self.with_conn(move |conn| {
            let user_id = user_id.to_string();
            let created_at = entry.created_at.to_rfc3339();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !game_exists(&tx, &entry.game_id.to_string())? {
                return Err(LedgerError::not_found("Game"));
            }

            let current: Option<f64> = tx
                .query_row(
                    "SELECT total_bet_amount FROM ledgers WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()?;
            let total = next_total(current, entry.bet_amount)?;

            tx.execute(
                "INSERT INTO ledgers (user_id, total_bet_amount, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    total_bet_amount = excluded.total_bet_amount,
                    updated_at = excluded.updated_at",
                params![user_id, total, created_at],
            )?;

            tx.execute(
                "INSERT INTO ledger_entries (user_id, seq, game_id, game_type, name, description,
                    bet_amount, result, status, created_at)
                 VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM ledger_entries WHERE user_id = ?1),
                    ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user_id,
                    entry.game_id.to_string(),
                    entry.game_type,
                    entry.name,
                    entry.description,
                    entry.bet_amount,
                    entry.result,
                    entry.status,
                    created_at,
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_ledger(&self, user_id: Uuid) -> Result<Option<Ledger>> {
        self.with_conn(move |conn| {
            let key = user_id.to_string();
            // One read transaction: header and entries come from the same snapshot
            let tx = conn.transaction()?;

            let header = tx
                .query_row(
                    "SELECT total_bet_amount, created_at, updated_at FROM ledgers WHERE user_id = ?1",
                    params![key],
                    |row| Ok((row.get::<_, f64>(0)?, time_col(row, 1)?, time_col(row, 2)?)),
                )
                .optional()?;
            let Some((total_bet_amount, created_at, updated_at)) = header else {
                return Ok(None);
            };

            let entries = {
                let mut stmt = tx.prepare_cached(
                    "SELECT game_id, game_type, name, description, bet_amount, result, status, created_at
                     FROM ledger_entries WHERE user_id = ?1 ORDER BY seq ASC",
                )?;
                let rows = stmt.query_map(params![key], |row| {
                    Ok(LedgerEntry {
                        game_id: uuid_col(row, 0)?,
                        game_type: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get(3)?,
                        bet_amount: row.get(4)?,
                        result: row.get(5)?,
                        status: row.get(6)?,
                        created_at: time_col(row, 7)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.commit()?;

            Ok(Some(Ledger {
                user_id,
                entries,
                total_bet_amount,
                created_at,
                updated_at,
            }))
        })
        .await
    }
}
