//! Bet Ledger Backend Library
//!
//! Administrators define games; users place bets against them and accrue a
//! per-user ledger with an exact running total. Storage is injected through
//! the `GameCatalog` and `LedgerStore` seams.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod store;

pub use api::{create_router, AppState};
pub use catalog::{Catalog, GameCatalog};
pub use error::LedgerError;
pub use ledger::{BetRequest, LedgerService, LedgerStore};
