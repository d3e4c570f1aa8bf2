//! Domain Models
//! Mission: Games, ledgers and the resolved views the API hands out

use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Administrator-defined betting event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user who joined a game through the play route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: Uuid,
    pub bet_amount: f64,
    pub joined_at: DateTime<Utc>,
}

/// Validated input for a new game (times already converted)
#[derive(Debug, Clone)]
pub struct GameDraft {
    pub name: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl GameDraft {
    pub fn into_game(self) -> Game {
        let now = Utc::now();
        Game {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            participants: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial edit of a game; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct GamePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl GamePatch {
    /// Apply the patch and re-check the game's window. On error `game` is
    /// left exactly as it was.
    pub fn apply(&self, game: &mut Game) -> Result<()> {
        let mut patched = game.clone();
        if let Some(name) = &self.name {
            patched.name = name.clone();
        }
        if let Some(description) = &self.description {
            patched.description = description.clone();
        }
        if let Some(start) = self.start_time {
            patched.start_time = start;
        }
        if let Some(end) = self.end_time {
            patched.end_time = end;
        }
        validate_game_fields(&patched.name, patched.start_time, patched.end_time)?;
        patched.updated_at = Utc::now();
        *game = patched;
        Ok(())
    }
}

/// One bet placed by a user against one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub game_id: Uuid,
    pub game_type: String, // e.g. "Single Digit", "Panna"
    pub name: String,
    pub description: String,
    pub bet_amount: f64,
    pub result: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-user aggregate of bets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub user_id: Uuid,
    pub entries: Vec<LedgerEntry>,
    pub total_bet_amount: f64, // running sum, added on each append
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ledger {
    /// A fresh ledger holding its first entry
    pub fn open(user_id: Uuid, first: LedgerEntry) -> Self {
        let now = first.created_at;
        Self {
            user_id,
            total_bet_amount: first.bet_amount,
            entries: vec![first],
            created_at: now,
            updated_at: now,
        }
    }

    /// Append and add to the running total. Rejected, with nothing changed,
    /// when the new total would overflow.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<()> {
        self.total_bet_amount = next_total(Some(self.total_bet_amount), entry.bet_amount)?;
        self.updated_at = entry.created_at;
        self.entries.push(entry);
        Ok(())
    }
}

/// Ledger entry with its game reference resolved at read time.
/// `game` is `None` when the game was deleted after the bet was placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEntry {
    pub game_id: Uuid,
    pub game: Option<Game>,
    pub game_type: String,
    pub name: String,
    pub description: String,
    pub bet_amount: f64,
    pub result: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Expanded ledger returned by the query side
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub user_id: Uuid,
    pub total_bet_amount: f64,
    pub created_at: DateTime<Utc>,
    pub games: Vec<ResolvedEntry>,
}

/// Parse an opaque identity string into an id
pub fn parse_id(kind: &'static str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| LedgerError::invalid_reference(kind, raw))
}

/// Bet amounts must be finite and strictly positive
pub fn validate_bet_amount(amount: f64) -> Result<f64> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(LedgerError::validation(format!(
            "betAmount must be a positive number, got {}",
            amount
        )));
    }
    Ok(amount)
}

/// Running total after adding `amount`; `None` means the ledger does not exist yet
pub fn next_total(current: Option<f64>, amount: f64) -> Result<f64> {
    let total = current.map_or(amount, |t| t + amount);
    if !total.is_finite() {
        return Err(LedgerError::validation(
            "betAmount would overflow the ledger's running total",
        ));
    }
    Ok(total)
}

pub fn validate_game_fields(
    name: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("name must not be empty"));
    }
    if end_time < start_time {
        return Err(LedgerError::validation("endTime must not be before startTime"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(amount: f64) -> LedgerEntry {
        LedgerEntry {
            game_id: Uuid::new_v4(),
            game_type: "Single Digit".to_string(),
            name: "Single Digit".to_string(),
            description: String::new(),
            bet_amount: amount,
            result: None,
            status: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ledger_total_tracks_appends() {
        let user = Uuid::new_v4();
        let mut ledger = Ledger::open(user, entry(50.0));
        ledger.append(entry(30.0)).unwrap();
        ledger.append(entry(2.5)).unwrap();

        assert_eq!(ledger.entries.len(), 3);
        assert_eq!(ledger.total_bet_amount, 82.5);
        let sum: f64 = ledger.entries.iter().map(|e| e.bet_amount).sum();
        assert_eq!(ledger.total_bet_amount, sum);
    }

    #[test]
    fn test_append_rejects_overflowing_total() {
        let mut ledger = Ledger::open(Uuid::new_v4(), entry(1e308));
        let err = ledger.append(entry(1e308)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger.entries.len(), 1);
        assert_eq!(ledger.total_bet_amount, 1e308);

        assert_eq!(next_total(None, 5.0).unwrap(), 5.0);
        assert_eq!(next_total(Some(5.0), 2.5).unwrap(), 7.5);
        assert!(next_total(Some(f64::MAX), f64::MAX).is_err());
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("user", &id.to_string()).unwrap(), id);

        let err = parse_id("user", "64b7f0c2e1").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidReference { kind: "user", .. }));
    }

    #[test]
    fn test_bet_amount_validation() {
        assert!(validate_bet_amount(10.0).is_ok());
        assert!(validate_bet_amount(0.0).is_err());
        assert!(validate_bet_amount(-5.0).is_err());
        assert!(validate_bet_amount(f64::NAN).is_err());
        assert!(validate_bet_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn test_patch_rejects_inverted_window() {
        let now = Utc::now();
        let mut game = GameDraft {
            name: "Panna".to_string(),
            description: String::new(),
            start_time: now,
            end_time: now + Duration::hours(1),
        }
        .into_game();

        let patch = GamePatch {
            end_time: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        let before = game.clone();
        assert!(matches!(patch.apply(&mut game), Err(LedgerError::Validation(_))));
        assert_eq!(game, before);

        let patch = GamePatch {
            name: Some("Jodi".to_string()),
            ..Default::default()
        };
        patch.apply(&mut game).unwrap();
        assert_eq!(game.name, "Jodi");
    }

    #[test]
    fn test_game_serializes_camel_case() {
        let now = Utc::now();
        let game = GameDraft {
            name: "Single Digit".to_string(),
            description: "pick one".to_string(),
            start_time: now,
            end_time: now,
        }
        .into_game();

        let json = serde_json::to_value(&game).unwrap();
        assert!(json.get("startTime").is_some());
        assert!(json.get("endTime").is_some());
        assert!(json.get("participants").unwrap().as_array().unwrap().is_empty());
    }
}
