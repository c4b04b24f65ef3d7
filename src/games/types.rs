use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Slots,
    Crash,
    Mines,
    Blackjack,
}

impl GameType {
    pub const ALL: [GameType; 4] = [
        GameType::Slots,
        GameType::Crash,
        GameType::Mines,
        GameType::Blackjack,
    ];

    /// Relay endpoint that forwards wagers for this game
    pub fn relay_path(&self) -> &'static str {
        match self {
            GameType::Slots => "/api/spin-slots",
            GameType::Crash => "/api/play-crash",
            GameType::Mines => "/api/play-mines",
            GameType::Blackjack => "/api/play-blackjack",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Slots => write!(f, "slots"),
            GameType::Crash => write!(f, "crash"),
            GameType::Mines => write!(f, "mines"),
            GameType::Blackjack => write!(f, "blackjack"),
        }
    }
}

/// Round outcome as seen by the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
    Push,
    /// Round abandoned before resolution, wager refunded
    Refunded,
}

/// Minimum and maximum wager accepted by a table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TableLimits {
    pub min_bet: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bet: Option<f64>,
}

impl TableLimits {
    pub fn new(min_bet: f64, max_bet: Option<f64>) -> Self {
        Self { min_bet, max_bet }
    }

    /// Any strictly positive wager
    pub fn open() -> Self {
        Self {
            min_bet: 0.0,
            max_bet: None,
        }
    }

    /// Reject non-positive, non-finite or out-of-range wagers.
    pub fn check(&self, amount: f64) -> Result<(), String> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(format!("wager must be a positive amount, got {}", amount));
        }
        if amount < self.min_bet {
            return Err(format!("wager {:.2} is below the table minimum {:.2}", amount, self.min_bet));
        }
        if let Some(max) = self.max_bet {
            if amount > max {
                return Err(format!("wager {:.2} is above the table maximum {:.2}", amount, max));
            }
        }
        Ok(())
    }
}

impl Default for TableLimits {
    fn default() -> Self {
        Self::open()
    }
}

/// Summary of a finished round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_id: Uuid,
    pub game: GameType,
    pub wager: f64,
    pub payout: f64,
    pub multiplier: f64,
    pub outcome: GameOutcome,
    pub finished_at: DateTime<Utc>,
}

impl RoundSummary {
    pub fn new(game: GameType, wager: f64, payout: f64, multiplier: f64, outcome: GameOutcome) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            game,
            wager,
            payout,
            multiplier,
            outcome,
            finished_at: Utc::now(),
        }
    }

    /// Net effect of the round on the balance
    pub fn profit(&self) -> f64 {
        self.payout - self.wager
    }
}

/// Round to two decimals, the precision every displayed multiplier and payout uses.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_reject_non_positive() {
        let limits = TableLimits::open();
        assert!(limits.check(0.0).is_err());
        assert!(limits.check(-1.0).is_err());
        assert!(limits.check(f64::NAN).is_err());
        assert!(limits.check(0.01).is_ok());
    }

    #[test]
    fn test_limits_bounds() {
        let limits = TableLimits::new(1.0, Some(100.0));
        assert!(limits.check(0.5).is_err());
        assert!(limits.check(100.5).is_err());
        assert!(limits.check(1.0).is_ok());
        assert!(limits.check(100.0).is_ok());
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(1.0606), 1.06);
        assert_eq!(round_cents(1.1206), 1.12);
        assert_eq!(round_cents(2.0), 2.0);
    }

    #[test]
    fn test_game_type_display_matches_serde() {
        for game in GameType::ALL {
            let json = serde_json::to_string(&game).unwrap();
            assert_eq!(json, format!("\"{}\"", game));
        }
    }
}
