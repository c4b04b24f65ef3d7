//! Error types for the casino engine
//!
//! Each concern owns its error enum; `CasinoError` rolls them up for callers
//! that span several concerns (binaries, session flows).

use crate::games::types::GameType;
use thiserror::Error;

/// Root error type for all casino operations
#[derive(Debug, Error)]
pub enum CasinoError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Rejected game actions and wagers
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Balance ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Relay submission and forwarding errors
    #[error("Relay error: {0}")]
    Relay(#[from] crate::relay::RelayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Balance ledger errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Insufficient funds: requested {requested:.2}, available {available:.2}")]
    InsufficientFunds { requested: f64, available: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),
}

/// Errors surfaced by game actions.
///
/// Every variant is returned before any state mutation, so a rejected action
/// leaves both the game and the ledger untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("Insufficient balance: wager {wager:.2} exceeds balance {balance:.2}")]
    InsufficientBalance { wager: f64, balance: f64 },

    #[error("Invalid bet: {0}")]
    InvalidBet(String),

    #[error("Action '{action}' is not allowed in {game} while {phase}")]
    IllegalAction {
        game: GameType,
        action: &'static str,
        phase: &'static str,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl GameError {
    pub fn illegal(game: GameType, action: &'static str, phase: &'static str) -> Self {
        GameError::IllegalAction {
            game,
            action,
            phase,
        }
    }

    /// True for guarded no-ops (wrong phase), as opposed to rejected wagers
    pub fn is_illegal_action(&self) -> bool {
        matches!(self, GameError::IllegalAction { .. })
    }
}

impl From<LedgerError> for GameError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientFunds {
                requested,
                available,
            } => GameError::InsufficientBalance {
                wager: requested,
                balance: available,
            },
            LedgerError::InvalidAmount(amount) => {
                GameError::InvalidBet(format!("amount {} is not a valid wager", amount))
            }
        }
    }
}

// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;
