//! Casino Engine - outcome and payout rules for four casino games
//!
//! Slots, crash, mines and blackjack run as explicit state machines over a
//! shared [`ledger::BalanceLedger`]. Timed reveals are stepped through
//! [`games::Scheduled`], either in virtual time or on the tokio clock. The
//! optional [`relay`] forwards wagers on chain as meta-transactions.

pub mod config;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod relay;
pub mod session;
pub mod simulation;

pub use config::{CasinoConfig, ConfigLoader};
pub use errors::{CasinoError, CasinoResult, ConfigurationError, GameError, LedgerError};
pub use ledger::BalanceLedger;
pub use session::{RelayOutcome, Session};
pub use simulation::{SimulationReport, Simulator};
