//! Player session
//!
//! A session owns the balance ledger, one table per game and a short history
//! of finished rounds. Games borrow the ledger for each action, so the balance
//! is only ever mutated through an explicit `&mut` path.

use crate::config::CasinoConfig;
use crate::errors::GameError;
use crate::games::{
    drive, rng, BlackjackTable, CrashGame, GameType, MinesGame, RoundSummary, SlotMachine, VirtualClock,
};
use crate::ledger::BalanceLedger;
use crate::relay::{BetSubmission, RelayClient};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{info, warn};

/// What became of a wager handed to the relay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelayOutcome {
    Confirmed { tx_hash: String },
    /// Relay failed; the local round was refunded and reset.
    RolledBack { refund: f64, reason: String },
    /// Relay failed after the local round had already settled.
    Unconfirmed { reason: String },
}

pub struct Session {
    pub ledger: BalanceLedger,
    pub blackjack: BlackjackTable,
    pub mines: MinesGame,
    pub crash: CrashGame,
    pub slots: SlotMachine,
    history: VecDeque<RoundSummary>,
    history_size: usize,
}

impl Session {
    pub fn new(config: &CasinoConfig) -> Self {
        Self {
            ledger: Self::ledger(config),
            blackjack: BlackjackTable::from_entropy(config.blackjack.clone()),
            mines: MinesGame::from_entropy(config.mines.clone()),
            crash: CrashGame::from_entropy(config.crash.clone()),
            slots: SlotMachine::from_entropy(config.slots.clone()),
            history: VecDeque::with_capacity(config.ledger.history_size),
            history_size: config.ledger.history_size,
        }
    }

    /// Reproducible session; each game draws from its own seeded stream.
    pub fn seeded(config: &CasinoConfig, seed: u64) -> Self {
        Self {
            ledger: Self::ledger(config),
            blackjack: BlackjackTable::new(config.blackjack.clone(), rng::seeded(seed)),
            mines: MinesGame::new(config.mines.clone(), rng::seeded(seed.wrapping_add(1))),
            crash: CrashGame::new(config.crash.clone(), rng::seeded(seed.wrapping_add(2))),
            slots: SlotMachine::new(config.slots.clone(), rng::seeded(seed.wrapping_add(3))),
            history: VecDeque::with_capacity(config.ledger.history_size),
            history_size: config.ledger.history_size,
        }
    }

    fn ledger(config: &CasinoConfig) -> BalanceLedger {
        BalanceLedger::with_journal_capacity(config.ledger.opening_balance, config.ledger.journal_capacity)
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance()
    }

    /// Move finished rounds from every table into the history.
    pub fn refresh_history(&mut self) {
        let finished = [
            self.blackjack.take_finished(),
            self.mines.take_finished(),
            self.crash.take_finished(),
            self.slots.take_finished(),
        ];
        for summary in finished.into_iter().flatten() {
            if self.history_size == 0 {
                continue;
            }
            while self.history.len() >= self.history_size {
                self.history.pop_back();
            }
            self.history.push_front(summary);
        }
    }

    /// Most recent first
    pub fn recent_rounds(&mut self) -> Vec<RoundSummary> {
        self.refresh_history();
        self.history.iter().cloned().collect()
    }

    /// Fire pending timed transitions on every table in virtual time.
    /// Returns the number of transitions fired.
    pub fn run_timers(&mut self, clock: &mut VirtualClock, max_steps: usize) -> Result<usize, GameError> {
        let mut fired = clock.run_until_idle(&mut self.blackjack, &mut self.ledger, max_steps)?;
        fired += clock.run_until_idle(&mut self.crash, &mut self.ledger, max_steps)?;
        fired += clock.run_until_idle(&mut self.slots, &mut self.ledger, max_steps)?;
        self.refresh_history();
        Ok(fired)
    }

    /// Drive every table's timers on the tokio clock until all wait on the player.
    ///
    /// Tables are driven one after another while the session is borrowed, so
    /// a crash run ticks until it crashes or reaches its auto cash-out target.
    /// Manual crash cash-out needs the caller to step `next_delay`/`fire` on
    /// `self.crash` itself and call `cash_out` between ticks.
    pub async fn drive_all(&mut self) -> Result<usize, GameError> {
        let mut fired = drive(&mut self.blackjack, &mut self.ledger).await?;
        fired += drive(&mut self.crash, &mut self.ledger).await?;
        fired += drive(&mut self.slots, &mut self.ledger).await?;
        self.refresh_history();
        Ok(fired)
    }

    /// Submit a wager whose round was already started locally. A relay
    /// failure refunds the round and puts the table back to betting; it is
    /// never fatal to the session.
    pub async fn relay_wager<C>(&mut self, client: &C, submission: &BetSubmission) -> Result<RelayOutcome, GameError>
    where
        C: RelayClient + ?Sized,
    {
        let game = submission.game();
        match client.submit_bet(submission).await {
            Ok(response) => {
                info!(game = %game, tx_hash = %response.tx_hash, "wager relayed");
                Ok(RelayOutcome::Confirmed {
                    tx_hash: response.tx_hash,
                })
            }
            Err(e) => {
                let reason = e.to_string();
                match self.abandon(game) {
                    Ok(refund) => {
                        warn!(game = %game, refund, error = %reason, "relay failed, wager rolled back");
                        self.refresh_history();
                        Ok(RelayOutcome::RolledBack { refund, reason })
                    }
                    Err(err) if err.is_illegal_action() => {
                        warn!(game = %game, error = %reason, "relay failed after the round settled");
                        Ok(RelayOutcome::Unconfirmed { reason })
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    fn abandon(&mut self, game: GameType) -> Result<f64, GameError> {
        match game {
            GameType::Blackjack => self.blackjack.abandon(&mut self.ledger),
            GameType::Mines => self.mines.abandon(&mut self.ledger),
            GameType::Crash => self.crash.abandon(&mut self.ledger),
            GameType::Slots => self.slots.abandon(&mut self.ledger),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::GameOutcome;

    fn config() -> CasinoConfig {
        CasinoConfig::default()
    }

    #[test]
    fn test_seeded_sessions_agree() {
        let mut a = Session::seeded(&config(), 7);
        let mut b = Session::seeded(&config(), 7);
        let mut clock = VirtualClock::new();

        for session in [&mut a, &mut b] {
            session.slots.spin(&mut session.ledger, 5.0).unwrap();
            session.run_timers(&mut clock, 1_000).unwrap();
        }
        assert_eq!(a.slots.reels(), b.slots.reels());
        assert_eq!(a.balance(), b.balance());
    }

    #[test]
    fn test_history_is_capped_and_newest_first() {
        let mut session = Session::seeded(&config(), 3);
        let mut clock = VirtualClock::new();
        for bet in 1..=7 {
            session.slots.spin(&mut session.ledger, bet as f64).unwrap();
            session.run_timers(&mut clock, 1_000).unwrap();
        }

        let rounds = session.recent_rounds();
        assert_eq!(rounds.len(), 5);
        assert_eq!(rounds[0].wager, 7.0);
        assert_eq!(rounds[4].wager, 3.0);
        assert!(rounds.iter().all(|r| r.game == GameType::Slots));
    }

    #[test]
    fn test_abandoned_round_lands_in_history() {
        let mut session = Session::seeded(&config(), 11);
        session.mines.start_round(&mut session.ledger, 4.0, 3).unwrap();
        assert_eq!(session.balance(), 996.0);

        let refund = session.abandon(GameType::Mines).unwrap();
        assert_eq!(refund, 4.0);
        assert_eq!(session.balance(), 1000.0);

        let rounds = session.recent_rounds();
        assert_eq!(rounds[0].outcome, GameOutcome::Refunded);
    }
}
