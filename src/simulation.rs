//! Batch simulation
//!
//! Plays many rounds of one game with a fixed strategy in virtual time and
//! reports win rate, return to player and house edge. Useful for checking a
//! payout table or multiplier model before changing it.

use crate::config::{CasinoConfig, SimulationConfig};
use crate::errors::GameError;
use crate::games::{
    blackjack::BlackjackTable,
    crash::CrashGame,
    mines::{MinesGame, MinesPhase, GRID_SIZE, TOTAL_CELLS},
    rng,
    slots::SlotMachine,
    BlackjackPhase, GameOutcome, GameType, RoundSummary, VirtualClock,
};
use crate::ledger::BalanceLedger;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Upper bound on timed transitions fired per round
const MAX_STEPS_PER_ROUND: usize = 100_000;

/// Aggregate results of one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub game: GameType,
    pub games_played: usize,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    pub total_bet: f64,
    pub total_payout: f64,
    pub win_rate: f64,
    /// Return to player, payout over wagered
    pub rtp: f64,
    pub house_edge: f64,
    pub biggest_multiplier: f64,
    pub virtual_time_ms: u64,
    pub execution_ms: u64,
}

#[derive(Default)]
struct Tally {
    games_played: usize,
    wins: usize,
    losses: usize,
    pushes: usize,
    total_bet: f64,
    total_payout: f64,
    biggest_multiplier: f64,
}

impl Tally {
    fn record(&mut self, summary: RoundSummary) {
        self.games_played += 1;
        self.total_bet += summary.wager;
        self.total_payout += summary.payout;
        self.biggest_multiplier = self.biggest_multiplier.max(summary.multiplier);
        match summary.outcome {
            GameOutcome::Win => self.wins += 1,
            GameOutcome::Loss => self.losses += 1,
            GameOutcome::Push | GameOutcome::Refunded => self.pushes += 1,
        }
    }

    fn into_report(self, game: GameType, clock: &VirtualClock, started: Instant) -> SimulationReport {
        let rtp = if self.total_bet > 0.0 { self.total_payout / self.total_bet } else { 0.0 };
        let win_rate = if self.games_played > 0 {
            self.wins as f64 / self.games_played as f64
        } else {
            0.0
        };
        SimulationReport {
            game,
            games_played: self.games_played,
            wins: self.wins,
            losses: self.losses,
            pushes: self.pushes,
            total_bet: self.total_bet,
            total_payout: self.total_payout,
            win_rate,
            rtp,
            house_edge: 1.0 - rtp,
            biggest_multiplier: self.biggest_multiplier,
            virtual_time_ms: clock.elapsed().as_millis() as u64,
            execution_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Runs batches against freshly built tables
pub struct Simulator {
    tables: CasinoConfig,
    settings: SimulationConfig,
}

impl Simulator {
    /// Tables and strategy both come from `config`
    pub fn new(config: CasinoConfig) -> Self {
        let settings = config.simulation.clone();
        Self {
            tables: config,
            settings,
        }
    }

    pub fn with_settings(mut self, settings: SimulationConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SimulationConfig {
        &self.settings
    }

    pub fn run(&self, game: GameType) -> Result<SimulationReport, GameError> {
        let started = Instant::now();
        let rounds = self.settings.rounds;
        let bet = self.settings.bet;
        // Every round risks at most a doubled wager, so the batch never runs dry
        let mut ledger = BalanceLedger::with_journal_capacity(bet * 2.0 * (rounds as f64 + 1.0), 16);
        let mut clock = VirtualClock::new();
        let mut tally = Tally::default();
        let mut rng = self.rng(game);

        info!(game = %game, rounds, bet, seed = ?self.settings.seed, "simulation started");
        match game {
            GameType::Blackjack => {
                let mut table = BlackjackTable::new(self.tables.blackjack.clone(), rng::fork(&mut rng));
                for _ in 0..rounds {
                    tally.record(self.play_blackjack(&mut table, &mut ledger, &mut clock)?);
                }
            }
            GameType::Mines => {
                let mut mines = MinesGame::new(self.tables.mines.clone(), rng::fork(&mut rng));
                for _ in 0..rounds {
                    tally.record(self.play_mines(&mut mines, &mut ledger, &mut rng)?);
                }
            }
            GameType::Crash => {
                let mut crash = CrashGame::new(self.tables.crash.clone(), rng::fork(&mut rng));
                for _ in 0..rounds {
                    tally.record(self.play_crash(&mut crash, &mut ledger, &mut clock)?);
                }
            }
            GameType::Slots => {
                let mut slots = SlotMachine::new(self.tables.slots.clone(), rng::fork(&mut rng));
                for _ in 0..rounds {
                    tally.record(self.play_slots(&mut slots, &mut ledger, &mut clock)?);
                }
            }
        }

        let report = tally.into_report(game, &clock, started);
        info!(
            game = %game,
            games_played = report.games_played,
            win_rate = report.win_rate,
            rtp = report.rtp,
            "simulation finished"
        );
        Ok(report)
    }

    pub fn run_all(&self) -> Result<Vec<SimulationReport>, GameError> {
        GameType::ALL.iter().map(|game| self.run(*game)).collect()
    }

    fn rng(&self, game: GameType) -> StdRng {
        match self.settings.seed {
            Some(seed) => rng::seeded(seed ^ game as u64),
            None => rng::from_entropy(),
        }
    }

    /// Hit below the configured total, otherwise stand.
    fn play_blackjack(
        &self,
        table: &mut BlackjackTable,
        ledger: &mut BalanceLedger,
        clock: &mut VirtualClock,
    ) -> Result<RoundSummary, GameError> {
        table.start_round(ledger, self.settings.bet)?;
        clock.run_until_idle(table, ledger, MAX_STEPS_PER_ROUND)?;
        while table.phase() == BlackjackPhase::Playing {
            if table.player_hand().value < self.settings.blackjack_stand_on {
                table.hit(ledger)?;
            } else {
                table.stand()?;
            }
        }
        clock.run_until_idle(table, ledger, MAX_STEPS_PER_ROUND)?;
        let summary = finished(table.take_finished(), GameType::Blackjack)?;
        table.reset()?;
        Ok(summary)
    }

    /// Reveal random cells until the target gem count, then cash out.
    fn play_mines(
        &self,
        game: &mut MinesGame,
        ledger: &mut BalanceLedger,
        rng: &mut StdRng,
    ) -> Result<RoundSummary, GameError> {
        game.start_round(ledger, self.settings.bet, self.settings.mine_count)?;
        let target = self.settings.mines_reveals.max(1);

        let mut order: Vec<usize> = (0..TOTAL_CELLS).collect();
        rng::fisher_yates(&mut order, rng);
        for index in order {
            if game.gems_found() >= target || game.phase() != MinesPhase::Playing {
                break;
            }
            game.reveal(index / GRID_SIZE, index % GRID_SIZE)?;
        }
        if game.phase() == MinesPhase::Playing {
            game.cash_out(ledger)?;
        }

        let summary = finished(game.take_finished(), GameType::Mines)?;
        game.reset()?;
        Ok(summary)
    }

    /// Auto cash-out at the configured target.
    fn play_crash(
        &self,
        game: &mut CrashGame,
        ledger: &mut BalanceLedger,
        clock: &mut VirtualClock,
    ) -> Result<RoundSummary, GameError> {
        game.start_round_with_target(ledger, self.settings.bet, Some(self.settings.crash_target))?;
        clock.run_until_idle(game, ledger, MAX_STEPS_PER_ROUND)?;
        let summary = finished(game.take_finished(), GameType::Crash)?;
        game.reset()?;
        Ok(summary)
    }

    fn play_slots(
        &self,
        machine: &mut SlotMachine,
        ledger: &mut BalanceLedger,
        clock: &mut VirtualClock,
    ) -> Result<RoundSummary, GameError> {
        machine.spin(ledger, self.settings.bet)?;
        clock.run_until_idle(machine, ledger, MAX_STEPS_PER_ROUND)?;
        finished(machine.take_finished(), GameType::Slots)
    }
}

fn finished(summary: Option<RoundSummary>, game: GameType) -> Result<RoundSummary, GameError> {
    summary.ok_or_else(|| GameError::illegal(game, "simulate", "unfinished round"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator(rounds: usize, seed: u64) -> Simulator {
        let settings = SimulationConfig {
            rounds,
            seed: Some(seed),
            ..SimulationConfig::default()
        };
        Simulator::new(CasinoConfig::default()).with_settings(settings)
    }

    #[test]
    fn test_every_round_is_counted() {
        let sim = simulator(300, 5);
        for report in sim.run_all().unwrap() {
            assert_eq!(report.games_played, 300, "{}", report.game);
            assert_eq!(report.wins + report.losses + report.pushes, 300);
            assert!(report.total_bet >= 300.0 * 10.0);
            assert!((report.house_edge - (1.0 - report.rtp)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_seeded_batches_repeat() {
        let a = simulator(500, 42).run(GameType::Mines).unwrap();
        let b = simulator(500, 42).run(GameType::Mines).unwrap();
        assert_eq!(a.wins, b.wins);
        assert_eq!(a.total_payout, b.total_payout);
    }

    #[test]
    fn test_slots_return_to_player() {
        // Triples pay (2 + 3 + 5 + 10 + 50) / 125 = 0.56 on average
        let report = simulator(20_000, 9).run(GameType::Slots).unwrap();
        assert!((report.rtp - 0.56).abs() < 0.11, "rtp {}", report.rtp);
    }

    #[test]
    fn test_crash_wins_pay_at_least_target() {
        let report = simulator(1_000, 13).run(GameType::Crash).unwrap();
        assert!(report.wins > 0);
        assert!(report.total_payout >= report.wins as f64 * 10.0 * 2.0);
        assert!(report.virtual_time_ms > 0);
    }

    #[test]
    fn test_bet_outside_limits_is_rejected() {
        let settings = SimulationConfig {
            rounds: 1,
            bet: 500.0,
            seed: Some(1),
            ..SimulationConfig::default()
        };
        let sim = Simulator::new(CasinoConfig::default()).with_settings(settings);
        assert!(matches!(sim.run(GameType::Slots), Err(GameError::InvalidBet(_))));
    }
}
