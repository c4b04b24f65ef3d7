//! Crash: a multiplier that climbs every tick until a hidden crash point
//!
//! `Idle -> Running -> {CashedOut | Crashed} -> Idle`. Ticks are timed steps
//! fired through [`Scheduled`]; each tick checks the crash point first, then
//! any auto cash-out target, so a cash-out can never land on a crashed run.

use super::rng;
use super::scheduler::Scheduled;
use super::types::{round_cents, GameOutcome, GameType, RoundSummary, TableLimits};
use crate::errors::GameError;
use crate::ledger::BalanceLedger;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const START_MULTIPLIER: f64 = 1.0;

/// Multiplier after one tick, rounded to cents
pub fn next_multiplier(previous: f64) -> f64 {
    round_cents(previous + 0.05 + previous * 0.01)
}

/// Uniform crash point on `[1.00, 1.00 + spread]`, rounded to cents
pub fn sample_crash_point<R: Rng + ?Sized>(rng: &mut R, spread: f64) -> f64 {
    round_cents(START_MULTIPLIER + rng.gen::<f64>() * spread)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CrashPhase {
    Idle,
    Running,
    CashedOut,
    Crashed,
}

impl CrashPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrashPhase::Idle => "idle",
            CrashPhase::Running => "running",
            CrashPhase::CashedOut => "cashed-out",
            CrashPhase::Crashed => "crashed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrashConfig {
    pub limits: TableLimits,
    pub tick_ms: u64,
    /// Width of the crash point distribution above 1.00
    pub crash_spread: f64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            limits: TableLimits::new(1.0, Some(100.0)),
            tick_ms: 100,
            crash_spread: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashView {
    pub phase: CrashPhase,
    pub bet: f64,
    pub multiplier: f64,
    pub history: Vec<f64>,
    pub auto_cash_out: Option<f64>,
    /// Only shown once the run is over
    pub crash_point: Option<f64>,
    pub winnings: Option<f64>,
}

pub struct CrashGame<R: Rng = StdRng> {
    config: CrashConfig,
    rng: R,
    staged: Option<f64>,
    phase: CrashPhase,
    bet: f64,
    crash_point: f64,
    multiplier: f64,
    history: Vec<f64>,
    auto_cash_out: Option<f64>,
    winnings: Option<f64>,
    finished: Option<RoundSummary>,
}

impl CrashGame<StdRng> {
    pub fn from_entropy(config: CrashConfig) -> Self {
        Self::new(config, rng::from_entropy())
    }
}

impl<R: Rng> CrashGame<R> {
    pub fn new(config: CrashConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            staged: None,
            phase: CrashPhase::Idle,
            bet: 0.0,
            crash_point: START_MULTIPLIER,
            multiplier: START_MULTIPLIER,
            history: Vec::new(),
            auto_cash_out: None,
            winnings: None,
            finished: None,
        }
    }

    pub fn phase(&self) -> CrashPhase {
        self.phase
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn winnings(&self) -> Option<f64> {
        self.winnings
    }

    pub fn config(&self) -> &CrashConfig {
        &self.config
    }

    /// Crash point revealed once the run has ended
    pub fn revealed_crash_point(&self) -> Option<f64> {
        matches!(self.phase, CrashPhase::CashedOut | CrashPhase::Crashed).then_some(self.crash_point)
    }

    /// Use `crash_point` for the next run instead of sampling one.
    pub fn load_crash_point(&mut self, crash_point: f64) {
        self.staged = Some(crash_point.max(START_MULTIPLIER));
    }

    pub fn take_finished(&mut self) -> Option<RoundSummary> {
        self.finished.take()
    }

    pub fn start_round(&mut self, ledger: &mut BalanceLedger, bet: f64) -> Result<(), GameError> {
        self.start_round_with_target(ledger, bet, None)
    }

    /// Start a run that cashes out by itself once the multiplier reaches
    /// `auto_cash_out`.
    pub fn start_round_with_target(
        &mut self,
        ledger: &mut BalanceLedger,
        bet: f64,
        auto_cash_out: Option<f64>,
    ) -> Result<(), GameError> {
        self.require(CrashPhase::Idle, "start")?;
        if let Some(target) = auto_cash_out {
            if !target.is_finite() || target <= START_MULTIPLIER {
                return Err(GameError::InvalidParameter(format!(
                    "auto cash-out target {} must be above {:.2}",
                    target, START_MULTIPLIER
                )));
            }
        }
        self.config.limits.check(bet).map_err(GameError::InvalidBet)?;
        if !ledger.can_cover(bet) {
            return Err(GameError::InsufficientBalance {
                wager: bet,
                balance: ledger.balance(),
            });
        }
        ledger.debit(GameType::Crash, bet)?;

        self.crash_point = match self.staged.take() {
            Some(point) => point,
            None => sample_crash_point(&mut self.rng, self.config.crash_spread),
        };
        self.bet = bet;
        self.multiplier = START_MULTIPLIER;
        self.history = vec![START_MULTIPLIER];
        self.auto_cash_out = auto_cash_out;
        self.winnings = None;
        self.finished = None;
        self.phase = CrashPhase::Running;
        debug!(bet, ?auto_cash_out, "crash run started");
        Ok(())
    }

    /// Take bet x current multiplier. Rejected once the run has crashed.
    pub fn cash_out(&mut self, ledger: &mut BalanceLedger) -> Result<f64, GameError> {
        self.require(CrashPhase::Running, "cash out")?;
        let winnings = round_cents(self.bet * self.multiplier);
        ledger.credit(GameType::Crash, winnings)?;

        self.winnings = Some(winnings);
        self.phase = CrashPhase::CashedOut;
        self.finished = Some(RoundSummary::new(
            GameType::Crash,
            self.bet,
            winnings,
            self.multiplier,
            GameOutcome::Win,
        ));
        info!(bet = self.bet, multiplier = self.multiplier, winnings, "crash cashed out");
        Ok(winnings)
    }

    /// Back to idle after the run ended
    pub fn reset(&mut self) -> Result<(), GameError> {
        if !matches!(self.phase, CrashPhase::CashedOut | CrashPhase::Crashed) {
            return Err(GameError::illegal(GameType::Crash, "reset", self.phase.as_str()));
        }
        self.clear();
        Ok(())
    }

    /// Refund the stake of a running round and return to idle.
    pub fn abandon(&mut self, ledger: &mut BalanceLedger) -> Result<f64, GameError> {
        self.require(CrashPhase::Running, "abandon")?;
        let refund = self.bet;
        ledger.credit(GameType::Crash, refund)?;
        self.finished = Some(RoundSummary::new(GameType::Crash, refund, refund, 1.0, GameOutcome::Refunded));
        self.clear();
        Ok(refund)
    }

    pub fn view(&self) -> CrashView {
        CrashView {
            phase: self.phase,
            bet: self.bet,
            multiplier: self.multiplier,
            history: self.history.clone(),
            auto_cash_out: self.auto_cash_out,
            crash_point: self.revealed_crash_point(),
            winnings: self.winnings,
        }
    }

    fn tick(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError> {
        let next = next_multiplier(self.multiplier);
        self.history.push(next);

        if next >= self.crash_point {
            self.multiplier = self.crash_point;
            self.winnings = Some(0.0);
            self.phase = CrashPhase::Crashed;
            self.finished = Some(RoundSummary::new(GameType::Crash, self.bet, 0.0, 0.0, GameOutcome::Loss));
            info!(bet = self.bet, crash_point = self.crash_point, "crash run crashed");
            return Ok(());
        }

        self.multiplier = next;
        if let Some(target) = self.auto_cash_out {
            if self.multiplier >= target {
                self.cash_out(ledger)?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.phase = CrashPhase::Idle;
        self.multiplier = START_MULTIPLIER;
        self.history.clear();
        self.auto_cash_out = None;
        self.winnings = None;
    }

    fn require(&self, phase: CrashPhase, action: &'static str) -> Result<(), GameError> {
        if self.phase != phase {
            debug!(action, phase = self.phase.as_str(), "crash action rejected");
            return Err(GameError::illegal(GameType::Crash, action, self.phase.as_str()));
        }
        Ok(())
    }
}

impl<R: Rng> Scheduled for CrashGame<R> {
    fn next_delay(&self) -> Option<Duration> {
        (self.phase == CrashPhase::Running).then(|| Duration::from_millis(self.config.tick_ms))
    }

    fn fire(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError> {
        if self.phase != CrashPhase::Running {
            return Ok(());
        }
        self.tick(ledger)
    }
}
