//! Three-reel slot machine
//!
//! A spin debits the wager, animates the reels from a throwaway generator,
//! then commits an independent draw when the spin resolves. Only three of a
//! kind pay.

use super::rng;
use super::scheduler::Scheduled;
use super::types::{GameOutcome, GameType, RoundSummary, TableLimits};
use crate::errors::GameError;
use crate::ledger::BalanceLedger;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const REELS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Cherry,
    Lemon,
    Orange,
    Star,
    Diamond,
}

impl Symbol {
    pub const ALL: [Symbol; 5] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Star,
        Symbol::Diamond,
    ];

    pub fn glyph(&self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Orange => "🍊",
            Symbol::Star => "⭐",
            Symbol::Diamond => "💎",
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Multiplier paid for three of a kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PayoutTable {
    pub cherry: f64,
    pub lemon: f64,
    pub orange: f64,
    pub star: f64,
    pub diamond: f64,
}

impl PayoutTable {
    pub fn payout(&self, symbol: Symbol) -> f64 {
        match symbol {
            Symbol::Cherry => self.cherry,
            Symbol::Lemon => self.lemon,
            Symbol::Orange => self.orange,
            Symbol::Star => self.star,
            Symbol::Diamond => self.diamond,
        }
    }

    pub fn entries(&self) -> [(Symbol, f64); 5] {
        Symbol::ALL.map(|symbol| (symbol, self.payout(symbol)))
    }
}

impl Default for PayoutTable {
    fn default() -> Self {
        Self {
            cherry: 2.0,
            lemon: 3.0,
            orange: 5.0,
            star: 10.0,
            diamond: 50.0,
        }
    }
}

pub type Reels = [Symbol; REELS];

/// Three symbols drawn independently and uniformly
pub fn draw_reels<R: Rng + ?Sized>(rng: &mut R) -> Reels {
    [Symbol::random(rng), Symbol::random(rng), Symbol::random(rng)]
}

/// Payout multiplier of a committed spin: the table entry for three of a
/// kind, 0 otherwise.
pub fn evaluate(reels: &Reels, table: &PayoutTable) -> f64 {
    let first = reels[0];
    if reels.iter().all(|&symbol| symbol == first) {
        table.payout(first)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotsPhase {
    Idle,
    Spinning,
}

impl SlotsPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotsPhase::Idle => "idle",
            SlotsPhase::Spinning => "spinning",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlotsConfig {
    pub limits: TableLimits,
    pub frame_ms: u64,
    pub spin_ms: u64,
    pub payouts: PayoutTable,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            limits: TableLimits::new(1.0, Some(100.0)),
            frame_ms: 100,
            spin_ms: 1500,
            payouts: PayoutTable::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsView {
    pub phase: SlotsPhase,
    pub bet: f64,
    pub reels: Reels,
    pub last_win: f64,
}

pub struct SlotMachine<R: Rng = StdRng> {
    config: SlotsConfig,
    rng: R,
    animation: Option<StdRng>,
    phase: SlotsPhase,
    bet: f64,
    reels: Reels,
    spin_elapsed_ms: u64,
    last_win: f64,
    finished: Option<RoundSummary>,
}

impl SlotMachine<StdRng> {
    pub fn from_entropy(config: SlotsConfig) -> Self {
        Self::new(config, rng::from_entropy())
    }
}

impl<R: Rng> SlotMachine<R> {
    pub fn new(config: SlotsConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            animation: None,
            phase: SlotsPhase::Idle,
            bet: 0.0,
            reels: [Symbol::Cherry; REELS],
            spin_elapsed_ms: 0,
            last_win: 0.0,
            finished: None,
        }
    }

    pub fn phase(&self) -> SlotsPhase {
        self.phase
    }

    /// Reels on display: animation frames while spinning, the committed
    /// draw afterwards
    pub fn reels(&self) -> Reels {
        self.reels
    }

    pub fn last_win(&self) -> f64 {
        self.last_win
    }

    pub fn config(&self) -> &SlotsConfig {
        &self.config
    }

    pub fn take_finished(&mut self) -> Option<RoundSummary> {
        self.finished.take()
    }

    pub fn spin(&mut self, ledger: &mut BalanceLedger, bet: f64) -> Result<(), GameError> {
        if self.phase != SlotsPhase::Idle {
            debug!(phase = self.phase.as_str(), "spin rejected");
            return Err(GameError::illegal(GameType::Slots, "spin", self.phase.as_str()));
        }
        self.config.limits.check(bet).map_err(GameError::InvalidBet)?;
        if !ledger.can_cover(bet) {
            return Err(GameError::InsufficientBalance {
                wager: bet,
                balance: ledger.balance(),
            });
        }
        ledger.debit(GameType::Slots, bet)?;

        self.animation = Some(rng::fork(&mut self.rng));
        self.bet = bet;
        self.last_win = 0.0;
        self.spin_elapsed_ms = 0;
        self.finished = None;
        self.phase = SlotsPhase::Spinning;
        Ok(())
    }

    /// Stop a spin before it resolves and refund the wager.
    pub fn abandon(&mut self, ledger: &mut BalanceLedger) -> Result<f64, GameError> {
        if self.phase != SlotsPhase::Spinning {
            return Err(GameError::illegal(GameType::Slots, "abandon", self.phase.as_str()));
        }
        let refund = self.bet;
        ledger.credit(GameType::Slots, refund)?;
        self.finished = Some(RoundSummary::new(GameType::Slots, refund, refund, 1.0, GameOutcome::Refunded));
        self.animation = None;
        self.phase = SlotsPhase::Idle;
        Ok(refund)
    }

    pub fn view(&self) -> SlotsView {
        SlotsView {
            phase: self.phase,
            bet: self.bet,
            reels: self.reels,
            last_win: self.last_win,
        }
    }

    fn resolve(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError> {
        let reels = draw_reels(&mut self.rng);
        let multiplier = evaluate(&reels, &self.config.payouts);
        let winnings = self.bet * multiplier;
        if winnings > 0.0 {
            ledger.credit(GameType::Slots, winnings)?;
        }

        let outcome = if winnings > 0.0 { GameOutcome::Win } else { GameOutcome::Loss };
        self.finished = Some(RoundSummary::new(GameType::Slots, self.bet, winnings, multiplier, outcome));
        self.reels = reels;
        self.last_win = winnings;
        self.animation = None;
        self.phase = SlotsPhase::Idle;
        info!(
            bet = self.bet,
            reels = %format!("{}{}{}", reels[0], reels[1], reels[2]),
            winnings,
            "slots spin resolved"
        );
        Ok(())
    }
}

impl<R: Rng> Scheduled for SlotMachine<R> {
    fn next_delay(&self) -> Option<Duration> {
        if self.phase != SlotsPhase::Spinning {
            return None;
        }
        let remaining = self.config.spin_ms.saturating_sub(self.spin_elapsed_ms);
        Some(Duration::from_millis(remaining.min(self.config.frame_ms)))
    }

    fn fire(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError> {
        let Some(delay) = self.next_delay() else {
            return Ok(());
        };
        self.spin_elapsed_ms += delay.as_millis() as u64;

        if self.spin_elapsed_ms >= self.config.spin_ms {
            return self.resolve(ledger);
        }
        if let Some(animation) = self.animation.as_mut() {
            self.reels = draw_reels(animation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::seeded;
    use crate::games::scheduler::VirtualClock;
    use std::collections::HashMap;

    #[test]
    fn test_evaluate_pays_only_triples() {
        let table = PayoutTable::default();
        assert_eq!(evaluate(&[Symbol::Diamond; 3], &table), 50.0);
        assert_eq!(evaluate(&[Symbol::Cherry; 3], &table), 2.0);
        assert_eq!(evaluate(&[Symbol::Star, Symbol::Star, Symbol::Lemon], &table), 0.0);
        assert_eq!(evaluate(&[Symbol::Lemon, Symbol::Orange, Symbol::Star], &table), 0.0);
    }

    #[test]
    fn test_triple_frequencies() {
        let mut rng = seeded(2024);
        let spins = 100_000;
        let mut triples: HashMap<Symbol, usize> = HashMap::new();
        for _ in 0..spins {
            let reels = draw_reels(&mut rng);
            if reels.iter().all(|&s| s == reels[0]) {
                *triples.entry(reels[0]).or_default() += 1;
            }
        }

        let any = triples.values().sum::<usize>() as f64 / spins as f64;
        assert!((any - 1.0 / 25.0).abs() < 0.004, "any-triple frequency {}", any);
        for symbol in Symbol::ALL {
            let freq = triples.get(&symbol).copied().unwrap_or(0) as f64 / spins as f64;
            assert!((freq - 1.0 / 125.0).abs() < 0.002, "{:?} frequency {}", symbol, freq);
        }
    }

    #[test]
    fn test_spin_resolves_after_full_duration() {
        let mut ledger = BalanceLedger::new(100.0);
        let mut clock = VirtualClock::new();
        let mut machine = SlotMachine::new(SlotsConfig::default(), seeded(4));

        machine.spin(&mut ledger, 10.0).unwrap();
        assert_eq!(ledger.balance(), 90.0);
        assert_eq!(machine.phase(), SlotsPhase::Spinning);

        let steps = clock.run_until_idle(&mut machine, &mut ledger, 100).unwrap();
        assert_eq!(steps, 15);
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
        assert_eq!(machine.phase(), SlotsPhase::Idle);

        let expected = 10.0 * evaluate(&machine.reels(), &machine.config().payouts);
        assert_eq!(machine.last_win(), expected);
        assert_eq!(ledger.balance(), 90.0 + expected);
        assert!(machine.take_finished().is_some());
    }

    #[test]
    fn test_animation_does_not_change_result() {
        // Same seed, with and without animation frames: identical committed reels.
        let config = SlotsConfig::default();
        let mut ledger = BalanceLedger::new(100.0);

        let mut animated = SlotMachine::new(config.clone(), seeded(77));
        animated.spin(&mut ledger, 1.0).unwrap();
        VirtualClock::new().run_until_idle(&mut animated, &mut ledger, 100).unwrap();

        let no_frames = SlotsConfig {
            frame_ms: 1500,
            ..config
        };
        let mut instant = SlotMachine::new(no_frames, seeded(77));
        instant.spin(&mut ledger, 1.0).unwrap();
        VirtualClock::new().run_until_idle(&mut instant, &mut ledger, 100).unwrap();

        assert_eq!(animated.reels(), instant.reels());
    }

    #[test]
    fn test_spin_guards() {
        let mut ledger = BalanceLedger::new(5.0);
        let mut machine = SlotMachine::new(SlotsConfig::default(), seeded(4));

        assert!(matches!(machine.spin(&mut ledger, 10.0).unwrap_err(), GameError::InsufficientBalance { .. }));
        assert!(matches!(machine.spin(&mut ledger, 0.5).unwrap_err(), GameError::InvalidBet(_)));
        machine.spin(&mut ledger, 2.0).unwrap();
        assert!(machine.spin(&mut ledger, 2.0).unwrap_err().is_illegal_action());
        assert_eq!(ledger.balance(), 3.0);

        assert_eq!(machine.abandon(&mut ledger).unwrap(), 2.0);
        assert_eq!(ledger.balance(), 5.0);
        assert_eq!(machine.next_delay(), None);
    }
}
