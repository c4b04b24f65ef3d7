//! Blackjack table
//!
//! Pure hand/outcome rules plus the table state machine
//! `Betting -> Dealing -> Playing -> DealerTurn -> Ended -> Betting`.
//! Dealing reveal, dealer draws and the final settlement are timed steps
//! fired through [`Scheduled`]; player actions are applied immediately.

use super::deck::{Card, Deck};
use super::rng;
use super::scheduler::Scheduled;
use super::types::{GameOutcome, GameType, RoundSummary, TableLimits};
use crate::errors::GameError;
use crate::ledger::BalanceLedger;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const BLACKJACK: u32 = 21;

/// Dealer hits below this total and stands on it (soft 17 included)
pub const DEALER_STANDS_ON: u32 = 17;

/// Hand total with aces counted 11, then demoted to 1 one at a time while the
/// hand is over 21.
pub fn hand_value(cards: &[Card]) -> u32 {
    let mut value: u32 = cards.iter().map(|c| c.value() as u32).sum();
    let mut soft_aces = cards.iter().filter(|c| c.is_ace()).count();
    while value > BLACKJACK && soft_aces > 0 {
        value -= 10;
        soft_aces -= 1;
    }
    value
}

/// Exactly two cards totalling 21
pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards) == BLACKJACK
}

/// A hand with its derived totals. Always rebuilt from the cards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hand {
    pub cards: Vec<Card>,
    pub value: u32,
    pub is_blackjack: bool,
    pub is_busted: bool,
}

impl Hand {
    pub fn from_cards(cards: &[Card]) -> Self {
        let value = hand_value(cards);
        Self {
            cards: cards.to_vec(),
            value,
            is_blackjack: is_blackjack(cards),
            is_busted: value > BLACKJACK,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlackjackResult {
    Win,
    Lose,
    Push,
    Blackjack,
}

impl BlackjackResult {
    /// Total return per unit staked, stake included
    pub fn multiplier(&self) -> f64 {
        match self {
            BlackjackResult::Win => 2.0,
            BlackjackResult::Lose => 0.0,
            BlackjackResult::Push => 1.0,
            BlackjackResult::Blackjack => 2.5,
        }
    }

    pub fn outcome(&self) -> GameOutcome {
        match self {
            BlackjackResult::Win | BlackjackResult::Blackjack => GameOutcome::Win,
            BlackjackResult::Lose => GameOutcome::Loss,
            BlackjackResult::Push => GameOutcome::Push,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    pub result: BlackjackResult,
    pub multiplier: f64,
    pub winnings: f64,
}

/// Classify a finished round. The first matching rule wins:
/// player bust, dealer bust, lone player blackjack, lone dealer blackjack,
/// both blackjack, then plain totals.
pub fn determine_result(player: &[Card], dealer: &[Card], bet: f64) -> Settlement {
    let player_value = hand_value(player);
    let dealer_value = hand_value(dealer);
    let player_bj = is_blackjack(player);
    let dealer_bj = is_blackjack(dealer);

    let result = if player_value > BLACKJACK {
        BlackjackResult::Lose
    } else if dealer_value > BLACKJACK {
        BlackjackResult::Win
    } else if player_bj && !dealer_bj {
        BlackjackResult::Blackjack
    } else if dealer_bj && !player_bj {
        BlackjackResult::Lose
    } else if player_bj && dealer_bj {
        BlackjackResult::Push
    } else if player_value > dealer_value {
        BlackjackResult::Win
    } else if dealer_value > player_value {
        BlackjackResult::Lose
    } else {
        BlackjackResult::Push
    };

    let multiplier = result.multiplier();
    Settlement {
        result,
        multiplier,
        winnings: bet * multiplier,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BlackjackPhase {
    Betting,
    Dealing,
    Playing,
    DealerTurn,
    Ended,
}

impl BlackjackPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlackjackPhase::Betting => "betting",
            BlackjackPhase::Dealing => "dealing",
            BlackjackPhase::Playing => "playing",
            BlackjackPhase::DealerTurn => "dealer-turn",
            BlackjackPhase::Ended => "ended",
        }
    }
}

/// Where each round's cards come from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ShoePolicy {
    /// New shuffled deck at every deal
    #[default]
    FreshPerRound,
    /// One deck carried across rounds, replaced when it runs dry
    Continuous,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlackjackConfig {
    pub limits: TableLimits,
    pub deal_delay_ms: u64,
    pub dealer_delay_ms: u64,
    pub double_down_delay_ms: u64,
    pub shoe: ShoePolicy,
}

impl Default for BlackjackConfig {
    fn default() -> Self {
        Self {
            limits: TableLimits::open(),
            deal_delay_ms: 1000,
            dealer_delay_ms: 1000,
            double_down_delay_ms: 1500,
            shoe: ShoePolicy::FreshPerRound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    RevealDeal,
    DealerDraw,
    Settle,
}

/// Snapshot presented to the player. The dealer's hole card stays hidden
/// until the dealer turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackjackView {
    pub phase: BlackjackPhase,
    pub bet: f64,
    pub player: Hand,
    pub dealer: Hand,
    pub can_double_down: bool,
    pub has_doubled_down: bool,
    pub settlement: Option<Settlement>,
}

pub struct BlackjackTable<R: Rng = StdRng> {
    config: BlackjackConfig,
    rng: R,
    deck: Deck,
    staged: Option<Deck>,
    phase: BlackjackPhase,
    player: Vec<Card>,
    dealer: Vec<Card>,
    base_bet: f64,
    bet: f64,
    doubled: bool,
    pending: Option<(Step, Duration)>,
    settlement: Option<Settlement>,
    finished: Option<RoundSummary>,
}

impl BlackjackTable<StdRng> {
    pub fn from_entropy(config: BlackjackConfig) -> Self {
        Self::new(config, rng::from_entropy())
    }
}

impl<R: Rng> BlackjackTable<R> {
    pub fn new(config: BlackjackConfig, mut rng: R) -> Self {
        let deck = Deck::shuffled(&mut rng);
        Self {
            config,
            rng,
            deck,
            staged: None,
            phase: BlackjackPhase::Betting,
            player: Vec::new(),
            dealer: Vec::new(),
            base_bet: 0.0,
            bet: 0.0,
            doubled: false,
            pending: None,
            settlement: None,
            finished: None,
        }
    }

    pub fn phase(&self) -> BlackjackPhase {
        self.phase
    }

    /// Current stake, doubled after a double down
    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn player_hand(&self) -> Hand {
        Hand::from_cards(&self.player)
    }

    /// Full dealer hand, hole card included
    pub fn dealer_hand(&self) -> Hand {
        Hand::from_cards(&self.dealer)
    }

    pub fn settlement(&self) -> Option<Settlement> {
        self.settlement
    }

    pub fn has_doubled_down(&self) -> bool {
        self.doubled
    }

    pub fn can_double_down(&self) -> bool {
        self.phase == BlackjackPhase::Playing
            && !self.doubled
            && self.player.len() == 2
            && !is_blackjack(&self.player)
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    pub fn config(&self) -> &BlackjackConfig {
        &self.config
    }

    /// Deal the next round from `deck` instead of the shoe policy.
    pub fn load_shoe(&mut self, deck: Deck) {
        self.staged = Some(deck);
    }

    /// Summary of the last finished round, handed out once
    pub fn take_finished(&mut self) -> Option<RoundSummary> {
        self.finished.take()
    }

    pub fn view(&self) -> BlackjackView {
        let dealer = match self.phase {
            BlackjackPhase::DealerTurn | BlackjackPhase::Ended => self.dealer_hand(),
            _ => Hand::from_cards(&self.dealer[..self.dealer.len().min(1)]),
        };
        BlackjackView {
            phase: self.phase,
            bet: self.bet,
            player: self.player_hand(),
            dealer,
            can_double_down: self.can_double_down(),
            has_doubled_down: self.doubled,
            settlement: self.settlement,
        }
    }

    /// Debit the wager and deal player, dealer, player, dealer.
    pub fn start_round(&mut self, ledger: &mut BalanceLedger, bet: f64) -> Result<(), GameError> {
        self.require(BlackjackPhase::Betting, "deal")?;
        self.config.limits.check(bet).map_err(GameError::InvalidBet)?;
        if !ledger.can_cover(bet) {
            return Err(GameError::InsufficientBalance {
                wager: bet,
                balance: ledger.balance(),
            });
        }
        ledger.debit(GameType::Blackjack, bet)?;

        if let Some(staged) = self.staged.take() {
            self.deck = staged;
        } else if self.config.shoe == ShoePolicy::FreshPerRound {
            self.deck = Deck::shuffled(&mut self.rng);
        }

        self.player.clear();
        self.dealer.clear();
        for _ in 0..2 {
            let card = self.deck.deal(&mut self.rng);
            self.player.push(card);
            let card = self.deck.deal(&mut self.rng);
            self.dealer.push(card);
        }

        self.base_bet = bet;
        self.bet = bet;
        self.doubled = false;
        self.settlement = None;
        self.finished = None;
        self.phase = BlackjackPhase::Dealing;
        self.schedule(Step::RevealDeal, self.config.deal_delay_ms);

        debug!(bet, player = hand_value(&self.player), "blackjack round dealt");
        Ok(())
    }

    /// Draw one card for the player. A bust settles the round at once.
    pub fn hit(&mut self, ledger: &mut BalanceLedger) -> Result<Card, GameError> {
        self.require(BlackjackPhase::Playing, "hit")?;
        let card = self.deck.deal(&mut self.rng);
        self.player.push(card);

        if hand_value(&self.player) > BLACKJACK {
            self.settle(ledger)?;
        }
        Ok(card)
    }

    /// Hand over to the dealer
    pub fn stand(&mut self) -> Result<(), GameError> {
        self.require(BlackjackPhase::Playing, "stand")?;
        self.phase = BlackjackPhase::DealerTurn;
        self.schedule(Step::DealerDraw, self.config.dealer_delay_ms);
        Ok(())
    }

    /// Match the original wager, take exactly one card, then stand.
    pub fn double_down(&mut self, ledger: &mut BalanceLedger) -> Result<Card, GameError> {
        self.require(BlackjackPhase::Playing, "double down")?;
        if !self.can_double_down() {
            return Err(GameError::illegal(GameType::Blackjack, "double down", "past the first two cards"));
        }
        if !ledger.can_cover(self.base_bet) {
            return Err(GameError::InsufficientBalance {
                wager: self.base_bet,
                balance: ledger.balance(),
            });
        }
        ledger.debit(GameType::Blackjack, self.base_bet)?;
        self.bet = self.base_bet * 2.0;
        self.doubled = true;

        let card = self.deck.deal(&mut self.rng);
        self.player.push(card);

        if hand_value(&self.player) > BLACKJACK {
            self.settle(ledger)?;
        } else {
            self.phase = BlackjackPhase::DealerTurn;
            self.schedule(Step::DealerDraw, self.config.double_down_delay_ms);
        }
        Ok(card)
    }

    /// Clear the table after a finished round
    pub fn reset(&mut self) -> Result<(), GameError> {
        self.require(BlackjackPhase::Ended, "reset")?;
        self.clear();
        Ok(())
    }

    /// Refund the stake of an unfinished round and return to betting.
    pub fn abandon(&mut self, ledger: &mut BalanceLedger) -> Result<f64, GameError> {
        if matches!(self.phase, BlackjackPhase::Betting | BlackjackPhase::Ended) {
            return Err(GameError::illegal(GameType::Blackjack, "abandon", self.phase.as_str()));
        }
        let refund = self.bet;
        ledger.credit(GameType::Blackjack, refund)?;
        self.finished = Some(RoundSummary::new(
            GameType::Blackjack,
            refund,
            refund,
            1.0,
            GameOutcome::Refunded,
        ));
        self.clear();
        Ok(refund)
    }

    fn clear(&mut self) {
        self.phase = BlackjackPhase::Betting;
        self.player.clear();
        self.dealer.clear();
        self.bet = self.base_bet;
        self.doubled = false;
        self.pending = None;
        self.settlement = None;
    }

    fn require(&self, phase: BlackjackPhase, action: &'static str) -> Result<(), GameError> {
        if self.phase != phase {
            debug!(action, phase = self.phase.as_str(), "blackjack action rejected");
            return Err(GameError::illegal(GameType::Blackjack, action, self.phase.as_str()));
        }
        Ok(())
    }

    fn schedule(&mut self, step: Step, delay_ms: u64) {
        self.pending = Some((step, Duration::from_millis(delay_ms)));
    }

    fn settle(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError> {
        let settlement = determine_result(&self.player, &self.dealer, self.bet);
        ledger.credit(GameType::Blackjack, settlement.winnings)?;

        info!(
            result = ?settlement.result,
            bet = self.bet,
            winnings = settlement.winnings,
            player = hand_value(&self.player),
            dealer = hand_value(&self.dealer),
            "blackjack round settled"
        );

        self.finished = Some(RoundSummary::new(
            GameType::Blackjack,
            self.bet,
            settlement.winnings,
            settlement.multiplier,
            settlement.result.outcome(),
        ));
        self.settlement = Some(settlement);
        self.phase = BlackjackPhase::Ended;
        self.pending = None;
        Ok(())
    }
}

impl<R: Rng> Scheduled for BlackjackTable<R> {
    fn next_delay(&self) -> Option<Duration> {
        self.pending.map(|(_, delay)| delay)
    }

    fn fire(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError> {
        let Some((step, _)) = self.pending.take() else {
            return Ok(());
        };
        match step {
            Step::RevealDeal => {
                if is_blackjack(&self.player) || is_blackjack(&self.dealer) {
                    self.settle(ledger)?;
                } else {
                    self.phase = BlackjackPhase::Playing;
                }
            }
            Step::DealerDraw => {
                if hand_value(&self.dealer) < DEALER_STANDS_ON {
                    let card = self.deck.deal(&mut self.rng);
                    self.dealer.push(card);
                    debug!(card = %card, dealer = hand_value(&self.dealer), "dealer draws");
                    self.schedule(Step::DealerDraw, self.config.dealer_delay_ms);
                } else {
                    self.schedule(Step::Settle, self.config.dealer_delay_ms);
                }
            }
            Step::Settle => self.settle(ledger)?,
        }
        Ok(())
    }
}
