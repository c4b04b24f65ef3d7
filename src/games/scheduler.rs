//! Stepping timed transitions
//!
//! Games that reveal or resolve on a timer (blackjack dealing and dealer play,
//! crash ticks, slot reels) expose their next timed transition through
//! [`Scheduled`]. A driver decides when to fire it: [`VirtualClock`] fires
//! immediately and tracks virtual time, [`drive`] sleeps on the tokio timer.
//! Each firing reads the game's current state, so a transition never acts on
//! a stale snapshot.

use crate::errors::GameError;
use crate::ledger::BalanceLedger;
use std::time::Duration;
use tracing::trace;

pub trait Scheduled {
    /// Delay until the next timed transition, or `None` when the game waits on
    /// the player (or is idle).
    fn next_delay(&self) -> Option<Duration>;

    /// Apply the pending timed transition.
    fn fire(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError>;
}

/// Deterministic driver for tests and simulation
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    elapsed: Duration,
    fired: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed across all fired transitions
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Fire the next pending transition, if any. Returns the delay it consumed.
    pub fn step<G: Scheduled + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut BalanceLedger,
    ) -> Result<Option<Duration>, GameError> {
        let Some(delay) = game.next_delay() else {
            return Ok(None);
        };
        game.fire(ledger)?;
        self.elapsed += delay;
        self.fired += 1;
        trace!(elapsed_ms = self.elapsed.as_millis() as u64, "virtual transition fired");
        Ok(Some(delay))
    }

    /// Fire transitions until the game waits on the player, capped at
    /// `max_steps`. Returns the number of transitions fired.
    pub fn run_until_idle<G: Scheduled + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut BalanceLedger,
        max_steps: usize,
    ) -> Result<usize, GameError> {
        let mut steps = 0;
        while steps < max_steps && self.step(game, ledger)?.is_some() {
            steps += 1;
        }
        Ok(steps)
    }

    /// Fire every transition that falls due within `budget` of virtual time.
    pub fn advance_by<G: Scheduled + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut BalanceLedger,
        budget: Duration,
    ) -> Result<usize, GameError> {
        let deadline = self.elapsed + budget;
        let mut steps = 0;
        while let Some(delay) = game.next_delay() {
            if self.elapsed + delay > deadline {
                break;
            }
            self.step(game, ledger)?;
            steps += 1;
        }
        self.elapsed = deadline;
        Ok(steps)
    }
}

/// Real-time driver: sleep for each pending delay, then fire, until the game
/// waits on the player. Returns the number of transitions fired.
pub async fn drive<G: Scheduled + ?Sized>(
    game: &mut G,
    ledger: &mut BalanceLedger,
) -> Result<usize, GameError> {
    let mut steps = 0;
    while let Some(delay) = game.next_delay() {
        tokio::time::sleep(delay).await;
        game.fire(ledger)?;
        steps += 1;
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::GameType;

    /// Counts down, crediting one unit per firing.
    struct Countdown {
        remaining: u32,
    }

    impl Scheduled for Countdown {
        fn next_delay(&self) -> Option<Duration> {
            (self.remaining > 0).then(|| Duration::from_millis(100))
        }

        fn fire(&mut self, ledger: &mut BalanceLedger) -> Result<(), GameError> {
            self.remaining -= 1;
            ledger.credit(GameType::Slots, 1.0)?;
            Ok(())
        }
    }

    #[test]
    fn test_run_until_idle() {
        let mut clock = VirtualClock::new();
        let mut ledger = BalanceLedger::new(0.0);
        let mut game = Countdown { remaining: 5 };

        let steps = clock.run_until_idle(&mut game, &mut ledger, 100).unwrap();
        assert_eq!(steps, 5);
        assert_eq!(clock.elapsed(), Duration::from_millis(500));
        assert_eq!(ledger.balance(), 5.0);
        assert_eq!(clock.step(&mut game, &mut ledger).unwrap(), None);
    }

    #[test]
    fn test_run_until_idle_respects_cap() {
        let mut clock = VirtualClock::new();
        let mut ledger = BalanceLedger::new(0.0);
        let mut game = Countdown { remaining: 5 };

        assert_eq!(clock.run_until_idle(&mut game, &mut ledger, 2).unwrap(), 2);
        assert_eq!(game.remaining, 3);
    }

    #[test]
    fn test_advance_by_fires_only_due_transitions() {
        let mut clock = VirtualClock::new();
        let mut ledger = BalanceLedger::new(0.0);
        let mut game = Countdown { remaining: 5 };

        assert_eq!(clock.advance_by(&mut game, &mut ledger, Duration::from_millis(250)).unwrap(), 2);
        assert_eq!(clock.elapsed(), Duration::from_millis(250));
        assert_eq!(game.remaining, 3);
    }

    #[tokio::test]
    async fn test_drive_with_tokio_timer() {
        let mut ledger = BalanceLedger::new(0.0);
        let mut game = Countdown { remaining: 2 };

        let steps = drive(&mut game, &mut ledger).await.unwrap();
        assert_eq!(steps, 2);
        assert_eq!(ledger.balance(), 2.0);
    }
}
