//! End-to-end rounds through a session: local play, timers and the relay
//! rollback path.

use async_trait::async_trait;
use casino_engine::config::CasinoConfig;
use casino_engine::games::blackjack::BlackjackResult;
use casino_engine::games::deck::{Card, Deck, Rank, Suit};
use casino_engine::games::mines::{calculate_multiplier, MineGrid};
use casino_engine::games::{BlackjackPhase, CrashPhase, GameOutcome, GameType, MinesPhase, VirtualClock};
use casino_engine::relay::{BetParams, BetSubmission, PlayResponse, RelayClient, RelayError};
use casino_engine::session::{RelayOutcome, Session};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const USER: &str = "0x00000000000000000000000000000000000000aa";

struct FailingRelay {
    calls: AtomicUsize,
}

#[async_trait]
impl RelayClient for FailingRelay {
    async fn submit_bet(&self, _submission: &BetSubmission) -> Result<PlayResponse, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RelayError::Rejected {
            status: 500,
            message: "execution reverted".to_string(),
        })
    }
}

struct AcceptingRelay;

#[async_trait]
impl RelayClient for AcceptingRelay {
    async fn submit_bet(&self, submission: &BetSubmission) -> Result<PlayResponse, RelayError> {
        Ok(PlayResponse {
            tx_hash: format!("0x{:064x}", submission.wager as u64),
            events: serde_json::json!([]),
        })
    }
}

fn session() -> Session {
    Session::seeded(&CasinoConfig::default(), 2024)
}

fn submission(wager: f64, params: BetParams) -> BetSubmission {
    BetSubmission {
        user_address: USER.to_string(),
        wager,
        params,
    }
}

#[test]
fn test_blackjack_stand_dealer_draws_to_twenty() {
    let mut session = session();
    let shoe = [Rank::Ten, Rank::Six, Rank::Nine, Rank::Four, Rank::King]
        .into_iter()
        .map(|rank| Card::new(rank, Suit::Spades));
    session.blackjack.load_shoe(Deck::from_cards(shoe));

    session.blackjack.start_round(&mut session.ledger, 10.0).unwrap();
    assert_eq!(session.balance(), 990.0);

    let mut clock = VirtualClock::new();
    session.run_timers(&mut clock, 100).unwrap();
    assert_eq!(session.blackjack.phase(), BlackjackPhase::Playing);
    assert_eq!(session.blackjack.player_hand().value, 19);

    session.blackjack.stand().unwrap();
    session.run_timers(&mut clock, 100).unwrap();

    assert_eq!(session.blackjack.phase(), BlackjackPhase::Ended);
    assert_eq!(session.blackjack.dealer_hand().value, 20);
    let settlement = session.blackjack.settlement().unwrap();
    assert_eq!(settlement.result, BlackjackResult::Lose);
    assert_eq!(session.balance(), 990.0);

    let rounds = session.recent_rounds();
    assert_eq!(rounds[0].game, GameType::Blackjack);
    assert_eq!(rounds[0].outcome, GameOutcome::Loss);
}

#[test]
fn test_mines_five_gems_then_cash_out() {
    let mut session = session();
    session
        .mines
        .load_grid(MineGrid::with_mines(&[(2, 0), (2, 1), (2, 2)]));

    session.mines.start_round(&mut session.ledger, 2.0, 3).unwrap();
    for col in 0..5 {
        session.mines.reveal(0, col).unwrap();
    }
    let multiplier = calculate_multiplier(5, 3).unwrap();
    let winnings = session.mines.cash_out(&mut session.ledger).unwrap();

    assert_eq!(winnings, 2.0 * multiplier);
    assert!((session.balance() - (1000.0 - 2.0 + 2.0 * multiplier)).abs() < 1e-9);
    assert_eq!(session.mines.phase(), MinesPhase::Ended);
}

#[tokio::test]
async fn test_relay_failure_rolls_back_wager() {
    let mut session = session();
    let relay = FailingRelay {
        calls: AtomicUsize::new(0),
    };

    session.crash.start_round(&mut session.ledger, 25.0).unwrap();
    assert_eq!(session.balance(), 975.0);

    let outcome = session
        .relay_wager(&relay, &submission(25.0, BetParams::Crash { multiplier: None }))
        .await
        .unwrap();

    assert!(matches!(outcome, RelayOutcome::RolledBack { refund, .. } if refund == 25.0));
    assert_eq!(session.balance(), 1000.0);
    assert_eq!(session.crash.phase(), CrashPhase::Idle);
    assert_eq!(relay.calls.load(Ordering::SeqCst), 1);

    // The table is back to betting and takes a new round
    session.crash.start_round(&mut session.ledger, 5.0).unwrap();
    assert_eq!(session.balance(), 995.0);
}

#[tokio::test]
async fn test_relay_failure_after_settlement_keeps_result() {
    let mut session = session();
    let relay = FailingRelay {
        calls: AtomicUsize::new(0),
    };

    session.slots.spin(&mut session.ledger, 10.0).unwrap();
    session.run_timers(&mut VirtualClock::new(), 1_000).unwrap();
    let settled = session.balance();

    let outcome = session
        .relay_wager(&relay, &submission(10.0, BetParams::Slots))
        .await
        .unwrap();

    assert!(matches!(outcome, RelayOutcome::Unconfirmed { .. }));
    assert_eq!(session.balance(), settled);
}

#[tokio::test]
async fn test_relay_success_leaves_round_running() {
    let mut session = session();
    session.mines.start_round(&mut session.ledger, 4.0, 3).unwrap();

    let outcome = session
        .relay_wager(&AcceptingRelay, &submission(4.0, BetParams::Mines { mines_picked: 3 }))
        .await
        .unwrap();

    assert!(matches!(outcome, RelayOutcome::Confirmed { ref tx_hash } if tx_hash.starts_with("0x")));
    assert_eq!(session.balance(), 996.0);
    assert_eq!(session.mines.phase(), MinesPhase::Playing);
}

#[tokio::test]
async fn test_drive_all_on_tokio_clock() {
    let mut config = CasinoConfig::default();
    config.slots.spin_ms = 300;
    config.slots.frame_ms = 100;
    let mut session = Session::seeded(&config, 5);

    session.slots.spin(&mut session.ledger, 1.0).unwrap();
    let started = tokio::time::Instant::now();
    let fired = session.drive_all().await.unwrap();

    assert_eq!(fired, 3);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(session.recent_rounds().len(), 1);
}

#[test]
fn test_manual_crash_cash_out_between_ticks() {
    let mut session = session();
    session.crash.load_crash_point(5.0);
    session.crash.start_round(&mut session.ledger, 10.0).unwrap();

    let mut clock = VirtualClock::new();
    for _ in 0..3 {
        assert!(clock.step(&mut session.crash, &mut session.ledger).unwrap().is_some());
    }
    assert_eq!(session.crash.multiplier(), 1.18);

    let winnings = session.crash.cash_out(&mut session.ledger).unwrap();
    assert_eq!(winnings, 11.8);
    assert_eq!(session.crash.phase(), CrashPhase::CashedOut);
    assert_eq!(session.crash.revealed_crash_point(), Some(5.0));
    assert!((session.balance() - 1001.8).abs() < 1e-9);
    assert_eq!(clock.step(&mut session.crash, &mut session.ledger).unwrap(), None);
}
