//! Mines: a 5x5 grid hiding a chosen number of mines
//!
//! Every gem revealed raises the cash-out multiplier; revealing a mine loses
//! the stake. The round is fully synchronous: `Betting -> Playing -> Ended`.

use super::rng::{self, fisher_yates};
use super::types::{GameOutcome, GameType, RoundSummary, TableLimits};
use crate::errors::GameError;
use crate::ledger::BalanceLedger;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const GRID_SIZE: usize = 5;
pub const TOTAL_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Share of the fair multiplier paid out
pub const HOUSE_EDGE_FACTOR: f64 = 0.97;

/// How the cash-out multiplier grows with each gem.
///
/// `Fair` is the default: the per-gem formula kept as `Legacy` is not
/// monotonic, so tables only use it when configured to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MultiplierModel {
    /// Inverse survival odds of the revealed gems: `(25 - i) / (safe - i)`.
    #[default]
    Fair,
    /// Per-gem factor `(safe - i) / (safe - i - mines + gems)`. Does not grow
    /// monotonically and falls back to the 1.0 floor for most boards.
    Legacy,
}

impl MultiplierModel {
    /// Multiplier after `gems_found` gems on a board with `mine_count` mines,
    /// or `None` once the pair does not fit on the grid.
    pub fn multiplier(&self, gems_found: usize, mine_count: usize) -> Option<f64> {
        if gems_found + mine_count > TOTAL_CELLS {
            return None;
        }
        if gems_found == 0 {
            return Some(1.0);
        }

        let safe = (TOTAL_CELLS - mine_count) as f64;
        let mut multiplier = 1.0;
        for i in 0..gems_found {
            let i = i as f64;
            let factor = match self {
                MultiplierModel::Fair => (TOTAL_CELLS as f64 - i) / (safe - i),
                MultiplierModel::Legacy => {
                    let denominator = safe - i - mine_count as f64 + gems_found as f64;
                    if denominator <= 0.0 {
                        return None;
                    }
                    (safe - i) / denominator
                }
            };
            multiplier *= factor;
        }
        Some((multiplier * HOUSE_EDGE_FACTOR).max(1.0))
    }
}

/// Cash-out multiplier under the default model
pub fn calculate_multiplier(gems_found: usize, mine_count: usize) -> Option<f64> {
    MultiplierModel::default().multiplier(gems_found, mine_count)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub is_revealed: bool,
    pub is_mine: bool,
    pub is_gem: bool,
}

/// Board layout. Only the revealed flags change after placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MineGrid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
    mine_count: usize,
}

impl MineGrid {
    /// Shuffle all 25 positions and mine the first `mine_count`.
    pub fn place<R: Rng + ?Sized>(mine_count: usize, rng: &mut R) -> Result<Self, GameError> {
        let mut positions: Vec<(usize, usize)> = (0..GRID_SIZE)
            .flat_map(|row| (0..GRID_SIZE).map(move |col| (row, col)))
            .collect();
        fisher_yates(&mut positions, rng);
        let mines = positions
            .get(..mine_count)
            .ok_or_else(|| {
                GameError::InvalidParameter(format!(
                    "{} mines do not fit on a {}-cell grid",
                    mine_count, TOTAL_CELLS
                ))
            })?;
        Ok(Self::with_mines(mines))
    }

    /// Board with mines at exactly the given coordinates
    pub fn with_mines(mines: &[(usize, usize)]) -> Self {
        let mut cells = [[Cell {
            is_revealed: false,
            is_mine: false,
            is_gem: true,
        }; GRID_SIZE]; GRID_SIZE];
        for &(row, col) in mines {
            if let Some(cell) = cells.get_mut(row).and_then(|r| r.get_mut(col)) {
                cell.is_mine = true;
                cell.is_gem = false;
            }
        }
        let mine_count = cells.iter().flatten().filter(|c| c.is_mine).count();
        Self { cells, mine_count }
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn rows(&self) -> &[[Cell; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    pub fn revealed_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_revealed).count()
    }

    fn reveal(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            cell.is_revealed = true;
        }
    }

    fn reveal_all_mines(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            if cell.is_mine {
                cell.is_revealed = true;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RevealOutcome {
    Gem { gems_found: usize, multiplier: f64 },
    Mine,
    AlreadyRevealed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MinesPhase {
    Betting,
    Playing,
    Ended,
}

impl MinesPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinesPhase::Betting => "betting",
            MinesPhase::Playing => "playing",
            MinesPhase::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MinesConfig {
    pub limits: TableLimits,
    pub min_mines: usize,
    pub max_mines: usize,
    pub model: MultiplierModel,
}

impl Default for MinesConfig {
    fn default() -> Self {
        Self {
            limits: TableLimits::new(0.01, None),
            min_mines: 1,
            max_mines: 10,
            model: MultiplierModel::Fair,
        }
    }
}

/// What the player sees of a cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisibleCell {
    Hidden,
    Gem,
    Mine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinesView {
    pub phase: MinesPhase,
    pub bet: f64,
    pub mine_count: usize,
    pub gems_found: usize,
    pub multiplier: f64,
    pub next_payout: f64,
    pub cells: Vec<Vec<VisibleCell>>,
    pub outcome: Option<GameOutcome>,
}

pub struct MinesGame<R: Rng = StdRng> {
    config: MinesConfig,
    rng: R,
    staged: Option<MineGrid>,
    grid: MineGrid,
    phase: MinesPhase,
    bet: f64,
    gems_found: usize,
    multiplier: f64,
    outcome: Option<GameOutcome>,
    finished: Option<RoundSummary>,
}

impl MinesGame<StdRng> {
    pub fn from_entropy(config: MinesConfig) -> Self {
        Self::new(config, rng::from_entropy())
    }
}

impl<R: Rng> MinesGame<R> {
    pub fn new(config: MinesConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            staged: None,
            grid: MineGrid::with_mines(&[]),
            phase: MinesPhase::Betting,
            bet: 0.0,
            gems_found: 0,
            multiplier: 1.0,
            outcome: None,
            finished: None,
        }
    }

    pub fn phase(&self) -> MinesPhase {
        self.phase
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn gems_found(&self) -> usize {
        self.gems_found
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn grid(&self) -> &MineGrid {
        &self.grid
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn config(&self) -> &MinesConfig {
        &self.config
    }

    /// Play the next round on `grid` instead of a random placement. The
    /// grid's own mine count overrides the one passed to `start_round`.
    pub fn load_grid(&mut self, grid: MineGrid) {
        self.staged = Some(grid);
    }

    pub fn take_finished(&mut self) -> Option<RoundSummary> {
        self.finished.take()
    }

    pub fn start_round(
        &mut self,
        ledger: &mut BalanceLedger,
        bet: f64,
        mine_count: usize,
    ) -> Result<(), GameError> {
        self.require(MinesPhase::Betting, "start")?;
        let mine_count = self.staged.as_ref().map_or(mine_count, MineGrid::mine_count);
        if mine_count < self.config.min_mines || mine_count > self.config.max_mines {
            return Err(GameError::InvalidParameter(format!(
                "mine count {} outside {}..={}",
                mine_count, self.config.min_mines, self.config.max_mines
            )));
        }
        self.config.limits.check(bet).map_err(GameError::InvalidBet)?;
        if !ledger.can_cover(bet) {
            return Err(GameError::InsufficientBalance {
                wager: bet,
                balance: ledger.balance(),
            });
        }

        let grid = match self.staged.take() {
            Some(grid) => grid,
            None => MineGrid::place(mine_count, &mut self.rng)?,
        };
        ledger.debit(GameType::Mines, bet)?;

        self.grid = grid;
        self.bet = bet;
        self.gems_found = 0;
        self.multiplier = 1.0;
        self.outcome = None;
        self.finished = None;
        self.phase = MinesPhase::Playing;
        debug!(bet, mine_count, "mines round started");
        Ok(())
    }

    /// Uncover one cell. Revealing a mine ends the round and shows every mine.
    pub fn reveal(&mut self, row: usize, col: usize) -> Result<RevealOutcome, GameError> {
        self.require(MinesPhase::Playing, "reveal")?;
        let cell = *self.grid.cell(row, col).ok_or_else(|| {
            GameError::InvalidParameter(format!(
                "cell ({}, {}) is outside the {}x{} grid",
                row, col, GRID_SIZE, GRID_SIZE
            ))
        })?;
        if cell.is_revealed {
            return Ok(RevealOutcome::AlreadyRevealed);
        }
        self.grid.reveal(row, col);

        if cell.is_mine {
            self.grid.reveal_all_mines();
            self.phase = MinesPhase::Ended;
            self.outcome = Some(GameOutcome::Loss);
            self.multiplier = 0.0;
            self.finished = Some(RoundSummary::new(GameType::Mines, self.bet, 0.0, 0.0, GameOutcome::Loss));
            info!(bet = self.bet, gems_found = self.gems_found, "mines round lost");
            return Ok(RevealOutcome::Mine);
        }

        self.gems_found += 1;
        if let Some(multiplier) = self.config.model.multiplier(self.gems_found, self.grid.mine_count()) {
            self.multiplier = multiplier;
        }
        Ok(RevealOutcome::Gem {
            gems_found: self.gems_found,
            multiplier: self.multiplier,
        })
    }

    /// Collect bet x current multiplier. Needs at least one gem.
    pub fn cash_out(&mut self, ledger: &mut BalanceLedger) -> Result<f64, GameError> {
        self.require(MinesPhase::Playing, "cash out")?;
        if self.gems_found == 0 {
            return Err(GameError::illegal(GameType::Mines, "cash out", "no gems found"));
        }
        let winnings = self.bet * self.multiplier;
        ledger.credit(GameType::Mines, winnings)?;

        self.phase = MinesPhase::Ended;
        self.outcome = Some(GameOutcome::Win);
        self.finished = Some(RoundSummary::new(
            GameType::Mines,
            self.bet,
            winnings,
            self.multiplier,
            GameOutcome::Win,
        ));
        info!(bet = self.bet, gems_found = self.gems_found, multiplier = self.multiplier, winnings, "mines cashed out");
        Ok(winnings)
    }

    pub fn reset(&mut self) -> Result<(), GameError> {
        self.require(MinesPhase::Ended, "reset")?;
        self.clear();
        Ok(())
    }

    /// Refund the stake of a round in play and return to betting.
    pub fn abandon(&mut self, ledger: &mut BalanceLedger) -> Result<f64, GameError> {
        self.require(MinesPhase::Playing, "abandon")?;
        let refund = self.bet;
        ledger.credit(GameType::Mines, refund)?;
        self.finished = Some(RoundSummary::new(GameType::Mines, refund, refund, 1.0, GameOutcome::Refunded));
        self.clear();
        Ok(refund)
    }

    pub fn view(&self) -> MinesView {
        let cells = self
            .grid
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match (cell.is_revealed, cell.is_mine) {
                        (false, _) => VisibleCell::Hidden,
                        (true, true) => VisibleCell::Mine,
                        (true, false) => VisibleCell::Gem,
                    })
                    .collect()
            })
            .collect();
        MinesView {
            phase: self.phase,
            bet: self.bet,
            mine_count: self.grid.mine_count(),
            gems_found: self.gems_found,
            multiplier: self.multiplier,
            next_payout: self.bet * self.multiplier,
            cells,
            outcome: self.outcome,
        }
    }

    fn clear(&mut self) {
        self.phase = MinesPhase::Betting;
        self.grid = MineGrid::with_mines(&[]);
        self.gems_found = 0;
        self.multiplier = 1.0;
        self.outcome = None;
    }

    fn require(&self, phase: MinesPhase, action: &'static str) -> Result<(), GameError> {
        if self.phase != phase {
            debug!(action, phase = self.phase.as_str(), "mines action rejected");
            return Err(GameError::illegal(GameType::Mines, action, self.phase.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::seeded;

    fn game() -> MinesGame<StdRng> {
        MinesGame::new(MinesConfig::default(), seeded(17))
    }

    #[test]
    fn test_multiplier_starts_at_one() {
        for mines in 0..=24 {
            assert_eq!(calculate_multiplier(0, mines), Some(1.0));
        }
    }

    #[test]
    fn test_fair_multiplier_strictly_increasing() {
        for mines in 1..=24 {
            let mut previous = 1.0;
            for gems in 1..=(TOTAL_CELLS - mines) {
                let current = calculate_multiplier(gems, mines).unwrap();
                assert!(current > previous, "m({}, {}) = {} <= {}", gems, mines, current, previous);
                previous = current;
            }
        }
    }

    #[test]
    fn test_multiplier_undefined_past_grid() {
        assert!(calculate_multiplier(23, 3).is_none());
        assert!(calculate_multiplier(22, 3).is_some());
        assert!(MultiplierModel::Legacy.multiplier(26, 0).is_none());
    }

    #[test]
    fn test_fair_multiplier_values() {
        let one_gem = calculate_multiplier(1, 3).unwrap();
        assert!((one_gem - 25.0 / 22.0 * 0.97).abs() < 1e-12);

        let five_gems = calculate_multiplier(5, 3).unwrap();
        assert!((five_gems - 13800.0 / 6840.0 * 0.97).abs() < 1e-9);
    }

    #[test]
    fn test_default_model_is_fair() {
        assert_eq!(MultiplierModel::default(), MultiplierModel::Fair);
        assert_eq!(MinesConfig::default().model, MultiplierModel::Fair);
        assert_eq!(calculate_multiplier(4, 5), MultiplierModel::Fair.multiplier(4, 5));
        assert_ne!(calculate_multiplier(5, 3), MultiplierModel::Legacy.multiplier(5, 3));
    }

    #[test]
    fn test_legacy_multiplier_values() {
        let legacy = MultiplierModel::Legacy;
        assert!((legacy.multiplier(1, 3).unwrap() - 1.1 * 0.97).abs() < 1e-12);
        assert_eq!(legacy.multiplier(5, 3), Some(1.0));
    }

    #[test]
    fn test_place_mines() {
        let mut rng = seeded(5);
        for mines in [0, 1, 3, 10, 24, 25] {
            let grid = MineGrid::place(mines, &mut rng).unwrap();
            assert_eq!(grid.mine_count(), mines);
            let gems = grid.rows().iter().flatten().filter(|c| c.is_gem).count();
            assert_eq!(gems, TOTAL_CELLS - mines);
            assert_eq!(grid.revealed_count(), 0);
        }
        assert!(MineGrid::place(26, &mut rng).is_err());
    }

    #[test]
    fn test_gems_then_cash_out() {
        let mut ledger = BalanceLedger::new(100.0);
        let mut game = game();
        game.load_grid(MineGrid::with_mines(&[(0, 0), (0, 1), (0, 2)]));

        game.start_round(&mut ledger, 2.0, 3).unwrap();
        assert_eq!(ledger.balance(), 98.0);

        for col in 0..GRID_SIZE {
            let outcome = game.reveal(4, col).unwrap();
            assert!(matches!(outcome, RevealOutcome::Gem { gems_found, .. } if gems_found == col + 1));
        }
        let expected = calculate_multiplier(5, 3).unwrap();
        assert_eq!(game.multiplier(), expected);

        let winnings = game.cash_out(&mut ledger).unwrap();
        assert_eq!(winnings, 2.0 * expected);
        assert_eq!(ledger.balance(), 98.0 + 2.0 * expected);
        assert_eq!(game.phase(), MinesPhase::Ended);
        assert_eq!(game.take_finished().unwrap().outcome, GameOutcome::Win);
    }

    #[test]
    fn test_mine_ends_round_and_reveals_mines() {
        let mut ledger = BalanceLedger::new(10.0);
        let mut game = game();
        game.load_grid(MineGrid::with_mines(&[(1, 1), (2, 2), (3, 3)]));

        game.start_round(&mut ledger, 2.0, 3).unwrap();
        game.reveal(0, 0).unwrap();
        assert_eq!(game.reveal(2, 2).unwrap(), RevealOutcome::Mine);

        assert_eq!(game.phase(), MinesPhase::Ended);
        assert_eq!(game.outcome(), Some(GameOutcome::Loss));
        assert_eq!(ledger.balance(), 8.0);
        let view = game.view();
        let shown_mines = view.cells.iter().flatten().filter(|c| **c == VisibleCell::Mine).count();
        let shown_gems = view.cells.iter().flatten().filter(|c| **c == VisibleCell::Gem).count();
        assert_eq!(shown_mines, 3);
        assert_eq!(shown_gems, 1);

        assert!(game.reveal(4, 4).unwrap_err().is_illegal_action());
        assert!(game.cash_out(&mut ledger).unwrap_err().is_illegal_action());
    }

    #[test]
    fn test_reveal_same_cell_twice_is_noop() {
        let mut ledger = BalanceLedger::new(10.0);
        let mut game = game();
        game.load_grid(MineGrid::with_mines(&[(0, 0)]));

        game.start_round(&mut ledger, 1.0, 1).unwrap();
        game.reveal(3, 3).unwrap();
        let multiplier = game.multiplier();

        assert_eq!(game.reveal(3, 3).unwrap(), RevealOutcome::AlreadyRevealed);
        assert_eq!(game.gems_found(), 1);
        assert_eq!(game.multiplier(), multiplier);
    }

    #[test]
    fn test_cash_out_needs_a_gem() {
        let mut ledger = BalanceLedger::new(10.0);
        let mut game = game();

        game.start_round(&mut ledger, 1.0, 3).unwrap();
        assert!(game.cash_out(&mut ledger).unwrap_err().is_illegal_action());
        assert_eq!(ledger.balance(), 9.0);
        assert_eq!(game.phase(), MinesPhase::Playing);
    }

    #[test]
    fn test_start_round_validation() {
        let mut ledger = BalanceLedger::new(10.0);
        let mut game = game();

        assert!(matches!(
            game.start_round(&mut ledger, 1.0, 0).unwrap_err(),
            GameError::InvalidParameter(_)
        ));
        assert!(matches!(
            game.start_round(&mut ledger, 1.0, 11).unwrap_err(),
            GameError::InvalidParameter(_)
        ));
        assert!(matches!(
            game.start_round(&mut ledger, 0.001, 3).unwrap_err(),
            GameError::InvalidBet(_)
        ));
        assert!(matches!(
            game.start_round(&mut ledger, 20.0, 3).unwrap_err(),
            GameError::InsufficientBalance { .. }
        ));
        assert_eq!(ledger.balance(), 10.0);
        assert!(game.reveal(0, 0).unwrap_err().is_illegal_action());
    }

    #[test]
    fn test_reveal_outside_grid() {
        let mut ledger = BalanceLedger::new(10.0);
        let mut game = game();
        game.start_round(&mut ledger, 1.0, 3).unwrap();

        assert!(matches!(game.reveal(5, 0).unwrap_err(), GameError::InvalidParameter(_)));
        assert_eq!(game.grid().revealed_count(), 0);
    }

    #[test]
    fn test_abandon_and_reset() {
        let mut ledger = BalanceLedger::new(10.0);
        let mut game = game();

        game.start_round(&mut ledger, 4.0, 2).unwrap();
        assert_eq!(game.abandon(&mut ledger).unwrap(), 4.0);
        assert_eq!(ledger.balance(), 10.0);
        assert_eq!(game.phase(), MinesPhase::Betting);

        game.load_grid(MineGrid::with_mines(&[(0, 0), (0, 1)]));
        game.start_round(&mut ledger, 4.0, 2).unwrap();
        game.reveal(0, 0).unwrap();
        game.reset().unwrap();
        assert_eq!(game.phase(), MinesPhase::Betting);
        assert_eq!(game.gems_found(), 0);
        assert_eq!(game.multiplier(), 1.0);
    }

    #[test]
    fn test_view_hides_unrevealed_cells() {
        let mut ledger = BalanceLedger::new(10.0);
        let mut game = game();
        game.start_round(&mut ledger, 1.0, 5).unwrap();

        let view = game.view();
        assert!(view.cells.iter().flatten().all(|c| *c == VisibleCell::Hidden));
        assert_eq!(view.mine_count, 5);
        assert_eq!(view.next_payout, 1.0);
    }
}
