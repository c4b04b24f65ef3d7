pub mod types;
pub mod rng;
pub mod deck;
pub mod scheduler;
pub mod blackjack;
pub mod mines;
pub mod crash;
pub mod slots;

pub use types::*;
pub use scheduler::{drive, Scheduled, VirtualClock};
pub use blackjack::{BlackjackConfig, BlackjackPhase, BlackjackResult, BlackjackTable};
pub use mines::{MinesConfig, MinesGame, MinesPhase, MultiplierModel};
pub use crash::{CrashConfig, CrashGame, CrashPhase};
pub use slots::{PayoutTable, SlotMachine, SlotsConfig, SlotsPhase, Symbol};
