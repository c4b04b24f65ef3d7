//! Meta-transaction relay
//!
//! An HTTP service that accepts game wagers from players, encodes the game
//! contract call and forwards it through a trusted forwarder contract paid for
//! by the relayer wallet.

pub mod calldata;
pub mod client;
pub mod errors;
pub mod forwarder;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use client::{HttpRelayClient, RelayClient};
pub use errors::RelayError;
pub use forwarder::{EthersForwarder, ForwardCall, ForwardReceipt, Forwarder};
pub use handlers::RelayState;
pub use metrics::RelayMetrics;
pub use models::{BetParams, BetSubmission, PlayRequest, PlayResponse};
pub use server::{build_app, RelayServer};
