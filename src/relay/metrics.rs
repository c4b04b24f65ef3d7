//! Prometheus metrics for relayed bets

use super::errors::RelayError;
use crate::games::types::GameType;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

pub struct RelayMetrics {
    registry: Registry,
    bets_total: IntCounterVec,
    forward_seconds: HistogramVec,
}

impl RelayMetrics {
    pub fn new() -> Result<Self, RelayError> {
        let registry = Registry::new_custom(Some("casino_relay".to_string()), None)?;

        let bets_total = IntCounterVec::new(
            Opts::new("bets_total", "Bets received by the relay, by game and result"),
            &["game", "status"],
        )?;
        let forward_seconds = HistogramVec::new(
            HistogramOpts::new("forward_seconds", "Time from request to mined receipt")
                .buckets(vec![0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0]),
            &["game"],
        )?;

        registry.register(Box::new(bets_total.clone()))?;
        registry.register(Box::new(forward_seconds.clone()))?;

        Ok(Self {
            registry,
            bets_total,
            forward_seconds,
        })
    }

    pub fn record(&self, game: GameType, status: &str, elapsed: Duration) {
        let game = game.to_string();
        self.bets_total.with_label_values(&[game.as_str(), status]).inc();
        if status == "ok" {
            self.forward_seconds
                .with_label_values(&[game.as_str()])
                .observe(elapsed.as_secs_f64());
        }
    }

    pub fn bets(&self, game: GameType, status: &str) -> u64 {
        let game = game.to_string();
        self.bets_total.with_label_values(&[game.as_str(), status]).get()
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String, RelayError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| RelayError::Metrics(e.to_string()))
    }
}
