//! Configuration management with validation and defaults
//!
//! One TOML document covers the session ledger, the four game tables, the
//! relay service and the simulator. `ConfigLoader` layers `CASINO_*`
//! environment variables over the file and validates the result.

use crate::errors::{CasinoResult, ConfigurationError};
use crate::games::blackjack::BlackjackConfig;
use crate::games::crash::CrashConfig;
use crate::games::mines::{MinesConfig, TOTAL_CELLS};
use crate::games::slots::SlotsConfig;
use crate::games::types::TableLimits;
use crate::ledger::{DEFAULT_JOURNAL_CAPACITY, DEFAULT_OPENING_BALANCE};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CasinoConfig {
    pub ledger: LedgerConfig,
    pub blackjack: BlackjackConfig,
    pub mines: MinesConfig,
    pub crash: CrashConfig,
    pub slots: SlotsConfig,
    pub relay: RelayConfig,
    pub simulation: SimulationConfig,
}

/// Session balance settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    pub opening_balance: f64,
    pub journal_capacity: usize,
    /// Finished rounds kept in the session's recent history
    pub history_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            opening_balance: DEFAULT_OPENING_BALANCE,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            history_size: 5,
        }
    }
}

/// Relay HTTP service and chain settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub rpc_url: String,
    pub gas_limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relayer_private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarder_address: Option<String>,
    pub contracts: GameContracts,
    /// Base URL a session uses to reach the relay
    pub client_base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            rpc_url: "https://api.avax-test.network/ext/bc/C/rpc".to_string(),
            gas_limit: 800_000,
            relayer_private_key: None,
            forwarder_address: None,
            contracts: GameContracts::default(),
            client_base_url: "http://127.0.0.1:4000".to_string(),
        }
    }
}

/// Deployed game contract addresses
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameContracts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mines: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackjack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash: Option<String>,
}

/// Batch simulation defaults
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub rounds: usize,
    pub bet: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Mines placed per simulated mines round
    pub mine_count: usize,
    /// Gems revealed before cashing out
    pub mines_reveals: usize,
    /// Auto cash-out target for simulated crash runs
    pub crash_target: f64,
    /// Player stands at or above this total
    pub blackjack_stand_on: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rounds: 10_000,
            bet: 10.0,
            seed: None,
            mine_count: 3,
            mines_reveals: 3,
            crash_target: 2.0,
            blackjack_stand_on: 17,
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = match &self.config_path {
            Some(path) => self.load_from_file(path)?,
            None => CasinoConfig::default(),
        };

        apply_overrides(&mut config, |key| env::var(key).ok())?;
        self.validate(&config)?;
        Ok(config)
    }

    fn load_from_file(&self, path: &Path) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &CasinoConfig) -> CasinoResult<()> {
        let ledger = &config.ledger;
        if !ledger.opening_balance.is_finite() || ledger.opening_balance < 0.0 {
            return Err(invalid(
                "ledger.opening_balance",
                ledger.opening_balance,
                "Opening balance must be a non-negative amount",
            ));
        }

        check_limits("blackjack.limits", &config.blackjack.limits)?;
        check_limits("mines.limits", &config.mines.limits)?;
        check_limits("crash.limits", &config.crash.limits)?;
        check_limits("slots.limits", &config.slots.limits)?;

        for (field, value) in [
            ("blackjack.deal_delay_ms", config.blackjack.deal_delay_ms),
            ("blackjack.dealer_delay_ms", config.blackjack.dealer_delay_ms),
            ("blackjack.double_down_delay_ms", config.blackjack.double_down_delay_ms),
            ("crash.tick_ms", config.crash.tick_ms),
            ("slots.frame_ms", config.slots.frame_ms),
            ("slots.spin_ms", config.slots.spin_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, value, "Delay must be positive"));
            }
        }

        let mines = &config.mines;
        if mines.max_mines >= TOTAL_CELLS || mines.min_mines > mines.max_mines {
            return Err(invalid(
                "mines.max_mines",
                format!("{}..={}", mines.min_mines, mines.max_mines),
                "Mine limits must satisfy min <= max <= 24",
            ));
        }

        if !config.crash.crash_spread.is_finite() || config.crash.crash_spread <= 0.0 {
            return Err(invalid(
                "crash.crash_spread",
                config.crash.crash_spread,
                "Crash spread must be positive",
            ));
        }

        for (symbol, payout) in config.slots.payouts.entries() {
            if !payout.is_finite() || payout <= 0.0 {
                return Err(invalid(
                    &format!("slots.payouts.{:?}", symbol).to_lowercase(),
                    payout,
                    "Payout multipliers must be positive",
                ));
            }
        }

        if config.relay.port == 0 {
            return Err(invalid("relay.port", 0, "Port cannot be zero"));
        }
        if config.relay.rpc_url.is_empty() {
            return Err(ConfigurationError::MissingRequired("relay.rpc_url".to_string()).into());
        }

        let sim = &config.simulation;
        if sim.rounds == 0 {
            return Err(invalid("simulation.rounds", 0, "At least one round is required"));
        }
        if !sim.bet.is_finite() || sim.bet <= 0.0 {
            return Err(invalid("simulation.bet", sim.bet, "Bet must be positive"));
        }
        if sim.crash_target <= 1.0 {
            return Err(invalid(
                "simulation.crash_target",
                sim.crash_target,
                "Auto cash-out target must be above 1.0",
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, config: &CasinoConfig, path: P) -> CasinoResult<()> {
        let path = path.as_ref();
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path.display(), e)).into()
        })
    }
}

/// Apply `CASINO_*` overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut CasinoConfig, lookup: F) -> CasinoResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(balance) = lookup("CASINO_OPENING_BALANCE") {
        config.ledger.opening_balance = parse_var("CASINO_OPENING_BALANCE", balance, "Invalid amount")?;
    }

    if let Some(host) = lookup("CASINO_RELAY_HOST") {
        config.relay.host = host;
    }
    if let Some(port) = lookup("CASINO_RELAY_PORT") {
        config.relay.port = parse_var("CASINO_RELAY_PORT", port, "Invalid port number")?;
    }
    if let Some(origins) = lookup("CASINO_CORS_ORIGIN") {
        config.relay.allowed_origins = origins.split(',').map(|o| o.trim().to_string()).collect();
    }
    if let Some(url) = lookup("CASINO_RPC_URL") {
        config.relay.rpc_url = url;
    }
    if let Some(url) = lookup("CASINO_RELAY_URL") {
        config.relay.client_base_url = url;
    }
    if let Some(key) = lookup("CASINO_RELAYER_PRIVATE_KEY") {
        config.relay.relayer_private_key = Some(key);
    }
    if let Some(address) = lookup("CASINO_FORWARDER_ADDRESS") {
        config.relay.forwarder_address = Some(address);
    }

    let contracts = &mut config.relay.contracts;
    for (key, slot) in [
        ("CASINO_SLOTS_ADDRESS", &mut contracts.slots),
        ("CASINO_MINES_ADDRESS", &mut contracts.mines),
        ("CASINO_BLACKJACK_ADDRESS", &mut contracts.blackjack),
        ("CASINO_CRASH_ADDRESS", &mut contracts.crash),
    ] {
        if let Some(address) = lookup(key) {
            *slot = Some(address);
        }
    }

    if let Some(seed) = lookup("CASINO_SIMULATION_SEED") {
        config.simulation.seed = Some(parse_var("CASINO_SIMULATION_SEED", seed, "Invalid seed")?);
    }

    Ok(())
}

/// Write the default configuration to `path`
pub fn generate_sample_config<P: AsRef<Path>>(path: P) -> CasinoResult<()> {
    ConfigLoader::new().save(&CasinoConfig::default(), path)
}

fn parse_var<T: std::str::FromStr>(field: &str, value: String, reason: &str) -> CasinoResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
        .into()
    })
}

fn check_limits(field: &str, limits: &TableLimits) -> CasinoResult<()> {
    if !limits.min_bet.is_finite() || limits.min_bet < 0.0 {
        return Err(invalid(field, limits.min_bet, "Minimum bet must be non-negative"));
    }
    if let Some(max) = limits.max_bet {
        if max < limits.min_bet {
            return Err(invalid(
                field,
                format!("{}..{}", limits.min_bet, max),
                "Maximum bet is below the minimum",
            ));
        }
    }
    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> crate::errors::CasinoError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
