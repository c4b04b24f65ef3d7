//! Forwarding game calls on chain
//!
//! The relayer wallet pays gas and submits `forwardCall(target, user, data)`
//! to the forwarder contract with the wager attached as value.

use super::errors::RelayError;
use crate::config::RelayConfig;
use crate::games::types::GameType;
use async_trait::async_trait;
use ethers::prelude::*;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

abigen!(
    ForwarderContract,
    r#"[
        function forwardCall(address target, address user, bytes data) external payable returns (bytes)
    ]"#
);

/// One game call to forward
#[derive(Debug, Clone)]
pub struct ForwardCall {
    pub game: GameType,
    pub user: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Mined transaction summary
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardReceipt {
    pub tx_hash: String,
    pub events: serde_json::Value,
}

#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Submit the call and wait for its receipt
    async fn forward(&self, call: ForwardCall) -> Result<ForwardReceipt, RelayError>;

    /// Chain the relayer is connected to, if known
    fn chain_id(&self) -> Option<u64>;
}

type RelayerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

pub struct EthersForwarder {
    contract: ForwarderContract<RelayerClient>,
    targets: HashMap<GameType, Address>,
    gas_limit: u64,
    chain_id: u64,
}

impl EthersForwarder {
    /// Connect the relayer wallet to the configured RPC endpoint.
    pub async fn connect(config: &RelayConfig) -> Result<Self, RelayError> {
        let key = config
            .relayer_private_key
            .as_deref()
            .ok_or_else(|| RelayError::NotConfigured("relayer private key missing".to_string()))?;
        let forwarder_address = config
            .forwarder_address
            .as_deref()
            .ok_or_else(|| RelayError::NotConfigured("forwarder address missing".to_string()))?;
        let forwarder_address = parse_address("forwarder", forwarder_address)?;

        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| RelayError::NotConfigured(format!("invalid RPC URL: {}", e)))?;
        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| RelayError::Forwarder(format!("failed to query chain id: {}", e)))?
            .as_u64();

        let wallet: LocalWallet = key
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| RelayError::NotConfigured("invalid relayer private key".to_string()))?;
        let wallet = wallet.with_chain_id(chain_id);
        info!(relayer = ?wallet.address(), chain_id, "relayer wallet loaded");

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = ForwarderContract::new(forwarder_address, client);

        let contracts = &config.contracts;
        let mut targets = HashMap::new();
        for (game, address) in [
            (GameType::Slots, &contracts.slots),
            (GameType::Mines, &contracts.mines),
            (GameType::Blackjack, &contracts.blackjack),
            (GameType::Crash, &contracts.crash),
        ] {
            if let Some(address) = address {
                targets.insert(game, parse_address(&game.to_string(), address)?);
            }
        }

        Ok(Self {
            contract,
            targets,
            gas_limit: config.gas_limit,
            chain_id,
        })
    }

    fn target(&self, game: GameType) -> Result<Address, RelayError> {
        self.targets
            .get(&game)
            .copied()
            .ok_or_else(|| RelayError::NotConfigured(format!("no contract address for {}", game)))
    }
}

#[async_trait]
impl Forwarder for EthersForwarder {
    async fn forward(&self, call: ForwardCall) -> Result<ForwardReceipt, RelayError> {
        let target = self.target(call.game)?;
        debug!(game = %call.game, target = ?target, user = ?call.user, value = %call.value, "forwarding call");

        let tx = self
            .contract
            .forward_call(target, call.user, call.data)
            .value(call.value)
            .gas(self.gas_limit);
        let pending = tx
            .send()
            .await
            .map_err(|e| RelayError::Forwarder(e.to_string()))?;
        let receipt = pending
            .await
            .map_err(|e| RelayError::Forwarder(e.to_string()))?
            .ok_or_else(|| RelayError::Forwarder("transaction dropped before mining".to_string()))?;

        let events = serde_json::to_value(&receipt.logs)
            .map_err(|e| RelayError::Forwarder(format!("failed to encode logs: {}", e)))?;
        Ok(ForwardReceipt {
            tx_hash: format!("0x{}", hex::encode(receipt.transaction_hash)),
            events,
        })
    }

    fn chain_id(&self) -> Option<u64> {
        Some(self.chain_id)
    }
}

/// Parse a 0x-prefixed account or contract address
pub fn parse_address(label: &str, value: &str) -> Result<Address, RelayError> {
    Address::from_str(value.trim())
        .map_err(|_| RelayError::InvalidRequest(format!("invalid {} address '{}'", label, value)))
}
