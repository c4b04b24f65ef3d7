//! Relay request and response models
//!
//! Field names follow the JSON the casino front-end sends (camelCase).

use crate::games::types::GameType;
use serde::{Deserialize, Serialize};

/// Wager amount as sent by the front-end: a JSON number or a decimal string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BetAmount {
    Number(f64),
    Text(String),
}

impl BetAmount {
    /// Decimal representation handed to the ether parser
    pub fn as_decimal(&self) -> String {
        match self {
            BetAmount::Number(value) => value.to_string(),
            BetAmount::Text(text) => text.trim().to_string(),
        }
    }
}

/// Integer game argument as sent by the front-end: a JSON number, a decimal
/// string or a 0x-prefixed hex string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UintField {
    Number(serde_json::Number),
    Text(String),
}

impl UintField {
    /// Non-negative integer value; `None` for fractions, negatives and junk
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            UintField::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v < u64::MAX as f64)
                    .map(|v| v as u64)
            }),
            UintField::Text(text) => {
                let text = text.trim();
                match text.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16).ok(),
                    None => text.parse().ok(),
                }
            }
        }
    }
}

impl From<u64> for UintField {
    fn from(value: u64) -> Self {
        UintField::Number(value.into())
    }
}

impl std::fmt::Display for UintField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UintField::Number(n) => write!(f, "{}", n),
            UintField::Text(text) => write!(f, "{:?}", text),
        }
    }
}

/// Body of every `POST /api/...` game route. Each game reads the fields it
/// needs; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet_eth: Option<BetAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet_native: Option<BetAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mines_picked: Option<UintField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<UintField>,
}

impl PlayRequest {
    /// `betNative` wins over `betEth`
    pub fn bet(&self) -> Option<&BetAmount> {
        self.bet_native.as_ref().or(self.bet_eth.as_ref())
    }

    pub fn user(&self) -> Option<&str> {
        self.user_address.as_deref().filter(|u| !u.is_empty())
    }

    /// Wire form of a session wager
    pub fn from_submission(submission: &BetSubmission) -> Self {
        let mut request = PlayRequest {
            user_address: Some(submission.user_address.clone()),
            bet_native: Some(BetAmount::Number(submission.wager)),
            ..Default::default()
        };
        match &submission.params {
            BetParams::Slots => {}
            BetParams::Mines { mines_picked } => request.mines_picked = Some(u64::from(*mines_picked).into()),
            BetParams::Blackjack { action } => request.action = Some(action.clone()),
            BetParams::Crash { multiplier } => request.multiplier = multiplier.map(UintField::from),
        }
        request
    }
}

/// Successful relay answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub tx_hash: String,
    pub events: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Game-specific arguments of a relayed wager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum BetParams {
    Slots,
    Mines { mines_picked: u8 },
    Blackjack { action: String },
    /// Forwarded to `play(uint256)` unchanged
    Crash { multiplier: Option<u64> },
}

impl BetParams {
    pub fn game(&self) -> GameType {
        match self {
            BetParams::Slots => GameType::Slots,
            BetParams::Mines { .. } => GameType::Mines,
            BetParams::Blackjack { .. } => GameType::Blackjack,
            BetParams::Crash { .. } => GameType::Crash,
        }
    }
}

/// A wager a session submits to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSubmission {
    pub user_address: String,
    pub wager: f64,
    pub params: BetParams,
}

impl BetSubmission {
    pub fn game(&self) -> GameType {
        self.params.game()
    }
}
