//! ABI encoding of the game contract calls
//!
//! Each game contract exposes one payable entry point; the relay wraps its
//! calldata in a forwarder call on behalf of the player.

use super::errors::RelayError;
use super::models::{BetAmount, PlayRequest, UintField};
use crate::games::types::GameType;
use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use ethers::types::{Bytes, U256};
use ethers::utils::parse_ether;

/// Human-readable ABI of each game's entry point
pub fn game_abi(game: GameType) -> &'static str {
    match game {
        GameType::Slots => "function spin() external payable",
        GameType::Mines => "function play(uint8 minesPicked) external payable",
        GameType::Blackjack => "function play(string action) external payable",
        GameType::Crash => "function play(uint256 multiplier) external payable",
    }
}

/// Message returned when a game's required fields are absent
pub fn missing_fields_message(game: GameType) -> &'static str {
    match game {
        GameType::Slots => "userAddress and bet amount required",
        GameType::Mines => "userAddress, bet and minesPicked required",
        GameType::Blackjack => "userAddress, bet and action required",
        GameType::Crash => "userAddress and bet required",
    }
}

/// Reject requests lacking the fields `game` needs
pub fn require_fields(game: GameType, request: &PlayRequest) -> Result<(), RelayError> {
    let complete = request.user().is_some()
        && request.bet().is_some()
        && match game {
            GameType::Mines => request.mines_picked.is_some(),
            GameType::Blackjack => request.action.as_deref().is_some_and(|a| !a.is_empty()),
            GameType::Slots | GameType::Crash => true,
        };
    if complete {
        Ok(())
    } else {
        Err(RelayError::MissingField(missing_fields_message(game).to_string()))
    }
}

/// Crash argument forwarded as given, 0 when absent
pub fn crash_target(multiplier: Option<&UintField>) -> Result<U256, RelayError> {
    match multiplier {
        None => Ok(U256::zero()),
        Some(field) => field
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| RelayError::InvalidRequest(format!("invalid crash multiplier {}", field))),
    }
}

/// Calldata of `game`'s entry point built from the request fields
pub fn encode_game_call(game: GameType, request: &PlayRequest) -> Result<Bytes, RelayError> {
    let abi = parse_abi(&[game_abi(game)])
        .map_err(|e| RelayError::InvalidRequest(format!("bad ABI for {}: {}", game, e)))?;
    let contract = BaseContract::from(abi);

    let encoded = match game {
        GameType::Slots => contract.encode("spin", ()),
        GameType::Mines => {
            let field = request
                .mines_picked
                .as_ref()
                .ok_or_else(|| RelayError::MissingField(missing_fields_message(game).to_string()))?;
            let picked = field
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| RelayError::InvalidRequest(format!("minesPicked {} does not fit uint8", field)))?;
            contract.encode("play", (picked,))
        }
        GameType::Blackjack => {
            let action = request
                .action
                .clone()
                .ok_or_else(|| RelayError::MissingField(missing_fields_message(game).to_string()))?;
            contract.encode("play", (action,))
        }
        GameType::Crash => contract.encode("play", (crash_target(request.multiplier.as_ref())?,)),
    };
    encoded.map_err(|e| RelayError::InvalidRequest(format!("failed to encode {} call: {}", game, e)))
}

/// Wager in wei
pub fn wager_wei(bet: &BetAmount) -> Result<U256, RelayError> {
    let decimal = bet.as_decimal();
    parse_ether(&decimal).map_err(|e| RelayError::InvalidRequest(format!("invalid bet amount '{}': {}", decimal, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::id;

    fn request() -> PlayRequest {
        PlayRequest {
            user_address: Some("0x0000000000000000000000000000000000000001".to_string()),
            bet_eth: Some(BetAmount::Text("0.01".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_spin_calldata_is_bare_selector() {
        let data = encode_game_call(GameType::Slots, &request()).unwrap();
        assert_eq!(data.as_ref(), &id("spin()")[..]);
    }

    #[test]
    fn test_mines_calldata() {
        let mut req = request();
        req.mines_picked = Some(7u64.into());
        let data = encode_game_call(GameType::Mines, &req).unwrap();

        assert_eq!(&data[..4], &id("play(uint8)")[..]);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 7);

        req.mines_picked = Some(UintField::Text("3".to_string()));
        assert_eq!(encode_game_call(GameType::Mines, &req).unwrap()[35], 3);

        for bad in [UintField::from(300u64), UintField::Text("-1".to_string())] {
            req.mines_picked = Some(bad);
            assert!(matches!(
                encode_game_call(GameType::Mines, &req).unwrap_err(),
                RelayError::InvalidRequest(_)
            ));
        }
    }

    #[test]
    fn test_blackjack_calldata_carries_action() {
        let mut req = request();
        req.action = Some("hit".to_string());
        let data = encode_game_call(GameType::Blackjack, &req).unwrap();

        assert_eq!(&data[..4], &id("play(string)")[..]);
        // offset word, length word, padded payload
        assert_eq!(data.len(), 4 + 32 * 3);
        assert_eq!(&data[4 + 64..4 + 64 + 3], b"hit");
    }

    #[test]
    fn test_crash_multiplier_forwarded_unchanged() {
        assert_eq!(crash_target(None).unwrap(), U256::zero());
        assert_eq!(crash_target(Some(&UintField::from(2u64))).unwrap(), U256::from(2u64));
        assert_eq!(
            crash_target(Some(&UintField::Text("150".to_string()))).unwrap(),
            U256::from(150u64)
        );
        let fractional: UintField = serde_json::from_str("1.75").unwrap();
        assert!(matches!(crash_target(Some(&fractional)), Err(RelayError::InvalidRequest(_))));
        let negative: UintField = serde_json::from_str("-2").unwrap();
        assert!(crash_target(Some(&negative)).is_err());

        let mut req = request();
        req.multiplier = Some(2u64.into());
        let data = encode_game_call(GameType::Crash, &req).unwrap();
        assert_eq!(&data[..4], &id("play(uint256)")[..]);
        assert_eq!(U256::from_big_endian(&data[4..36]), U256::from(2u64));
    }

    #[test]
    fn test_required_fields_per_game() {
        let mut req = request();
        assert!(require_fields(GameType::Slots, &req).is_ok());
        assert!(require_fields(GameType::Crash, &req).is_ok());
        assert!(require_fields(GameType::Mines, &req).is_err());
        assert!(require_fields(GameType::Blackjack, &req).is_err());

        req.bet_eth = None;
        let err = require_fields(GameType::Slots, &req).unwrap_err();
        assert_eq!(err.to_string(), "userAddress and bet amount required");
    }

    #[test]
    fn test_wager_wei() {
        let wei = wager_wei(&BetAmount::Number(0.5)).unwrap();
        assert_eq!(wei, U256::from(500_000_000_000_000_000u64));
        assert!(wager_wei(&BetAmount::Text("lots".to_string())).is_err());
    }
}
