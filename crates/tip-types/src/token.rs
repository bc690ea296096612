//! Token metadata for the tip relay.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Configuration for a tippable token.
///
/// # Fields
///
/// * `symbol` - The token symbol as users type it (e.g., "USDC", "MON")
/// * `address` - The on-chain address of the token contract; the zero address
///   marks the chain's native asset
/// * `decimals` - The number of decimal places for the token (0 to 18)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenInfo {
	pub symbol: String,
	pub address: Address,
	pub decimals: u8,
}

impl TokenInfo {
	/// Highest decimal precision accepted for a token.
	pub const MAX_DECIMALS: u8 = 18;

	/// Returns true when this entry represents the chain's native asset.
	///
	/// Native tips are sent by the wallet as value transfers and are never
	/// encoded as ERC-20 calls.
	pub fn is_native(&self) -> bool {
		self.address == Address::ZERO
	}
}
