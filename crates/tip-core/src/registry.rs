//! Token registry.
//!
//! Static symbol table loaded once from `[[tokens]]`. Lookups are exact; the
//! parser goes through `canonical_symbol` first to map whatever casing a user
//! typed onto the registry's own spelling.

use std::collections::HashMap;
use thiserror::Error;
use tip_types::TokenInfo;

#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("Duplicate token symbol: {0}")]
	DuplicateSymbol(String),
	#[error("Token {symbol} has {decimals} decimals, maximum is {max}")]
	DecimalsOutOfRange { symbol: String, decimals: u8, max: u8 },
}

/// Supported tokens keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
	tokens: HashMap<String, TokenInfo>,
	/// Lowercased symbol to canonical symbol.
	canonical: HashMap<String, String>,
}

impl TokenRegistry {
	/// Builds the registry, rejecting symbols that collide case-insensitively.
	pub fn new(tokens: impl IntoIterator<Item = TokenInfo>) -> Result<Self, RegistryError> {
		let mut registry = Self::default();

		for token in tokens {
			if token.decimals > TokenInfo::MAX_DECIMALS {
				return Err(RegistryError::DecimalsOutOfRange {
					symbol: token.symbol,
					decimals: token.decimals,
					max: TokenInfo::MAX_DECIMALS,
				});
			}

			let folded = token.symbol.to_lowercase();
			if registry.canonical.contains_key(&folded) {
				return Err(RegistryError::DuplicateSymbol(token.symbol));
			}

			registry.canonical.insert(folded, token.symbol.clone());
			registry.tokens.insert(token.symbol.clone(), token);
		}

		Ok(registry)
	}

	/// Case-sensitive exact lookup.
	pub fn lookup(&self, symbol: &str) -> Option<&TokenInfo> {
		self.tokens.get(symbol)
	}

	/// Maps `raw` to the registry's spelling of the same symbol, ignoring case.
	pub fn canonical_symbol(&self, raw: &str) -> Option<&str> {
		self.canonical.get(&raw.to_lowercase()).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Symbols in sorted order.
	pub fn symbols(&self) -> Vec<&str> {
		let mut symbols: Vec<&str> = self.tokens.keys().map(String::as_str).collect();
		symbols.sort_unstable();
		symbols
	}
}
