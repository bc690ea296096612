//! Address normalization and amount conversion.
//!
//! Amounts travel through the relay in human units as `Decimal` and are only
//! converted to a token's smallest integer unit at the chain boundary.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while normalizing addresses or converting amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
	#[error("Malformed address: {0}")]
	MalformedAddress(String),
	#[error("Amount must be positive: {0}")]
	NonPositiveAmount(Decimal),
	#[error("Token decimals {0} exceed the supported maximum")]
	DecimalsOutOfRange(u8),
}

/// Converts a human amount to smallest units, truncating toward zero.
///
/// Computes `floor(amount * 10^decimals)` exactly on the decimal's integer
/// mantissa, so no floating point rounding is involved.
pub fn to_smallest_units(amount: Decimal, decimals: u8) -> Result<U256, ConversionError> {
	if amount <= Decimal::ZERO {
		return Err(ConversionError::NonPositiveAmount(amount));
	}
	if decimals > crate::TokenInfo::MAX_DECIMALS {
		return Err(ConversionError::DecimalsOutOfRange(decimals));
	}

	let ten = U256::from(10u8);
	let mantissa = U256::from(amount.mantissa().unsigned_abs());
	let scaled = mantissa * ten.pow(U256::from(decimals));
	Ok(scaled / ten.pow(U256::from(amount.scale())))
}

/// Parses an address string into its canonical form.
///
/// Accepts 40 hex digits with an optional `0x` prefix in any letter case. The
/// checksummed rendering is available through `Address::to_checksum(None)`.
pub fn normalize_address(raw: &str) -> Result<Address, ConversionError> {
	let trimmed = raw.trim();
	let digits = super::without_0x_prefix(trimmed);
	if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(ConversionError::MalformedAddress(raw.to_string()));
	}
	Address::from_str(digits).map_err(|_| ConversionError::MalformedAddress(raw.to_string()))
}
