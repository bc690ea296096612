//! String formatting utilities.
//!
//! Hex prefix management, truncation of post and transaction hashes for log
//! lines, and rendering of smallest-unit balances in human units.

use alloy_primitives::U256;

/// Truncates a hash for display, keeping the first 10 characters.
///
/// `0x` prefixed hashes keep the prefix plus eight hex digits.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.starts_with("0x") || hex_str.starts_with("0X") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders a smallest-unit amount in human units.
///
/// Trailing zeros of the fractional part are dropped, so `1500000` with six
/// decimals renders as `1.5` and `2000000` as `2`.
pub fn format_token_amount(units: U256, decimals: u8) -> String {
	let digits = units.to_string();
	if decimals == 0 {
		return digits;
	}

	let places = decimals as usize;
	let (whole, fraction) = if digits.len() <= places {
		("0".to_string(), format!("{:0>width$}", digits, width = places))
	} else {
		let split = digits.len() - places;
		(digits[..split].to_string(), digits[split..].to_string())
	};

	let fraction = fraction.trim_end_matches('0');
	if fraction.is_empty() {
		whole
	} else {
		format!("{}.{}", whole, fraction)
	}
}

/// Current UNIX timestamp in seconds, 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
