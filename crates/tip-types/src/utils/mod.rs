//! Utility functions for address and amount handling.
//!
//! These helpers are shared by the parser, the pipeline and the chain client so
//! that every crate normalizes addresses and converts amounts the same way.

pub mod conversion;
pub mod formatting;

pub use conversion::{normalize_address, to_smallest_units, ConversionError};
pub use formatting::{
	current_timestamp, format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix,
};
