//! Common types module for the tip relay.
//!
//! This module defines the core data types shared by every relay crate:
//! tip commands and outcomes, token metadata, chain receipts, inbound social
//! events, and the configuration validation framework used by pluggable
//! implementations.

/// HTTP API types: webhook payloads, responses and errors.
pub mod api;
/// Chain interaction types such as receipts.
pub mod chain;
/// Implementation registry trait for pluggable services.
pub mod registry;
/// Secure string type for private keys and API credentials.
pub mod secret_string;
/// Inbound post events and parent-post lookups.
pub mod social;
/// Storage namespaces.
pub mod storage;
/// Tip commands, requests, failures and outcomes.
pub mod tip;
/// Token metadata.
pub mod token;
/// Utility functions for address and amount handling.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use chain::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use social::*;
pub use storage::*;
pub use tip::*;
pub use token::TokenInfo;
pub use utils::{
	current_timestamp, format_token_amount, normalize_address, to_smallest_units, truncate_id,
	with_0x_prefix, without_0x_prefix, ConversionError,
};
pub use validation::*;

pub use alloy_primitives::{Address, B256, U256};
pub use rust_decimal::Decimal;
