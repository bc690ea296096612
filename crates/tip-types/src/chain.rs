//! Chain interaction types for the tip relay.
//!
//! This module defines the result of waiting on a submitted tip transaction.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Transaction receipt containing the fields the relay records.
///
/// Provides information about a transaction after it has been included in a
/// block, including its execution status, block number and gas usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: B256,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Gas consumed by the transaction.
	pub gas_used: u64,
	/// Whether the transaction executed successfully (status 1).
	pub success: bool,
}
