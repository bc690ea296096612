//! Chain client for the tip relay.
//!
//! All RPC interaction lives behind `ChainInterface` so the pipeline can run
//! against a fake. `ChainService` adds what the relay needs on top of a raw
//! implementation: the operator address and serialized submission, since
//! nonces are read fresh from the chain on every submit.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tip_types::{
	Address, ConfigSchema, ImplementationRegistry, SecretString, TransactionReceipt, B256, U256,
};
use tokio::sync::Mutex;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
	/// A read-only RPC call failed.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// The simulated tip call would revert.
	#[error("Gas estimation failed: {0}")]
	Estimation(String),
	/// Building, signing or broadcasting the transaction failed.
	#[error("Submission failed: {0}")]
	Submission(String),
	/// No receipt was found before the deadline.
	#[error("Transaction {hash} not confirmed within {seconds}s")]
	ConfirmationTimeout { hash: B256, seconds: u64 },
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// One `sendTip` invocation on a tipper's smart wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipCall {
	/// The tipper's smart wallet, target of the transaction.
	pub wallet: Address,
	pub recipient: Address,
	/// Token contract, or the zero address for the native asset.
	pub token: Address,
	/// Amount in the token's smallest unit.
	pub amount_units: U256,
}

/// Interface for chain implementations.
#[async_trait]
pub trait ChainInterface: Send + Sync {
	/// Returns the configuration schema for this chain implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Looks up the smart wallet registered for a social id.
	///
	/// Returns the zero address when none exists.
	async fn resolve_wallet(&self, social_id: u64) -> Result<Address, ChainError>;

	async fn native_balance(&self, owner: Address) -> Result<U256, ChainError>;

	async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

	/// Reads the bot address a smart wallet accepts tips from.
	async fn authorized_signer(&self, wallet: Address) -> Result<Address, ChainError>;

	/// Simulates the tip call from `from` and returns the gas it needs.
	async fn estimate_gas(&self, call: &TipCall, from: Address) -> Result<u64, ChainError>;

	/// Signs and broadcasts the tip call, reading gas price and nonce live.
	async fn submit(&self, call: &TipCall, gas_limit: u64) -> Result<B256, ChainError>;

	/// Polls for the receipt of `hash` until it is mined or `timeout` elapses.
	async fn await_confirmation(
		&self,
		hash: B256,
		timeout: Duration,
	) -> Result<TransactionReceipt, ChainError>;
}

/// Type alias for chain factory functions.
///
/// Receives the implementation's configuration table and the operator key.
pub type ChainFactory =
	fn(&toml::Value, &SecretString) -> Result<Box<dyn ChainInterface>, ChainError>;

/// Registry trait for chain implementations.
pub trait ChainRegistry: ImplementationRegistry<Factory = ChainFactory> {}

/// Get all registered chain implementations.
pub fn get_all_implementations() -> Vec<(&'static str, ChainFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}

/// Service that owns the chain connection shared by all tip runs.
///
/// Read-only calls run concurrently. Submissions are serialized behind a
/// mutex scoped to the operator key, so two runs never read the same
/// pending nonce.
pub struct ChainService {
	implementation: Box<dyn ChainInterface>,
	signer: Address,
	submit_lock: Mutex<()>,
}

impl ChainService {
	pub fn new(implementation: Box<dyn ChainInterface>, signer: Address) -> Self {
		Self {
			implementation,
			signer,
			submit_lock: Mutex::new(()),
		}
	}

	/// Address derived from the operator key.
	pub fn signer_address(&self) -> Address {
		self.signer
	}

	pub async fn resolve_wallet(&self, social_id: u64) -> Result<Address, ChainError> {
		self.implementation.resolve_wallet(social_id).await
	}

	/// Balance of `owner` in `token`, dispatching on the native sentinel.
	pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
		if token == Address::ZERO {
			self.implementation.native_balance(owner).await
		} else {
			self.implementation.token_balance(token, owner).await
		}
	}

	pub async fn authorized_signer(&self, wallet: Address) -> Result<Address, ChainError> {
		self.implementation.authorized_signer(wallet).await
	}

	/// Estimates the tip call as sent by the operator.
	pub async fn estimate_gas(&self, call: &TipCall) -> Result<u64, ChainError> {
		self.implementation.estimate_gas(call, self.signer).await
	}

	/// Submits the tip call while holding the per-key submission lock.
	pub async fn submit(&self, call: &TipCall, gas_limit: u64) -> Result<B256, ChainError> {
		let _guard = self.submit_lock.lock().await;
		tracing::debug!(wallet = %call.wallet, gas_limit, "Acquired submission lock");
		self.implementation.submit(call, gas_limit).await
	}

	pub async fn await_confirmation(
		&self,
		hash: B256,
		timeout: Duration,
	) -> Result<TransactionReceipt, ChainError> {
		self.implementation.await_confirmation(hash, timeout).await
	}
}
