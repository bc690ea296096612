//! Alloy-based EVM chain client.
//!
//! Talks JSON-RPC over HTTP to a single chain. Tip wallets are created by a
//! factory contract keyed by social id; each wallet only accepts `sendTip`
//! from its configured bot address.

use crate::{ChainError, ChainFactory, ChainInterface, ChainRegistry, TipCall};
use alloy::{
	network::{EthereumWallet, TransactionBuilder},
	primitives::{Address, B256, U256},
	providers::{DynProvider, Provider, ProviderBuilder},
	rpc::types::TransactionRequest,
	signers::{local::PrivateKeySigner, Signer},
	sol,
	sol_types::SolCall,
};
use async_trait::async_trait;
use std::time::Duration;
use tip_types::{
	truncate_id, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, SecretString,
	TransactionReceipt, ValidationError,
};

/// Monad testnet.
pub const DEFAULT_CHAIN_ID: u64 = 10143;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 2;

sol! {
	#[sol(rpc)]
	interface ITipWalletFactory {
		function getWallet(uint256 fid) external view returns (address);
	}

	#[sol(rpc)]
	interface ITipWallet {
		function sendTip(address recipient, address token, uint256 amount) external;
		function botAddress() external view returns (address);
	}

	#[sol(rpc)]
	interface IERC20 {
		function balanceOf(address owner) external view returns (uint256);
	}
}

/// Chain client backed by an alloy HTTP provider.
pub struct AlloyChain {
	provider: DynProvider,
	signer: Address,
	chain_id: u64,
	factory: Address,
	poll_interval: Duration,
}

impl AlloyChain {
	/// Builds the provider with the operator key as its wallet.
	///
	/// No request is made here; the first RPC call opens the connection.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		factory: Address,
		poll_interval: Duration,
		private_key: &SecretString,
	) -> Result<Self, ChainError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| ChainError::InvalidConfig("Invalid private key format".to_string()))
		})?;
		let signer_address = signer.address();

		let url: reqwest::Url = rpc_url
			.parse()
			.map_err(|e| ChainError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		let wallet = EthereumWallet::from(signer.with_chain_id(Some(chain_id)));
		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_http(url)
			.erased();

		tracing::info!(chain_id, factory = %factory, signer = %signer_address, "Chain client configured");

		Ok(Self {
			provider,
			signer: signer_address,
			chain_id,
			factory,
			poll_interval,
		})
	}
}

/// Configuration schema for the alloy chain client.
pub struct AlloyChainSchema;

impl AlloyChainSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for AlloyChainSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("rpc_url", FieldType::Url),
				Field::new("factory_address", FieldType::Address).with_validator(|value| {
					match value.as_str().map(tip_types::normalize_address) {
						Some(Ok(address)) if address == Address::ZERO => {
							Err("factory_address cannot be the zero address".to_string())
						},
						_ => Ok(()),
					}
				}),
			],
			vec![
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new(
					"poll_interval_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(60),
					},
				),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl ChainInterface for AlloyChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyChainSchema)
	}

	async fn resolve_wallet(&self, social_id: u64) -> Result<Address, ChainError> {
		let factory = ITipWalletFactory::new(self.factory, self.provider.clone());
		factory
			.getWallet(U256::from(social_id))
			.call()
			.await
			.map_err(|e| ChainError::Rpc(format!("getWallet({}) failed: {}", social_id, e)))
	}

	async fn native_balance(&self, owner: Address) -> Result<U256, ChainError> {
		self.provider
			.get_balance(owner)
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get balance: {}", e)))
	}

	async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
		let erc20 = IERC20::new(token, self.provider.clone());
		erc20
			.balanceOf(owner)
			.call()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to call balanceOf on {}: {}", token, e)))
	}

	async fn authorized_signer(&self, wallet: Address) -> Result<Address, ChainError> {
		let contract = ITipWallet::new(wallet, self.provider.clone());
		contract
			.botAddress()
			.call()
			.await
			.map_err(|e| ChainError::Rpc(format!("botAddress() on {} failed: {}", wallet, e)))
	}

	async fn estimate_gas(&self, call: &TipCall, from: Address) -> Result<u64, ChainError> {
		let contract = ITipWallet::new(call.wallet, self.provider.clone());
		contract
			.sendTip(call.recipient, call.token, call.amount_units)
			.from(from)
			.estimate_gas()
			.await
			.map_err(|e| ChainError::Estimation(e.to_string()))
	}

	async fn submit(&self, call: &TipCall, gas_limit: u64) -> Result<B256, ChainError> {
		let input = ITipWallet::sendTipCall {
			recipient: call.recipient,
			token: call.token,
			amount: call.amount_units,
		}
		.abi_encode();

		let nonce = self
			.provider
			.get_transaction_count(self.signer)
			.pending()
			.await
			.map_err(|e| ChainError::Submission(format!("Failed to get nonce: {}", e)))?;
		let gas_price = self
			.provider
			.get_gas_price()
			.await
			.map_err(|e| ChainError::Submission(format!("Failed to get gas price: {}", e)))?;

		let request = TransactionRequest::default()
			.with_from(self.signer)
			.with_to(call.wallet)
			.with_input(input)
			.with_gas_limit(gas_limit)
			.with_gas_price(gas_price)
			.with_nonce(nonce)
			.with_chain_id(self.chain_id);

		// The provider's wallet signs the request
		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| ChainError::Submission(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending.tx_hash();
		tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			nonce,
			gas_price,
			"Submitted tip transaction"
		);
		Ok(tx_hash)
	}

	async fn await_confirmation(
		&self,
		hash: B256,
		timeout: Duration,
	) -> Result<TransactionReceipt, ChainError> {
		let deadline = tokio::time::Instant::now() + timeout;

		loop {
			match self.provider.get_transaction_receipt(hash).await {
				Ok(Some(receipt)) => {
					return Ok(TransactionReceipt {
						hash,
						block_number: receipt.block_number.unwrap_or(0),
						gas_used: receipt.gas_used,
						success: receipt.status(),
					});
				},
				Ok(None) => {},
				Err(e) => {
					tracing::debug!(tx_hash = %truncate_id(&hash.to_string()), error = %e, "Receipt poll failed");
				},
			}

			let now = tokio::time::Instant::now();
			if now >= deadline {
				return Err(ChainError::ConfirmationTimeout {
					hash,
					seconds: timeout.as_secs(),
				});
			}
			tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
		}
	}
}

/// Factory function to create the alloy chain client from configuration.
///
/// Configuration parameters:
/// - `rpc_url` (required): HTTP(S) JSON-RPC endpoint
/// - `factory_address` (required): tip wallet factory contract
/// - `chain_id` (optional): defaults to 10143
/// - `poll_interval_seconds` (optional): receipt polling interval, defaults to 2
pub fn create_chain(
	config: &toml::Value,
	private_key: &SecretString,
) -> Result<Box<dyn ChainInterface>, ChainError> {
	AlloyChainSchema::validate_config(config)
		.map_err(|e| ChainError::InvalidConfig(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ChainError::InvalidConfig("rpc_url is required".to_string()))?;

	let factory = config
		.get("factory_address")
		.and_then(|v| v.as_str())
		.map(tip_types::normalize_address)
		.transpose()
		.map_err(|e| ChainError::InvalidConfig(e.to_string()))?
		.ok_or_else(|| ChainError::InvalidConfig("factory_address is required".to_string()))?;

	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_CHAIN_ID);

	let poll_interval = config
		.get("poll_interval_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS);

	let chain = AlloyChain::new(
		rpc_url,
		chain_id,
		factory,
		Duration::from_secs(poll_interval),
		private_key,
	)?;
	Ok(Box::new(chain))
}

/// Registry for the alloy chain implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = ChainFactory;

	fn factory() -> Self::Factory {
		create_chain
	}
}

impl ChainRegistry for Registry {}
