//! Engine wired to in-process fakes for handler tests.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::collections::HashMap;
use std::time::Duration;
use tip_account::{implementations::local::LocalAccount, AccountError, AccountInterface};
use tip_chain::{ChainError, ChainInterface, TipCall};
use tip_config::builders::ConfigBuilder;
use tip_core::{TipEngine, TipEngineBuilder, TipFactories};
use tip_social::{SocialError, SocialInterface};
use tip_storage::implementations::memory;
use tip_types::{
	Address, ConfigSchema, ParentPost, SecretString, TransactionReceipt, ValidationError, B256,
	U256,
};

pub const SECRET: &str = "webhook-test-secret";
const BOT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const BOT_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Hex HMAC-SHA512 of `body` under `SECRET`.
pub fn sign(body: &[u8]) -> String {
	let mut mac = Hmac::<Sha512>::new_from_slice(SECRET.as_bytes()).unwrap();
	mac.update(body);
	hex::encode(mac.finalize().into_bytes())
}

struct NoSchema;

impl ConfigSchema for NoSchema {
	fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
		Ok(())
	}
}

/// Chain where every tipper has a funded wallet that authorizes the bot.
struct FundedChain;

#[async_trait]
impl ChainInterface for FundedChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	async fn resolve_wallet(&self, _social_id: u64) -> Result<Address, ChainError> {
		Ok(Address::repeat_byte(0xaa))
	}

	async fn native_balance(&self, _owner: Address) -> Result<U256, ChainError> {
		Ok(U256::MAX)
	}

	async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256, ChainError> {
		Ok(U256::MAX)
	}

	async fn authorized_signer(&self, _wallet: Address) -> Result<Address, ChainError> {
		BOT_ADDRESS
			.parse()
			.map_err(|_| ChainError::Rpc("bad fixture address".into()))
	}

	async fn estimate_gas(&self, _call: &TipCall, _from: Address) -> Result<u64, ChainError> {
		Ok(60_000)
	}

	async fn submit(&self, _call: &TipCall, _gas_limit: u64) -> Result<B256, ChainError> {
		Ok(B256::repeat_byte(0x42))
	}

	async fn await_confirmation(
		&self,
		hash: B256,
		_timeout: Duration,
	) -> Result<TransactionReceipt, ChainError> {
		Ok(TransactionReceipt {
			hash,
			block_number: 7,
			gas_used: 50_000,
			success: true,
		})
	}
}

/// Every parent post belongs to a verified user.
struct VerifiedSocial;

#[async_trait]
impl SocialInterface for VerifiedSocial {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	async fn fetch_post(&self, _hash: &str) -> Result<ParentPost, SocialError> {
		Ok(ParentPost {
			author_social_id: 22,
			author_display_name: Some("alice".into()),
			verified_primary_address: Some(format!("{}", Address::repeat_byte(0xbb))),
		})
	}

	async fn publish_reply(&self, _parent_hash: &str, _text: &str) -> Result<String, SocialError> {
		Ok("0xreply".into())
	}
}

/// Builds an engine admitting at most `capacity` concurrent tips.
pub async fn engine(capacity: usize) -> TipEngine {
	let config = ConfigBuilder::new().max_concurrent_tips(capacity).build();

	let factories = TipFactories {
		storage_factories: HashMap::from([("memory".to_string(), memory::create_storage)]),
		account_factories: HashMap::from([(
			"test".to_string(),
			|_: &toml::Value| -> Result<Box<dyn AccountInterface>, AccountError> {
				Ok(Box::new(LocalAccount::new(&SecretString::from(BOT_KEY))?))
			},
		)]),
		chain_factories: HashMap::from([(
			"test".to_string(),
			|_: &toml::Value, _: &SecretString| -> Result<Box<dyn ChainInterface>, ChainError> {
				Ok(Box::new(FundedChain))
			},
		)]),
		social_factories: HashMap::from([(
			"test".to_string(),
			|_: &toml::Value| -> Result<Box<dyn SocialInterface>, SocialError> {
				Ok(Box::new(VerifiedSocial))
			},
		)]),
	};

	TipEngineBuilder::new(config).build(factories).await.unwrap()
}
