//! End-to-end runs through the engine against scripted chain and social fakes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tip_account::{implementations::local::LocalAccount, AccountError, AccountInterface};
use tip_chain::{ChainError, ChainInterface, TipCall};
use tip_config::{builders::ConfigBuilder, Config};
use tip_core::{EngineError, TipEngine, TipEngineBuilder, TipFactories};
use tip_social::{SocialError, SocialInterface};
use tip_storage::implementations::memory;
use tip_types::{
	Address, ConfigSchema, Decimal, FailureKind, InboundCast, ParentPost, SecretString, TipCommand,
	TipOutcome, TipStatus, TransactionReceipt, ValidationError, B256, NONE_SENTINEL, U256,
};

const BOT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const BOT_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const RECIPIENT: &str = "0xf817257fed379853cde0fa4f97ab987181b1e5ea";
const TIPPER_FID: u64 = 11;
const RECIPIENT_FID: u64 = 22;

struct NoSchema;

impl ConfigSchema for NoSchema {
	fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
		Ok(())
	}
}

#[derive(Clone, Copy)]
enum Confirmation {
	Mined { success: bool, block: u64 },
	Timeout,
}

/// What the fake chain answers; tests tweak one field from the happy path.
struct ChainScript {
	wallet: Address,
	bot: Address,
	native_balance: U256,
	token_balance: U256,
	estimate_fails: bool,
	submit_fails: bool,
	panic_on_balance: bool,
	confirmation: Confirmation,
	submitted: Mutex<Vec<TipCall>>,
}

impl ChainScript {
	fn happy() -> Self {
		Self {
			wallet: Address::repeat_byte(0xaa),
			bot: BOT_ADDRESS.parse().unwrap(),
			native_balance: U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64)),
			token_balance: U256::ZERO,
			estimate_fails: false,
			submit_fails: false,
			panic_on_balance: false,
			confirmation: Confirmation::Mined {
				success: true,
				block: 4242,
			},
			submitted: Mutex::new(Vec::new()),
		}
	}

	fn submissions(&self) -> Vec<TipCall> {
		self.submitted.lock().unwrap().clone()
	}
}

struct FakeChain(Arc<ChainScript>);

#[async_trait]
impl ChainInterface for FakeChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	async fn resolve_wallet(&self, social_id: u64) -> Result<Address, ChainError> {
		assert_eq!(social_id, TIPPER_FID);
		Ok(self.0.wallet)
	}

	async fn native_balance(&self, owner: Address) -> Result<U256, ChainError> {
		// The builder reads the operator balance at startup; only runs should panic.
		if self.0.panic_on_balance && owner == self.0.wallet {
			panic!("balance decoder exploded");
		}
		Ok(self.0.native_balance)
	}

	async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256, ChainError> {
		Ok(self.0.token_balance)
	}

	async fn authorized_signer(&self, _wallet: Address) -> Result<Address, ChainError> {
		Ok(self.0.bot)
	}

	async fn estimate_gas(&self, _call: &TipCall, _from: Address) -> Result<u64, ChainError> {
		if self.0.estimate_fails {
			return Err(ChainError::Estimation("execution reverted".into()));
		}
		Ok(65_000)
	}

	async fn submit(&self, call: &TipCall, _gas_limit: u64) -> Result<B256, ChainError> {
		if self.0.submit_fails {
			return Err(ChainError::Submission("connection reset".into()));
		}
		self.0.submitted.lock().unwrap().push(*call);
		Ok(B256::repeat_byte(0x77))
	}

	async fn await_confirmation(
		&self,
		hash: B256,
		timeout: Duration,
	) -> Result<TransactionReceipt, ChainError> {
		match self.0.confirmation {
			Confirmation::Mined { success, block } => Ok(TransactionReceipt {
				hash,
				block_number: block,
				gas_used: 51_000,
				success,
			}),
			Confirmation::Timeout => Err(ChainError::ConfirmationTimeout {
				hash,
				seconds: timeout.as_secs(),
			}),
		}
	}
}

struct SocialScript {
	posts: HashMap<String, ParentPost>,
	replies: Mutex<Vec<(String, String)>>,
}

impl SocialScript {
	fn with_recipient(address: Option<&str>) -> Self {
		let post = ParentPost {
			author_social_id: RECIPIENT_FID,
			author_display_name: Some("alice".into()),
			verified_primary_address: address.map(str::to_string),
		};
		Self {
			posts: HashMap::from([("0xparent".to_string(), post)]),
			replies: Mutex::new(Vec::new()),
		}
	}

	fn replies(&self) -> Vec<(String, String)> {
		self.replies.lock().unwrap().clone()
	}
}

struct FakeSocial(Arc<SocialScript>);

#[async_trait]
impl SocialInterface for FakeSocial {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	async fn fetch_post(&self, hash: &str) -> Result<ParentPost, SocialError> {
		self.0
			.posts
			.get(hash)
			.cloned()
			.ok_or_else(|| SocialError::NotFound(hash.to_string()))
	}

	async fn publish_reply(&self, parent_hash: &str, text: &str) -> Result<String, SocialError> {
		self.0
			.replies
			.lock()
			.unwrap()
			.push((parent_hash.to_string(), text.to_string()));
		Ok("0xreply".into())
	}
}

async fn engine(
	config: Config,
	chain: &Arc<ChainScript>,
	social: &Arc<SocialScript>,
) -> TipEngine {
	let chain = chain.clone();
	let social = social.clone();

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
			move |_: &toml::Value, _: &SecretString| -> Result<Box<dyn ChainInterface>, ChainError> {
				Ok(Box::new(FakeChain(chain.clone())))
			},
		)]),
		social_factories: HashMap::from([(
			"test".to_string(),
			move |_: &toml::Value| -> Result<Box<dyn SocialInterface>, SocialError> {
				Ok(Box::new(FakeSocial(social.clone())))
			},
		)]),
	};

	TipEngineBuilder::new(config).build(factories).await.unwrap()
}

fn default_config() -> Config {
	ConfigBuilder::new()
		.token("USDC", Address::repeat_byte(0x11), 6)
		.build()
}

fn cast(text: &str) -> InboundCast {
	InboundCast {
		author_social_id: TIPPER_FID,
		author_display_name: Some("bob".into()),
		text: text.to_string(),
		parent_post_hash: "0xparent".into(),
		post_hash: "0xorigin".into(),
		post_timestamp: "2025-03-01T12:00:00Z".into(),
	}
}

async fn run(engine: &TipEngine, text: &str) -> TipOutcome {
	let cast = cast(text);
	let command = engine.parse(&cast.text).expect("command should parse");
	engine.dispatch(&cast, command).unwrap().outcome().await.unwrap()
}

#[tokio::test]
async fn test_end_to_end_native_tip() {
	let chain = Arc::new(ChainScript::happy());
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 10 mon").await;

	assert_eq!(outcome.status(), TipStatus::Success);
	assert_eq!(outcome.amount(), Decimal::from(10));
	assert_eq!(outcome.token_symbol(), "MON");
	assert_eq!(outcome.token_address(), Some(Address::ZERO));
	assert_eq!(outcome.transaction_hash(), Some(B256::repeat_byte(0x77)));
	assert_eq!(outcome.block_number(), 4242);
	assert_eq!(outcome.recipient_display_name(), "alice");
	assert!(outcome.failure().is_none());

	let calls = chain.submissions();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].wallet, Address::repeat_byte(0xaa));
	assert_eq!(calls[0].token, Address::ZERO);
	assert_eq!(
		calls[0].amount_units,
		U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64))
	);

	let record = engine.find_tip("0xorigin").await.unwrap().unwrap();
	assert_eq!(record.tx_status, TipStatus::Success);
	assert_eq!(record.tipper_fid, TIPPER_FID);
	assert_eq!(record.recipient_fid, Some(RECIPIENT_FID));
	assert_eq!(
		record.recipient_wallet,
		RECIPIENT.parse::<Address>().unwrap().to_checksum(None)
	);
	assert_eq!(record.gas_used, 51_000);

	let by_tx = engine
		.find_tip_by_tx(&B256::repeat_byte(0x77).to_string())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(by_tx, record);

	let replies = social.replies();
	assert_eq!(replies.len(), 1);
	assert_eq!(replies[0].0, "0xorigin");
	assert!(replies[0].1.starts_with("✅"));
}

#[tokio::test]
async fn test_zero_wallet_always_no_smart_wallet() {
	let chain = Arc::new(ChainScript {
		wallet: Address::ZERO,
		// downstream state that would fail anyway
		bot: Address::repeat_byte(0x01),
		estimate_fails: true,
		confirmation: Confirmation::Timeout,
		..ChainScript::happy()
	});
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 10 mon").await;

	assert_eq!(outcome.status(), TipStatus::Failed);
	assert_eq!(outcome.failure_kind(), Some(FailureKind::NoSmartWallet));
	assert!(chain.submissions().is_empty());

	let record = engine.find_tip("0xorigin").await.unwrap().unwrap();
	assert_eq!(record.tipper_wallet, NONE_SENTINEL);
	assert_eq!(record.tx_hash, NONE_SENTINEL);
}

#[tokio::test]
async fn test_confirmation_timeout_keeps_hash() {
	let chain = Arc::new(ChainScript {
		confirmation: Confirmation::Timeout,
		..ChainScript::happy()
	});
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 1 mon").await;

	assert_eq!(
		outcome.failure_kind(),
		Some(FailureKind::TransactionConfirmationFailed)
	);
	assert_eq!(outcome.transaction_hash(), Some(B256::repeat_byte(0x77)));

	let record = engine.find_tip("0xorigin").await.unwrap().unwrap();
	assert_eq!(record.tx_status, TipStatus::Failed);
	assert_eq!(record.tx_hash, B256::repeat_byte(0x77).to_string());
	assert!(record
		.failure_reason
		.unwrap()
		.starts_with("transaction_confirmation_failed"));
}

#[tokio::test]
async fn test_reverted_receipt_keeps_block_and_gas() {
	let chain = Arc::new(ChainScript {
		confirmation: Confirmation::Mined {
			success: false,
			block: 99,
		},
		..ChainScript::happy()
	});
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 1 mon").await;

	assert_eq!(outcome.failure_kind(), Some(FailureKind::TransactionReverted));
	assert_eq!(outcome.block_number(), 99);
	assert_eq!(outcome.gas_used(), 51_000);
}

#[tokio::test]
async fn test_recipient_failures() {
	let chain = Arc::new(ChainScript::happy());

	let social = Arc::new(SocialScript::with_recipient(None));
	let engine_a = engine(default_config(), &chain, &social).await;
	let outcome = run(&engine_a, "!montip tip 1 mon").await;
	assert_eq!(outcome.failure_kind(), Some(FailureKind::NoVerifiedAddress));
	assert_eq!(outcome.recipient_social_id(), Some(RECIPIENT_FID));

	let social = Arc::new(SocialScript::with_recipient(Some("0x1234")));
	let engine_b = engine(default_config(), &chain, &social).await;
	let outcome = run(&engine_b, "!montip tip 1 mon").await;
	assert_eq!(outcome.failure_kind(), Some(FailureKind::InvalidAddressFormat));

	let social = Arc::new(SocialScript {
		posts: HashMap::new(),
		replies: Mutex::new(Vec::new()),
	});
	let engine_c = engine(default_config(), &chain, &social).await;
	let outcome = run(&engine_c, "!montip tip 1 mon").await;
	assert_eq!(outcome.failure_kind(), Some(FailureKind::NoVerifiedAddress));
	assert_eq!(outcome.recipient_display_name(), "unknown");

	assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_bot_not_authorized() {
	let chain = Arc::new(ChainScript {
		bot: Address::repeat_byte(0x05),
		..ChainScript::happy()
	});
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 1 mon").await;
	assert_eq!(outcome.failure_kind(), Some(FailureKind::BotNotAuthorized));
	assert!(social.replies()[0].1.starts_with("🔒"));
}

#[tokio::test]
async fn test_token_balance_checked_in_smallest_units() {
	let chain = Arc::new(ChainScript {
		token_balance: U256::from(2_000_000u64),
		..ChainScript::happy()
	});
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 2.5 $usdc").await;
	assert_eq!(outcome.failure_kind(), Some(FailureKind::InsufficientBalance));
	assert_eq!(outcome.amount_units(), Some(U256::from(2_500_000u64)));
	assert_eq!(outcome.token_symbol(), "USDC");

	let outcome = run(&engine, "!montip tip 1.9999999 usdc").await;
	assert!(outcome.is_success());
	assert_eq!(chain.submissions()[0].amount_units, U256::from(1_999_999u64));
	assert_eq!(chain.submissions()[0].token, Address::repeat_byte(0x11));
}

#[tokio::test]
async fn test_estimation_and_submission_failures() {
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));

	let chain = Arc::new(ChainScript {
		estimate_fails: true,
		..ChainScript::happy()
	});
	let engine_a = engine(default_config(), &chain, &social).await;
	let outcome = run(&engine_a, "!montip tip 1 mon").await;
	assert_eq!(outcome.failure_kind(), Some(FailureKind::GasEstimationFailed));

	let chain = Arc::new(ChainScript {
		submit_fails: true,
		..ChainScript::happy()
	});
	let engine_b = engine(default_config(), &chain, &social).await;
	let outcome = run(&engine_b, "!montip tip 1 mon").await;
	assert_eq!(
		outcome.failure_kind(),
		Some(FailureKind::TransactionSubmissionError)
	);
	assert!(outcome.transaction_hash().is_none());
}

#[tokio::test]
async fn test_panicking_run_is_recorded_as_unexpected() {
	let chain = Arc::new(ChainScript {
		panic_on_balance: true,
		..ChainScript::happy()
	});
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 1 mon").await;
	assert_eq!(outcome.failure_kind(), Some(FailureKind::Unexpected));

	let record = engine.find_tip("0xorigin").await.unwrap().unwrap();
	assert_eq!(record.failure_code, Some(FailureKind::Unexpected));
	assert_eq!(social.replies().len(), 1);
	assert_eq!(engine.in_flight(), 0);
}

#[tokio::test]
async fn test_unknown_token_rejected_by_pipeline() {
	let chain = Arc::new(ChainScript::happy());
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let inbound = cast("!montip tip 1 doge");
	let command = TipCommand {
		amount: Decimal::ONE,
		token_symbol: "DOGE".into(),
	};
	let outcome = engine.dispatch(&inbound, command).unwrap().outcome().await.unwrap();

	assert_eq!(outcome.failure_kind(), Some(FailureKind::UnsupportedToken));
	assert!(outcome.transaction_hash().is_none());
	assert!(chain.submissions().is_empty());
	let record = engine.find_tip("0xorigin").await.unwrap().unwrap();
	assert_eq!(record.failure_code, Some(FailureKind::UnsupportedToken));
}

#[tokio::test]
async fn test_amount_below_one_unit_is_not_submitted() {
	let chain = Arc::new(ChainScript {
		token_balance: U256::from(5_000_000u64),
		..ChainScript::happy()
	});
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let engine = engine(default_config(), &chain, &social).await;

	let outcome = run(&engine, "!montip tip 0.0000001 usdc").await;

	assert_eq!(outcome.failure_kind(), Some(FailureKind::AmountTooSmall));
	assert_eq!(outcome.amount_units(), Some(U256::ZERO));
	assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn test_admission_rejects_when_full() {
	let chain = Arc::new(ChainScript::happy());
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let config = ConfigBuilder::new().max_concurrent_tips(1).build();
	let engine = engine(config, &chain, &social).await;

	let inbound = cast("!montip tip 1 mon");
	let command = engine.parse(&inbound.text).unwrap();

	let first = engine.dispatch(&inbound, command.clone()).unwrap();
	assert_eq!(engine.in_flight(), 1);
	assert!(matches!(
		engine.dispatch(&inbound, command.clone()),
		Err(EngineError::AtCapacity(1))
	));

	assert!(first.outcome().await.unwrap().is_success());
	assert_eq!(engine.in_flight(), 0);
	let again = engine.dispatch(&inbound, command).unwrap();
	assert!(again.outcome().await.unwrap().is_success());
}

#[tokio::test]
async fn test_sinks_follow_notification_settings() {
	let chain = Arc::new(ChainScript::happy());
	let social = Arc::new(SocialScript::with_recipient(Some(RECIPIENT)));
	let config = ConfigBuilder::new().reply_enabled(false).persist(false).build();
	let engine = engine(config, &chain, &social).await;

	assert!(run(&engine, "!montip tip 1 mon").await.is_success());
	assert!(social.replies().is_empty());
	assert!(engine.find_tip("0xorigin").await.unwrap().is_none());
}
