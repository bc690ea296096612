//! Tip commands, requests, failures and terminal outcomes.
//!
//! A tip run starts from a `TipRequest` built out of one inbound post and ends
//! with exactly one `TipOutcome`. Outcomes can only be produced through an
//! `OutcomeDraft`, which keeps the success/failure invariants in one place.

use crate::{InboundCast, TokenInfo, TransactionReceipt};
use alloy_primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used when a display name could not be resolved.
pub const UNKNOWN_DISPLAY_NAME: &str = "unknown";

/// Amount and token extracted from a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipCommand {
	/// Positive amount in human units.
	pub amount: Decimal,
	/// Token symbol in the registry's casing.
	pub token_symbol: String,
}

/// Where the trigger word may appear in a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
	/// Trigger anywhere in the text, connector word optional.
	#[default]
	Anywhere,
	/// Trigger must be the first word and must be followed by the connector.
	FirstWord,
}

/// One tip attempt, owned by a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipRequest {
	pub tipper_social_id: u64,
	pub tipper_display_name: Option<String>,
	/// Filled in once the parent post has been fetched.
	pub recipient_social_id: Option<u64>,
	pub origin_post_hash: String,
	pub parent_post_hash: String,
	pub post_timestamp: String,
	pub command: TipCommand,
}

impl TipRequest {
	/// Builds the request for a parsed command found in `cast`.
	pub fn from_cast(cast: &InboundCast, command: TipCommand) -> Self {
		Self {
			tipper_social_id: cast.author_social_id,
			tipper_display_name: cast.author_display_name.clone(),
			recipient_social_id: None,
			origin_post_hash: cast.post_hash.clone(),
			parent_post_hash: cast.parent_post_hash.clone(),
			post_timestamp: cast.post_timestamp.clone(),
			command,
		}
	}
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipStatus {
	Success,
	Failed,
}

impl TipStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			TipStatus::Success => "success",
			TipStatus::Failed => "failed",
		}
	}
}

impl fmt::Display for TipStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Broad class of a failure, used for auditing and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
	/// Malformed command, unsupported token or an amount below one unit.
	Input,
	/// Missing wallet, missing authorization or insufficient funds.
	Precondition,
	/// Estimation, submission or confirmation problems.
	Rpc,
	/// Anything else.
	Unexpected,
}

/// Closed set of reasons a run can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	NoVerifiedAddress,
	NoSmartWallet,
	UnsupportedToken,
	InvalidAddressFormat,
	AmountTooSmall,
	WalletNotCreated,
	BotNotAuthorized,
	InsufficientBalance,
	GasEstimationFailed,
	TransactionSubmissionError,
	TransactionConfirmationFailed,
	TransactionReverted,
	Unexpected,
}

impl FailureKind {
	pub fn category(&self) -> FailureCategory {
		match self {
			FailureKind::UnsupportedToken
			| FailureKind::InvalidAddressFormat
			| FailureKind::AmountTooSmall => FailureCategory::Input,
			FailureKind::NoVerifiedAddress
			| FailureKind::NoSmartWallet
			| FailureKind::WalletNotCreated
			| FailureKind::BotNotAuthorized
			| FailureKind::InsufficientBalance => FailureCategory::Precondition,
			FailureKind::GasEstimationFailed
			| FailureKind::TransactionSubmissionError
			| FailureKind::TransactionConfirmationFailed
			| FailureKind::TransactionReverted => FailureCategory::Rpc,
			FailureKind::Unexpected => FailureCategory::Unexpected,
		}
	}

	/// Stable snake_case code stored with persisted records.
	pub fn code(&self) -> &'static str {
		match self {
			FailureKind::NoVerifiedAddress => "no_verified_address",
			FailureKind::NoSmartWallet => "no_smart_wallet",
			FailureKind::UnsupportedToken => "unsupported_token",
			FailureKind::InvalidAddressFormat => "invalid_address_format",
			FailureKind::AmountTooSmall => "amount_too_small",
			FailureKind::WalletNotCreated => "wallet_not_created",
			FailureKind::BotNotAuthorized => "bot_not_authorized",
			FailureKind::InsufficientBalance => "insufficient_balance",
			FailureKind::GasEstimationFailed => "gas_estimation_failed",
			FailureKind::TransactionSubmissionError => "transaction_submission_error",
			FailureKind::TransactionConfirmationFailed => "transaction_confirmation_failed",
			FailureKind::TransactionReverted => "transaction_reverted",
			FailureKind::Unexpected => "unexpected",
		}
	}

	/// Short message posted back to the tipper.
	pub fn user_message(&self) -> &'static str {
		match self {
			FailureKind::NoVerifiedAddress => "❌ The recipient has no verified wallet address.",
			FailureKind::NoSmartWallet => "❌ You don't have a tip wallet yet.",
			FailureKind::UnsupportedToken => "❌ That token is not supported.",
			FailureKind::InvalidAddressFormat => "❌ A wallet address was malformed.",
			FailureKind::AmountTooSmall => "❌ That amount is below the token's smallest unit.",
			FailureKind::WalletNotCreated => "❌ Your tip wallet has not been created.",
			FailureKind::BotNotAuthorized => "🔒 The tip bot is not authorized on your wallet.",
			FailureKind::InsufficientBalance => "💸 Your tip wallet balance is too low.",
			FailureKind::GasEstimationFailed => "⛽ The tip would fail on-chain, nothing was sent.",
			FailureKind::TransactionSubmissionError => "⚠️ The tip transaction could not be sent.",
			FailureKind::TransactionConfirmationFailed => {
				"⏳ The tip was sent but not confirmed in time."
			},
			FailureKind::TransactionReverted => "❌ The tip transaction reverted.",
			FailureKind::Unexpected => "⚠️ Something went wrong while processing your tip.",
		}
	}
}

impl fmt::Display for FailureKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}

/// A failure kind with optional free-text detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipFailure {
	pub kind: FailureKind,
	pub detail: Option<String>,
}

impl TipFailure {
	pub fn new(kind: FailureKind) -> Self {
		Self { kind, detail: None }
	}

	pub fn with_detail(kind: FailureKind, detail: impl Into<String>) -> Self {
		Self {
			kind,
			detail: Some(detail.into()),
		}
	}
}

impl fmt::Display for TipFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.detail {
			Some(detail) => write!(f, "{}: {}", self.kind.code(), detail),
			None => f.write_str(self.kind.code()),
		}
	}
}

/// Mutable state gathered while a run progresses.
///
/// Each pipeline step records what it resolved. The draft is consumed by
/// either `fail` or `succeed`, so a run can produce only one outcome.
#[derive(Debug, Clone)]
pub struct OutcomeDraft {
	token_symbol: String,
	token_address: Option<Address>,
	amount: Decimal,
	amount_units: Option<U256>,
	tipper_wallet: Option<Address>,
	recipient_wallet: Option<Address>,
	tipper_display_name: Option<String>,
	recipient_display_name: Option<String>,
	recipient_social_id: Option<u64>,
	transaction_hash: Option<B256>,
	block_number: u64,
	gas_used: u64,
}

impl OutcomeDraft {
	pub fn new(request: &TipRequest) -> Self {
		Self {
			token_symbol: request.command.token_symbol.clone(),
			token_address: None,
			amount: request.command.amount,
			amount_units: None,
			tipper_wallet: None,
			recipient_wallet: None,
			tipper_display_name: request.tipper_display_name.clone(),
			recipient_display_name: None,
			recipient_social_id: request.recipient_social_id,
			transaction_hash: None,
			block_number: 0,
			gas_used: 0,
		}
	}

	pub fn set_token(&mut self, token: &TokenInfo) {
		self.token_symbol = token.symbol.clone();
		self.token_address = Some(token.address);
	}

	pub fn set_amount_units(&mut self, units: U256) {
		self.amount_units = Some(units);
	}

	pub fn set_recipient(
		&mut self,
		social_id: u64,
		display_name: Option<String>,
		wallet: Option<Address>,
	) {
		self.recipient_social_id = Some(social_id);
		self.recipient_display_name = display_name;
		self.recipient_wallet = wallet;
	}

	pub fn set_recipient_wallet(&mut self, wallet: Address) {
		self.recipient_wallet = Some(wallet);
	}

	pub fn set_tipper_wallet(&mut self, wallet: Address) {
		self.tipper_wallet = Some(wallet);
	}

	pub fn set_transaction_hash(&mut self, hash: B256) {
		self.transaction_hash = Some(hash);
	}

	/// Records block and gas of a mined transaction, whatever its status.
	pub fn set_receipt(&mut self, receipt: &TransactionReceipt) {
		self.transaction_hash = Some(receipt.hash);
		self.block_number = receipt.block_number;
		self.gas_used = receipt.gas_used;
	}

	pub fn transaction_hash(&self) -> Option<B256> {
		self.transaction_hash
	}

	/// Finalizes a failed run, keeping whatever was resolved so far.
	pub fn fail(self, failure: TipFailure) -> TipOutcome {
		self.finish(TipStatus::Failed, Some(failure))
	}

	/// Finalizes a run from a confirmed receipt.
	///
	/// A receipt that is not a successful inclusion in a real block cannot
	/// yield a success outcome; it is turned into a failure instead.
	pub fn succeed(mut self, receipt: &TransactionReceipt) -> TipOutcome {
		self.set_receipt(receipt);
		if !receipt.success {
			return self.fail(TipFailure::new(FailureKind::TransactionReverted));
		}
		if receipt.block_number == 0 {
			return self.fail(TipFailure::with_detail(
				FailureKind::Unexpected,
				"receipt reported success without a block number",
			));
		}
		self.finish(TipStatus::Success, None)
	}

	fn finish(self, status: TipStatus, failure: Option<TipFailure>) -> TipOutcome {
		TipOutcome {
			status,
			transaction_hash: self.transaction_hash,
			failure,
			tipper_wallet: self.tipper_wallet,
			recipient_wallet: self.recipient_wallet,
			tipper_display_name: self
				.tipper_display_name
				.unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
			recipient_display_name: self
				.recipient_display_name
				.unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
			recipient_social_id: self.recipient_social_id,
			token_symbol: self.token_symbol,
			token_address: self.token_address,
			amount: self.amount,
			amount_units: self.amount_units,
			block_number: self.block_number,
			gas_used: self.gas_used,
		}
	}
}

/// The single, immutable result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TipOutcome {
	status: TipStatus,
	transaction_hash: Option<B256>,
	failure: Option<TipFailure>,
	tipper_wallet: Option<Address>,
	recipient_wallet: Option<Address>,
	tipper_display_name: String,
	recipient_display_name: String,
	recipient_social_id: Option<u64>,
	token_symbol: String,
	token_address: Option<Address>,
	amount: Decimal,
	amount_units: Option<U256>,
	block_number: u64,
	gas_used: u64,
}

impl TipOutcome {
	pub fn status(&self) -> TipStatus {
		self.status
	}

	pub fn is_success(&self) -> bool {
		self.status == TipStatus::Success
	}

	pub fn transaction_hash(&self) -> Option<B256> {
		self.transaction_hash
	}

	pub fn failure(&self) -> Option<&TipFailure> {
		self.failure.as_ref()
	}

	pub fn failure_kind(&self) -> Option<FailureKind> {
		self.failure.as_ref().map(|f| f.kind)
	}

	/// Failure rendered as `<code>: <detail>`, absent on success.
	pub fn failure_reason(&self) -> Option<String> {
		self.failure.as_ref().map(|f| f.to_string())
	}

	pub fn tipper_wallet(&self) -> Option<Address> {
		self.tipper_wallet
	}

	pub fn recipient_wallet(&self) -> Option<Address> {
		self.recipient_wallet
	}

	pub fn tipper_display_name(&self) -> &str {
		&self.tipper_display_name
	}

	pub fn recipient_display_name(&self) -> &str {
		&self.recipient_display_name
	}

	pub fn recipient_social_id(&self) -> Option<u64> {
		self.recipient_social_id
	}

	pub fn token_symbol(&self) -> &str {
		&self.token_symbol
	}

	pub fn token_address(&self) -> Option<Address> {
		self.token_address
	}

	pub fn amount(&self) -> Decimal {
		self.amount
	}

	pub fn amount_units(&self) -> Option<U256> {
		self.amount_units
	}

	pub fn block_number(&self) -> u64 {
		self.block_number
	}

	pub fn gas_used(&self) -> u64 {
		self.gas_used
	}

	/// Human readable reply for the origin post.
	pub fn reply_text(&self) -> String {
		match &self.failure {
			None => format!(
				"✅ Sent {} {} to @{}! tx: {}",
				self.amount.normalize(),
				self.token_symbol,
				self.recipient_display_name,
				self.transaction_hash
					.map(|h| h.to_string())
					.unwrap_or_default()
			),
			Some(failure) => match (failure.kind, self.transaction_hash) {
				(FailureKind::TransactionConfirmationFailed, Some(hash))
				| (FailureKind::TransactionReverted, Some(hash)) => {
					format!("{} tx: {}", failure.kind.user_message(), hash)
				},
				_ => failure.kind.user_message().to_string(),
			},
		}
	}
}

/// Sentinel stored when a run ended without a transaction hash or wallet.
pub const NONE_SENTINEL: &str = "none";

/// Persisted row describing one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipRecord {
	pub tx_hash: String,
	pub tx_status: TipStatus,
	/// Timestamp of the origin post.
	pub timestamp: String,
	/// UNIX seconds at which the outcome was recorded.
	pub recorded_at: u64,
	pub tipper_fid: u64,
	pub tipper_username: String,
	pub tipper_wallet: String,
	pub recipient_fid: Option<u64>,
	pub recipient_username: String,
	pub recipient_wallet: String,
	pub token_symbol: String,
	pub token_address: String,
	pub amount: Decimal,
	pub cast_hash: String,
	pub parent_cast_hash: String,
	pub block_number: u64,
	pub gas_used: u64,
	pub failure_code: Option<FailureKind>,
	pub failure_reason: Option<String>,
}

impl TipRecord {
	pub fn new(request: &TipRequest, outcome: &TipOutcome, recorded_at: u64) -> Self {
		let render = |address: Option<Address>| {
			address
				.map(|a| a.to_checksum(None))
				.unwrap_or_else(|| NONE_SENTINEL.to_string())
		};

		Self {
			tx_hash: outcome
				.transaction_hash()
				.map(|h| h.to_string())
				.unwrap_or_else(|| NONE_SENTINEL.to_string()),
			tx_status: outcome.status(),
			timestamp: request.post_timestamp.clone(),
			recorded_at,
			tipper_fid: request.tipper_social_id,
			tipper_username: outcome.tipper_display_name().to_string(),
			tipper_wallet: render(outcome.tipper_wallet()),
			recipient_fid: outcome.recipient_social_id(),
			recipient_username: outcome.recipient_display_name().to_string(),
			recipient_wallet: render(outcome.recipient_wallet()),
			token_symbol: outcome.token_symbol().to_string(),
			token_address: render(outcome.token_address()),
			amount: outcome.amount(),
			cast_hash: request.origin_post_hash.clone(),
			parent_cast_hash: request.parent_post_hash.clone(),
			block_number: outcome.block_number(),
			gas_used: outcome.gas_used(),
			failure_code: outcome.failure_kind(),
			failure_reason: outcome.failure_reason(),
		}
	}
}
