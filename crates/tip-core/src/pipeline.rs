//! The tip pipeline.
//!
//! One run walks a fixed sequence of steps and stops at the first failure.
//! Whatever happens, it returns exactly one `TipOutcome`; errors never leave
//! the run as `Err`. Nothing is retried.

use crate::registry::TokenRegistry;
use std::sync::Arc;
use std::time::Duration;
use tip_chain::{ChainError, ChainService, TipCall};
use tip_social::SocialService;
use tip_types::{
	normalize_address, to_smallest_units, truncate_id, Address, FailureKind, OutcomeDraft,
	TipFailure, TipOutcome, TipRequest, TransactionReceipt,
};
use tracing::Instrument;

/// Runs tip requests against the chain and the social API.
pub struct TipPipeline {
	registry: Arc<TokenRegistry>,
	chain: Arc<ChainService>,
	social: Arc<SocialService>,
	confirmation_timeout: Duration,
}

impl TipPipeline {
	pub fn new(
		registry: Arc<TokenRegistry>,
		chain: Arc<ChainService>,
		social: Arc<SocialService>,
		confirmation_timeout: Duration,
	) -> Self {
		Self {
			registry,
			chain,
			social,
			confirmation_timeout,
		}
	}

	/// Processes one request to its terminal outcome.
	pub async fn run(&self, request: &TipRequest) -> TipOutcome {
		let span = tracing::info_span!(
			"tip",
			cast = %truncate_id(&request.origin_post_hash),
			tipper = request.tipper_social_id,
			amount = %request.command.amount,
			token = %request.command.token_symbol,
		);

		async {
			let mut draft = OutcomeDraft::new(request);
			let outcome = match self.execute(request, &mut draft).await {
				Ok(receipt) => draft.succeed(&receipt),
				Err(failure) => {
					tracing::warn!(reason = %failure, "Tip failed");
					draft.fail(failure)
				},
			};

			if outcome.is_success() {
				tracing::info!(
					block = outcome.block_number(),
					gas_used = outcome.gas_used(),
					"Tip confirmed"
				);
			}
			outcome
		}
		.instrument(span)
		.await
	}

	async fn execute(
		&self,
		request: &TipRequest,
		draft: &mut OutcomeDraft,
	) -> Result<TransactionReceipt, TipFailure> {
		// Recipient from the parent post author
		let parent = self
			.social
			.fetch_post(&request.parent_post_hash)
			.await
			.map_err(|e| TipFailure::with_detail(FailureKind::NoVerifiedAddress, e.to_string()))?;
		let raw_recipient = parent.verified_primary_address.clone();
		draft.set_recipient(parent.author_social_id, parent.author_display_name, None);
		let raw_recipient = raw_recipient.ok_or_else(|| {
			TipFailure::with_detail(
				FailureKind::NoVerifiedAddress,
				format!("fid {} has no primary address", parent.author_social_id),
			)
		})?;

		// Tipper's smart wallet
		let wallet = self
			.chain
			.resolve_wallet(request.tipper_social_id)
			.await
			.map_err(|e| unexpected("wallet lookup", e))?;
		if wallet == Address::ZERO {
			return Err(TipFailure::with_detail(
				FailureKind::NoSmartWallet,
				format!("fid {}", request.tipper_social_id),
			));
		}
		draft.set_tipper_wallet(wallet);

		let token = self
			.registry
			.lookup(&request.command.token_symbol)
			.ok_or_else(|| {
				TipFailure::with_detail(
					FailureKind::UnsupportedToken,
					request.command.token_symbol.clone(),
				)
			})?
			.clone();
		draft.set_token(&token);

		let recipient = normalize_address(&raw_recipient)
			.map_err(|e| TipFailure::with_detail(FailureKind::InvalidAddressFormat, e.to_string()))?;
		draft.set_recipient_wallet(recipient);

		// Unreachable after the NoSmartWallet check; kept to hold the step order.
		if wallet.is_zero() {
			return Err(TipFailure::new(FailureKind::WalletNotCreated));
		}

		let authorized = self
			.chain
			.authorized_signer(wallet)
			.await
			.map_err(|e| unexpected("authorization lookup", e))?;
		if authorized != self.chain.signer_address() {
			return Err(TipFailure::with_detail(
				FailureKind::BotNotAuthorized,
				format!(
					"wallet {} accepts {}, bot is {}",
					wallet,
					authorized,
					self.chain.signer_address()
				),
			));
		}

		let amount_units = to_smallest_units(request.command.amount, token.decimals)
			.map_err(|e| TipFailure::with_detail(FailureKind::Unexpected, e.to_string()))?;
		draft.set_amount_units(amount_units);
		if amount_units.is_zero() {
			return Err(TipFailure::with_detail(
				FailureKind::AmountTooSmall,
				format!("{} {} is less than one unit", request.command.amount, token.symbol),
			));
		}

		let balance = self
			.chain
			.balance_of(token.address, wallet)
			.await
			.map_err(|e| unexpected("balance lookup", e))?;
		if balance < amount_units {
			return Err(TipFailure::with_detail(
				FailureKind::InsufficientBalance,
				format!("has {} needs {} {}", balance, amount_units, token.symbol),
			));
		}

		let call = TipCall {
			wallet,
			recipient,
			token: token.address,
			amount_units,
		};

		let gas_limit = self
			.chain
			.estimate_gas(&call)
			.await
			.map_err(|e| TipFailure::with_detail(FailureKind::GasEstimationFailed, e.to_string()))?;

		// A failed submit leaves no hash; the node may still have the tx.
		let hash = self.chain.submit(&call, gas_limit).await.map_err(|e| {
			TipFailure::with_detail(FailureKind::TransactionSubmissionError, e.to_string())
		})?;
		draft.set_transaction_hash(hash);
		tracing::info!(tx_hash = %truncate_id(&hash.to_string()), gas_limit, "Tip submitted");

		let receipt = self
			.chain
			.await_confirmation(hash, self.confirmation_timeout)
			.await
			.map_err(|e| {
				TipFailure::with_detail(FailureKind::TransactionConfirmationFailed, e.to_string())
			})?;

		Ok(receipt)
	}
}

fn unexpected(step: &str, error: ChainError) -> TipFailure {
	TipFailure::with_detail(FailureKind::Unexpected, format!("{} failed: {}", step, error))
}
