//! Shared application context.
//!
//! Everything a run needs that outlives the run itself. Built once by the
//! builder and shared by `Arc`; nothing in here is mutated after startup.

use crate::parser::CommandParser;
use crate::registry::TokenRegistry;
use crate::sinks::OutcomeRecorder;
use std::sync::Arc;
use tip_chain::ChainService;
use tip_config::Config;
use tip_social::SocialService;
use tip_storage::StorageService;
use tip_types::Address;

pub struct TipContext {
	pub config: Config,
	pub registry: Arc<TokenRegistry>,
	pub parser: CommandParser,
	pub chain: Arc<ChainService>,
	pub social: Arc<SocialService>,
	pub storage: Arc<StorageService>,
	pub recorder: Arc<OutcomeRecorder>,
	/// Operator address derived from the signing key.
	pub signer: Address,
}

impl TipContext {
	pub fn new(
		config: Config,
		registry: Arc<TokenRegistry>,
		chain: Arc<ChainService>,
		social: Arc<SocialService>,
		storage: Arc<StorageService>,
		recorder: Arc<OutcomeRecorder>,
	) -> Self {
		let parser = CommandParser::new(
			&config.bot.trigger_word,
			&config.bot.connector_word,
			config.bot.trigger_policy,
			registry.clone(),
		);
		let signer = chain.signer_address();

		Self {
			config,
			registry,
			parser,
			chain,
			social,
			storage,
			recorder,
			signer,
		}
	}
}
