//! Builder for constructing tip engines.
//!
//! Instantiates the configured implementation of each service through
//! name-keyed factory functions, then wires the shared context. Factories are
//! passed in rather than looked up globally so tests can inject fakes.

use crate::engine::{context::TipContext, TipEngine};
use crate::registry::TokenRegistry;
use crate::sinks::{OutcomeRecorder, OutcomeSink, ReplySink, StorageSink};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tip_account::{AccountError, AccountInterface, AccountService};
use tip_chain::{ChainError, ChainInterface, ChainService};
use tip_config::Config;
use tip_social::{SocialError, SocialInterface, SocialService};
use tip_storage::{StorageError, StorageInterface, StorageService};
use tip_types::{format_token_amount, SecretString};

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every service, keyed by implementation name.
pub struct TipFactories<SF, AF, CF, SOF> {
	pub storage_factories: HashMap<String, SF>,
	pub account_factories: HashMap<String, AF>,
	pub chain_factories: HashMap<String, CF>,
	pub social_factories: HashMap<String, SOF>,
}

/// Builder for constructing a `TipEngine` from configuration.
pub struct TipEngineBuilder {
	config: Config,
}

/// Runs the named factory and logs the result the same way for every component.
fn instantiate<T, E: Display>(
	component: &'static str,
	name: &str,
	factory: Option<impl FnOnce() -> Result<T, E>>,
) -> Result<T, BuilderError> {
	let factory = factory.ok_or_else(|| {
		BuilderError::MissingComponent(format!("no {} implementation named '{}'", component, name))
	})?;

	match factory() {
		Ok(implementation) => {
			tracing::info!(component, implementation = %name, "Loaded");
			Ok(implementation)
		},
		Err(e) => {
			tracing::error!(
				component,
				implementation = %name,
				error = %e,
				"Failed to create implementation"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, name, e
			)))
		},
	}
}

fn section<'a>(
	component: &str,
	implementations: &'a HashMap<String, toml::Value>,
	name: &str,
) -> Result<&'a toml::Value, BuilderError> {
	implementations.get(name).ok_or_else(|| {
		BuilderError::Config(format!(
			"{} implementation '{}' has no configuration table",
			component, name
		))
	})
}

impl TipEngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine using factories for each component type.
	pub async fn build<SF, AF, CF, SOF>(
		self,
		factories: TipFactories<SF, AF, CF, SOF>,
	) -> Result<TipEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
		CF: Fn(&toml::Value, &SecretString) -> Result<Box<dyn ChainInterface>, ChainError>,
		SOF: Fn(&toml::Value) -> Result<Box<dyn SocialInterface>, SocialError>,
	{
		let config = &self.config;

		// Storage
		let name = &config.storage.primary;
		let table = section("storage", &config.storage.implementations, name)?;
		let backend = instantiate(
			"storage",
			name,
			factories.storage_factories.get(name).map(|f| move || f(table)),
		)?;
		let storage = Arc::new(StorageService::new(backend));

		// Account
		let name = &config.account.primary;
		let table = section("account", &config.account.implementations, name)?;
		let account = AccountService::new(instantiate(
			"account",
			name,
			factories.account_factories.get(name).map(|f| move || f(table)),
		)?);
		let signer = account.get_address().await.map_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get signer address");
			BuilderError::Config(format!("Failed to get signer address: {}", e))
		})?;
		let signing_key = account.signing_key();

		// Chain
		let name = &config.chain.primary;
		let table = section("chain", &config.chain.implementations, name)?;
		let chain_impl = instantiate(
			"chain",
			name,
			factories
				.chain_factories
				.get(name)
				.map(|f| move || f(table, &signing_key)),
		)?;
		let chain = Arc::new(ChainService::new(chain_impl, signer));

		// Social, plus the reply fallback if configured
		let name = &config.social.primary;
		let table = section("social", &config.social.implementations, name)?;
		let primary = instantiate(
			"social",
			name,
			factories.social_factories.get(name).map(|f| move || f(table)),
		)?;
		let fallback = match &config.notifications.fallback {
			Some(name) => {
				let table = section("social", &config.social.implementations, name)?;
				Some(instantiate(
					"social_fallback",
					name,
					factories.social_factories.get(name).map(|f| move || f(table)),
				)?)
			},
			None => None,
		};
		let social = Arc::new(SocialService::new(primary, fallback));

		let registry = Arc::new(
			TokenRegistry::new(config.tokens.iter().cloned())
				.map_err(|e| BuilderError::Config(e.to_string()))?,
		);
		if registry.is_empty() {
			return Err(BuilderError::MissingComponent("token registry is empty".into()));
		}

		let mut sinks: Vec<Arc<dyn OutcomeSink>> = Vec::new();
		if config.notifications.persist {
			sinks.push(Arc::new(StorageSink::new(storage.clone())));
		}
		if config.notifications.reply_enabled {
			sinks.push(Arc::new(ReplySink::new(social.clone())));
		}
		if sinks.is_empty() {
			tracing::warn!("No outcome sinks enabled - tip results will only be logged");
		}
		let recorder = Arc::new(OutcomeRecorder::new(sinks));

		// Operator balance, for monitoring only
		match chain.balance_of(tip_types::Address::ZERO, signer).await {
			Ok(balance) => tracing::info!(
				signer = %signer,
				balance = %format_token_amount(balance, 18),
				"Operator gas balance"
			),
			Err(e) => tracing::warn!(error = %e, "Failed to check operator balance"),
		}

		let context = TipContext::new(self.config, registry, chain, social, storage, recorder);
		Ok(TipEngine::new(context))
	}
}
