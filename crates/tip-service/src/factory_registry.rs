//! Dynamic factory registry for relay implementations.
//!
//! Every crate advertises its implementations through
//! `get_all_implementations()`. This module collects them once and hands the
//! builder only the factories the loaded configuration actually names.

use std::collections::HashMap;
use std::sync::OnceLock;
use tip_account::{AccountError, AccountInterface};
use tip_chain::{ChainError, ChainInterface};
use tip_config::Config;
use tip_core::{TipEngine, TipEngineBuilder, TipFactories};
use tip_social::{SocialError, SocialInterface};
use tip_storage::{StorageError, StorageInterface};
use tip_types::{ImplementationRegistry, SecretString};

// Type aliases for factory functions
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;
pub type ChainFactory =
	fn(&toml::Value, &SecretString) -> Result<Box<dyn ChainInterface>, ChainError>;
pub type SocialFactory = fn(&toml::Value) -> Result<Box<dyn SocialInterface>, SocialError>;

/// Name under which the reply fallback client is registered.
///
/// The fallback is a second Neynar client with its own credentials, so it
/// shares the primary's factory.
pub const NEYNAR_FALLBACK: &str = "neynar_fallback";

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub account: HashMap<String, AccountFactory>,
	pub chain: HashMap<String, ChainFactory>,
	pub social: HashMap<String, SocialFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			account: HashMap::new(),
			chain: HashMap::new(),
			social: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}

	pub fn register_chain(&mut self, name: impl Into<String>, factory: ChainFactory) {
		self.chain.insert(name.into(), factory);
	}

	pub fn register_social(&mut self, name: impl Into<String>, factory: SocialFactory) {
		self.social.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in tip_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in tip_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}

		for (name, factory) in tip_chain::get_all_implementations() {
			tracing::debug!("Registering chain implementation: {}", name);
			registry.register_chain(name, factory);
		}

		for (name, factory) in tip_social::get_all_implementations() {
			tracing::debug!("Registering social implementation: {}", name);
			if name == tip_social::implementations::neynar::Registry::NAME {
				registry.register_social(NEYNAR_FALLBACK, factory);
			}
			registry.register_social(name, factory);
		}

		registry
	})
}

pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Macro to build factories from config implementations
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Build the tip engine using the registry and config.
pub async fn build_engine_from_config(
	config: Config,
) -> Result<TipEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let account_factories =
		build_factories!(registry, config.account.implementations, account, "account");
	let chain_factories = build_factories!(registry, config.chain.implementations, chain, "chain");
	let social_factories =
		build_factories!(registry, config.social.implementations, social, "social");

	let factories = TipFactories {
		storage_factories,
		account_factories,
		chain_factories,
		social_factories,
	};

	Ok(TipEngineBuilder::new(config).build(factories).await?)
}
