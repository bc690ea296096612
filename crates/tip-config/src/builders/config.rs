//! Configuration builder for tests.
//!
//! Produces a `Config` wired to in-memory storage and placeholder service
//! entries, without going through TOML parsing or validation.

use crate::{
	AccountConfig, ApiConfig, BotConfig, ChainConfig, Config, NotificationsConfig, SocialConfig,
	StorageConfig,
};
use std::collections::HashMap;
use tip_types::{Address, TokenInfo, TriggerPolicy};

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	bot_id: String,
	trigger_policy: TriggerPolicy,
	max_concurrent_tips: usize,
	confirmation_timeout_seconds: u64,
	tokens: Vec<TokenInfo>,
	reply_enabled: bool,
	persist: bool,
	fallback: Option<String>,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a builder with a native MON token and short timeouts.
	pub fn new() -> Self {
		Self {
			bot_id: "test-montip".to_string(),
			trigger_policy: TriggerPolicy::Anywhere,
			max_concurrent_tips: 4,
			confirmation_timeout_seconds: 5,
			tokens: vec![TokenInfo {
				symbol: "MON".to_string(),
				address: Address::ZERO,
				decimals: 18,
			}],
			reply_enabled: true,
			persist: true,
			fallback: None,
			api: None,
		}
	}

	pub fn bot_id(mut self, id: impl Into<String>) -> Self {
		self.bot_id = id.into();
		self
	}

	pub fn trigger_policy(mut self, policy: TriggerPolicy) -> Self {
		self.trigger_policy = policy;
		self
	}

	pub fn max_concurrent_tips(mut self, limit: usize) -> Self {
		self.max_concurrent_tips = limit;
		self
	}

	pub fn confirmation_timeout_seconds(mut self, seconds: u64) -> Self {
		self.confirmation_timeout_seconds = seconds;
		self
	}

	/// Adds a token to the table.
	pub fn token(mut self, symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
		self.tokens.push(TokenInfo {
			symbol: symbol.into(),
			address,
			decimals,
		});
		self
	}

	pub fn reply_enabled(mut self, enabled: bool) -> Self {
		self.reply_enabled = enabled;
		self
	}

	pub fn persist(mut self, persist: bool) -> Self {
		self.persist = persist;
		self
	}

	pub fn fallback(mut self, fallback: Option<String>) -> Self {
		self.fallback = fallback;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		let empty = || toml::Value::Table(toml::map::Map::new());
		let mut social = HashMap::from([("test".to_string(), empty())]);
		if let Some(ref fallback) = self.fallback {
			social.insert(fallback.clone(), empty());
		}

		Config {
			bot: BotConfig {
				id: self.bot_id,
				trigger_word: "!montip".to_string(),
				connector_word: "tip".to_string(),
				trigger_policy: self.trigger_policy,
				max_concurrent_tips: self.max_concurrent_tips,
				confirmation_timeout_seconds: self.confirmation_timeout_seconds,
			},
			chain: ChainConfig {
				primary: "test".to_string(),
				implementations: HashMap::from([("test".to_string(), empty())]),
			},
			tokens: self.tokens,
			account: AccountConfig {
				primary: "test".to_string(),
				implementations: HashMap::from([("test".to_string(), empty())]),
			},
			social: SocialConfig {
				primary: "test".to_string(),
				implementations: social,
			},
			storage: StorageConfig {
				primary: "memory".to_string(),
				implementations: HashMap::from([("memory".to_string(), empty())]),
				cleanup_interval_seconds: 60,
			},
			notifications: NotificationsConfig {
				reply_enabled: self.reply_enabled,
				persist: self.persist,
				fallback: self.fallback,
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_produces_valid_config() {
		let config = ConfigBuilder::new()
			.token("USDC", Address::repeat_byte(0x11), 6)
			.fallback(Some("backup".to_string()))
			.build();

		assert!(config.validate().is_ok());
		assert_eq!(config.tokens.len(), 2);
		assert!(config.social.implementations.contains_key("backup"));
	}
}
