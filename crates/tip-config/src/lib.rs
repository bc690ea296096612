//! Configuration module for the tip relay.
//!
//! Loads the relay configuration from TOML, resolves `${VAR}` and
//! `${VAR:-default}` environment placeholders, and validates cross-section
//! references (primary implementations, reply fallback, token table) before
//! anything is constructed.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["tokens.toml", "secrets.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tip_types::{SecretString, TokenInfo, TriggerPolicy};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Complete relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Bot identity, command syntax and run limits.
	pub bot: BotConfig,
	/// Chain client selection.
	pub chain: ChainConfig,
	/// Tippable tokens, loaded once into the token registry.
	pub tokens: Vec<TokenInfo>,
	/// Signing account selection.
	pub account: AccountConfig,
	/// Social API client selection.
	pub social: SocialConfig,
	/// Persistence backend selection.
	pub storage: StorageConfig,
	/// Outcome sink switches.
	#[serde(default)]
	pub notifications: NotificationsConfig,
	/// HTTP server for webhook intake and queries.
	pub api: Option<ApiConfig>,
}

/// Bot identity and command handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
	/// Identifier of this relay instance, used in logs.
	pub id: String,
	/// Command keyword that marks a post as a tip.
	#[serde(default = "default_trigger_word")]
	pub trigger_word: String,
	/// Word that may (or must, depending on policy) follow the trigger.
	#[serde(default = "default_connector_word")]
	pub connector_word: String,
	#[serde(default)]
	pub trigger_policy: TriggerPolicy,
	/// Upper bound on tip runs in flight at once.
	#[serde(default = "default_max_concurrent_tips")]
	pub max_concurrent_tips: usize,
	/// How long to wait for a submitted tip to be mined.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
}

fn default_trigger_word() -> String {
	"!montip".to_string()
}

fn default_connector_word() -> String {
	"tip".to_string()
}

fn default_max_concurrent_tips() -> usize {
	32
}

fn default_confirmation_timeout_seconds() -> u64 {
	120
}

/// Chain client selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of chain implementation names to their raw configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Social API client selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SocialConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval_seconds() -> u64 {
	3600
}

/// Outcome sink switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
	/// Post a reply to the origin post once a run finishes.
	#[serde(default = "default_true")]
	pub reply_enabled: bool,
	/// Persist one record per run.
	#[serde(default = "default_true")]
	pub persist: bool,
	/// Social implementation used once when the primary reply fails.
	/// Must match one of the entries in `[social.implementations]`.
	#[serde(default)]
	pub fallback: Option<String>,
}

impl Default for NotificationsConfig {
	fn default() -> Self {
		Self {
			reply_enabled: true,
			persist: true,
			fallback: None,
		}
	}
}

fn default_true() -> bool {
	true
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Shared secret for webhook signatures.
	#[serde(default)]
	pub webhook_secret: Option<SecretString>,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8000
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}. Placeholders
/// inside TOML comments are left untouched.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let line_start = input[..full_match.start()].rfind('\n').map_or(0, |i| i + 1);
		if in_comment(&input[line_start..full_match.start()]) {
			continue;
		}
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

/// Whether a `#` outside of a string starts a comment before the end of `prefix`.
fn in_comment(prefix: &str) -> bool {
	let mut quote: Option<char> = None;
	let mut escaped = false;
	for c in prefix.chars() {
		match quote {
			Some('"') if escaped => escaped = false,
			Some('"') if c == '\\' => escaped = true,
			Some(q) if c == q => quote = None,
			Some(_) => {},
			None if c == '#' => return true,
			None if c == '"' || c == '\'' => quote = Some(c),
			None => {},
		}
	}
	false
}

fn require_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

fn is_single_word(word: &str) -> bool {
	!word.is_empty() && !word.chars().any(char::is_whitespace)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-section references and value ranges.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.bot.id.is_empty() {
			return Err(ConfigError::Validation("Bot ID cannot be empty".into()));
		}
		if !is_single_word(&self.bot.trigger_word) {
			return Err(ConfigError::Validation(
				"Bot trigger_word must be a single non-empty word".into(),
			));
		}
		if !is_single_word(&self.bot.connector_word) {
			return Err(ConfigError::Validation(
				"Bot connector_word must be a single non-empty word".into(),
			));
		}
		if self.bot.max_concurrent_tips == 0 {
			return Err(ConfigError::Validation(
				"Bot max_concurrent_tips must be greater than 0".into(),
			));
		}
		if self.bot.confirmation_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Bot confirmation_timeout_seconds must be greater than 0".into(),
			));
		}

		self.validate_tokens()?;

		require_primary("chain", &self.chain.primary, &self.chain.implementations)?;
		require_primary("account", &self.account.primary, &self.account.implementations)?;
		require_primary("social", &self.social.primary, &self.social.implementations)?;
		require_primary("storage", &self.storage.primary, &self.storage.implementations)?;

		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if let Some(ref fallback) = self.notifications.fallback {
			if !self.social.implementations.contains_key(fallback) {
				return Err(ConfigError::Validation(format!(
					"Reply fallback '{}' not found in social.implementations",
					fallback
				)));
			}
			if *fallback == self.social.primary {
				return Err(ConfigError::Validation(
					"Reply fallback must differ from the primary social implementation".into(),
				));
			}
		}

		if let Some(ref api) = self.api {
			if api.enabled {
				match api.webhook_secret {
					Some(ref secret) if !secret.is_blank() => {},
					_ => {
						return Err(ConfigError::Validation(
							"API webhook_secret is required when the API is enabled".into(),
						))
					},
				}
			}
		}

		Ok(())
	}

	fn validate_tokens(&self) -> Result<(), ConfigError> {
		if self.tokens.is_empty() {
			return Err(ConfigError::Validation(
				"At least one token must be configured".into(),
			));
		}

		let mut seen = HashSet::new();
		for token in &self.tokens {
			if token.symbol.is_empty() {
				return Err(ConfigError::Validation("Token symbol cannot be empty".into()));
			}
			if token.decimals > TokenInfo::MAX_DECIMALS {
				return Err(ConfigError::Validation(format!(
					"Token {} has {} decimals (max: {})",
					token.symbol,
					token.decimals,
					TokenInfo::MAX_DECIMALS
				)));
			}
			// Symbols are matched case-insensitively by the parser
			if !seen.insert(token.symbol.to_lowercase()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate token symbol '{}'",
					token.symbol
				)));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
