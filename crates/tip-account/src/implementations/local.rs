//! Local private-key account.
//!
//! Reads a hex encoded secp256k1 key from configuration, usually through an
//! environment placeholder such as `private_key = "${BOT_PRIVATE_KEY}"`.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tip_types::{
	with_0x_prefix, without_0x_prefix, Address, ConfigSchema, Field, FieldType,
	ImplementationRegistry, Schema, SecretString, ValidationError,
};

/// Account backed by a key held in process memory.
pub struct LocalAccount {
	signer: PrivateKeySigner,
	private_key: SecretString,
}

impl LocalAccount {
	/// Validates and loads a hex private key.
	///
	/// The key must be exactly 64 hex digits, with or without `0x`.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(|raw| {
			let raw = raw.trim();
			check_key_format(raw).map_err(AccountError::InvalidKey)?;
			raw.parse::<PrivateKeySigner>()
				.map_err(|e| AccountError::InvalidKey(format!("Failed to parse key: {}", e)))
		})?;

		let private_key =
			private_key.with_exposed(|raw| SecretString::new(with_0x_prefix(raw.trim())));

		tracing::debug!(address = %signer.address(), "Loaded local signing account");
		Ok(Self {
			signer,
			private_key,
		})
	}
}

fn check_key_format(raw: &str) -> Result<(), String> {
	let digits = without_0x_prefix(raw);
	if digits.len() != 64 {
		return Err(format!(
			"Private key must be 64 hex characters, got {}",
			digits.len()
		));
	}
	if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err("Private key contains non-hex characters".to_string());
	}
	Ok(())
}

/// Configuration schema for the local account.
pub struct LocalAccountSchema;

impl ConfigSchema for LocalAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(raw) => check_key_format(raw.trim()),
					None => Err("Expected a string".to_string()),
				}
			})],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalAccountSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	fn signing_key(&self) -> SecretString {
		self.private_key.clone()
	}
}

/// Factory function to create a local account from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex encoded key, 64 digits with optional `0x`
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalAccount::new(&private_key)?))
}

/// Registry for the local account implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}
