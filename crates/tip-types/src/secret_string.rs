//! Secure string type for the relay's credentials.
//!
//! The bot signing key, the social API key, the reply signer identifier and
//! the webhook secret are all held as `SecretString`. The value is zeroed on
//! drop and never appears in Debug, Display or serialized output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that zeroes its memory on drop and redacts itself when printed.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret as a string slice.
	///
	/// Callers must not log or persist the returned value.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// Exposes the secret to a closure, limiting the scope of the borrow.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	/// True when the secret is empty or whitespace only.
	///
	/// Unresolved `${VAR:-}` placeholders end up here, so configuration
	/// validation rejects blank secrets explicitly.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// Serialized configs and API responses only ever see the placeholder.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_signing_key_never_printed() {
		let key = SecretString::from("4c0883a69102937d6231471b5dbb6204fe512961708279f1d7b1b3f1e2b4c6d8");
		let debug = format!("{:?}", key);
		let display = format!("{}", key);
		let json = serde_json::to_string(&key).unwrap();

		assert_eq!(debug, "SecretString(***REDACTED***)");
		assert_eq!(display, "***REDACTED***");
		assert_eq!(json, "\"***REDACTED***\"");
		assert!(!debug.contains("4c0883"));
	}

	#[test]
	fn test_expose_and_compare() {
		let api_key = SecretString::from("neynar-key");
		assert_eq!(api_key.expose_secret(), "neynar-key");
		assert_eq!(api_key.with_exposed(|s| s.len()), 10);
		assert_eq!(api_key, SecretString::from("neynar-key".to_string()));
		assert_ne!(api_key, SecretString::from("other"));
	}

	#[test]
	fn test_blank_detection() {
		assert!(SecretString::from("").is_blank());
		assert!(SecretString::from("   ").is_blank());
		assert!(!SecretString::from("x").is_blank());
	}

	#[test]
	fn test_deserialize_from_toml() {
		#[derive(Deserialize)]
		struct Section {
			webhook_secret: SecretString,
		}
		let section: Section = toml::from_str("webhook_secret = \"s3cret\"").unwrap();
		assert_eq!(section.webhook_secret.expose_secret(), "s3cret");
	}
}
