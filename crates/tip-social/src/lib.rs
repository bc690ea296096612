//! Social network client for the tip relay.
//!
//! The pipeline needs two things from the social network: the author of the
//! post being replied to (the tip recipient) and a way to answer the tipper.
//! `SocialService` pairs a primary client with an optional fallback that is
//! tried once when publishing a reply fails.

use async_trait::async_trait;
use thiserror::Error;
use tip_types::{ConfigSchema, ImplementationRegistry, ParentPost};

/// Re-export implementations
pub mod implementations {
	pub mod neynar;
}

/// Errors that can occur during social API operations.
#[derive(Debug, Error)]
pub enum SocialError {
	/// The requested post does not exist.
	#[error("Post not found: {0}")]
	NotFound(String),
	/// The API answered with an error or could not be reached.
	#[error("Upstream error: {0}")]
	Upstream(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Interface for social network clients.
#[async_trait]
pub trait SocialInterface: Send + Sync {
	/// Returns the configuration schema for this social implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the author details of the post identified by `hash`.
	async fn fetch_post(&self, hash: &str) -> Result<ParentPost, SocialError>;

	/// Publishes `text` as a reply to `parent_hash`, returning the new post hash.
	async fn publish_reply(&self, parent_hash: &str, text: &str) -> Result<String, SocialError>;
}

/// Type alias for social factory functions.
pub type SocialFactory = fn(&toml::Value) -> Result<Box<dyn SocialInterface>, SocialError>;

/// Registry trait for social implementations.
pub trait SocialRegistry: ImplementationRegistry<Factory = SocialFactory> {}

/// Get all registered social implementations.
pub fn get_all_implementations() -> Vec<(&'static str, SocialFactory)> {
	use implementations::neynar;

	vec![(neynar::Registry::NAME, neynar::Registry::factory())]
}

/// Service combining the primary social client and the reply fallback.
pub struct SocialService {
	primary: Box<dyn SocialInterface>,
	fallback: Option<Box<dyn SocialInterface>>,
}

impl SocialService {
	pub fn new(
		primary: Box<dyn SocialInterface>,
		fallback: Option<Box<dyn SocialInterface>>,
	) -> Self {
		Self { primary, fallback }
	}

	/// Looks up a parent post through the primary client.
	pub async fn fetch_post(&self, hash: &str) -> Result<ParentPost, SocialError> {
		self.primary.fetch_post(hash).await
	}

	/// Publishes a reply, trying the fallback once if the primary fails.
	pub async fn publish_reply(&self, parent_hash: &str, text: &str) -> Result<String, SocialError> {
		let primary_error = match self.primary.publish_reply(parent_hash, text).await {
			Ok(hash) => return Ok(hash),
			Err(e) => e,
		};

		let Some(fallback) = &self.fallback else {
			return Err(primary_error);
		};

		tracing::warn!(
			parent = %tip_types::truncate_id(parent_hash),
			error = %primary_error,
			"Primary reply failed, trying fallback"
		);
		fallback.publish_reply(parent_hash, text).await
	}
}
