//! Outcome sinks.
//!
//! Every finished run is handed to the `OutcomeRecorder`, which writes it to
//! each configured sink in turn. Sink failures are logged and swallowed; a
//! broken sink never changes the outcome or blocks the others.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tip_social::SocialService;
use tip_storage::StorageService;
use tip_types::{current_timestamp, truncate_id, StorageKey, TipOutcome, TipRecord, TipRequest};

#[derive(Debug, Error)]
pub enum SinkError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Reply error: {0}")]
	Reply(String),
}

/// A write-only destination for finished outcomes.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &'static str;

	async fn record(&self, request: &TipRequest, outcome: &TipOutcome) -> Result<(), SinkError>;
}

/// Persists one `TipRecord` per run under the origin post hash.
///
/// Runs that reached submission are also indexed by transaction hash.
pub struct StorageSink {
	storage: Arc<StorageService>,
}

impl StorageSink {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}
}

#[async_trait]
impl OutcomeSink for StorageSink {
	fn name(&self) -> &'static str {
		"storage"
	}

	async fn record(&self, request: &TipRequest, outcome: &TipOutcome) -> Result<(), SinkError> {
		let record = TipRecord::new(request, outcome, current_timestamp());

		self.storage
			.store(StorageKey::Tips, &request.origin_post_hash, &record)
			.await
			.map_err(|e| SinkError::Storage(e.to_string()))?;

		if let Some(hash) = outcome.transaction_hash() {
			self.storage
				.store(
					StorageKey::TipByTxHash,
					&hash.to_string(),
					&request.origin_post_hash,
				)
				.await
				.map_err(|e| SinkError::Storage(e.to_string()))?;
		}
		Ok(())
	}
}

/// Replies to the origin post with the outcome message.
pub struct ReplySink {
	social: Arc<SocialService>,
}

impl ReplySink {
	pub fn new(social: Arc<SocialService>) -> Self {
		Self { social }
	}
}

#[async_trait]
impl OutcomeSink for ReplySink {
	fn name(&self) -> &'static str {
		"reply"
	}

	async fn record(&self, request: &TipRequest, outcome: &TipOutcome) -> Result<(), SinkError> {
		let reply = self
			.social
			.publish_reply(&request.origin_post_hash, &outcome.reply_text())
			.await
			.map_err(|e| SinkError::Reply(e.to_string()))?;
		tracing::debug!(reply = %truncate_id(&reply), "Published outcome reply");
		Ok(())
	}
}

/// Fans one outcome out to every sink.
#[derive(Default)]
pub struct OutcomeRecorder {
	sinks: Vec<Arc<dyn OutcomeSink>>,
}

impl OutcomeRecorder {
	pub fn new(sinks: Vec<Arc<dyn OutcomeSink>>) -> Self {
		Self { sinks }
	}

	pub fn sink_names(&self) -> Vec<&'static str> {
		self.sinks.iter().map(|s| s.name()).collect()
	}

	/// Writes the outcome to all sinks, returning how many succeeded.
	pub async fn record(&self, request: &TipRequest, outcome: &TipOutcome) -> usize {
		let mut written = 0;
		for sink in &self.sinks {
			match sink.record(request, outcome).await {
				Ok(()) => written += 1,
				Err(e) => tracing::error!(
					sink = sink.name(),
					cast = %truncate_id(&request.origin_post_hash),
					error = %e,
					"Failed to record tip outcome"
				),
			}
		}
		written
	}
}
