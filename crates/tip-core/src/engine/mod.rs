//! Tip engine.
//!
//! Admits inbound tip commands, runs each one in its own task and records
//! the outcome. Admission is bounded: when every permit is taken the command
//! is rejected immediately so the webhook sender can redeliver later.

pub mod context;
pub mod lifecycle;

use crate::pipeline::TipPipeline;
use context::TipContext;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tip_storage::StorageError;
use tip_types::{
	truncate_id, FailureKind, InboundCast, OutcomeDraft, StorageKey, TipCommand, TipFailure,
	TipOutcome, TipRecord, TipRequest,
};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// All run permits are in use.
	#[error("Engine at capacity ({0} tips in flight)")]
	AtCapacity(usize),
	#[error("Storage error: {0}")]
	Storage(String),
	/// The recording task itself died.
	#[error("Task error: {0}")]
	Task(String),
}

/// Handle to a dispatched run.
pub struct TipHandle {
	origin_post_hash: String,
	task: JoinHandle<TipOutcome>,
}

impl TipHandle {
	pub fn origin_post_hash(&self) -> &str {
		&self.origin_post_hash
	}

	/// Waits for the run to finish and its outcome to be recorded.
	pub async fn outcome(self) -> Result<TipOutcome, EngineError> {
		self.task
			.await
			.map_err(|e| EngineError::Task(e.to_string()))
	}
}

/// Main engine that owns the context and the admission semaphore.
#[derive(Clone)]
pub struct TipEngine {
	pub(crate) context: Arc<TipContext>,
	pipeline: Arc<TipPipeline>,
	admission: Arc<Semaphore>,
	capacity: usize,
}

impl TipEngine {
	pub fn new(context: TipContext) -> Self {
		let capacity = context.config.bot.max_concurrent_tips;
		let pipeline = TipPipeline::new(
			context.registry.clone(),
			context.chain.clone(),
			context.social.clone(),
			Duration::from_secs(context.config.bot.confirmation_timeout_seconds),
		);

		Self {
			context: Arc::new(context),
			pipeline: Arc::new(pipeline),
			admission: Arc::new(Semaphore::new(capacity)),
			capacity,
		}
	}

	pub fn context(&self) -> &TipContext {
		&self.context
	}

	/// Parses post text with the configured trigger policy.
	pub fn parse(&self, text: &str) -> Option<TipCommand> {
		self.context.parser.parse(text)
	}

	pub fn has_trigger(&self, text: &str) -> bool {
		self.context.parser.has_trigger(text)
	}

	/// Number of runs currently holding a permit.
	pub fn in_flight(&self) -> usize {
		self.capacity - self.admission.available_permits()
	}

	/// Starts a run for `command` found in `cast`.
	///
	/// Returns `AtCapacity` without queueing when no permit is free. The
	/// outcome is always recorded, even if the pipeline task panics.
	pub fn dispatch(&self, cast: &InboundCast, command: TipCommand) -> Result<TipHandle, EngineError> {
		let permit = self
			.admission
			.clone()
			.try_acquire_owned()
			.map_err(|_| EngineError::AtCapacity(self.capacity))?;

		let request = TipRequest::from_cast(cast, command);
		let origin_post_hash = request.origin_post_hash.clone();
		tracing::info!(
			cast = %truncate_id(&origin_post_hash),
			tipper = request.tipper_social_id,
			"Dispatching tip"
		);

		let pipeline = self.pipeline.clone();
		let context = self.context.clone();
		let task = tokio::spawn(async move {
			let _permit = permit;

			let run_request = request.clone();
			let run = tokio::spawn(async move { pipeline.run(&run_request).await });
			let outcome = match run.await {
				Ok(outcome) => outcome,
				Err(e) => {
					tracing::error!(error = %e, "Tip run aborted");
					OutcomeDraft::new(&request)
						.fail(TipFailure::with_detail(FailureKind::Unexpected, e.to_string()))
				},
			};

			context.recorder.record(&request, &outcome).await;
			outcome
		});

		Ok(TipHandle {
			origin_post_hash,
			task,
		})
	}

	/// Looks up the stored record for an origin post hash.
	pub async fn find_tip(&self, cast_hash: &str) -> Result<Option<TipRecord>, EngineError> {
		match self
			.context
			.storage
			.retrieve(StorageKey::Tips, cast_hash)
			.await
		{
			Ok(record) => Ok(Some(record)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(EngineError::Storage(e.to_string())),
		}
	}

	/// Looks up a stored record by transaction hash.
	pub async fn find_tip_by_tx(&self, tx_hash: &str) -> Result<Option<TipRecord>, EngineError> {
		let origin: String = match self
			.context
			.storage
			.retrieve(StorageKey::TipByTxHash, tx_hash)
			.await
		{
			Ok(origin) => origin,
			Err(StorageError::NotFound) => return Ok(None),
			Err(e) => return Err(EngineError::Storage(e.to_string())),
		};
		self.find_tip(&origin).await
	}
}
