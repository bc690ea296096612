//! Startup and background maintenance for the tip engine.

use super::TipEngine;
use std::time::Duration;
use tokio::task::JoinHandle;

impl TipEngine {
	/// Logs the effective setup before the engine starts taking tips.
	pub fn initialize(&self) {
		let config = &self.context.config;
		tracing::info!(
			bot = %config.bot.id,
			signer = %self.context.signer,
			tokens = self.context.registry.len(),
			max_concurrent_tips = config.bot.max_concurrent_tips,
			policy = ?config.bot.trigger_policy,
			sinks = ?self.context.recorder.sink_names(),
			"Tip engine ready"
		);
	}

	/// Spawns the periodic storage cleanup task.
	///
	/// The caller aborts the returned handle on shutdown.
	pub fn start_cleanup(&self) -> JoinHandle<()> {
		let storage = self.context.storage.clone();
		let period = Duration::from_secs(self.context.config.storage.cleanup_interval_seconds);

		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				interval.tick().await;
				match storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!(removed = count, "Storage cleanup");
					},
					Err(e) => {
						tracing::warn!(error = %e, "Storage cleanup failed");
					},
					_ => {},
				}
			}
		})
	}

	/// Waits for in-flight runs to finish, up to `grace`.
	pub async fn shutdown(&self, grace: Duration) {
		tracing::info!(in_flight = self.in_flight(), "Shutting down tip engine");
		let capacity = self.capacity as u32;
		match tokio::time::timeout(grace, self.admission.acquire_many(capacity)).await {
			Ok(Ok(_permits)) => tracing::info!("All tips finished"),
			Ok(Err(e)) => tracing::warn!(error = %e, "Admission closed during shutdown"),
			Err(_) => tracing::warn!(
				in_flight = self.in_flight(),
				"Shutdown grace elapsed with tips still running"
			),
		}
	}
}
