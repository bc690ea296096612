//! Main entry point for the MonTip relay service.
//!
//! This binary receives post webhooks from the social network, recognizes
//! tip commands, and executes them as transfers from the tipper's smart
//! wallet. It uses a modular architecture with pluggable implementations for
//! storage, signing, chain access and the social API.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tip_config::Config;

mod apis;
mod factory_registry;
mod server;
#[cfg(test)]
mod test_support;

/// Command-line arguments for the relay service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/montip.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Seconds to wait for running tips on shutdown
	#[arg(long, default_value_t = 30)]
	shutdown_grace_seconds: u64,
}

/// Main entry point for the relay service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the tip engine with all implementations
/// 5. Serves webhooks until interrupted, then drains running tips
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started montip relay");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.bot.id);

	let engine = factory_registry::build_engine_from_config(config.clone()).await?;
	let engine = Arc::new(engine);
	engine.initialize();
	let cleanup = engine.start_cleanup();

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			server::start_server(api_config, Arc::clone(&engine), shutdown_signal()).await?;
			tracing::info!("API server finished");
		},
		None => {
			tracing::warn!("API disabled - no webhooks will be received");
			shutdown_signal().await;
		},
	}

	cleanup.abort();
	engine
		.shutdown(Duration::from_secs(args.shutdown_grace_seconds))
		.await;

	tracing::info!("Stopped montip relay");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for shutdown signal: {}", e);
	}
	tracing::info!("Shutdown requested");
}
