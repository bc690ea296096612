//! Registry trait for self-registering implementations.
//!
//! Every pluggable service crate (storage, account, chain, social) exposes a
//! `Registry` struct per implementation so the service binary can wire
//! implementations by the names used in the configuration file.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// This should match the key used in the TOML configuration, for example:
	/// - "memory" for `[storage.implementations.memory]`
	/// - "local" for `[account.implementations.local]`
	/// - "evm_alloy" for `[chain.implementations.evm_alloy]`
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
