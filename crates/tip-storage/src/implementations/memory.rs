//! In-memory storage backend.
//!
//! Useful for development and tests; nothing survives a restart. Expiry is
//! tracked per entry with a monotonic deadline.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry, TtlConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tip_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|deadline| now >= deadline)
	}
}

/// In-memory storage implementation.
#[derive(Default)]
pub struct MemoryStorage {
	store: RwLock<HashMap<String, Entry>>,
	ttl_config: TtlConfig,
}

impl MemoryStorage {
	pub fn new(ttl_config: TtlConfig) -> Self {
		Self {
			store: RwLock::new(HashMap::new()),
			ttl_config,
		}
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		match store.get(key) {
			Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.value.clone()),
			_ => Err(StorageError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let ttl = ttl.unwrap_or_else(|| self.ttl_config.ttl_for_key(key));
		let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);

		let mut store = self.store.write().await;
		store.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.get(key)
			.is_some_and(|entry| !entry.is_expired(Instant::now())))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let now = Instant::now();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| !entry.is_expired(now));
		Ok(before - store.len())
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], TtlConfig::schema_fields());
		schema.validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
///
/// Configuration parameters:
/// - `ttl_tips`, `ttl_tip_by_tx_hash` (optional): seconds, 0 keeps forever
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new(TtlConfig::from_config(config))))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::default();

		let key = "tips:0xabc";
		let value = b"record".to_vec();
		storage.set_bytes(key, value.clone(), None).await.unwrap();

		assert_eq!(storage.get_bytes(key).await.unwrap(), value);
		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_overwrite() {
		let storage = MemoryStorage::default();

		storage.set_bytes("tips:k", b"v1".to_vec(), None).await.unwrap();
		storage.set_bytes("tips:k", b"v2".to_vec(), None).await.unwrap();
		assert_eq!(storage.get_bytes("tips:k").await.unwrap(), b"v2".to_vec());
	}

	#[tokio::test(start_paused = true)]
	async fn test_expired_entries_hidden_and_cleaned() {
		let config: toml::Value = toml::from_str("ttl_tips = 10").unwrap();
		let storage = MemoryStorage::new(TtlConfig::from_config(&config));

		storage.set_bytes("tips:old", b"a".to_vec(), None).await.unwrap();
		storage
			.set_bytes("tip_by_tx_hash:0x1", b"b".to_vec(), None)
			.await
			.unwrap();

		tokio::time::advance(Duration::from_secs(11)).await;

		assert!(!storage.exists("tips:old").await.unwrap());
		assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
		assert!(storage.exists("tip_by_tx_hash:0x1").await.unwrap());
	}

	#[test]
	fn test_schema_rejects_negative_ttl() {
		let config: toml::Value = toml::from_str("ttl_tips = -1").unwrap();
		assert!(create_storage(&config).is_err());
	}
}
