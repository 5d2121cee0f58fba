//! In-memory storage, lost on exit.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_live(&self) -> bool {
		self.expires_at.map_or(true, |at| Instant::now() < at)
	}
}

#[derive(Default)]
pub struct MemoryStorage {
	entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let entries = self.entries.read().await;
		match entries.get(key) {
			Some(entry) if entry.is_live() => Ok(entry.value.clone()),
			_ => Err(StorageError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let entry = Entry {
			value,
			expires_at: ttl.map(|ttl| Instant::now() + ttl),
		};
		self.entries.write().await.insert(key.to_string(), entry);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.write().await.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self
			.entries
			.read()
			.await
			.get(key)
			.is_some_and(Entry::is_live))
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		Ok(self
			.entries
			.read()
			.await
			.iter()
			.filter(|(key, entry)| key.starts_with(prefix) && entry.is_live())
			.map(|(key, _)| key.clone())
			.collect())
	}
}

/// Creates an in-memory storage backend.
pub fn create_storage() -> Box<dyn StorageInterface> {
	Box::new(MemoryStorage::new())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::StorageService;

	#[tokio::test]
	async fn test_round_trip() {
		let service = StorageService::new(create_storage());
		service.store("history", "1", &vec![1u8, 2, 3]).await.unwrap();

		let value: Vec<u8> = service.retrieve("history", "1").await.unwrap();
		assert_eq!(value, vec![1, 2, 3]);
	}

	#[tokio::test]
	async fn test_list_namespace() {
		let service = StorageService::new(create_storage());
		service.store("history", "b", &1u8).await.unwrap();
		service.store("history", "a", &2u8).await.unwrap();
		service.store("session", "c", &3u8).await.unwrap();

		assert_eq!(service.list("history").await.unwrap(), vec!["a", "b"]);
		assert!(service.list("other").await.unwrap().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_ttl_expiry() {
		let service = StorageService::new(create_storage());
		service
			.store_with_ttl("session", "s", &"value", Some(Duration::from_secs(60)))
			.await
			.unwrap();
		assert!(service.exists("session", "s").await.unwrap());

		tokio::time::advance(Duration::from_secs(61)).await;
		assert!(!service.exists("session", "s").await.unwrap());
		assert!(matches!(
			service.retrieve::<String>("session", "s").await,
			Err(StorageError::NotFound)
		));
	}
}
