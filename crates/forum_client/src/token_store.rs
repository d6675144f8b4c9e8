use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use forum_client_core::AccessToken;
use tracing::{debug, info, warn};

use crate::settings::TokenStoreKind;

const KEYRING_SERVICE: &str = "forum";
const TOKEN_KEY: &str = "access_token";

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
	#[error("keyring: {0}")]
	Keyring(String),

	#[error("token file {path}: {message}")]
	File { path: String, message: String },
}

/// Where the access token lives between runs.
pub trait TokenStore: Send + Sync {
	fn load(&self) -> Option<AccessToken>;
	fn store(&self, token: &AccessToken) -> Result<(), TokenStoreError>;
	fn clear(&self) -> Result<(), TokenStoreError>;
}

/// Open the configured store; `dir` holds the file backend.
pub fn open_token_store(kind: TokenStoreKind, dir: &Path) -> Arc<dyn TokenStore> {
	match kind {
		TokenStoreKind::File => Arc::new(FileTokenStore::new(dir.join("secrets.json"))),
		TokenStoreKind::Keyring => Arc::new(KeyringTokenStore::new(KEYRING_SERVICE, TOKEN_KEY)),
		TokenStoreKind::Memory => Arc::new(MemoryTokenStore::default()),
	}
}

/// System keyring entry.
pub struct KeyringTokenStore {
	service: String,
	account: String,
}

impl KeyringTokenStore {
	pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
		Self {
			service: service.into(),
			account: account.into(),
		}
	}

	fn entry(&self) -> Result<keyring::Entry, TokenStoreError> {
		keyring::Entry::new(&self.service, &self.account).map_err(|e| TokenStoreError::Keyring(e.to_string()))
	}
}

impl TokenStore for KeyringTokenStore {
	fn load(&self) -> Option<AccessToken> {
		let entry = match self.entry() {
			Ok(entry) => entry,
			Err(e) => {
				warn!(error = %e, "keyring unavailable");
				return None;
			}
		};

		match entry.get_password() {
			Ok(token) if !token.trim().is_empty() => {
				debug!("read token from keyring");
				Some(AccessToken::new(token))
			}
			Ok(_) | Err(keyring::Error::NoEntry) => None,
			Err(e) => {
				info!("keyring get_password failed: {}", e);
				None
			}
		}
	}

	fn store(&self, token: &AccessToken) -> Result<(), TokenStoreError> {
		self.entry()?
			.set_password(token.expose())
			.map_err(|e| TokenStoreError::Keyring(e.to_string()))?;
		info!("stored token in system keyring");
		Ok(())
	}

	fn clear(&self) -> Result<(), TokenStoreError> {
		match self.entry()?.delete_credential() {
			Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
			Err(e) => Err(TokenStoreError::Keyring(e.to_string())),
		}
	}
}

/// JSON map file next to the settings.
pub struct FileTokenStore {
	path: PathBuf,
}

impl FileTokenStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_map(&self) -> HashMap<String, String> {
		match std::fs::read_to_string(&self.path) {
			Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
				warn!(path = %self.path.display(), error = %e, "ignoring unreadable token file");
				HashMap::new()
			}),
			Err(_) => HashMap::new(),
		}
	}

	fn write_map(&self, map: &HashMap<String, String>) -> Result<(), TokenStoreError> {
		let file_err = |message: String| TokenStoreError::File {
			path: self.path.display().to_string(),
			message,
		};

		if let Some(parent) = self.path.parent() {
			std::fs::create_dir_all(parent).map_err(|e| file_err(format!("create dir: {e}")))?;
		}
		let data = serde_json::to_string_pretty(map).map_err(|e| file_err(format!("serialize: {e}")))?;
		std::fs::write(&self.path, data).map_err(|e| file_err(format!("write: {e}")))?;
		Ok(())
	}
}

impl TokenStore for FileTokenStore {
	fn load(&self) -> Option<AccessToken> {
		let token = self.read_map().remove(TOKEN_KEY)?;
		if token.trim().is_empty() {
			return None;
		}
		debug!(path = %self.path.display(), "read token from file");
		Some(AccessToken::new(token))
	}

	fn store(&self, token: &AccessToken) -> Result<(), TokenStoreError> {
		let mut map = self.read_map();
		map.insert(TOKEN_KEY.to_string(), token.expose().to_string());
		self.write_map(&map)?;
		info!(path = %self.path.display(), "wrote token file");
		Ok(())
	}

	fn clear(&self) -> Result<(), TokenStoreError> {
		let mut map = self.read_map();
		if map.remove(TOKEN_KEY).is_none() {
			return Ok(());
		}
		self.write_map(&map)
	}
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
	token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
	pub fn new(token: Option<AccessToken>) -> Self {
		Self {
			token: Mutex::new(token),
		}
	}
}

impl TokenStore for MemoryTokenStore {
	fn load(&self) -> Option<AccessToken> {
		self.token.lock().ok()?.clone()
	}

	fn store(&self, token: &AccessToken) -> Result<(), TokenStoreError> {
		if let Ok(mut slot) = self.token.lock() {
			*slot = Some(token.clone());
		}
		Ok(())
	}

	fn clear(&self) -> Result<(), TokenStoreError> {
		if let Ok(mut slot) = self.token.lock() {
			*slot = None;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn file_store_round_trip_and_clear() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileTokenStore::new(dir.path().join("nested").join("secrets.json"));

		assert!(store.load().is_none());
		store.store(&AccessToken::new("jwt-1")).unwrap();
		assert_eq!(store.load(), Some(AccessToken::new("jwt-1")));

		store.store(&AccessToken::new("jwt-2")).unwrap();
		assert_eq!(store.load(), Some(AccessToken::new("jwt-2")));

		store.clear().unwrap();
		assert!(store.load().is_none());
		store.clear().unwrap();
	}

	#[test]
	fn file_store_keeps_unrelated_entries() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("secrets.json");
		std::fs::write(&path, r#"{"other":"value"}"#).unwrap();

		let store = FileTokenStore::new(&path);
		store.store(&AccessToken::new("jwt")).unwrap();
		store.clear().unwrap();

		let map: HashMap<String, String> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(map.get("other").map(String::as_str), Some("value"));
		assert!(!map.contains_key(TOKEN_KEY));
	}

	#[test]
	fn garbage_file_reads_as_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("secrets.json");
		std::fs::write(&path, "not json").unwrap();
		assert!(FileTokenStore::new(&path).load().is_none());
	}

	#[test]
	fn memory_store() {
		let store = MemoryTokenStore::new(Some(AccessToken::new("a")));
		assert_eq!(store.load(), Some(AccessToken::new("a")));
		store.clear().unwrap();
		assert!(store.load().is_none());
	}
}
