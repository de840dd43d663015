//! Device-local secret persistence.
//!
//! Secrets (the session token and the unlock PIN) live in the OS
//! keychain, survive app restarts, and never leave the device. A
//! reinstall clears them.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use keyring::Entry;
use tokio::task;

/// Keychain service name all entries are filed under
const SERVICE_NAME: &str = "ajeutchim";

/// Key for the cached session token
pub const TOKEN_KEY: &str = "userToken";

/// Key for the local unlock PIN
pub const PIN_KEY: &str = "userPIN";

/// Scoped key-value secret persistence.
///
/// Values are stored as-is; callers own any format constraints (the gate
/// checks the 4-digit PIN shape before writing, not the store).
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Secret store backed by the OS keychain.
///
/// `keyring` calls block, so each one runs on the blocking pool.
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    fn entry(key: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, key).context("Failed to create keyring entry")
    }
}

#[async_trait]
impl SecretStore for KeyringSecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        task::spawn_blocking(move || {
            let entry = Self::entry(&key)?;
            match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e).context("Failed to read secret from keychain"),
            }
        })
        .await
        .context("Keychain read task panicked")?
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        task::spawn_blocking(move || {
            let entry = Self::entry(&key)?;
            entry
                .set_password(&value)
                .context("Failed to store secret in keychain")
        })
        .await
        .context("Keychain write task panicked")?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        task::spawn_blocking(move || {
            let entry = Self::entry(&key)?;
            match entry.delete_credential() {
                // Deleting an absent secret is not an error
                Err(keyring::Error::NoEntry) | Ok(()) => Ok(()),
                Err(e) => Err(e).context("Failed to delete secret from keychain"),
            }
        })
        .await
        .context("Keychain delete task panicked")?
    }
}

/// In-process secret store for tests and previews
#[derive(Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().expect("secret map poisoned").get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .expect("secret map poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().expect("secret map poisoned").remove(key);
        Ok(())
    }
}
