//! Secret retrieval and generation

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use rand::{distributions::Alphanumeric, Rng};
use tracing::info;

use crate::Result;

/// Retrieves deployment secrets, generating them on first use
pub trait SecretStore: Send + Sync {
    /// Return the named secret, creating one of `length` characters if it
    /// does not exist yet
    fn get_or_create(&self, name: &str, description: &str, length: usize) -> Result<String>;
}

fn generate(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// In-memory secret store, mainly for tests
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get_or_create(&self, name: &str, _description: &str, length: usize) -> Result<String> {
        let mut values = self.values.lock().unwrap();
        if let Some(existing) = values.get(name) {
            return Ok(existing.clone());
        }
        let secret = generate(length);
        values.insert(name.to_string(), secret.clone());
        Ok(secret)
    }
}

/// Secret store persisted as a YAML map on disk.
///
/// Secrets survive across runs so that re-deploying never rotates
/// credentials the already-written configs embed.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileSecretStore {
    /// Open the store, loading any previously persisted secrets
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.is_file() {
            let contents = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&contents)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_yaml::to_string(values)?)?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get_or_create(&self, name: &str, description: &str, length: usize) -> Result<String> {
        let mut values = self.values.lock().unwrap();
        if let Some(existing) = values.get(name) {
            return Ok(existing.clone());
        }
        info!(name, description, "generating new secret");
        let secret = generate(length);
        values.insert(name.to_string(), secret.clone());
        self.persist(&values)?;
        Ok(secret)
    }
}
