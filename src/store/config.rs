//! Encrypted configuration store.

use crate::domain::config::Configuration;
use crate::error::StorageError;
use crate::identity::IdentityService;
use crate::store::{EncryptedStore, KeyValueBackend};

use std::sync::Arc;

const CONFIGURATION_KEY: &str = "configuration";

/// Loads and saves the application [`Configuration`].
pub struct ConfigurationStore {
    store: EncryptedStore,
}

impl ConfigurationStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, identity: Arc<IdentityService>) -> Self {
        Self {
            store: EncryptedStore::new(backend, identity),
        }
    }

    /// Loads the stored configuration, falling back to defaults when none
    /// has been saved yet.
    pub fn load(&self) -> Result<Configuration, StorageError> {
        Ok(self.store.get_item(CONFIGURATION_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, configuration: &Configuration) -> Result<(), StorageError> {
        self.store.set_item(CONFIGURATION_KEY, configuration)
    }
}
