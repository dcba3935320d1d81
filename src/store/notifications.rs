//! Encrypted notification log.

use crate::domain::notification::Notification;
use crate::error::StorageError;
use crate::identity::IdentityService;
use crate::shared::new_token;
use crate::store::{EncryptedStore, KeyValueBackend};

use std::sync::{Arc, RwLock};

const NOTIFICATIONS_KEY: &str = "notifications";

/// How many notifications the "latest" view returns.
const LATEST_COUNT: usize = 3;

/// The user's notification list, persisted encrypted.
pub struct NotificationStore {
    store: EncryptedStore,
    notifications: RwLock<Vec<Notification>>,
}

impl NotificationStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, identity: Arc<IdentityService>) -> Self {
        Self {
            store: EncryptedStore::new(backend, identity),
            notifications: RwLock::new(Vec::new()),
        }
    }

    /// Loads the stored list and makes sure it is well-formed: a welcome
    /// entry is seeded into an empty list, and missing ids are backfilled.
    pub fn load(&self) -> Result<(), StorageError> {
        let mut loaded: Vec<Notification> =
            self.store.get_item(NOTIFICATIONS_KEY)?.unwrap_or_default();

        if loaded.is_empty() {
            loaded.push(Notification::welcome());
        }
        for notification in &mut loaded {
            if notification.id.is_empty() {
                notification.id = new_token();
            }
        }

        *self.notifications.write().expect("notification lock") = loaded;
        Ok(())
    }

    pub fn save(&self) -> Result<(), StorageError> {
        let notifications = self.notifications.read().expect("notification lock");
        self.store.set_item(NOTIFICATIONS_KEY, &*notifications)
    }

    /// Appends a notification and persists the list.
    pub fn push(&self, notification: Notification) -> Result<(), StorageError> {
        self.notifications
            .write()
            .expect("notification lock")
            .push(notification);
        self.save()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications
            .read()
            .expect("notification lock")
            .clone()
    }

    /// The most recent notifications, newest first.
    pub fn latest(&self) -> Vec<Notification> {
        let notifications = self.notifications.read().expect("notification lock");
        notifications
            .iter()
            .rev()
            .take(LATEST_COUNT)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PasswordIdentity;
    use crate::store::MemoryBackend;

    fn notification_store() -> NotificationStore {
        let identity = Arc::new(IdentityService::new());
        identity.logon(Arc::new(PasswordIdentity::new("pw")));
        NotificationStore::new(Arc::new(MemoryBackend::new()), identity)
    }

    #[test]
    fn test_empty_list_seeds_welcome() {
        let store = notification_store();
        store.load().unwrap();
        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Entered on AssetChain");
        assert!(!all[0].id.is_empty());
    }

    #[test]
    fn test_latest_is_newest_first_capped_at_three() {
        let store = notification_store();
        store.load().unwrap();
        for i in 0..4 {
            store
                .push(Notification::new(format!("n{i}"), "", "", "bell"))
                .unwrap();
        }
        let latest = store.latest();
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].title, "n3");
        assert_eq!(latest[2].title, "n1");
    }

    #[test]
    fn test_push_persists() {
        let store = notification_store();
        store.load().unwrap();
        store
            .push(Notification::new("saved", "", "", "bell"))
            .unwrap();

        // Reload from the backend and make sure the push survived.
        store.load().unwrap();
        assert!(store.all().iter().any(|n| n.title == "saved"));
    }
}
