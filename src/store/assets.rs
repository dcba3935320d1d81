//! The asset store: encrypted local persistence of the user's assets,
//! reconciled against on-chain security pegs.
//!
//! The local list is authoritative for asset metadata (name, images,
//! comments); the ledger is authoritative for ownership. Reconciliation
//! only ever adds: pegs with no local counterpart synthesize an asset,
//! and a failed ledger connection leaves local data untouched.

use crate::domain::asset::{Asset, AssetSecurity, ImageLocation};
use crate::domain::notification::Notification;
use crate::domain::transfer::TransferRequest;
use crate::domain::verification::{VerificationKind, VerificationRequest};
use crate::error::SdkError;
use crate::gateway::BinaryStore;
use crate::identity::IdentityService;
use crate::ledger::{reconcile, LedgerService};
use crate::shared::AssetId;
use crate::store::notifications::NotificationStore;
use crate::store::{EncryptedStore, KeyValueBackend};

use async_lock::RwLock;
use std::sync::Arc;

const ASSETS_KEY: &str = "assets";

/// High-level store for the user's assets.
pub struct AssetStore<L: LedgerService, B: BinaryStore> {
    assets: RwLock<Option<Vec<Asset>>>,
    store: EncryptedStore,
    identity: Arc<IdentityService>,
    ledger: Arc<L>,
    binary: Arc<B>,
    notifications: Arc<NotificationStore>,
}

impl<L: LedgerService, B: BinaryStore> AssetStore<L, B> {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        identity: Arc<IdentityService>,
        ledger: Arc<L>,
        binary: Arc<B>,
        notifications: Arc<NotificationStore>,
    ) -> Self {
        Self {
            assets: RwLock::new(None),
            store: EncryptedStore::new(backend, identity.clone()),
            identity,
            ledger,
            binary,
            notifications,
        }
    }

    /// Makes sure the asset list is loaded and reconciled.
    ///
    /// A no-op when not authenticated. Ledger failures during
    /// reconciliation degrade to "use local data as-is".
    pub async fn ensure_assets(&self) -> Result<(), SdkError> {
        if !self.identity.is_authenticated() {
            return Ok(());
        }
        if self.assets.read().await.is_none() {
            self.load_db().await?;
        }
        self.process_dangling_assets().await?;
        self.check_assets().await;
        Ok(())
    }

    /// Discards the in-memory list (e.g. on logoff).
    pub async fn unload(&self) {
        *self.assets.write().await = None;
    }

    /// Reloads the list from the encrypted store.
    pub async fn reload(&self) -> Result<(), SdkError> {
        self.load_db().await
    }

    pub async fn get_all(&self) -> Result<Vec<Asset>, SdkError> {
        self.ensure_assets().await?;
        Ok(self.assets.read().await.clone().unwrap_or_default())
    }

    pub async fn get(&self, id: &AssetId) -> Result<Option<Asset>, SdkError> {
        self.ensure_assets().await?;
        Ok(self
            .assets
            .read()
            .await
            .as_ref()
            .and_then(|assets| assets.iter().find(|a| a.id.as_ref() == Some(id)).cloned()))
    }

    /// Creates or updates an asset and persists the list. An asset
    /// without an id gets a fresh one assigned.
    pub async fn save(&self, mut asset: Asset) -> Result<Asset, SdkError> {
        self.ensure_assets().await?;
        if asset.id.is_none() {
            self.create(&mut asset).await?;
        } else {
            self.update(&asset).await;
        }
        self.save_db().await?;
        Ok(asset)
    }

    /// Whether any backend ledger is currently reachable.
    pub async fn has_ledgers(&self) -> bool {
        self.ledger.is_active().await
    }

    /// Registers the asset on the ledger, waits for the write to land,
    /// attaches the resulting peg, and persists.
    pub async fn secure_asset(&self, id: &AssetId) -> Result<Asset, SdkError> {
        let mut asset = self
            .get(id)
            .await?
            .ok_or_else(|| SdkError::Other(format!("unknown asset {id}")))?;

        let peg = self.ledger.secure_asset(&asset).await?;
        match asset.secured_on.as_mut() {
            Some(security) => security.security_pegs.push(peg),
            None => {
                asset.secured_on = Some(AssetSecurity {
                    name: reconcile::RESTORED_SECURITY_TIER.to_string(),
                    security_pegs: vec![peg],
                })
            }
        }

        self.update(&asset).await;
        self.save_db().await?;
        Ok(asset)
    }

    // ── Transfer requests (pass-through, ledger-only state) ──────────────

    pub async fn create_transfer_request(
        &self,
        request: &TransferRequest,
    ) -> Result<(), SdkError> {
        Ok(self
            .ledger
            .create_transfer_request(&request.asset_id)
            .await?)
    }

    pub async fn confirm_transfer_request(
        &self,
        request: &TransferRequest,
    ) -> Result<(), SdkError> {
        Ok(self.ledger.confirm_transfer_request(request).await?)
    }

    pub async fn ignore_transfer_request(
        &self,
        request: &TransferRequest,
    ) -> Result<(), SdkError> {
        Ok(self.ledger.ignore_transfer_request(request).await?)
    }

    pub async fn get_transfer_requests(
        &self,
        asset: &Asset,
    ) -> Result<Vec<TransferRequest>, SdkError> {
        Ok(self.ledger.transfer_requests(asset).await?)
    }

    // ── Verification requests ────────────────────────────────────────────

    /// Verification requests addressed to the current user. Empty when
    /// no ledger connection can be established.
    pub async fn get_incoming_verification_requests(
        &self,
    ) -> Result<Vec<VerificationRequest>, SdkError> {
        if self.ledger.ensure_connected().await.is_err() {
            return Ok(Vec::new());
        }
        Ok(self.ledger.incoming_verification_requests().await?)
    }

    pub async fn get_incoming_verification_request(
        &self,
        id: &AssetId,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRequest>, SdkError> {
        if self.ledger.ensure_connected().await.is_err() {
            return Ok(None);
        }
        Ok(self.ledger.incoming_verification_request(id, kind).await?)
    }

    pub async fn confirm_verification_request(
        &self,
        request: &VerificationRequest,
    ) -> Result<(), SdkError> {
        Ok(self.ledger.process_verification(request, true).await?)
    }

    pub async fn ignore_verification_request(
        &self,
        request: &VerificationRequest,
    ) -> Result<(), SdkError> {
        Ok(self.ledger.process_verification(request, false).await?)
    }

    // ── Internals ────────────────────────────────────────────────────────

    async fn create(&self, asset: &mut Asset) -> Result<(), SdkError> {
        asset.id = Some(AssetId::random());
        let mut guard = self.assets.write().await;
        guard.get_or_insert_with(Vec::new).push(asset.clone());
        drop(guard);

        self.notify(Notification::asset_registered(asset));
        Ok(())
    }

    async fn update(&self, updated: &Asset) {
        let mut guard = self.assets.write().await;
        let assets = guard.get_or_insert_with(Vec::new);
        match assets.iter_mut().find(|a| a.id == updated.id) {
            Some(existing) => *existing = updated.clone(),
            // An unknown id still gets stored rather than silently lost.
            None => assets.push(updated.clone()),
        }
    }

    async fn process_dangling_assets(&self) -> Result<(), SdkError> {
        if let Err(e) = self.ledger.ensure_connected().await {
            tracing::debug!("Skipping reconciliation, ledger unavailable: {e}");
            return Ok(());
        }
        let pegs = match self.ledger.all_security_pegs().await {
            Ok(pegs) => pegs,
            Err(e) => {
                tracing::debug!("Skipping reconciliation, peg fetch failed: {e}");
                return Ok(());
            }
        };

        let notifications = {
            let mut guard = self.assets.write().await;
            let assets = guard.get_or_insert_with(Vec::new);
            reconcile::merge_dangling(assets, pegs)
        };

        if notifications.is_empty() {
            return Ok(());
        }
        for notification in notifications {
            self.notify(notification);
        }
        self.save_db().await
    }

    async fn check_assets(&self) {
        let mut guard = self.assets.write().await;
        let Some(assets) = guard.as_mut() else {
            return;
        };
        for asset in assets.iter_mut() {
            if let Err(e) = self.ledger.check_asset_status(asset).await {
                tracing::debug!("Skipping status check: {e}");
                return;
            }
        }
    }

    async fn load_db(&self) -> Result<(), SdkError> {
        let mut loaded: Vec<Asset> = self.store.get_item(ASSETS_KEY)?.unwrap_or_default();

        // Pull gateway-backed images that have no inline payload yet.
        for asset in &mut loaded {
            for image in &mut asset.images {
                if image.is_loaded() || image.location != ImageLocation::Gateway {
                    continue;
                }
                let Some(hash) = image.hash.clone() else {
                    continue;
                };
                match self.binary.get_item(&hash).await {
                    Ok(data) => image.data_url = Some(data),
                    Err(e) => {
                        tracing::debug!(%hash, "Image fetch from gateway failed: {e}");
                    }
                }
            }
        }

        // Refresh pending verification flags from the ledger.
        if self.ledger.ensure_connected().await.is_ok() {
            for asset in &mut loaded {
                let Some(id) = asset.id.clone() else {
                    continue;
                };
                for verification in &mut asset.verifications {
                    if !verification.is_pending {
                        continue;
                    }
                    let Some(verifier) = verification.verifier_address.clone() else {
                        continue;
                    };
                    if let Ok(Some(from_ledger)) = self
                        .ledger
                        .own_verification_request(&verifier, &id, verification.kind)
                        .await
                    {
                        verification.is_pending = from_ledger.verification.is_pending;
                    }
                }
            }
        }

        *self.assets.write().await = Some(loaded);
        Ok(())
    }

    async fn save_db(&self) -> Result<(), SdkError> {
        let mut guard = self.assets.write().await;
        let Some(assets) = guard.as_mut() else {
            return Ok(());
        };

        // Upload inline images to the gateway. A failed upload keeps the
        // inline payload so the next save retries it.
        for asset in assets.iter_mut() {
            for image in asset.images.iter_mut() {
                if image.location != ImageLocation::DataUrl {
                    continue;
                }
                let Some(data) = image.data_url.clone() else {
                    continue;
                };
                match self.binary.set_item(&image.file_name, &data).await {
                    Ok(hash) => {
                        image.hash = Some(hash);
                        image.location = ImageLocation::Gateway;
                    }
                    Err(e) => {
                        tracing::warn!(file = %image.file_name, "Image upload failed: {e}");
                    }
                }
            }
        }

        // Flush verifications marked for saving to the ledger.
        for asset in assets.iter_mut() {
            if asset.id.is_none() {
                continue;
            }
            let snapshot = asset.clone();
            for verification in asset.verifications.iter_mut() {
                if !verification.should_be_saved || verification.verifier_address.is_none() {
                    continue;
                }
                match self
                    .ledger
                    .request_verification(&snapshot, verification)
                    .await
                {
                    Ok(()) => verification.should_be_saved = false,
                    Err(e) => {
                        tracing::warn!("Verification request not sent: {e}");
                    }
                }
            }
        }

        // Persist, dropping inline payloads for images the gateway holds.
        let mut for_save = assets.clone();
        for asset in &mut for_save {
            for image in &mut asset.images {
                if image.location == ImageLocation::Gateway {
                    image.data_url = None;
                }
            }
        }
        self.store.set_item(ASSETS_KEY, &for_save)?;
        Ok(())
    }

    fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifications.push(notification) {
            tracing::warn!("Notification not persisted: {e}");
        }
    }
}
