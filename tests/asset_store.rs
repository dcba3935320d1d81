//! Asset store behavior against a scripted ledger and binary store:
//! round-trips, reconciliation of dangling pegs, and the persist
//! pipeline's side effects.

use assetchain_sdk::prelude::*;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ─── Scripted collaborators ──────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedLedger {
    online: AtomicBool,
    active: AtomicBool,
    pegs: Mutex<Vec<SecurityPeg>>,
    verification_requests: Mutex<Vec<(AssetId, Address)>>,
    transfer_requests_created: Mutex<Vec<AssetId>>,
}

impl ScriptedLedger {
    fn online() -> Self {
        let ledger = Self::default();
        ledger.online.store(true, Ordering::SeqCst);
        ledger
    }

    fn offline() -> Self {
        Self::default()
    }

    fn current_address() -> Address {
        Address::new("0xabcdef0123456789abcdef0123456789abcdef01")
    }

    fn peg_for(id: &str, name: &str) -> SecurityPeg {
        SecurityPeg {
            name: "Ethereum".into(),
            logo_image_file_name: "ethereum-logo.png".into(),
            transaction_url: "http://etherapps.info/block/1507".into(),
            details: PegDetails {
                address: Self::current_address(),
                asset: PegAssetRef {
                    id: AssetId::from(id),
                    name: name.into(),
                },
                block_number: Some(1507),
            },
            is_owned: true,
        }
    }

    fn add_peg(&self, id: &str, name: &str) {
        self.pegs
            .lock()
            .unwrap()
            .push(Self::peg_for(id, name));
    }

    fn info() -> ConnectionInfo {
        ConnectionInfo {
            current_address: Self::current_address(),
            coinbase: Self::current_address(),
            address_substituted: false,
            generation: 1,
        }
    }
}

impl LedgerService for ScriptedLedger {
    fn ledger_name(&self) -> &str {
        "Ethereum"
    }

    async fn connect(&self) -> Result<ConnectionInfo, LedgerError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(LedgerError::Connect("node unreachable".into()));
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(Self::info())
    }

    async fn ensure_connected(&self) -> Result<ConnectionInfo, LedgerError> {
        self.connect().await
    }

    async fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn secure_asset(&self, asset: &Asset) -> Result<SecurityPeg, LedgerError> {
        let id = asset.id.clone().ok_or(LedgerError::MissingAssetId)?;
        let peg = Self::peg_for(id.as_str(), &asset.name);
        self.pegs.lock().unwrap().push(peg.clone());
        Ok(peg)
    }

    async fn owner_of(&self, id: &AssetId) -> Result<Option<Address>, LedgerError> {
        let secured = self
            .pegs
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.details.asset.id == *id);
        Ok(secured.then(Self::current_address))
    }

    async fn is_secured(&self, id: &AssetId) -> Result<bool, LedgerError> {
        Ok(self.owner_of(id).await?.is_some())
    }

    async fn security_peg(&self, id: &AssetId, name: &str) -> Result<SecurityPeg, LedgerError> {
        Ok(Self::peg_for(id.as_str(), name))
    }

    async fn all_security_pegs(&self) -> Result<Vec<SecurityPeg>, LedgerError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(LedgerError::NotConnected);
        }
        Ok(self.pegs.lock().unwrap().clone())
    }

    async fn check_asset_status(&self, asset: &mut Asset) -> Result<(), LedgerError> {
        if let Some(security) = asset.secured_on.as_mut() {
            for peg in &mut security.security_pegs {
                peg.is_owned = peg.details.address == Self::current_address();
            }
        }
        Ok(())
    }

    async fn create_transfer_request(&self, id: &AssetId) -> Result<(), LedgerError> {
        self.transfer_requests_created.lock().unwrap().push(id.clone());
        Ok(())
    }

    async fn confirm_transfer_request(
        &self,
        _request: &TransferRequest,
    ) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn ignore_transfer_request(&self, _request: &TransferRequest) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn transfer_requests(&self, _asset: &Asset) -> Result<Vec<TransferRequest>, LedgerError> {
        Ok(Vec::new())
    }

    async fn incoming_verification_requests(
        &self,
    ) -> Result<Vec<VerificationRequest>, LedgerError> {
        Ok(Vec::new())
    }

    async fn incoming_verification_request(
        &self,
        _id: &AssetId,
        _kind: VerificationKind,
    ) -> Result<Option<VerificationRequest>, LedgerError> {
        Ok(None)
    }

    async fn own_verification_request(
        &self,
        _verifier: &Address,
        _id: &AssetId,
        _kind: VerificationKind,
    ) -> Result<Option<VerificationRequest>, LedgerError> {
        Ok(None)
    }

    async fn request_verification(
        &self,
        asset: &Asset,
        verification: &Verification,
    ) -> Result<(), LedgerError> {
        let id = asset.id.clone().ok_or(LedgerError::MissingAssetId)?;
        let verifier = verification
            .verifier_address
            .clone()
            .ok_or(LedgerError::MissingVerifier)?;
        self.verification_requests.lock().unwrap().push((id, verifier));
        Ok(())
    }

    async fn process_verification(
        &self,
        _request: &VerificationRequest,
        _confirm: bool,
    ) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Default)]
struct ScriptedBinaryStore {
    items: Mutex<HashMap<String, String>>,
    next_hash: AtomicU64,
}

impl BinaryStore for ScriptedBinaryStore {
    async fn set_item(&self, _name: &str, value: &str) -> Result<String, StorageError> {
        let hash = format!("Qm{:044}", self.next_hash.fetch_add(1, Ordering::SeqCst));
        self.items
            .lock()
            .unwrap()
            .insert(hash.clone(), value.to_string());
        Ok(hash)
    }

    async fn get_item(&self, hash: &str) -> Result<String, StorageError> {
        self.items
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| StorageError::Gateway(format!("not found: {hash}")))
    }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
    backend: Arc<dyn KeyValueBackend>,
    identity: Arc<IdentityService>,
    ledger: Arc<ScriptedLedger>,
    binary: Arc<ScriptedBinaryStore>,
    notifications: Arc<NotificationStore>,
    assets: AssetStore<ScriptedLedger, ScriptedBinaryStore>,
}

fn harness(ledger: ScriptedLedger) -> Harness {
    let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::new());
    let identity = Arc::new(IdentityService::new());
    identity.logon(Arc::new(PasswordIdentity::new("hunter2")));

    let ledger = Arc::new(ledger);
    let binary = Arc::new(ScriptedBinaryStore::default());
    let notifications = Arc::new(NotificationStore::new(backend.clone(), identity.clone()));
    notifications.load().unwrap();

    let assets = AssetStore::new(
        backend.clone(),
        identity.clone(),
        ledger.clone(),
        binary.clone(),
        notifications.clone(),
    );

    Harness {
        backend,
        identity,
        ledger,
        binary,
        notifications,
        assets,
    }
}

impl Harness {
    /// A second store over the same backend, simulating a fresh session.
    fn fresh_store(&self) -> AssetStore<ScriptedLedger, ScriptedBinaryStore> {
        AssetStore::new(
            self.backend.clone(),
            self.identity.clone(),
            self.ledger.clone(),
            self.binary.clone(),
            self.notifications.clone(),
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_assigns_id_and_round_trips() {
    let h = harness(ScriptedLedger::offline());

    let saved = h.assets.save(Asset::new("Diamond ring")).await.unwrap();
    let id = saved.id.clone().expect("save assigns an id");

    let fetched = h.assets.get(&id).await.unwrap().expect("retrievable by id");
    assert_eq!(fetched.name, "Diamond ring");
    assert!(fetched.is_pending_claim);
}

#[tokio::test]
async fn save_survives_a_fresh_session() {
    let h = harness(ScriptedLedger::offline());
    let saved = h.assets.save(Asset::new("Necklace")).await.unwrap();
    let id = saved.id.clone().unwrap();

    let second_session = h.fresh_store();
    let fetched = second_session.get(&id).await.unwrap();
    assert_eq!(fetched.unwrap().name, "Necklace");
}

#[tokio::test]
async fn ledger_outage_skips_reconciliation_and_keeps_local_data() {
    let h = harness(ScriptedLedger::offline());
    h.assets.save(Asset::new("Ring")).await.unwrap();

    // ensure_assets must not fail or drop anything while offline.
    h.assets.ensure_assets().await.unwrap();
    assert_eq!(h.assets.get_all().await.unwrap().len(), 1);
    assert!(!h.assets.has_ledgers().await);
}

#[tokio::test]
async fn dangling_peg_synthesizes_exactly_one_asset() {
    let h = harness(ScriptedLedger::online());
    h.ledger.add_peg("bb22bb22bb22bb22bb22bb22bb22bb22", "Inherited watch");

    let all = h.assets.get_all().await.unwrap();
    assert_eq!(all.len(), 1);

    let restored = &all[0];
    assert_eq!(
        restored.id,
        Some(AssetId::from("bb22bb22bb22bb22bb22bb22bb22bb22"))
    );
    assert_eq!(restored.name, "Inherited watch");

    let security = restored.secured_on.as_ref().unwrap();
    assert_eq!(security.name, "Premium");
    assert_eq!(security.security_pegs.len(), 1);
}

#[tokio::test]
async fn dangling_merge_is_persisted_immediately() {
    let h = harness(ScriptedLedger::online());
    h.ledger.add_peg("cc33cc33cc33cc33cc33cc33cc33cc33", "Bracelet");
    h.assets.ensure_assets().await.unwrap();

    // A fresh session sees the restored asset even with the ledger gone.
    h.ledger.online.store(false, Ordering::SeqCst);
    let second_session = h.fresh_store();
    let all = second_session.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Bracelet");
}

#[tokio::test]
async fn matched_peg_never_duplicates_an_asset() {
    let h = harness(ScriptedLedger::online());

    let saved = h.assets.save(Asset::new("Ring")).await.unwrap();
    let id = saved.id.clone().unwrap();

    // The ledger now reports a peg for an asset that exists locally.
    h.ledger.add_peg(id.as_str(), "Ring");
    h.assets.ensure_assets().await.unwrap();

    let all = h.assets.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn ensure_assets_is_idempotent() {
    let h = harness(ScriptedLedger::online());
    h.ledger.add_peg("dd44dd44dd44dd44dd44dd44dd44dd44", "Brooch");
    h.assets.save(Asset::new("Ring")).await.unwrap();

    h.assets.ensure_assets().await.unwrap();
    let first: Vec<_> = h
        .assets
        .get_all()
        .await
        .unwrap()
        .iter()
        .map(|a| a.id.clone())
        .collect();

    h.assets.ensure_assets().await.unwrap();
    let second: Vec<_> = h
        .assets
        .get_all()
        .await
        .unwrap()
        .iter()
        .map(|a| a.id.clone())
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn restored_asset_emits_a_notification() {
    let h = harness(ScriptedLedger::online());
    h.ledger.add_peg("ee55ee55ee55ee55ee55ee55ee55ee55", "Heirloom");
    h.assets.ensure_assets().await.unwrap();

    let titles: Vec<_> = h
        .notifications
        .all()
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert!(titles.contains(&"Asset restored from security peg".to_string()));
}

#[tokio::test]
async fn registering_an_asset_emits_a_notification() {
    let h = harness(ScriptedLedger::offline());
    h.assets.save(Asset::new("Ring")).await.unwrap();

    let latest = h.notifications.latest();
    assert_eq!(latest[0].title, "New asset registered");
}

#[tokio::test]
async fn update_overwrites_fields_by_id() {
    let h = harness(ScriptedLedger::offline());
    let mut saved = h.assets.save(Asset::new("Ring")).await.unwrap();

    saved.comments = Some("engraved".into());
    saved.category = Some("Jewelry".into());
    h.assets.save(saved.clone()).await.unwrap();

    let all = h.assets.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].comments.as_deref(), Some("engraved"));
}

#[tokio::test]
async fn inline_images_are_uploaded_and_stripped_from_persistence() {
    let h = harness(ScriptedLedger::offline());

    let mut asset = Asset::new("Ring");
    asset.images.push(AssetImage {
        file_name: "ring.jpg".into(),
        location: ImageLocation::DataUrl,
        data_url: Some("data:image/jpeg;base64,/9j/4A==".into()),
        hash: None,
    });
    let saved = h.assets.save(asset).await.unwrap();
    let id = saved.id.clone().unwrap();

    // Uploaded exactly once, hash recorded.
    let current = h.assets.get(&id).await.unwrap().unwrap();
    let image = &current.images[0];
    assert_eq!(image.location, ImageLocation::Gateway);
    assert!(image.hash.is_some());

    // A fresh session reloads the payload from the gateway.
    let second_session = h.fresh_store();
    let reloaded = second_session.get(&id).await.unwrap().unwrap();
    assert_eq!(
        reloaded.images[0].data_url.as_deref(),
        Some("data:image/jpeg;base64,/9j/4A==")
    );
}

#[tokio::test]
async fn marked_verifications_are_flushed_to_the_ledger_once() {
    let h = harness(ScriptedLedger::online());

    let mut asset = Asset::new("Ring");
    let mut verification = Verification::new(VerificationKind::EXPERT);
    verification.verifier_address = Some(Address::new(
        "0x9254f061aaa8e8b44eb8e11a7b56b9c7cdedbb38",
    ));
    verification.should_be_saved = true;
    asset.verifications.push(verification);

    h.assets.save(asset).await.unwrap();
    assert_eq!(h.ledger.verification_requests.lock().unwrap().len(), 1);

    // Saving again must not resend: the flag was cleared.
    let all = h.assets.get_all().await.unwrap();
    h.assets.save(all[0].clone()).await.unwrap();
    assert_eq!(h.ledger.verification_requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn securing_an_asset_attaches_and_persists_the_peg() {
    let h = harness(ScriptedLedger::online());
    let saved = h.assets.save(Asset::new("Ring")).await.unwrap();
    let id = saved.id.clone().unwrap();

    let secured = h.assets.secure_asset(&id).await.unwrap();
    let security = secured.secured_on.as_ref().unwrap();
    assert_eq!(security.name, "Premium");
    assert_eq!(security.security_pegs.len(), 1);
    assert_eq!(security.security_pegs[0].details.asset.id, id);
    assert!(security.security_pegs[0].is_owned);

    // The peg survives a reload, and the now-secured asset does not get
    // duplicated by reconciliation even though the ledger reports its peg.
    let second_session = h.fresh_store();
    let all = second_session.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].secured_on.is_some());
}

#[tokio::test]
async fn securing_an_unknown_asset_is_an_error() {
    let h = harness(ScriptedLedger::online());
    let missing = AssetId::from("0000aaaa0000aaaa0000aaaa0000aaaa");
    assert!(h.assets.secure_asset(&missing).await.is_err());
}

#[tokio::test]
async fn transfer_requests_pass_through_to_the_ledger() {
    let h = harness(ScriptedLedger::online());
    let request = TransferRequest {
        asset_id: AssetId::from("ff66ff66ff66ff66ff66ff66ff66ff66"),
        requester_address: Address::new("0x9254f061aaa8e8b44eb8e11a7b56b9c7cdedbb38"),
    };
    h.assets.create_transfer_request(&request).await.unwrap();
    assert_eq!(
        h.ledger.transfer_requests_created.lock().unwrap().as_slice(),
        &[AssetId::from("ff66ff66ff66ff66ff66ff66ff66ff66")]
    );
}

#[tokio::test]
async fn incoming_verification_requests_empty_when_offline() {
    let h = harness(ScriptedLedger::offline());
    let requests = h.assets.get_incoming_verification_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn unauthenticated_store_is_a_no_op() {
    let backend: Arc<dyn KeyValueBackend> = Arc::new(MemoryBackend::new());
    let identity = Arc::new(IdentityService::new());
    let ledger = Arc::new(ScriptedLedger::offline());
    let binary = Arc::new(ScriptedBinaryStore::default());
    let notifications = Arc::new(NotificationStore::new(backend.clone(), identity.clone()));

    let assets = AssetStore::new(backend, identity, ledger, binary, notifications);
    assets.ensure_assets().await.unwrap();
    assert!(assets.get_all().await.unwrap().is_empty());
}
