//! The ledger boundary: connection management, the AssetVault call
//! surface, transaction watching, and peg reconciliation.

pub mod reconcile;
pub mod vault;
pub mod watch;

pub use vault::AssetVault;
pub use watch::{TxWatch, WatchConfig, WatchStep};

use crate::domain::asset::{Asset, PegAssetRef, PegDetails, SecurityPeg};
use crate::domain::config::EthereumConfiguration;
use crate::domain::transfer::TransferRequest;
use crate::domain::verification::{
    Verification, VerificationAssetRef, VerificationKind, VerificationRequest,
};
use crate::error::LedgerError;
use crate::network;
use crate::rpc::JsonRpcClient;
use crate::shared::{Address, AssetId};

use async_lock::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// The operations a backend ledger offers the asset store.
///
/// One implementation per ledger; the store only ever talks through this
/// trait, so tests can substitute a scripted ledger.
#[allow(async_fn_in_trait)]
pub trait LedgerService: Send + Sync {
    /// Display name used on security pegs, e.g. `"Ethereum"`.
    fn ledger_name(&self) -> &str;

    async fn connect(&self) -> Result<ConnectionInfo, LedgerError>;
    async fn ensure_connected(&self) -> Result<ConnectionInfo, LedgerError>;
    async fn is_active(&self) -> bool;

    /// Registers the asset on the ledger and waits for the write to land.
    async fn secure_asset(&self, asset: &Asset) -> Result<SecurityPeg, LedgerError>;

    async fn owner_of(&self, id: &AssetId) -> Result<Option<Address>, LedgerError>;
    async fn is_secured(&self, id: &AssetId) -> Result<bool, LedgerError>;
    async fn security_peg(&self, id: &AssetId, name: &str) -> Result<SecurityPeg, LedgerError>;
    async fn all_security_pegs(&self) -> Result<Vec<SecurityPeg>, LedgerError>;

    /// Recomputes the ownership flag of the asset's pegs on this ledger.
    async fn check_asset_status(&self, asset: &mut Asset) -> Result<(), LedgerError>;

    async fn create_transfer_request(&self, id: &AssetId) -> Result<(), LedgerError>;
    async fn confirm_transfer_request(&self, request: &TransferRequest)
        -> Result<(), LedgerError>;
    async fn ignore_transfer_request(&self, request: &TransferRequest) -> Result<(), LedgerError>;
    async fn transfer_requests(&self, asset: &Asset) -> Result<Vec<TransferRequest>, LedgerError>;

    async fn incoming_verification_requests(
        &self,
    ) -> Result<Vec<VerificationRequest>, LedgerError>;
    async fn incoming_verification_request(
        &self,
        id: &AssetId,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRequest>, LedgerError>;
    async fn own_verification_request(
        &self,
        verifier: &Address,
        id: &AssetId,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRequest>, LedgerError>;
    async fn request_verification(
        &self,
        asset: &Asset,
        verification: &Verification,
    ) -> Result<(), LedgerError>;
    async fn process_verification(
        &self,
        request: &VerificationRequest,
        confirm: bool,
    ) -> Result<(), LedgerError>;
}

/// Snapshot of an established connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// The address transactions are sent from.
    pub current_address: Address,
    /// The node's default account.
    pub coinbase: Address,
    /// True when the configured address was unknown to the node and the
    /// coinbase was substituted for it.
    pub address_substituted: bool,
    /// Generation counter of this connection; bumps on every rebind.
    pub generation: u64,
}

#[derive(Clone)]
struct LedgerConnection {
    rpc: JsonRpcClient,
    vault: AssetVault,
    current_address: Address,
    coinbase: Address,
    address_substituted: bool,
    generation: u64,
}

impl LedgerConnection {
    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            current_address: self.current_address.clone(),
            coinbase: self.coinbase.clone(),
            address_substituted: self.address_substituted,
            generation: self.generation,
        }
    }
}

/// Removes the asset id from the in-flight set when the operation ends,
/// on both the success and error paths.
#[derive(Debug)]
struct InFlightGuard {
    set: Arc<Mutex<HashSet<AssetId>>>,
    id: AssetId,
}

impl InFlightGuard {
    fn claim(set: &Arc<Mutex<HashSet<AssetId>>>, id: AssetId) -> Result<Self, LedgerError> {
        let mut entries = set.lock().expect("in-flight lock");
        if !entries.insert(id.clone()) {
            return Err(LedgerError::InFlight(id));
        }
        Ok(Self {
            set: set.clone(),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().expect("in-flight lock").remove(&self.id);
    }
}

/// Client for the AssetVault contract on an Ethereum node.
///
/// Connection state lives in one explicit value behind a lock rather
/// than process-global state; rebinding bumps a generation counter that
/// in-flight watchers check to cancel themselves.
pub struct LedgerClient {
    config: RwLock<EthereumConfiguration>,
    connection: RwLock<Option<LedgerConnection>>,
    generation: AtomicU64,
    in_flight: Arc<Mutex<HashSet<AssetId>>>,
    watch_config: WatchConfig,
}

impl LedgerClient {
    pub fn new(config: EthereumConfiguration) -> Self {
        Self {
            config: RwLock::new(config),
            connection: RwLock::new(None),
            generation: AtomicU64::new(0),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            watch_config: WatchConfig::default(),
        }
    }

    pub fn with_watch_config(mut self, watch_config: WatchConfig) -> Self {
        self.watch_config = watch_config;
        self
    }

    /// Replaces the connection settings. Any established connection is
    /// dropped and in-flight watchers cancel on their next sample.
    pub async fn reconfigure(&self, config: EthereumConfiguration) {
        *self.config.write().await = config;
        *self.connection.write().await = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Drops the connection without touching the configuration.
    pub async fn disconnect(&self) {
        *self.connection.write().await = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn connection_info(&self) -> Option<ConnectionInfo> {
        self.connection.read().await.as_ref().map(|c| c.info())
    }

    async fn require_connection(&self) -> Result<LedgerConnection, LedgerError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or(LedgerError::NotConnected)
    }

    fn check_peg(peg: &mut SecurityPeg, current_address: &Address) {
        peg.is_owned =
            !peg.details.address.is_zero() && peg.details.address == *current_address;
    }

    /// Zero-address returns from the contract mean "no owner".
    fn normalize_owner(owner: Address) -> Option<Address> {
        (!owner.is_zero()).then_some(owner)
    }
}

impl LedgerService for LedgerClient {
    fn ledger_name(&self) -> &str {
        network::ETHEREUM_LEDGER_NAME
    }

    async fn connect(&self) -> Result<ConnectionInfo, LedgerError> {
        let config = self.config.read().await.clone();
        let rpc_url = config
            .json_rpc_url
            .clone()
            .ok_or_else(|| LedgerError::Connect("no JSON-RPC URL configured".into()))?;

        let rpc = JsonRpcClient::new(&rpc_url);
        let coinbase = rpc
            .coinbase()
            .await
            .map_err(|e| LedgerError::Connect(e.to_string()))?;
        let accounts = rpc
            .accounts()
            .await
            .map_err(|e| LedgerError::Connect(e.to_string()))?;

        let mut current_address = match &config.current_address {
            Some(address) => address.clone(),
            None => coinbase.clone(),
        };
        let mut address_substituted = false;
        if !accounts.contains(&current_address) {
            tracing::warn!(
                configured = %current_address,
                coinbase = %coinbase,
                "Configured address is not present on the node, switching to coinbase"
            );
            current_address = coinbase.clone();
            address_substituted = true;
        }

        let contract = config.contract_address();
        let vault = AssetVault::new(rpc.clone(), contract.clone(), current_address.clone());

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let connection = LedgerConnection {
            rpc,
            vault,
            current_address,
            coinbase,
            address_substituted,
            generation,
        };
        let info = connection.info();
        *self.connection.write().await = Some(connection);

        tracing::info!(
            node = %rpc_url,
            contract = %contract,
            address = %info.current_address,
            generation,
            "Connected to Ethereum node"
        );
        Ok(info)
    }

    async fn ensure_connected(&self) -> Result<ConnectionInfo, LedgerError> {
        if let Some(info) = self.connection_info().await {
            return Ok(info);
        }
        self.connect().await
    }

    async fn is_active(&self) -> bool {
        self.connection.read().await.is_some()
    }

    async fn secure_asset(&self, asset: &Asset) -> Result<SecurityPeg, LedgerError> {
        let id = asset.id.clone().ok_or(LedgerError::MissingAssetId)?;
        self.ensure_connected().await?;
        let conn = self.require_connection().await?;

        let _guard = InFlightGuard::claim(&self.in_flight, id.clone())?;

        conn.vault.create_asset(&id, &asset.name).await?;
        let block_at_start = conn.rpc.block_number().await.map_err(LedgerError::Rpc)?;

        let probe_vault = conn.vault.clone();
        let probe_id = id.clone();
        let block_number = watch::run_watch(
            &conn.rpc,
            move || {
                let vault = probe_vault.clone();
                let id = probe_id.clone();
                async move { Ok(!vault.owner_by_asset_id(&id).await?.is_zero()) }
            },
            &self.watch_config,
            block_at_start,
            || {
                let current = self.generation.load(Ordering::SeqCst);
                if current != conn.generation {
                    Some(LedgerError::StaleConnection {
                        started: conn.generation,
                        current,
                    })
                } else {
                    None
                }
            },
        )
        .await?;

        Ok(SecurityPeg {
            name: self.ledger_name().to_string(),
            logo_image_file_name: network::ETHEREUM_LOGO_FILE.to_string(),
            transaction_url: format!("{}/{}", network::BLOCK_EXPLORER_URL, block_number),
            details: PegDetails {
                address: conn.current_address.clone(),
                asset: PegAssetRef {
                    id,
                    name: asset.name.clone(),
                },
                block_number: Some(block_number),
            },
            is_owned: true,
        })
    }

    async fn owner_of(&self, id: &AssetId) -> Result<Option<Address>, LedgerError> {
        let conn = self.require_connection().await?;
        let owner = conn.vault.owner_by_asset_id(id).await?;
        Ok(Self::normalize_owner(owner))
    }

    async fn is_secured(&self, id: &AssetId) -> Result<bool, LedgerError> {
        Ok(self.owner_of(id).await?.is_some())
    }

    async fn security_peg(&self, id: &AssetId, name: &str) -> Result<SecurityPeg, LedgerError> {
        let conn = self.require_connection().await?;
        let owner = conn.vault.owner_by_asset_id(id).await?;

        let mut peg = SecurityPeg {
            name: self.ledger_name().to_string(),
            logo_image_file_name: network::ETHEREUM_LOGO_FILE.to_string(),
            transaction_url: network::BLOCK_EXPLORER_URL.to_string(),
            details: PegDetails {
                address: owner,
                asset: PegAssetRef {
                    id: id.clone(),
                    name: name.to_string(),
                },
                block_number: None,
            },
            is_owned: false,
        };
        Self::check_peg(&mut peg, &conn.current_address);
        Ok(peg)
    }

    async fn all_security_pegs(&self) -> Result<Vec<SecurityPeg>, LedgerError> {
        let conn = self.require_connection().await?;
        let slot_count = conn.vault.assets_by_owner(&conn.current_address).await?;

        let mut pegs = Vec::new();
        for index in 0..slot_count {
            let id = conn.vault.asset_id_at(&conn.current_address, index).await?;
            if id.is_empty() {
                // Cleared slot (asset transferred away and compacted).
                continue;
            }
            let name = conn
                .vault
                .asset_name_at(&conn.current_address, index)
                .await?;
            pegs.push(self.security_peg(&AssetId::from(id), &name).await?);
        }
        Ok(pegs)
    }

    async fn check_asset_status(&self, asset: &mut Asset) -> Result<(), LedgerError> {
        let conn = self.require_connection().await?;
        let ledger_name = self.ledger_name().to_string();

        let Some(security) = asset.secured_on.as_mut() else {
            return Ok(());
        };
        for peg in security
            .security_pegs
            .iter_mut()
            .filter(|p| p.name.eq_ignore_ascii_case(&ledger_name))
        {
            let owner = conn.vault.owner_by_asset_id(&peg.details.asset.id).await?;
            peg.details.address = owner;
            Self::check_peg(peg, &conn.current_address);
        }
        Ok(())
    }

    async fn create_transfer_request(&self, id: &AssetId) -> Result<(), LedgerError> {
        let conn = self.require_connection().await?;
        conn.vault.request_transfer(id).await
    }

    async fn confirm_transfer_request(
        &self,
        request: &TransferRequest,
    ) -> Result<(), LedgerError> {
        let conn = self.require_connection().await?;
        conn.vault
            .process_transfer(&request.asset_id, &request.requester_address, true)
            .await
    }

    async fn ignore_transfer_request(&self, request: &TransferRequest) -> Result<(), LedgerError> {
        let conn = self.require_connection().await?;
        conn.vault
            .process_transfer(&request.asset_id, &request.requester_address, false)
            .await
    }

    async fn transfer_requests(&self, asset: &Asset) -> Result<Vec<TransferRequest>, LedgerError> {
        // Requires a live connection; an unreachable node degrades to "no
        // requests" rather than an error, matching how callers poll this.
        if let Err(e) = self.ensure_connected().await {
            tracing::warn!("Skipping transfer request fetch, no connection: {e}");
            return Ok(Vec::new());
        }
        let conn = self.require_connection().await?;

        let Some(asset_id) = asset.id.as_ref() else {
            return Ok(Vec::new());
        };

        let count = conn.vault.transfer_request_count().await?;
        let mut requests = Vec::new();
        for index in 0..count {
            let (id, requester_address) = conn.vault.transfer_request_at(index).await?;
            if id == asset_id.as_str() {
                requests.push(TransferRequest {
                    asset_id: AssetId::from(id),
                    requester_address,
                });
            }
        }
        Ok(requests)
    }

    async fn incoming_verification_requests(
        &self,
    ) -> Result<Vec<VerificationRequest>, LedgerError> {
        let conn = self.require_connection().await?;
        let verifier = conn.current_address.clone();
        self.verification_requests(&conn, Some(&verifier), None, None, Some(false))
            .await
    }

    async fn incoming_verification_request(
        &self,
        id: &AssetId,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRequest>, LedgerError> {
        let conn = self.require_connection().await?;
        let verifier = conn.current_address.clone();
        let mut found = self
            .verification_requests(&conn, Some(&verifier), Some(id), Some(kind), Some(false))
            .await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.remove(0))
        })
    }

    async fn own_verification_request(
        &self,
        verifier: &Address,
        id: &AssetId,
        kind: VerificationKind,
    ) -> Result<Option<VerificationRequest>, LedgerError> {
        let conn = self.require_connection().await?;
        let owner = conn.current_address.clone();
        let mut found = self
            .verification_requests_for_owner(
                &conn,
                &owner,
                Some(verifier),
                Some(id),
                Some(kind),
                None,
            )
            .await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.remove(0))
        })
    }

    async fn request_verification(
        &self,
        asset: &Asset,
        verification: &Verification,
    ) -> Result<(), LedgerError> {
        let conn = self.require_connection().await?;
        let id = asset.id.as_ref().ok_or(LedgerError::MissingAssetId)?;
        let verifier = verification
            .verifier_address
            .as_ref()
            .ok_or(LedgerError::MissingVerifier)?;
        conn.vault
            .request_verification(id, verifier, verification.kind.0)
            .await
    }

    async fn process_verification(
        &self,
        request: &VerificationRequest,
        confirm: bool,
    ) -> Result<(), LedgerError> {
        let conn = self.require_connection().await?;
        conn.vault
            .process_verification(&request.asset.id, request.verification.kind.0, confirm)
            .await
    }
}

impl LedgerClient {
    /// Scan over all owners. O(owners × assets × verifications) — no
    /// pagination exists on the contract side.
    async fn verification_requests(
        &self,
        conn: &LedgerConnection,
        filter_verifier: Option<&Address>,
        filter_asset: Option<&AssetId>,
        filter_kind: Option<VerificationKind>,
        filter_confirmed: Option<bool>,
    ) -> Result<Vec<VerificationRequest>, LedgerError> {
        let owner_count = conn.vault.owner_count().await?;
        let mut requests = Vec::new();
        for index in 0..owner_count {
            let owner = conn.vault.owner_at(index).await?;
            if owner.is_zero() {
                continue;
            }
            requests.extend(
                self.verification_requests_for_owner(
                    conn,
                    &owner,
                    filter_verifier,
                    filter_asset,
                    filter_kind,
                    filter_confirmed,
                )
                .await?,
            );
        }
        Ok(requests)
    }

    async fn verification_requests_for_owner(
        &self,
        conn: &LedgerConnection,
        owner: &Address,
        filter_verifier: Option<&Address>,
        filter_asset: Option<&AssetId>,
        filter_kind: Option<VerificationKind>,
        filter_confirmed: Option<bool>,
    ) -> Result<Vec<VerificationRequest>, LedgerError> {
        let slot_count = conn.vault.assets_by_owner(owner).await?;
        let mut requests = Vec::new();

        for slot in 0..slot_count {
            let asset_id = conn.vault.asset_id_at(owner, slot).await?;
            if asset_id.is_empty() {
                continue;
            }
            if let Some(filter) = filter_asset {
                if filter.as_str() != asset_id {
                    continue;
                }
            }
            let asset_id = AssetId::from(asset_id);
            let (_, _, verification_count) = conn.vault.asset_at(owner, slot).await?;

            for vi in 0..verification_count {
                let (verifier, kind, confirmed) = conn.vault.verification_at(&asset_id, vi).await?;
                let kind = VerificationKind(kind);

                let verifier_matches =
                    filter_verifier.map_or(true, |filter| verifier == *filter);
                let confirmed_matches =
                    filter_confirmed.map_or(true, |filter| confirmed == filter);
                let kind_matches = filter_kind.map_or(true, |filter| kind == filter);
                if !(verifier_matches && confirmed_matches && kind_matches) {
                    continue;
                }

                let mut verification = Verification::new(kind);
                verification.verifier_address = Some(verifier);
                verification.is_pending = !confirmed;

                requests.push(VerificationRequest {
                    owner_address: owner.clone(),
                    asset: VerificationAssetRef {
                        id: asset_id.clone(),
                        name: conn.vault.asset_name_at(owner, slot).await?,
                    },
                    verification,
                });
            }
        }
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peg_with_owner(owner: Address) -> SecurityPeg {
        SecurityPeg {
            name: network::ETHEREUM_LEDGER_NAME.to_string(),
            logo_image_file_name: network::ETHEREUM_LOGO_FILE.to_string(),
            transaction_url: network::BLOCK_EXPLORER_URL.to_string(),
            details: PegDetails {
                address: owner,
                asset: PegAssetRef {
                    id: AssetId::from("aa11aa11aa11aa11aa11aa11aa11aa11"),
                    name: "Ring".to_string(),
                },
                block_number: None,
            },
            is_owned: true,
        }
    }

    #[test]
    fn test_zero_owner_normalizes_to_none() {
        assert!(LedgerClient::normalize_owner(Address::zero()).is_none());
        let owner = Address::new("0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(LedgerClient::normalize_owner(owner.clone()), Some(owner));
    }

    #[test]
    fn test_check_peg_compares_against_current_address() {
        let current = Address::new("0xabcdef0123456789abcdef0123456789abcdef01");
        let other = Address::new("0x9254f061aaa8e8b44eb8e11a7b56b9c7cdedbb38");

        let mut peg = peg_with_owner(current.clone());
        LedgerClient::check_peg(&mut peg, &current);
        assert!(peg.is_owned);

        let mut peg = peg_with_owner(other);
        LedgerClient::check_peg(&mut peg, &current);
        assert!(!peg.is_owned);
    }

    #[test]
    fn test_check_peg_zero_owner_is_never_owned() {
        let current = Address::new("0xabcdef0123456789abcdef0123456789abcdef01");
        let mut peg = peg_with_owner(Address::zero());
        LedgerClient::check_peg(&mut peg, &current);
        assert!(!peg.is_owned);
    }

    #[tokio::test]
    async fn test_disconnected_client_reports_not_connected() {
        let client = LedgerClient::new(EthereumConfiguration::default());
        assert!(!client.is_active().await);

        let id = AssetId::from("aa11aa11aa11aa11aa11aa11aa11aa11");
        assert!(matches!(
            client.owner_of(&id).await.unwrap_err(),
            LedgerError::NotConnected
        ));
    }

    #[tokio::test]
    async fn test_connect_without_rpc_url_fails() {
        let client = LedgerClient::new(EthereumConfiguration::default());
        assert!(matches!(
            client.connect().await.unwrap_err(),
            LedgerError::Connect(_)
        ));
    }

    #[tokio::test]
    async fn test_reconfigure_bumps_generation() {
        let client = LedgerClient::new(EthereumConfiguration::default());
        let before = client.generation.load(Ordering::SeqCst);
        client.reconfigure(EthereumConfiguration::default()).await;
        assert_eq!(client.generation.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_in_flight_guard_blocks_and_releases() {
        let set = Arc::new(Mutex::new(HashSet::new()));
        let id = AssetId::from("aa11aa11aa11aa11aa11aa11aa11aa11");

        let guard = InFlightGuard::claim(&set, id.clone()).unwrap();
        assert!(matches!(
            InFlightGuard::claim(&set, id.clone()).unwrap_err(),
            LedgerError::InFlight(_)
        ));

        drop(guard);
        assert!(InFlightGuard::claim(&set, id).is_ok());
    }
}
