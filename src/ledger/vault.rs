//! Typed call surface of the AssetVault contract.
//!
//! One method per contract function. Methods return wire-level values
//! (addresses may be the zero sentinel, asset ids may be empty for
//! cleared slots); interpretation happens in the ledger client.

use crate::error::LedgerError;
use crate::rpc::JsonRpcClient;
use crate::shared::abi::{CallData, ReturnData};
use crate::shared::{Address, AssetId};

/// Handle to the deployed AssetVault contract, bound to the address
/// transactions are sent from.
#[derive(Clone)]
pub struct AssetVault {
    rpc: JsonRpcClient,
    contract: Address,
    from: Address,
}

impl AssetVault {
    pub fn new(rpc: JsonRpcClient, contract: Address, from: Address) -> Self {
        Self {
            rpc,
            contract,
            from,
        }
    }

    pub fn contract_address(&self) -> &Address {
        &self.contract
    }

    async fn call(&self, data: &CallData) -> Result<ReturnData, LedgerError> {
        let raw = self.rpc.eth_call(&self.contract, &data.to_hex()).await?;
        Ok(ReturnData::parse(&raw)?)
    }

    async fn transact(&self, data: &CallData) -> Result<(), LedgerError> {
        self.rpc
            .send_transaction(&self.from, &self.contract, &data.to_hex())
            .await?;
        Ok(())
    }

    // ── Writes (fire-and-forget) ─────────────────────────────────────────

    pub async fn create_asset(&self, id: &AssetId, name: &str) -> Result<(), LedgerError> {
        let mut data = CallData::new("createAsset(bytes32,bytes32)");
        data.push_str32(id.as_str())?.push_str32(name)?;
        self.transact(&data).await
    }

    pub async fn request_transfer(&self, id: &AssetId) -> Result<(), LedgerError> {
        let mut data = CallData::new("requestTransfer(bytes32)");
        data.push_str32(id.as_str())?;
        self.transact(&data).await
    }

    pub async fn process_transfer(
        &self,
        id: &AssetId,
        new_owner: &Address,
        confirm: bool,
    ) -> Result<(), LedgerError> {
        let mut data = CallData::new("processTransfer(bytes32,address,bool)");
        data.push_str32(id.as_str())?
            .push_address(new_owner)?
            .push_bool(confirm);
        self.transact(&data).await
    }

    pub async fn request_verification(
        &self,
        id: &AssetId,
        verifier: &Address,
        kind: u64,
    ) -> Result<(), LedgerError> {
        let mut data = CallData::new("requestVerification(bytes32,address,uint256)");
        data.push_str32(id.as_str())?
            .push_address(verifier)?
            .push_uint(kind);
        self.transact(&data).await
    }

    pub async fn process_verification(
        &self,
        id: &AssetId,
        kind: u64,
        confirm: bool,
    ) -> Result<(), LedgerError> {
        let mut data = CallData::new("processVerification(bytes32,uint256,bool)");
        data.push_str32(id.as_str())?.push_uint(kind).push_bool(confirm);
        self.transact(&data).await
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Owner of an asset; the zero address means "no owner".
    pub async fn owner_by_asset_id(&self, id: &AssetId) -> Result<Address, LedgerError> {
        let mut data = CallData::new("ownerByAssetID(bytes32)");
        data.push_str32(id.as_str())?;
        self.call(&data).await?.address(0).map_err(Into::into)
    }

    /// Number of asset slots held by an owner (cleared slots included).
    pub async fn assets_by_owner(&self, owner: &Address) -> Result<u64, LedgerError> {
        let mut data = CallData::new("assetsByOwner(address)");
        data.push_address(owner)?;
        self.call(&data).await?.uint(0).map_err(Into::into)
    }

    /// Asset id at an owner's slot; empty for cleared slots.
    pub async fn asset_id_at(&self, owner: &Address, index: u64) -> Result<String, LedgerError> {
        let mut data = CallData::new("getAssetID(address,uint256)");
        data.push_address(owner)?.push_uint(index);
        self.call(&data).await?.str32(0).map_err(Into::into)
    }

    pub async fn asset_name_at(&self, owner: &Address, index: u64) -> Result<String, LedgerError> {
        let mut data = CallData::new("getAssetName(address,uint256)");
        data.push_address(owner)?.push_uint(index);
        self.call(&data).await?.str32(0).map_err(Into::into)
    }

    /// `(id, name, verification count)` of an owner's slot.
    pub async fn asset_at(
        &self,
        owner: &Address,
        index: u64,
    ) -> Result<(String, String, u64), LedgerError> {
        let mut data = CallData::new("getAsset(address,uint256)");
        data.push_address(owner)?.push_uint(index);
        let ret = self.call(&data).await?;
        Ok((ret.str32(0)?, ret.str32(1)?, ret.uint(2)?))
    }

    pub async fn transfer_request_count(&self) -> Result<u64, LedgerError> {
        let data = CallData::new("transferRequestCount()");
        self.call(&data).await?.uint(0).map_err(Into::into)
    }

    /// `(asset id, requester)` at an index in the transfer request list.
    pub async fn transfer_request_at(&self, index: u64) -> Result<(String, Address), LedgerError> {
        let mut data = CallData::new("transferRequests(uint256)");
        data.push_uint(index);
        let ret = self.call(&data).await?;
        Ok((ret.str32(0)?, ret.address(1)?))
    }

    pub async fn owner_count(&self) -> Result<u64, LedgerError> {
        let data = CallData::new("ownerCount()");
        self.call(&data).await?.uint(0).map_err(Into::into)
    }

    pub async fn owner_at(&self, index: u64) -> Result<Address, LedgerError> {
        let mut data = CallData::new("owners(uint256)");
        data.push_uint(index);
        self.call(&data).await?.address(0).map_err(Into::into)
    }

    /// `(verifier, type, confirmed)` of an asset's verification slot.
    pub async fn verification_at(
        &self,
        id: &AssetId,
        index: u64,
    ) -> Result<(Address, u64, bool), LedgerError> {
        let mut data = CallData::new("getVerification(bytes32,uint256)");
        data.push_str32(id.as_str())?.push_uint(index);
        let ret = self.call(&data).await?;
        Ok((ret.address(0)?, ret.uint(1)?, ret.boolean(2)?))
    }
}
