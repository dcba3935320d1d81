//! Ownership transfer requests.

use crate::shared::{Address, AssetId};
use serde::{Deserialize, Serialize};

/// An outstanding request by another address to receive ownership of an
/// asset. Lives entirely on the ledger; always re-fetched, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRequest {
    pub asset_id: AssetId,
    pub requester_address: Address,
}
