//! Assets and their security pegs.

use crate::shared::{Address, AssetId};
use serde::{Deserialize, Serialize};

/// A physical asset registered with AssetChain.
///
/// Assets are created locally (the identifier is assigned client-side),
/// optionally secured on a ledger, and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    /// Absent until the store assigns one on first save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<AssetId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub is_pending_claim: bool,
    #[serde(default)]
    pub verifications: Vec<crate::domain::verification::Verification>,
    #[serde(default)]
    pub images: Vec<AssetImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secured_on: Option<AssetSecurity>,
}

impl Asset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            category: None,
            comments: None,
            is_pending_claim: true,
            verifications: Vec::new(),
            images: Vec::new(),
            secured_on: None,
        }
    }
}

/// Where an image's bytes currently live.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ImageLocation {
    /// Inline `data:` URL, not yet uploaded.
    DataUrl,
    /// Stored in the content-addressed gateway under `hash`.
    Gateway,
}

/// An image attached to an asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetImage {
    pub file_name: String,
    pub location: ImageLocation,
    /// Inline payload; dropped from the persisted copy once uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    /// Content hash at the gateway, once uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl AssetImage {
    /// Whether a usable inline payload is present.
    pub fn is_loaded(&self) -> bool {
        match &self.data_url {
            Some(url) => url.starts_with("data:"),
            None => false,
        }
    }
}

/// The security tier of an asset and the pegs backing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetSecurity {
    /// Security tier name, e.g. `"Premium"`.
    pub name: String,
    pub security_pegs: Vec<SecurityPeg>,
}

/// The `{id, name}` pair a peg was created for. The id is the sole key
/// used to match pegs back to local assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PegAssetRef {
    pub id: AssetId,
    pub name: String,
}

/// Ledger-specific detail bag carried by a peg.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PegDetails {
    /// The address owning the asset on the ledger.
    pub address: Address,
    pub asset: PegAssetRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// A record proving an asset's registration on one backend ledger.
///
/// Immutable once created except for `is_owned`, which is recomputed on
/// every status check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityPeg {
    /// Ledger display name, e.g. `"Ethereum"`.
    pub name: String,
    pub logo_image_file_name: String,
    /// Human-facing transaction URL on a block explorer.
    pub transaction_url: String,
    pub details: PegDetails,
    /// Whether the peg is held by the currently configured address.
    pub is_owned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_asset_is_pending_with_no_id() {
        let asset = Asset::new("Diamond ring");
        assert!(asset.id.is_none());
        assert!(asset.is_pending_claim);
        assert!(asset.secured_on.is_none());
    }

    #[test]
    fn test_image_is_loaded_requires_data_url() {
        let mut image = AssetImage {
            file_name: "ring.jpg".into(),
            location: ImageLocation::DataUrl,
            data_url: None,
            hash: None,
        };
        assert!(!image.is_loaded());

        image.data_url = Some("http://example.com/ring.jpg".into());
        assert!(!image.is_loaded());

        image.data_url = Some("data:image/jpeg;base64,/9j/4A==".into());
        assert!(image.is_loaded());
    }

    #[test]
    fn test_asset_serde_round_trip() {
        let mut asset = Asset::new("Rolex Daytona");
        asset.id = Some(AssetId::from("a480f7317f4c5a9be4c2736f7a9f4bba"));
        asset.category = Some("Watch".into());
        let json = serde_json::to_string(&asset).unwrap();
        let back: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }
}
