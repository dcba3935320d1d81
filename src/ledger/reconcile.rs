//! Reconciliation of local assets against on-chain security pegs.
//!
//! The merge is one-directional by design: pegs with no local
//! counterpart synthesize a local asset, but nothing local is ever
//! removed on the strength of a (possibly stale) ledger read.

use crate::domain::asset::{Asset, AssetSecurity, SecurityPeg};
use crate::domain::notification::Notification;
use std::collections::HashSet;

/// Security tier assigned to assets rebuilt from a peg.
pub const RESTORED_SECURITY_TIER: &str = "Premium";

/// Merges dangling pegs into the local asset list.
///
/// A peg is dangling when its embedded asset id matches no local asset.
/// Each dangling peg synthesizes an asset carrying the peg's `{id, name}`
/// and a security record holding exactly that peg. Returns one
/// "restored" notification per synthesized asset; an empty return means
/// nothing changed and nothing needs persisting.
pub fn merge_dangling(assets: &mut Vec<Asset>, pegs: Vec<SecurityPeg>) -> Vec<Notification> {
    let mut known: HashSet<_> = assets.iter().filter_map(|a| a.id.clone()).collect();

    let mut notifications = Vec::new();
    for peg in pegs {
        if known.contains(&peg.details.asset.id) {
            continue;
        }
        known.insert(peg.details.asset.id.clone());

        let mut asset = Asset::new(peg.details.asset.name.clone());
        asset.id = Some(peg.details.asset.id.clone());
        asset.secured_on = Some(AssetSecurity {
            name: RESTORED_SECURITY_TIER.to_string(),
            security_pegs: vec![peg.clone()],
        });

        tracing::debug!(
            asset_id = %peg.details.asset.id,
            ledger = %peg.name,
            "Restoring dangling asset from security peg"
        );
        notifications.push(Notification::asset_restored(&asset, &peg));
        assets.push(asset);
    }
    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::{PegAssetRef, PegDetails};
    use crate::shared::{Address, AssetId};

    fn peg(id: &str, name: &str) -> SecurityPeg {
        SecurityPeg {
            name: "Ethereum".into(),
            logo_image_file_name: "ethereum-logo.png".into(),
            transaction_url: "http://etherapps.info/block/1507".into(),
            details: PegDetails {
                address: Address::new("0xabcdef0123456789abcdef0123456789abcdef01"),
                asset: PegAssetRef {
                    id: AssetId::from(id),
                    name: name.into(),
                },
                block_number: Some(1507),
            },
            is_owned: true,
        }
    }

    fn local_asset(id: &str, name: &str) -> Asset {
        let mut asset = Asset::new(name);
        asset.id = Some(AssetId::from(id));
        asset
    }

    #[test]
    fn test_matched_peg_creates_no_duplicate() {
        let mut assets = vec![local_asset("aa11", "Ring")];
        let notifications = merge_dangling(&mut assets, vec![peg("aa11", "Ring")]);
        assert!(notifications.is_empty());
        assert_eq!(assets.len(), 1);
    }

    #[test]
    fn test_single_unmatched_peg_synthesizes_one_asset() {
        let mut assets = vec![local_asset("aa11", "Ring")];
        let notifications = merge_dangling(&mut assets, vec![peg("bb22", "Necklace")]);

        assert_eq!(notifications.len(), 1);
        assert_eq!(assets.len(), 2);

        let restored = &assets[1];
        assert_eq!(restored.id, Some(AssetId::from("bb22")));
        assert_eq!(restored.name, "Necklace");

        let security = restored.secured_on.as_ref().unwrap();
        assert_eq!(security.name, RESTORED_SECURITY_TIER);
        assert_eq!(security.security_pegs.len(), 1);
        assert_eq!(
            security.security_pegs[0].details.asset.id,
            AssetId::from("bb22")
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut assets = vec![local_asset("aa11", "Ring")];
        let first = merge_dangling(&mut assets, vec![peg("bb22", "Necklace")]);
        assert_eq!(first.len(), 1);

        let ids_after_first: Vec<_> = assets.iter().map(|a| a.id.clone()).collect();
        let second = merge_dangling(&mut assets, vec![peg("bb22", "Necklace")]);
        assert!(second.is_empty());
        assert_eq!(
            assets.iter().map(|a| a.id.clone()).collect::<Vec<_>>(),
            ids_after_first
        );
    }

    #[test]
    fn test_duplicate_pegs_in_one_batch_merge_once() {
        let mut assets = Vec::new();
        let notifications =
            merge_dangling(&mut assets, vec![peg("cc33", "Watch"), peg("cc33", "Watch")]);
        assert_eq!(notifications.len(), 1);
        assert_eq!(assets.len(), 1);
    }

    #[test]
    fn test_nothing_is_ever_removed() {
        let mut assets = vec![local_asset("aa11", "Ring"), local_asset("bb22", "Necklace")];
        // The ledger reports no pegs at all — locals must survive.
        let notifications = merge_dangling(&mut assets, Vec::new());
        assert!(notifications.is_empty());
        assert_eq!(assets.len(), 2);
    }
}
