//! Expert and ownership verifications.

use crate::shared::{Address, AssetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verification type as carried on the ledger (an integer enum).
///
/// Unknown values created by other clients pass through untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VerificationKind(pub u64);

impl VerificationKind {
    pub const OWNERSHIP: VerificationKind = VerificationKind(1);
    pub const EXPERT: VerificationKind = VerificationKind(2);
}

impl fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            VerificationKind::OWNERSHIP => write!(f, "ownership"),
            VerificationKind::EXPERT => write!(f, "expert"),
            VerificationKind(other) => write!(f, "type {other}"),
        }
    }
}

/// A verification attached to an asset.
///
/// Comments and defects are local-only; the pending flag and verifier
/// address mirror the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_address: Option<Address>,
    pub kind: VerificationKind,
    pub is_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defects: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Set when the verification has been edited locally and still has to
    /// be pushed to the ledger on the next persist.
    #[serde(default)]
    pub should_be_saved: bool,
}

impl Verification {
    pub fn new(kind: VerificationKind) -> Self {
        Self {
            verifier_address: None,
            kind,
            is_pending: true,
            comments: None,
            defects: None,
            date: None,
            should_be_saved: false,
        }
    }
}

/// A reference to the asset a verification request concerns. The asset may
/// not exist locally, so only the on-chain `{id, name}` pair is carried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationAssetRef {
    pub id: AssetId,
    pub name: String,
}

/// An outstanding request for a third party to attest to an asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationRequest {
    pub owner_address: Address,
    pub asset: VerificationAssetRef,
    pub verification: Verification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_constants() {
        assert_eq!(VerificationKind::OWNERSHIP.0, 1);
        assert_eq!(VerificationKind::EXPERT.0, 2);
        assert_eq!(VerificationKind::EXPERT.to_string(), "expert");
        assert_eq!(VerificationKind(9).to_string(), "type 9");
    }

    #[test]
    fn test_unknown_kind_survives_serde() {
        let v = Verification::new(VerificationKind(7));
        let json = serde_json::to_string(&v).unwrap();
        let back: Verification = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, VerificationKind(7));
    }
}
