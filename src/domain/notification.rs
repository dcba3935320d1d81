//! User-facing notifications.

use crate::domain::asset::{Asset, SecurityPeg};
use crate::shared::new_token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry in the user's notification list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub details: String,
    /// Route the notification links to, e.g. `asset/<id>`.
    pub url: String,
    /// Icon name for the UI.
    pub icon: String,
    pub seen: bool,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        details: impl Into<String>,
        url: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            id: new_token(),
            title: title.into(),
            date: Utc::now(),
            details: details.into(),
            url: url.into(),
            icon: icon.into(),
            seen: false,
        }
    }

    /// Seeded once for every fresh notification list.
    pub fn welcome() -> Self {
        Self::new(
            "Entered on AssetChain",
            "You became an AssetChain user. Be welcome!",
            "",
            "home",
        )
    }

    /// Emitted when a new asset is registered locally.
    pub fn asset_registered(asset: &Asset) -> Self {
        let id = asset.id.as_ref().map(|i| i.as_str()).unwrap_or_default();
        Self::new(
            "New asset registered",
            format!("Your asset {} has been registered.", asset.name),
            format!("asset/{id}"),
            "plus-circle",
        )
    }

    /// Emitted when a dangling asset is rebuilt from an on-chain peg.
    pub fn asset_restored(asset: &Asset, peg: &SecurityPeg) -> Self {
        let id = asset.id.as_ref().map(|i| i.as_str()).unwrap_or_default();
        Self::new(
            "Asset restored from security peg",
            format!(
                "The asset {} for which you control the security peg on the {} ledger has been restored.",
                asset.name, peg.name
            ),
            format!("asset/{id}"),
            "lock",
        )
    }
}
