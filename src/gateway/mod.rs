//! Content-addressed binary storage over the local gateway HTTP API.
//!
//! Values are encrypted with the user's identity before upload, so the
//! gateway (and anyone who can read it) only ever sees ciphertext. The
//! gateway returns a base58 content hash which the caller records on the
//! owning record.

use crate::error::StorageError;
use crate::identity::IdentityService;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Remote store for binary attachments, addressed by content hash.
pub trait BinaryStore: Send + Sync {
    /// Stores a value and returns its content hash.
    fn set_item(
        &self,
        name: &str,
        value: &str,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Retrieves a value by content hash.
    fn get_item(&self, hash: &str) -> impl Future<Output = Result<String, StorageError>> + Send;
}

#[derive(Serialize)]
struct StoreFileRequest<'a> {
    name: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct StoreFileResponse {
    #[serde(rename = "ipfsHash")]
    ipfs_hash: String,
}

#[derive(Deserialize)]
struct GetFileResponse {
    data: String,
}

/// [`BinaryStore`] backed by the gateway's `/files` + `/ipfs/:hash` API.
pub struct GatewayStore {
    api_url: String,
    client: Client,
    identity: Arc<IdentityService>,
}

impl GatewayStore {
    pub fn new(api_url: &str, identity: Arc<IdentityService>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
            identity,
        }
    }
}

impl BinaryStore for GatewayStore {
    async fn set_item(&self, name: &str, value: &str) -> Result<String, StorageError> {
        let provider = self.identity.require_primary()?;
        let json = serde_json::to_string(value)?;
        let blob = provider.encrypt(&json)?;

        let url = format!("{}/files", self.api_url);
        let resp = self
            .client
            .post(&url)
            .json(&StoreFileRequest {
                name,
                data: &blob,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StorageError::Gateway(format!(
                "storing '{name}' failed with status {}",
                resp.status()
            )));
        }
        let parsed = resp.json::<StoreFileResponse>().await?;

        // The gateway hands back a base58 multihash; reject anything else
        // before it gets recorded on an asset.
        if bs58::decode(&parsed.ipfs_hash).into_vec().is_err() {
            return Err(StorageError::Gateway(format!(
                "gateway returned a malformed content hash: {}",
                parsed.ipfs_hash
            )));
        }
        Ok(parsed.ipfs_hash)
    }

    async fn get_item(&self, hash: &str) -> Result<String, StorageError> {
        let provider = self.identity.require_primary()?;

        let url = format!("{}/ipfs/{}", self.api_url, hash);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(StorageError::Gateway(format!(
                "fetching '{hash}' failed with status {}",
                resp.status()
            )));
        }
        let parsed = resp.json::<GetFileResponse>().await?;

        let json = provider.decrypt(&parsed.data)?;
        Ok(serde_json::from_str(&json)?)
    }
}
