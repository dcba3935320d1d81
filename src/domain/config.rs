//! Application configuration, persisted encrypted.

use crate::network;
use crate::shared::Address;
use serde::{Deserialize, Serialize};

/// Connection settings for the Ethereum ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EthereumConfiguration {
    /// JSON-RPC endpoint of the node to transact through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_rpc_url: Option<String>,
    /// The account to transact from. When unset or unknown to the node,
    /// the node's coinbase is used instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_address: Option<Address>,
    /// Override for the AssetVault contract address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
}

impl EthereumConfiguration {
    pub fn contract_address(&self) -> Address {
        self.contract_address
            .clone()
            .unwrap_or_else(|| Address::new(network::VAULT_CONTRACT_ADDRESS))
    }
}

/// Settings for the local gateway serving the content-addressed store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfiguration {
    pub base_url: String,
}

impl GatewayConfiguration {
    /// Base URL of the AssetChain API on the gateway.
    pub fn api_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            network::GATEWAY_API_PATH
        )
    }
}

impl Default for GatewayConfiguration {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_GATEWAY_URL.to_string(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    #[serde(default)]
    pub ethereum: EthereumConfiguration,
    #[serde(default)]
    pub gateway: GatewayConfiguration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_api_url() {
        let gateway = GatewayConfiguration {
            base_url: "http://localhost:3000/".into(),
        };
        assert_eq!(gateway.api_url(), "http://localhost:3000/apis/assetchain");
    }

    #[test]
    fn test_contract_address_defaults_to_deployed() {
        let config = EthereumConfiguration::default();
        assert_eq!(
            config.contract_address(),
            Address::new(crate::network::VAULT_CONTRACT_ADDRESS)
        );
    }
}
