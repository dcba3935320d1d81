//! Network and ledger constants.

/// Default base URL of the local gateway serving the content-addressed store.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";

/// Path of the AssetChain API on the gateway.
pub const GATEWAY_API_PATH: &str = "/apis/assetchain";

/// Address of the deployed AssetVault contract. Redeploys move this;
/// `EthereumConfiguration::contract_address` overrides it.
pub const VAULT_CONTRACT_ADDRESS: &str = "0x388104e955c95bbe3e25b22d1f824b0855ae622a";

/// Display name of the Ethereum ledger on security pegs.
pub const ETHEREUM_LEDGER_NAME: &str = "Ethereum";

/// Logo shown next to Ethereum security pegs.
pub const ETHEREUM_LOGO_FILE: &str = "ethereum-logo.png";

/// Block explorer used for human-facing transaction URLs.
pub const BLOCK_EXPLORER_URL: &str = "http://etherapps.info/block";
