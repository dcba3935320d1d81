//! Unified SDK error types.

use crate::shared::AssetId;
use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// JSON-RPC transport and node errors.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// Errors at the ledger boundary.
///
/// The original client collapsed every failure here into a single
/// "not active" boolean; callers that only care about availability can
/// still treat any variant as "skip ledger work", but the kind stays
/// observable.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Not connected to a ledger node")]
    NotConnected,

    #[error("Could not connect to ledger node: {0}")]
    Connect(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error("Transaction not observed within {waited_blocks} blocks")]
    WatchTimedOut { waited_blocks: u64 },

    #[error("Connection was rebound while waiting (generation {started} -> {current})")]
    StaleConnection { started: u64, current: u64 },

    #[error("An operation is already in flight for asset {0}")]
    InFlight(AssetId),

    #[error("Asset has no identifier")]
    MissingAssetId,

    #[error("Verification has no verifier address")]
    MissingVerifier,
}

/// Fixed-width contract call encoding errors.
#[derive(Error, Debug)]
pub enum AbiError {
    #[error("Value '{value}' exceeds the {max}-byte field width")]
    ValueTooLong { value: String, max: usize },

    #[error("Invalid hex in response: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Response too short: expected {expected} words, got {got}")]
    ShortResponse { expected: usize, got: usize },

    #[error("Malformed word: {0}")]
    InvalidWord(String),
}

/// Local and gateway persistence errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Stored data could not be decrypted")]
    Decrypt,

    #[error("Stored data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
