//! # AssetChain SDK
//!
//! A Rust SDK for AssetChain: register physical assets, attach images,
//! request expert verification, and anchor proof-of-ownership records
//! ("security pegs") on an Ethereum ledger.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Shared newtypes, domain models, errors, constants
//! 2. **Identity & persistence** — Password identity, encrypted key-value stores
//! 3. **RPC** — JSON-RPC client with per-request retry policies
//! 4. **Ledger** — `LedgerClient` over the AssetVault contract: reads,
//!    fire-and-forget writes with completion watching, peg reconciliation
//! 5. **Asset store** — `AssetStore`, the high-level entry point
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use assetchain_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! let identity = Arc::new(IdentityService::new());
//! identity.logon(Arc::new(PasswordIdentity::new("hunter2")));
//!
//! let config = Configuration::default();
//! let ledger = Arc::new(LedgerClient::new(config.ethereum.clone()));
//! let gateway = Arc::new(GatewayStore::new(&config.gateway.api_url(), identity.clone()));
//! let backend: Arc<dyn KeyValueBackend> = Arc::new(FileBackend::open("assetchain.json")?);
//!
//! let notifications = Arc::new(NotificationStore::new(backend.clone(), identity.clone()));
//! let assets = AssetStore::new(backend, identity, ledger, gateway, notifications);
//!
//! let saved = assets.save(Asset::new("Diamond ring")).await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and the fixed-width contract call codec.
pub mod shared;

/// Domain types: assets, pegs, transfers, verifications, configuration.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network and ledger constants.
pub mod network;

// ── Layer 2: Identity & persistence ──────────────────────────────────────────

/// User identity and symmetric encryption of stored data.
pub mod identity;

/// Local persistence: backends, the encrypted store, derived stores.
pub mod store;

/// Content-addressed binary storage over the gateway API.
pub mod gateway;

// ── Layer 3: RPC ─────────────────────────────────────────────────────────────

/// JSON-RPC client with retry policies.
pub mod rpc;

// ── Layer 4: Ledger ──────────────────────────────────────────────────────────

/// Connection management, contract calls, watching, reconciliation.
pub mod ledger;

// ── Layer 5: Supporting services ─────────────────────────────────────────────

/// Directory of verification experts.
pub mod experts;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{Address, AssetId};

    // Domain types
    pub use crate::domain::asset::{
        Asset, AssetImage, AssetSecurity, ImageLocation, PegAssetRef, PegDetails, SecurityPeg,
    };
    pub use crate::domain::config::{Configuration, EthereumConfiguration, GatewayConfiguration};
    pub use crate::domain::notification::Notification;
    pub use crate::domain::transfer::TransferRequest;
    pub use crate::domain::verification::{
        Verification, VerificationKind, VerificationRequest,
    };

    // Errors
    pub use crate::error::{AbiError, LedgerError, RpcError, SdkError, StorageError};

    // Identity & stores
    pub use crate::gateway::{BinaryStore, GatewayStore};
    pub use crate::identity::{IdentityProvider, IdentityService, PasswordIdentity};
    pub use crate::store::assets::AssetStore;
    pub use crate::store::config::ConfigurationStore;
    pub use crate::store::notifications::NotificationStore;
    pub use crate::store::{EncryptedStore, FileBackend, KeyValueBackend, MemoryBackend};

    // Ledger
    pub use crate::ledger::{
        ConnectionInfo, LedgerClient, LedgerService, TxWatch, WatchConfig, WatchStep,
    };
    pub use crate::rpc::retry::{RetryConfig, RetryPolicy};

    // Experts
    pub use crate::experts::{Expert, ExpertDirectory, ExpertGroup};
}
