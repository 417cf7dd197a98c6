//! # CR-02 Secret Store
//!
//! Durable mapping from a commitment to the secret that reveals it.
//!
//! **Subsystem ID:** 02  
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Purpose
//!
//! The ledger records only the committed hash. Without the option and salt a
//! vote can never be revealed, so every secret lives in two places:
//! - a local device cache (fast, advisory status flags)
//! - the shared metadata backend (cross-device, authoritative for existence)
//!
//! The two are merged explicitly by [`SecretStore::reconcile`]; see
//! `application::store` for the merge table.
//!
//! ## Module Structure
//!
//! ```text
//! cr-02-secret-store/
//! ├── domain/          # SecretRecord, VoteRecord, PendingCommit, ReconcileReport
//! ├── ports/           # LocalSecretCache, MetadataStore
//! ├── application/     # SecretStore
//! ├── adapters/        # in-memory and JSON file caches, in-memory backend
//! └── config.rs        # SecretStoreConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{FileLocalCache, InMemoryLocalCache, InMemoryMetadataStore};
pub use application::{PutReceipt, SecretStore};
pub use config::SecretStoreConfig;
pub use domain::{
    PendingCommit, PollFilter, ReconcileReport, SecretConflict, SecretRecord, StoreError,
    VoteRecord,
};
pub use ports::{LocalSecretCache, MetadataStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
