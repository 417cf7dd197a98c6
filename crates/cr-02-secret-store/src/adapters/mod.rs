//! # Adapters
//!
//! | Adapter | Port | Backing |
//! |---------|------|---------|
//! | `InMemoryLocalCache` | `LocalSecretCache` | process memory |
//! | `FileLocalCache` | `LocalSecretCache` | JSON snapshot on disk |
//! | `InMemoryMetadataStore` | `MetadataStore` | process memory, fault injection |

pub mod file_cache;
pub mod local_cache;
pub mod metadata_store;

pub use file_cache::FileLocalCache;
pub use local_cache::InMemoryLocalCache;
pub use metadata_store::InMemoryMetadataStore;
