//! # Reconciliation Engine Test Suite
//!
//! Cross-subsystem tests. Unit tests live next to the code in each crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # TestEngine: every subsystem over the in-memory ledger
//! └── integration/
//!     ├── scenarios.rs   # End-to-end commit/reveal/resolve/claim scenarios
//!     ├── automation.rs  # Scheduler sweeps
//!     └── properties.rs  # Idempotence, monotonicity, reconciliation convergence
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cr-tests
//! cargo test -p cr-tests integration::properties::
//! ```

pub mod fixtures;
pub mod integration;
