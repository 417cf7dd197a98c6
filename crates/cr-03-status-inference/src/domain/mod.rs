//! # Domain Module
//!
//! Inference results and the evidence behind them.

pub mod inference;

pub use inference::*;
