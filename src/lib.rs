//! ghledger - incremental GitHub contribution ledgers
//!
//! Harvests public contributions of users in a region, merges them into
//! per-repository ledgers, and derives a windowed score and ranks from them.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod github;
pub mod storage;
pub mod sync;

pub use error::{LedgerError, Result};
