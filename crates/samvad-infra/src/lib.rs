//! Infrastructure implementations for Samvad.
//!
//! SQLite-backed repositories, the wallet ledger, the provider rate
//! catalogue, token authentication, and configuration loading. This crate
//! implements the ports defined in `samvad-core`.

pub mod config;
pub mod sqlite;
