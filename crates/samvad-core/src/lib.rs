//! Session coordination and business logic for Samvad.
//!
//! This crate defines the "ports" (ledger, auth, catalogue, repository
//! traits) that the infrastructure layer implements, and owns the live
//! session machinery: the per-session serialized actor, its lifecycle
//! coordinator, connection roster, message sequencer, and presence
//! tracker. It depends only on `samvad-types` -- never on `samvad-infra`
//! or any database/IO crate.

pub mod auth;
pub mod catalogue;
pub mod events;
pub mod ledger;
pub mod repository;
pub mod session;
