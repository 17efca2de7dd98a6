//! Cinder lifecycle core
//!
//! A consumption-gated document vault: a sender encrypts a document and
//! hands the recipient a single opaque locator; the document can be
//! decrypted a bounded number of times before it is irrecoverably
//! destroyed. The hard part is not the encryption primitive but the
//! lifecycle - an atomic remaining-uses counter, optional one-time
//! secret gating, and destruction that tolerates concurrent consumers
//! and crashes.
//!
//! The surrounding UI/CLI layer calls in through four operations on
//! [`Vault`]:
//!
//! - [`Vault::register`] - encrypt and persist, returning the locator
//!   (and one-time secret, shown exactly once)
//! - [`Vault::inspect`] - read-only eligibility check, never mutates
//! - [`Vault::consume`] - decrypt one use; destroys the document when
//!   the budget is spent
//! - [`Vault::sweep`] - reconciliation pass destroying anything
//!   exhausted but not yet destroyed (crash recovery)
//!
//! # Concurrency
//!
//! The sole correctness-critical synchronization point is the record
//! store's atomic try-consume: under K concurrent consumers of one
//! locator, exactly `max_uses` succeed regardless of interleaving.
//! Every destruction step is an idempotent delete, so consume, sweep
//! and crash recovery can overlap freely.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod vault;

pub use error::VaultError;
pub use vault::{
    ConsumedDocument, InspectReport, RegisterRequest, Registration, SweepReport, Vault,
    VaultConfig,
};
