//! Spending policies and the output descriptors built from them.
//!
//! This crate is pure domain: extended public keys, their fingerprints,
//! threshold/timelock clauses, and the rendering of a [`SpendingPolicy`]
//! into the witness-script descriptor string the wallet daemon is
//! configured with. No IO, no async.
//!
//! Values are validated at construction: holding a [`SpendingPolicy`] is
//! proof that thresholds fit their key sets and recovery delays strictly
//! increase, so descriptor rendering itself cannot fail.

mod descriptor;
mod key;
mod policy;

pub use descriptor::Descriptor;
pub use key::{Fingerprint, XPub};
pub use policy::{SpendingPolicy, ThresholdClause, TimelockClause};

/// Rejections raised while assembling keys, clauses, or policies.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid public key: {0}")]
    InvalidKey(&'static str),
    #[error("clause has no signers")]
    EmptyKeySet,
    #[error("threshold {threshold} out of range for {keys} keys")]
    ThresholdOutOfRange { threshold: usize, keys: usize },
    #[error("recovery delays must strictly increase: got {delay} after {previous}")]
    UnorderedRecoveryChain { previous: u32, delay: u32 },
}
