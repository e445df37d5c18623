//! Threshold and timelock clauses composing a spending policy.

use crate::PolicyError;
use crate::key::XPub;

/// "At least `threshold` of these signers."
#[derive(Debug, Clone)]
pub struct ThresholdClause {
    threshold: usize,
    keys: Vec<XPub>,
}

impl ThresholdClause {
    pub fn new(threshold: usize, keys: Vec<XPub>) -> Result<Self, PolicyError> {
        if keys.is_empty() {
            return Err(PolicyError::EmptyKeySet);
        }
        if threshold == 0 || threshold > keys.len() {
            return Err(PolicyError::ThresholdOutOfRange {
                threshold,
                keys: keys.len(),
            });
        }
        Ok(Self { threshold, keys })
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn keys(&self) -> &[XPub] {
        &self.keys
    }

    /// A 1-of-1 clause renders as a single-key spend rather than `multi`.
    pub(crate) fn is_single_key(&self) -> bool {
        self.threshold == 1 && self.keys.len() == 1
    }
}

/// A threshold clause that only becomes spendable `relative_delay` blocks
/// after the funding transaction confirmed.
#[derive(Debug, Clone)]
pub struct TimelockClause {
    clause: ThresholdClause,
    relative_delay: u32,
}

impl TimelockClause {
    #[must_use]
    pub fn new(clause: ThresholdClause, relative_delay: u32) -> Self {
        Self {
            clause,
            relative_delay,
        }
    }

    #[must_use]
    pub fn clause(&self) -> &ThresholdClause {
        &self.clause
    }

    #[must_use]
    pub fn relative_delay(&self) -> u32 {
        self.relative_delay
    }
}

/// A primary authorization path plus a chain of ever-more-delayed recovery
/// paths.
///
/// The primary clause carries no delay — that is encoded in the type, not a
/// zero field. The recovery chain is validated to be strictly ascending by
/// delay, which also rules out a zero delay in first position: each later
/// clause is only reachable once the earlier ones have expired.
#[derive(Debug, Clone)]
pub struct SpendingPolicy {
    primary: ThresholdClause,
    recovery_chain: Vec<TimelockClause>,
}

impl SpendingPolicy {
    pub fn new(
        primary: ThresholdClause,
        recovery_chain: Vec<TimelockClause>,
    ) -> Result<Self, PolicyError> {
        let mut previous = 0u32;
        for clause in &recovery_chain {
            if clause.relative_delay() <= previous {
                return Err(PolicyError::UnorderedRecoveryChain {
                    previous,
                    delay: clause.relative_delay(),
                });
            }
            previous = clause.relative_delay();
        }
        Ok(Self {
            primary,
            recovery_chain,
        })
    }

    #[must_use]
    pub fn primary(&self) -> &ThresholdClause {
        &self.primary
    }

    #[must_use]
    pub fn recovery_chain(&self) -> &[TimelockClause] {
        &self.recovery_chain
    }
}
