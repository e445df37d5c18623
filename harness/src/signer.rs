//! Test signers: fixed key sets standing in for the participants' wallets.
//!
//! Key material comes from outside — the harness derives nothing. These
//! types only organize a signer's exported keys into the spending-policy
//! shapes the functional tests exercise.

use std::collections::BTreeMap;

use stockade_policy::{PolicyError, SpendingPolicy, ThresholdClause, TimelockClause, XPub};

/// One participant holding a primary key and a recovery key.
#[derive(Debug, Clone)]
pub struct SingleSigner {
    primary: XPub,
    recovery: XPub,
}

impl SingleSigner {
    #[must_use]
    pub fn new(primary: XPub, recovery: XPub) -> Self {
        Self { primary, recovery }
    }

    #[must_use]
    pub fn primary(&self) -> &XPub {
        &self.primary
    }

    #[must_use]
    pub fn recovery(&self) -> &XPub {
        &self.recovery
    }

    /// 1-of-1 primary, 1-of-1 recovery after `csv_value` blocks.
    pub fn policy(&self, csv_value: u32) -> Result<SpendingPolicy, PolicyError> {
        let primary = ThresholdClause::new(1, vec![self.primary.clone()])?;
        let recovery = TimelockClause::new(
            ThresholdClause::new(1, vec![self.recovery.clone()])?,
            csv_value,
        );
        SpendingPolicy::new(primary, vec![recovery])
    }
}

/// A signer set: N primary participants plus per-delay recovery sets.
#[derive(Debug, Clone)]
pub struct MultiSigner {
    primary: Vec<XPub>,
    recovery: BTreeMap<u32, Vec<XPub>>,
}

impl MultiSigner {
    #[must_use]
    pub fn new(primary: Vec<XPub>, recovery: BTreeMap<u32, Vec<XPub>>) -> Self {
        Self { primary, recovery }
    }

    #[must_use]
    pub fn primary_keys(&self) -> &[XPub] {
        &self.primary
    }

    #[must_use]
    pub fn recovery_keys(&self, csv_value: u32) -> Option<&[XPub]> {
        self.recovery.get(&csv_value).map(Vec::as_slice)
    }

    /// Build "primary_threshold-of-N degrading to each `(delay, threshold)`
    /// in turn". Delays must name a recovery set this signer holds and must
    /// be given in ascending order.
    pub fn policy(
        &self,
        primary_threshold: usize,
        recovery_thresholds: &[(u32, usize)],
    ) -> Result<SpendingPolicy, PolicyError> {
        let primary = ThresholdClause::new(primary_threshold, self.primary.clone())?;
        let mut chain = Vec::with_capacity(recovery_thresholds.len());
        for &(csv_value, threshold) in recovery_thresholds {
            // An unknown delay yields an empty key set and fails as such.
            let keys = self.recovery.get(&csv_value).cloned().unwrap_or_default();
            chain.push(TimelockClause::new(
                ThresholdClause::new(threshold, keys)?,
                csv_value,
            ));
        }
        SpendingPolicy::new(primary, chain)
    }
}
