//! Output descriptor rendering.
//!
//! Turns a validated [`SpendingPolicy`] into the `wsh(...)` descriptor
//! string the wallet daemon is configured with. The primary path comes
//! first; recovery paths nest right-leaning inside the fallback branch,
//! ordered from least to most delayed, each behind its own relative
//! timelock:
//!
//! ```text
//! wsh(or_d(PRIMARY,
//!          or_i(and_v(v:REC1,older(d1)),
//!               and_v(v:REC2,older(d2)))))
//! ```

use std::fmt;

use crate::key::XPub;
use crate::policy::{SpendingPolicy, ThresholdClause, TimelockClause};

/// Derivation template appended to every key: receiving and change paths
/// plus an index wildcard.
const DERIV_PATHS: &str = "/<0;1>/*";

/// Single-key spend form, which differs by position in the tree.
#[derive(Clone, Copy)]
enum SingleKeyForm {
    /// Primary position: `pk(...)`.
    Pk,
    /// Recovery position, inside `and_v(v:...)`: `pkh(...)`.
    Pkh,
}

/// An immutable output descriptor, built once per test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor(String);

impl Descriptor {
    /// Render `policy` as a witness-script output descriptor.
    ///
    /// Deterministic: identical policies produce byte-identical strings.
    #[must_use]
    pub fn from_policy(policy: &SpendingPolicy) -> Self {
        let primary = threshold_expr(policy.primary(), SingleKeyForm::Pk);
        let expr = match policy.recovery_chain() {
            [] => primary,
            chain => format!("or_d({primary},{})", recovery_expr(chain)),
        };
        Self(format!("wsh({expr})"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `[<fingerprint>]<key>/<0;1>/*`.
///
/// The origin fingerprint is derived from the embedded key itself, not a
/// parent key. That keeps keys distinguishable without carrying real
/// derivation metadata.
fn key_token(key: &XPub) -> String {
    format!("[{}]{}{DERIV_PATHS}", key.fingerprint(), key.encoded())
}

fn threshold_expr(clause: &ThresholdClause, single: SingleKeyForm) -> String {
    if clause.is_single_key() {
        let wrap = match single {
            SingleKeyForm::Pk => "pk",
            SingleKeyForm::Pkh => "pkh",
        };
        return format!("{wrap}({})", key_token(&clause.keys()[0]));
    }
    let mut expr = format!("multi({}", clause.threshold());
    for key in clause.keys() {
        expr.push(',');
        expr.push_str(&key_token(key));
    }
    expr.push(')');
    expr
}

fn timelock_expr(clause: &TimelockClause) -> String {
    format!(
        "and_v(v:{},older({}))",
        threshold_expr(clause.clause(), SingleKeyForm::Pkh),
        clause.relative_delay()
    )
}

/// Right-leaning `or_i` tree over the recovery chain. A single clause is
/// its own leaf; the caller guarantees the chain is non-empty.
fn recovery_expr(chain: &[TimelockClause]) -> String {
    let (head, rest) = chain.split_first().expect("non-empty recovery chain");
    if rest.is_empty() {
        timelock_expr(head)
    } else {
        format!("or_i({},{})", timelock_expr(head), recovery_expr(rest))
    }
}
