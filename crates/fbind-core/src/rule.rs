#![forbid(unsafe_code)]

//! Broken-rule records.
//!
//! A [`BrokenRule`] is minted once by the rule engine and shared by
//! reference while the violation persists. *Identity* — not structural
//! equality — decides whether two records are the same still-broken rule:
//! the mirror diffs its visible collection with [`BrokenRule::same`]
//! (`Rc` pointer equality), which correctly distinguishes "the same rule,
//! still broken" from "a new rule with identical text".
//!
//! Structural `PartialEq` is also derived, but only for test assertions;
//! nothing in the diffing path uses it.

use std::rc::Rc;

use crate::severity::Severity;

/// One currently-active validation failure for a specific property.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrokenRule {
    /// Name of the property the rule is attached to.
    pub property: String,
    /// Human-readable description of the failure.
    pub description: String,
    /// How bad the failure is.
    pub severity: Severity,
    /// Name of the rule that produced this record.
    pub rule_name: String,
}

impl BrokenRule {
    /// Create a new record.
    #[must_use]
    pub fn new(
        property: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        rule_name: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            description: description.into(),
            severity,
            rule_name: rule_name.into(),
        }
    }

    /// Mint a shared record the way the rule engine does.
    #[must_use]
    pub fn mint(
        property: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        rule_name: impl Into<String>,
    ) -> Rc<Self> {
        Rc::new(Self::new(property, description, severity, rule_name))
    }

    /// Reference identity: the same still-broken rule, not a lookalike.
    #[must_use]
    pub fn same(a: &Rc<BrokenRule>, b: &Rc<BrokenRule>) -> bool {
        Rc::ptr_eq(a, b)
    }
}
