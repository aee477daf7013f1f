#![forbid(unsafe_code)]

//! Broken-rule severity levels.
//!
//! Severities order worst-first: `Error < Warning < Information`, so the
//! "worst" record of a non-empty set is the minimum. [`Severity::ordinal`]
//! exposes the same ordering as a number for callers that sort externally.

use core::fmt;

/// Severity of a [`BrokenRule`](crate::BrokenRule).
///
/// The derived `Ord` follows declaration order, so `Severity::Error` is the
/// minimum and therefore the worst.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// The rule violation blocks the object from being saved.
    Error,
    /// The violation is suspect but does not block.
    Warning,
    /// Purely informational.
    Information,
}

impl Severity {
    /// Ordinal position; lower is worse (`Error` is 0).
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Information => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
        };
        f.write_str(name)
    }
}
