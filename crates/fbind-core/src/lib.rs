#![forbid(unsafe_code)]

//! Core capability model for Frankenbind.
//!
//! A *bindable source* is an externally-owned object that may expose any
//! subset of observer-facing capabilities: authorization queries, a
//! broken-rules collection, busy reporting, generic change notification,
//! and sequence-view indirection. The mirror in `fbind-mirror` probes these
//! capabilities through [`BindableSource`]'s `as_*` accessors and degrades
//! gracefully when one is absent.
//!
//! This crate holds the pieces that both sides of that contract share:
//!
//! - [`Severity`] and [`BrokenRule`]: the validation value records.
//! - [`Notifier`] / [`Subscription`]: single-threaded change broadcast with
//!   RAII unsubscription.
//! - [`BindableSource`] and the capability traits.
//! - [`BindingExpr`], [`FacetRegistry`], [`HostControl`]: the binding model
//!   consumed by the resolvers.

pub mod binding;
pub mod notify;
pub mod rule;
pub mod severity;
pub mod source;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testutil;

pub use binding::{BindingExpr, FacetRegistry, HostControl, RelativeMode};
pub use notify::{Notifier, Subscription};
pub use rule::BrokenRule;
pub use severity::Severity;
pub use source::{
    BindableSource, BusyChanged, BusyReporter, ChangeNotifier, PropertyChanged, ReadAuthorizer,
    RuleReporter, SequenceView, SourceRef, WriteAuthorizer, same_source,
};
