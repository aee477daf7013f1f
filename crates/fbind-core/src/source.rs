#![forbid(unsafe_code)]

//! The bindable-source capability surface.
//!
//! A source object implements zero or more of the capability traits below;
//! observers probe them through [`BindableSource`]'s `as_*` accessors — a
//! safe interface query, never reflection by name. Absence of a capability
//! degrades to a permissive default:
//!
//! | Capability         | Default when absent      |
//! |--------------------|--------------------------|
//! | [`ReadAuthorizer`] | read allowed             |
//! | [`WriteAuthorizer`]| write allowed            |
//! | [`RuleReporter`]   | no broken rules (valid)  |
//! | [`BusyReporter`]   | never busy, no events    |
//! | [`ChangeNotifier`] | no events                |
//! | [`SequenceView`]   | object used as-is        |
//! | [`HostControl`]    | not a visual element     |
//!
//! [`BindableSource`] also carries the graph metadata the path resolver
//! walks: [`has_property`](BindableSource::has_property) is a metadata
//! lookup (it must never attempt the read and swallow a failure), and
//! [`child`](BindableSource::child) returns the object behind a property
//! when that object is itself bindable.
//!
//! Source identity is `Rc` pointer identity; see [`same_source`].

use std::rc::Rc;

use crate::binding::HostControl;
use crate::notify::Notifier;
use crate::rule::BrokenRule;

/// Shared handle to a bindable source.
pub type SourceRef = Rc<dyn BindableSource>;

/// Generic property-change event.
///
/// `property == None` (or an empty name) signals that all properties may
/// have changed.
#[derive(Clone, Debug)]
pub struct PropertyChanged {
    /// The changed property, or `None` for "all properties".
    pub property: Option<String>,
}

/// Busy-state transition reported by a source.
///
/// The flag is a hint: a collection-level busy event may not apply to one
/// specific property, so observers re-query
/// [`BusyReporter::is_property_busy`] rather than trusting it verbatim.
#[derive(Clone, Debug)]
pub struct BusyChanged {
    /// The property the transition applies to, or `None` for the whole object.
    pub property: Option<String>,
    /// The reported busy flag.
    pub busy: bool,
}

/// Read-authorization queries.
pub trait ReadAuthorizer {
    /// Whether the current user may read `property`.
    fn can_read_property(&self, property: &str) -> bool;
}

/// Write-authorization queries.
pub trait WriteAuthorizer {
    /// Whether the current user may write `property`.
    fn can_write_property(&self, property: &str) -> bool;
}

/// Access to the source's full broken-rules collection.
pub trait RuleReporter {
    /// All currently-broken rules, shared by reference with the rule engine.
    fn broken_rules(&self) -> Vec<Rc<BrokenRule>>;
}

/// Fine-grained busy state plus busy-change notification.
pub trait BusyReporter {
    /// Whether `property` has an asynchronous operation in flight.
    fn is_property_busy(&self, property: &str) -> bool;

    /// Busy-transition events.
    fn busy_events(&self) -> &Notifier<BusyChanged>;
}

/// Generic property-change notification.
pub trait ChangeNotifier {
    /// Property-change events.
    fn property_events(&self) -> &Notifier<PropertyChanged>;
}

/// "Current item of a view over a sequence" indirection.
pub trait SequenceView {
    /// The currently-selected element, if any.
    fn current_item(&self) -> Option<SourceRef>;
}

/// An object that can sit in a bound object graph.
///
/// Every method has a degraded default, so implementors opt in to exactly
/// the capabilities they have.
pub trait BindableSource {
    /// Read-authorization capability, when supported.
    fn as_read_authorizer(&self) -> Option<&dyn ReadAuthorizer> {
        None
    }

    /// Write-authorization capability, when supported.
    fn as_write_authorizer(&self) -> Option<&dyn WriteAuthorizer> {
        None
    }

    /// Broken-rules capability, when supported.
    fn as_rule_reporter(&self) -> Option<&dyn RuleReporter> {
        None
    }

    /// Busy-reporting capability, when supported.
    fn as_busy_reporter(&self) -> Option<&dyn BusyReporter> {
        None
    }

    /// Change-notification capability, when supported.
    fn as_change_notifier(&self) -> Option<&dyn ChangeNotifier> {
        None
    }

    /// Sequence-view capability, when this object is a view over a sequence.
    fn as_sequence_view(&self) -> Option<&dyn SequenceView> {
        None
    }

    /// Visual-element capability, when this object is a hosting control
    /// rather than a data object.
    fn as_host_control(&self) -> Option<&dyn HostControl> {
        None
    }

    /// Metadata lookup: does this object declare a property named `name`?
    fn has_property(&self, _name: &str) -> bool {
        false
    }

    /// The object behind property `name`, when it is itself bindable.
    fn child(&self, _name: &str) -> Option<SourceRef> {
        None
    }
}

/// Identity comparison for optional source handles.
///
/// Two `Some` handles are the same source only when they point at the same
/// allocation; structural equality plays no part.
#[must_use]
pub fn same_source(a: Option<&SourceRef>, b: Option<&SourceRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}
