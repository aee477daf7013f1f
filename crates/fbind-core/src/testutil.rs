#![forbid(unsafe_code)]

//! Configurable test doubles for exercising observers of the capability
//! surface. Available to dependent crates through the `test-helpers`
//! feature.
//!
//! [`StubSource`] advertises exactly the capabilities named in its
//! [`Caps`] flags; everything it reports (children, rules, busy set,
//! denied reads/writes, current item) is interior-mutable so a test can
//! rewire the graph mid-scenario and then raise the matching event.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::binding::{FacetRegistry, HostControl};
use crate::notify::Notifier;
use crate::rule::BrokenRule;
use crate::source::{
    BindableSource, BusyChanged, BusyReporter, ChangeNotifier, PropertyChanged, ReadAuthorizer,
    RuleReporter, SequenceView, SourceRef, WriteAuthorizer,
};

bitflags::bitflags! {
    /// Capabilities a [`StubSource`] advertises.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Caps: u8 {
        const READ_AUTH  = 1 << 0;
        const WRITE_AUTH = 1 << 1;
        const RULES      = 1 << 2;
        const BUSY       = 1 << 3;
        const CHANGES    = 1 << 4;
        const VIEW       = 1 << 5;
    }
}

/// A bindable source whose capabilities and reported state are scripted.
pub struct StubSource {
    caps: Caps,
    children: RefCell<AHashMap<String, SourceRef>>,
    leaves: RefCell<AHashSet<String>>,
    rules: RefCell<Vec<Rc<BrokenRule>>>,
    busy: RefCell<AHashSet<String>>,
    denied_reads: RefCell<AHashSet<String>>,
    denied_writes: RefCell<AHashSet<String>>,
    current: RefCell<Option<SourceRef>>,
    property_changes: Notifier<PropertyChanged>,
    busy_changes: Notifier<BusyChanged>,
}

impl StubSource {
    /// A stub advertising exactly `caps`.
    #[must_use]
    pub fn new(caps: Caps) -> Rc<Self> {
        Rc::new(Self {
            caps,
            children: RefCell::new(AHashMap::new()),
            leaves: RefCell::new(AHashSet::new()),
            rules: RefCell::new(Vec::new()),
            busy: RefCell::new(AHashSet::new()),
            denied_reads: RefCell::new(AHashSet::new()),
            denied_writes: RefCell::new(AHashSet::new()),
            current: RefCell::new(None),
            property_changes: Notifier::new(),
            busy_changes: Notifier::new(),
        })
    }

    /// Fully-capable business-object stand-in (everything but `VIEW`).
    #[must_use]
    pub fn business() -> Rc<Self> {
        Self::new(
            Caps::READ_AUTH | Caps::WRITE_AUTH | Caps::RULES | Caps::BUSY | Caps::CHANGES,
        )
    }

    /// A plain object with no capabilities at all.
    #[must_use]
    pub fn bare() -> Rc<Self> {
        Self::new(Caps::empty())
    }

    /// A sequence view whose current item is `item`.
    #[must_use]
    pub fn view_over(item: Option<SourceRef>) -> Rc<Self> {
        let view = Self::new(Caps::VIEW);
        *view.current.borrow_mut() = item;
        view
    }

    /// Declare a property whose value is itself a bindable object.
    pub fn add_child(&self, name: impl Into<String>, child: SourceRef) {
        self.children.borrow_mut().insert(name.into(), child);
    }

    /// Remove a previously-declared child, keeping the property declared
    /// but unreachable (a null-valued intermediate object).
    pub fn clear_child(&self, name: &str) {
        let name = name.to_owned();
        self.children.borrow_mut().remove(&name);
        self.leaves.borrow_mut().insert(name);
    }

    /// Declare a leaf (non-object) property.
    pub fn add_leaf(&self, name: impl Into<String>) {
        self.leaves.borrow_mut().insert(name.into());
    }

    /// Replace the broken-rules collection.
    pub fn set_rules(&self, rules: Vec<Rc<BrokenRule>>) {
        *self.rules.borrow_mut() = rules;
    }

    /// Append one broken rule.
    pub fn push_rule(&self, rule: Rc<BrokenRule>) {
        self.rules.borrow_mut().push(rule);
    }

    /// Mark `property` as denied for reads.
    pub fn deny_read(&self, property: impl Into<String>) {
        self.denied_reads.borrow_mut().insert(property.into());
    }

    /// Mark `property` as denied for writes.
    pub fn deny_write(&self, property: impl Into<String>) {
        self.denied_writes.borrow_mut().insert(property.into());
    }

    /// Set the queryable busy state of `property` (no event).
    pub fn set_busy(&self, property: impl Into<String>, busy: bool) {
        let property = property.into();
        let mut set = self.busy.borrow_mut();
        if busy {
            set.insert(property);
        } else {
            set.remove(&property);
        }
    }

    /// Replace the sequence view's current item.
    pub fn set_current(&self, item: Option<SourceRef>) {
        *self.current.borrow_mut() = item;
    }

    /// Raise a property-changed event (`None` = all properties).
    pub fn emit_changed(&self, property: Option<&str>) {
        self.property_changes.emit(&PropertyChanged {
            property: property.map(str::to_owned),
        });
    }

    /// Raise a busy-changed event with an arbitrary flag. The flag may
    /// deliberately disagree with [`set_busy`](Self::set_busy) state to
    /// model collection-level busy events.
    pub fn emit_busy(&self, property: Option<&str>, busy: bool) {
        self.busy_changes.emit(&BusyChanged {
            property: property.map(str::to_owned),
            busy,
        });
    }

    /// Live property-changed subscriptions (attach/detach observability).
    #[must_use]
    pub fn property_subscriber_count(&self) -> usize {
        self.property_changes.subscriber_count()
    }

    /// Live busy-changed subscriptions.
    #[must_use]
    pub fn busy_subscriber_count(&self) -> usize {
        self.busy_changes.subscriber_count()
    }
}

impl ReadAuthorizer for StubSource {
    fn can_read_property(&self, property: &str) -> bool {
        !self.denied_reads.borrow().contains(property)
    }
}

impl WriteAuthorizer for StubSource {
    fn can_write_property(&self, property: &str) -> bool {
        !self.denied_writes.borrow().contains(property)
    }
}

impl RuleReporter for StubSource {
    fn broken_rules(&self) -> Vec<Rc<BrokenRule>> {
        self.rules.borrow().clone()
    }
}

impl BusyReporter for StubSource {
    fn is_property_busy(&self, property: &str) -> bool {
        self.busy.borrow().contains(property)
    }

    fn busy_events(&self) -> &Notifier<BusyChanged> {
        &self.busy_changes
    }
}

impl ChangeNotifier for StubSource {
    fn property_events(&self) -> &Notifier<PropertyChanged> {
        &self.property_changes
    }
}

impl SequenceView for StubSource {
    fn current_item(&self) -> Option<SourceRef> {
        self.current.borrow().clone()
    }
}

impl BindableSource for StubSource {
    fn as_read_authorizer(&self) -> Option<&dyn ReadAuthorizer> {
        self.caps
            .contains(Caps::READ_AUTH)
            .then_some(self as &dyn ReadAuthorizer)
    }

    fn as_write_authorizer(&self) -> Option<&dyn WriteAuthorizer> {
        self.caps
            .contains(Caps::WRITE_AUTH)
            .then_some(self as &dyn WriteAuthorizer)
    }

    fn as_rule_reporter(&self) -> Option<&dyn RuleReporter> {
        self.caps
            .contains(Caps::RULES)
            .then_some(self as &dyn RuleReporter)
    }

    fn as_busy_reporter(&self) -> Option<&dyn BusyReporter> {
        self.caps
            .contains(Caps::BUSY)
            .then_some(self as &dyn BusyReporter)
    }

    fn as_change_notifier(&self) -> Option<&dyn ChangeNotifier> {
        self.caps
            .contains(Caps::CHANGES)
            .then_some(self as &dyn ChangeNotifier)
    }

    fn as_sequence_view(&self) -> Option<&dyn SequenceView> {
        self.caps
            .contains(Caps::VIEW)
            .then_some(self as &dyn SequenceView)
    }

    fn has_property(&self, name: &str) -> bool {
        self.children.borrow().contains_key(name) || self.leaves.borrow().contains(name)
    }

    fn child(&self, name: &str) -> Option<SourceRef> {
        self.children.borrow().get(name).cloned()
    }
}

/// A hosting control with a scripted facet registry and data context.
pub struct StubControl {
    facets: FacetRegistry,
    context: RefCell<Option<SourceRef>>,
}

impl StubControl {
    /// A control exposing `facets`, with no data context yet.
    #[must_use]
    pub fn new(facets: FacetRegistry) -> Rc<Self> {
        Rc::new(Self {
            facets,
            context: RefCell::new(None),
        })
    }

    /// Replace the control's inherited data context.
    pub fn set_context(&self, context: Option<SourceRef>) {
        *self.context.borrow_mut() = context;
    }
}

impl HostControl for StubControl {
    fn data_context(&self) -> Option<SourceRef> {
        self.context.borrow().clone()
    }

    fn facets(&self) -> &FacetRegistry {
        &self.facets
    }
}

impl BindableSource for StubControl {
    fn as_host_control(&self) -> Option<&dyn HostControl> {
        Some(self)
    }
}
