#![forbid(unsafe_code)]

//! The property metastate mirror.
//!
//! [`PropertyMirror`] mirrors, for one bound property, the live metastate
//! of the object that owns it: read/write authorization, busy flag,
//! validity, and the worst broken rule. It stays correct as the binding
//! path re-resolves through sequence-view indirection, multi-segment
//! paths, and templated-parent/data-context indirection, re-pairing its
//! change subscriptions whenever the resolved source identity changes.
//!
//! # Architecture
//!
//! The mirror is a cloneable handle over `Rc<Shared>`; all state lives in
//! one `RefCell` and every mutation happens on the single UI-affine
//! thread. Facet and rule-edit events are queued while the state borrow is
//! held and drained afterwards, so a subscriber's callback may freely read
//! the mirror (or trigger another cycle) without aliasing panics. Source
//! subscriptions are RAII [`Subscription`] guards captured with a `Weak`
//! handle back to the mirror; dropping the guards *is* the detach.
//!
//! # Invariants
//!
//! 1. At most one source is attached; every reattachment drops the old
//!    guards before installing new ones (paired detach/attach).
//! 2. The visible broken-rules collection holds exactly the records the
//!    attached source reports for the trailing path segment, diffed by
//!    reference identity with minimal edits (survivors keep position).
//! 3. `is_valid` ⇔ the visible collection is empty; the worst severity and
//!    its description are published from the minimum-ordinal record, and
//!    cleared when valid.
//! 4. Facet events fire only on real transitions; recomputing with nothing
//!    changed upstream emits nothing.
//! 5. Until [`mark_loaded`](PropertyMirror::mark_loaded), no recomputation
//!    occurs and every facet holds its constructed default.
//!
//! # Failure Modes
//!
//! - Unresolvable path or absent capability: facets fall back to their
//!    permissive defaults (read/write allowed, not busy, valid). Never an
//!    error.
//! - Notifications from a detached source: cannot arrive — detach drops
//!   the subscriptions themselves rather than filtering stale events.

use core::fmt;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use fbind_core::binding::BindingExpr;
use fbind_core::notify::{Notifier, Subscription};
use fbind_core::rule::BrokenRule;
use fbind_core::severity::Severity;
use fbind_core::source::{BusyChanged, PropertyChanged, SourceRef, same_source};

use crate::path::{leaf, relative_path, resolve_source};
use crate::relative::parse_relative_binding;

/// Identifies one observable facet of the mirror.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Facet {
    /// Read authorization for the bound property.
    CanRead,
    /// Write authorization for the bound property.
    CanWrite,
    /// Whether the bound property has an asynchronous operation in flight.
    IsBusy,
    /// Whether the bound property has no broken rules.
    IsValid,
    /// Severity of the worst broken rule.
    RuleSeverity,
    /// Description of the worst broken rule.
    RuleDescription,
}

/// One edit to the visible broken-rules collection.
#[derive(Clone, Debug)]
pub enum RuleEdit {
    /// A record entered the visible set.
    Added(Rc<BrokenRule>),
    /// A record left the visible set.
    Removed(Rc<BrokenRule>),
    /// The whole set was dropped because the attached source has no
    /// broken-rules capability.
    Cleared,
}

enum Pending {
    Facet(Facet),
    Rule(RuleEdit),
}

/// Subscriptions held against the attached source. Dropping them is the
/// detach; a source lacking a capability simply never had a guard.
#[derive(Default)]
struct SourceHooks {
    property_changed: Option<Subscription>,
    busy_changed: Option<Subscription>,
}

/// Watch on an intermediate object during data-context indirection: when
/// `segment` changes on `source`, resolution is re-triggered.
struct OverrideWatch {
    _source: SourceRef,
    _segment: String,
    _changes: Option<Subscription>,
}

struct MirrorState {
    loading: bool,
    binding: Option<BindingExpr>,
    relative_binding: Option<BindingExpr>,
    override_watch: Option<OverrideWatch>,
    /// Trimmed to the trailing segment once the terminal source is located.
    binding_path: String,
    source: Option<SourceRef>,
    hooks: SourceHooks,
    can_read: bool,
    can_write: bool,
    is_busy: bool,
    is_valid: bool,
    worst_severity: Option<Severity>,
    rule_description: String,
    broken_rules: Vec<Rc<BrokenRule>>,
    pending: VecDeque<Pending>,
}

impl MirrorState {
    fn new() -> Self {
        Self {
            loading: true,
            binding: None,
            relative_binding: None,
            override_watch: None,
            binding_path: String::new(),
            source: None,
            hooks: SourceHooks::default(),
            can_read: true,
            can_write: true,
            is_busy: false,
            is_valid: true,
            worst_severity: None,
            rule_description: String::new(),
            broken_rules: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn set_can_read(&mut self, value: bool) {
        if value != self.can_read {
            self.can_read = value;
            self.pending.push_back(Pending::Facet(Facet::CanRead));
        }
    }

    fn set_can_write(&mut self, value: bool) {
        if value != self.can_write {
            self.can_write = value;
            self.pending.push_back(Pending::Facet(Facet::CanWrite));
        }
    }

    fn set_is_busy(&mut self, value: bool) {
        if value != self.is_busy {
            self.is_busy = value;
            self.pending.push_back(Pending::Facet(Facet::IsBusy));
        }
    }

    fn set_is_valid(&mut self, value: bool) {
        if value != self.is_valid {
            self.is_valid = value;
            self.pending.push_back(Pending::Facet(Facet::IsValid));
        }
    }

    fn set_worst_severity(&mut self, value: Option<Severity>) {
        if value != self.worst_severity {
            self.worst_severity = value;
            self.pending.push_back(Pending::Facet(Facet::RuleSeverity));
        }
    }

    fn set_rule_description(&mut self, value: String) {
        if value != self.rule_description {
            self.rule_description = value;
            self.pending
                .push_back(Pending::Facet(Facet::RuleDescription));
        }
    }
}

struct Shared {
    state: RefCell<MirrorState>,
    facet_events: Notifier<Facet>,
    rule_events: Notifier<RuleEdit>,
}

/// Cloneable handle to one property metastate mirror.
#[derive(Clone)]
pub struct PropertyMirror {
    shared: Rc<Shared>,
}

impl PropertyMirror {
    /// Create a mirror in its first-load window: facets hold their
    /// defaults and no recomputation happens until
    /// [`mark_loaded`](Self::mark_loaded).
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(MirrorState::new()),
                facet_events: Notifier::new(),
                rule_events: Notifier::new(),
            }),
        }
    }

    /// Create a mirror that is already loaded (test convenience).
    #[must_use]
    pub fn new_loaded() -> Self {
        let mirror = Self::new();
        mirror.mark_loaded();
        mirror
    }

    /// End the first-load window and recompute against whatever binding is
    /// configured. Idempotent.
    pub fn mark_loaded(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            if !state.loading {
                return;
            }
            state.loading = false;
            self.update_state(&mut state);
        }
        self.drain();
    }

    /// Whether the first-load window has ended.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !self.shared.state.borrow().loading
    }

    /// Configure the binding and run a resolution cycle.
    pub fn set_binding(&self, expr: BindingExpr) {
        self.shared.state.borrow_mut().binding = Some(expr);
        self.resolve_cycle();
    }

    /// Re-run the resolution cycle; the external binding-path-changed
    /// signal (source swapped, path string changed, data context changed).
    pub fn refresh(&self) {
        self.resolve_cycle();
    }

    // ── Facet getters ───────────────────────────────────────────────

    /// Read authorization for the bound property.
    #[must_use]
    pub fn can_read(&self) -> bool {
        self.shared.state.borrow().can_read
    }

    /// Write authorization for the bound property.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.shared.state.borrow().can_write
    }

    /// Whether the bound property has an asynchronous operation in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.shared.state.borrow().is_busy
    }

    /// Whether the bound property has no broken rules.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.shared.state.borrow().is_valid
    }

    /// Severity of the worst visible broken rule; `None` when valid.
    #[must_use]
    pub fn worst_severity(&self) -> Option<Severity> {
        self.shared.state.borrow().worst_severity
    }

    /// Description of the worst visible broken rule; empty when valid.
    #[must_use]
    pub fn rule_description(&self) -> String {
        self.shared.state.borrow().rule_description.clone()
    }

    /// The visible broken rules, in stable (minimal-edit) order.
    #[must_use]
    pub fn broken_rules(&self) -> Vec<Rc<BrokenRule>> {
        self.shared.state.borrow().broken_rules.clone()
    }

    /// The trailing path segment used for direct lookups, once resolved.
    #[must_use]
    pub fn binding_path(&self) -> String {
        self.shared.state.borrow().binding_path.clone()
    }

    /// The currently attached source, if any.
    #[must_use]
    pub fn attached_source(&self) -> Option<SourceRef> {
        self.shared.state.borrow().source.clone()
    }

    // ── Output subscriptions ────────────────────────────────────────

    /// Subscribe to facet transitions. Events fire only when a facet's
    /// value actually changed.
    pub fn subscribe_facets(&self, callback: impl Fn(&Facet) + 'static) -> Subscription {
        self.shared.facet_events.subscribe(callback)
    }

    /// Subscribe to visible broken-rule collection edits.
    pub fn subscribe_rules(&self, callback: impl Fn(&RuleEdit) + 'static) -> Subscription {
        self.shared.rule_events.subscribe(callback)
    }

    // ── Resolution cycle ────────────────────────────────────────────

    fn resolve_cycle(&self) {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("resolve_cycle").entered();
        {
            let mut state = self.shared.state.borrow_mut();
            let Some(expr) = state.binding.clone() else {
                return;
            };
            self.run_set_source(&mut state, &expr);
        }
        self.drain();
    }

    /// One full resolution pass: locate the terminal source, handle
    /// data-context indirection, trim the path, and re-pair subscriptions
    /// when the source identity changed.
    fn run_set_source(&self, state: &mut MirrorState, expr: &BindingExpr) {
        let mut data_loaded = true;
        state.binding_path = expr.path.clone();
        let mut new_source = resolve_source(expr.source.as_ref(), &state.binding_path);

        // Re-evaluated from scratch every cycle.
        state.override_watch = None;

        if let Some(candidate) = new_source.clone() {
            if let Some(control) = candidate.as_host_control() {
                // The path landed on a visual element, not a data object:
                // go through the control's data context instead.
                let data = control.data_context();
                if let Some(rel) = parse_relative_binding(expr) {
                    state.binding_path = rel.path.clone();
                    if data.is_some() && state.relative_binding.is_none() {
                        state.relative_binding = Some(rel);
                    }
                }
                new_source = resolve_source(data.as_ref(), &state.binding_path);

                if let Some(intermediate) = new_source.clone() {
                    if state.binding_path.contains('.') {
                        if let Some(first) =
                            relative_path(Some(&intermediate), &state.binding_path)
                        {
                            if first != leaf(&state.binding_path) {
                                // The graph is deeper than what resolved so
                                // far: watch the intermediate object and stay
                                // dormant until the real source is known.
                                state.override_watch =
                                    Some(self.install_override_watch(intermediate, first));
                                data_loaded = false;
                            }
                        }
                    }
                }
            }
        }

        // All later lookups use the trailing segment only.
        if let Some(i) = state.binding_path.rfind('.') {
            state.binding_path = state.binding_path[i + 1..].to_owned();
        }

        if data_loaded {
            if !same_source(state.source.as_ref(), new_source.as_ref()) {
                state.source = new_source;
                self.swap_source_hooks(state);
            }
            self.update_state(state);
        }
    }

    fn install_override_watch(&self, intermediate: SourceRef, segment: String) -> OverrideWatch {
        let changes = intermediate.as_change_notifier().map(|notifier| {
            let weak = Rc::downgrade(&self.shared);
            let watched = segment.clone();
            notifier.property_events().subscribe(move |event| {
                let applies = match &event.property {
                    None => true,
                    Some(name) => name.is_empty() || *name == watched,
                };
                if applies {
                    if let Some(shared) = weak.upgrade() {
                        PropertyMirror { shared }.refresh();
                    }
                }
            })
        });
        OverrideWatch {
            _source: intermediate,
            _segment: segment,
            _changes: changes,
        }
    }

    /// Drop the old source's guards and install guards on the new one;
    /// seeds the busy facet from the new source before the aggregator pass.
    fn swap_source_hooks(&self, state: &mut MirrorState) {
        state.hooks = SourceHooks::default();
        let Some(source) = state.source.clone() else {
            return;
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(path = %state.binding_path, "source attached");

        if let Some(notifier) = source.as_change_notifier() {
            let weak = Rc::downgrade(&self.shared);
            state.hooks.property_changed =
                Some(notifier.property_events().subscribe(move |event| {
                    if let Some(shared) = weak.upgrade() {
                        PropertyMirror { shared }.on_property_changed(event);
                    }
                }));
        }
        if let Some(busy) = source.as_busy_reporter() {
            let weak = Rc::downgrade(&self.shared);
            state.hooks.busy_changed = Some(busy.busy_events().subscribe(move |event| {
                if let Some(shared) = weak.upgrade() {
                    PropertyMirror { shared }.on_busy_changed(event);
                }
            }));
            let seeded = busy.is_property_busy(&state.binding_path);
            state.set_is_busy(seeded);
        }
    }

    // ── Source event re-entry ───────────────────────────────────────

    fn on_property_changed(&self, event: &PropertyChanged) {
        {
            let mut state = self.shared.state.borrow_mut();
            if event_applies(&event.property, &state.binding_path) {
                self.update_state(&mut state);
            }
        }
        self.drain();
    }

    fn on_busy_changed(&self, event: &BusyChanged) {
        {
            let mut state = self.shared.state.borrow_mut();
            if event_applies(&event.property, &state.binding_path) {
                // A collection-level busy event may not apply to this exact
                // property; re-query rather than trusting the event's flag.
                let source = state.source.clone();
                let busy = match source.as_ref().and_then(|s| s.as_busy_reporter()) {
                    Some(reporter) => reporter.is_property_busy(&state.binding_path),
                    None => event.busy,
                };
                if busy != state.is_busy {
                    state.set_is_busy(busy);
                    self.update_state(&mut state);
                }
            }
        }
        self.drain();
    }

    // ── Metastate aggregation ───────────────────────────────────────

    /// Recompute every facet from the attached source. Sole writer of the
    /// authorization/validity facets and the visible rules collection.
    /// Idempotent; a no-op while loading, sourceless, or pathless.
    fn update_state(&self, state: &mut MirrorState) {
        if state.loading {
            return;
        }
        let Some(source) = state.source.clone() else {
            return;
        };
        if state.binding_path.is_empty() {
            return;
        }

        if let Some(auth) = source.as_write_authorizer() {
            let allowed = auth.can_write_property(&state.binding_path);
            state.set_can_write(allowed);
        }
        if let Some(auth) = source.as_read_authorizer() {
            let allowed = auth.can_read_property(&state.binding_path);
            state.set_can_read(allowed);
        }

        if let Some(reporter) = source.as_rule_reporter() {
            let matching: Vec<Rc<BrokenRule>> = reporter
                .broken_rules()
                .into_iter()
                .filter(|rule| rule.property == state.binding_path)
                .collect();

            let to_remove: Vec<Rc<BrokenRule>> = state
                .broken_rules
                .iter()
                .filter(|held| !matching.iter().any(|r| BrokenRule::same(r, held)))
                .cloned()
                .collect();
            let to_add: Vec<Rc<BrokenRule>> = matching
                .iter()
                .filter(|r| !state.broken_rules.iter().any(|held| BrokenRule::same(held, r)))
                .cloned()
                .collect();

            for rule in to_remove {
                state.broken_rules.retain(|held| !BrokenRule::same(held, &rule));
                state.pending.push_back(Pending::Rule(RuleEdit::Removed(rule)));
            }
            for rule in to_add {
                state.broken_rules.push(Rc::clone(&rule));
                state.pending.push_back(Pending::Rule(RuleEdit::Added(rule)));
            }

            let valid = state.broken_rules.is_empty();
            state.set_is_valid(valid);
            if valid {
                state.set_worst_severity(None);
                state.set_rule_description(String::new());
            } else {
                let worst = state
                    .broken_rules
                    .iter()
                    .min_by_key(|rule| rule.severity.ordinal())
                    .cloned();
                match worst {
                    Some(rule) => {
                        state.set_worst_severity(Some(rule.severity));
                        state.set_rule_description(rule.description.clone());
                    }
                    // Unreachable when invalid; clear rather than go stale.
                    None => state.set_rule_description(String::new()),
                }
            }
        } else {
            // Nothing to invalidate against.
            if !state.broken_rules.is_empty() {
                state.broken_rules.clear();
                state.pending.push_back(Pending::Rule(RuleEdit::Cleared));
            }
            state.set_worst_severity(None);
            state.set_rule_description(String::new());
            state.set_is_valid(true);
        }
    }

    /// Deliver queued events with the state borrow released, so callbacks
    /// may re-read the mirror.
    fn drain(&self) {
        loop {
            let next = self.shared.state.borrow_mut().pending.pop_front();
            match next {
                Some(Pending::Facet(facet)) => self.shared.facet_events.emit(&facet),
                Some(Pending::Rule(edit)) => self.shared.rule_events.emit(&edit),
                None => break,
            }
        }
    }
}

fn event_applies(property: &Option<String>, binding_path: &str) -> bool {
    match property {
        None => true,
        Some(name) => name.is_empty() || name == binding_path,
    }
}

impl Default for PropertyMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("PropertyMirror")
            .field("loading", &state.loading)
            .field("binding_path", &state.binding_path)
            .field("attached", &state.source.is_some())
            .field("hooked", &state.hooks.property_changed.is_some())
            .field("busy_hooked", &state.hooks.busy_changed.is_some())
            .field("dormant", &state.override_watch.is_some())
            .field("can_read", &state.can_read)
            .field("can_write", &state.can_write)
            .field("is_busy", &state.is_busy)
            .field("is_valid", &state.is_valid)
            .field("broken_rules", &state.broken_rules.len())
            .finish()
    }
}
