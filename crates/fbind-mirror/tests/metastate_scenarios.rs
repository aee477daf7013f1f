//! End-to-end metastate mirroring scenarios: dotted paths, sequence views,
//! templated-parent redirection, and data-context indirection.

use std::rc::Rc;

use fbind_core::binding::{BindingExpr, FacetRegistry};
use fbind_core::source::SourceRef;
use fbind_core::testutil::{StubControl, StubSource};
use fbind_core::{BrokenRule, Severity, same_source};
use fbind_mirror::{Facet, PropertyMirror};

fn as_ref(stub: &Rc<StubSource>) -> SourceRef {
    Rc::clone(stub) as SourceRef
}

fn rule(property: &str, description: &str, severity: Severity) -> Rc<BrokenRule> {
    BrokenRule::mint(property, description, severity, "ScenarioRule")
}

#[test]
fn address_city_attaches_to_the_address_object() {
    let address = StubSource::business();
    address.add_leaf("City");
    let person = StubSource::bare();
    person.add_child("Address", as_ref(&address));

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::new(Some(as_ref(&person)), "Address.City"));

    assert_eq!(mirror.binding_path(), "City");
    let attached = mirror.attached_source();
    let address_ref = as_ref(&address);
    assert!(same_source(attached.as_ref(), Some(&address_ref)));

    address.push_rule(rule("City", "city is required", Severity::Error));
    address.emit_changed(Some("City"));
    assert!(!mirror.is_valid());
    assert_eq!(mirror.rule_description(), "city is required");
}

#[test]
fn sequence_view_current_item_swap() {
    let x = StubSource::business();
    x.add_leaf("Name");
    x.push_rule(rule("Name", "x is broken", Severity::Error));
    let y = StubSource::business();
    y.add_leaf("Name");

    let view = StubSource::view_over(Some(as_ref(&x)));
    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::new(Some(as_ref(&view)), "Name"));

    assert!(!mirror.is_valid());
    assert_eq!(x.property_subscriber_count(), 1);

    // Selecting Y must detach from X, attach to Y, and recompute.
    view.set_current(Some(as_ref(&y)));
    mirror.refresh();

    assert_eq!(x.property_subscriber_count(), 0);
    assert_eq!(y.property_subscriber_count(), 1);
    assert!(mirror.is_valid());

    x.emit_changed(Some("Name"));
    assert!(mirror.is_valid(), "detached item can no longer influence state");
}

#[test]
fn source_without_rules_capability_stays_valid() {
    let plain = StubSource::bare();
    plain.add_leaf("Name");

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::new(Some(as_ref(&plain)), "Name"));

    assert!(mirror.is_valid());
    assert!(mirror.broken_rules().is_empty());
    assert!(mirror.can_read());
    assert!(mirror.can_write());
    assert!(!mirror.is_busy());
}

#[test]
fn severity_ordering_across_mixed_rules() {
    let source = StubSource::business();
    source.add_leaf("Amount");
    let warning = rule("Amount", "looks high", Severity::Warning);
    let error = rule("Amount", "must be positive", Severity::Error);
    let info = rule("Amount", "rounded", Severity::Information);
    source.set_rules(vec![warning, Rc::clone(&error), info]);

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::new(Some(as_ref(&source)), "Amount"));

    assert_eq!(mirror.worst_severity(), Some(Severity::Error));
    assert_eq!(mirror.rule_description(), "must be positive");
}

#[test]
fn templated_parent_binding_redirects_through_the_control_facet() {
    // The control's "Person" facet is bound to "Customer.Person" on its
    // data context; the mirror configured against the control must end up
    // observing the Customer object's "Person" property.
    let customer = StubSource::business();
    customer.add_leaf("Person");
    customer.push_rule(rule("Person", "person unknown", Severity::Warning));
    let context = StubSource::bare();
    context.add_child("Customer", as_ref(&customer));

    let mut facets = FacetRegistry::new();
    facets.register("Person", BindingExpr::new(None, "Customer.Person"));
    let control = StubControl::new(facets);
    control.set_context(Some(as_ref(&context)));

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::templated(
        Some(Rc::clone(&control) as SourceRef),
        "Person",
    ));

    assert_eq!(mirror.binding_path(), "Person");
    let attached = mirror.attached_source();
    let customer_ref = as_ref(&customer);
    assert!(same_source(attached.as_ref(), Some(&customer_ref)));
    assert!(!mirror.is_valid());
    assert_eq!(mirror.worst_severity(), Some(Severity::Warning));
}

#[test]
fn data_context_indirection_stays_dormant_until_resolvable() {
    // The context declares "Customer" but its value is not available yet:
    // the mirror must not report default state for the wrong object, and
    // must wake up when the intermediate property becomes available.
    let context = StubSource::business();
    context.add_child("Customer", StubSource::bare() as SourceRef);
    context.clear_child("Customer");

    let mut facets = FacetRegistry::new();
    facets.register("Person", BindingExpr::new(None, "Customer.Person"));
    let control = StubControl::new(facets);
    control.set_context(Some(as_ref(&context)));

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::templated(
        Some(Rc::clone(&control) as SourceRef),
        "Person",
    ));

    assert!(mirror.attached_source().is_none(), "dormant: nothing attached");
    assert!(mirror.is_valid(), "defaults while dormant");

    // The customer arrives; the watched segment change re-triggers
    // resolution without any host involvement.
    let customer = StubSource::business();
    customer.add_leaf("Person");
    customer.push_rule(rule("Person", "still unknown", Severity::Error));
    context.add_child("Customer", as_ref(&customer));
    context.emit_changed(Some("Customer"));

    let attached = mirror.attached_source();
    let customer_ref = as_ref(&customer);
    assert!(same_source(attached.as_ref(), Some(&customer_ref)));
    assert!(!mirror.is_valid());
    assert_eq!(mirror.rule_description(), "still unknown");
}

#[test]
fn facet_events_fire_once_per_transition() {
    let source = StubSource::business();
    source.add_leaf("Name");

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::new(Some(as_ref(&source)), "Name"));

    let transitions = Rc::new(std::cell::RefCell::new(Vec::new()));
    let log = Rc::clone(&transitions);
    let _sub = mirror.subscribe_facets(move |facet| log.borrow_mut().push(*facet));

    source.push_rule(rule("Name", "required", Severity::Error));
    source.emit_changed(Some("Name"));
    // Same state again: no further events.
    source.emit_changed(Some("Name"));

    let seen = transitions.borrow();
    assert_eq!(
        seen.iter().filter(|f| **f == Facet::IsValid).count(),
        1,
        "IsValid transitioned exactly once"
    );
    assert_eq!(
        seen.iter().filter(|f| **f == Facet::RuleSeverity).count(),
        1
    );
    assert_eq!(
        seen.iter()
            .filter(|f| **f == Facet::RuleDescription)
            .count(),
        1
    );
}

#[test]
fn authorization_revocation_flows_through() {
    let source = StubSource::business();
    source.add_leaf("Salary");

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::new(Some(as_ref(&source)), "Salary"));
    assert!(mirror.can_read());
    assert!(mirror.can_write());

    source.deny_read("Salary");
    source.deny_write("Salary");
    source.emit_changed(Some("Salary"));

    assert!(!mirror.can_read());
    assert!(!mirror.can_write());
}

#[test]
fn busy_lifecycle_over_an_async_operation() {
    let source = StubSource::business();
    source.add_leaf("Name");

    let mirror = PropertyMirror::new_loaded();
    mirror.set_binding(BindingExpr::new(Some(as_ref(&source)), "Name"));
    assert!(!mirror.is_busy());

    source.set_busy("Name", true);
    source.emit_busy(Some("Name"), true);
    assert!(mirror.is_busy());

    source.set_busy("Name", false);
    source.emit_busy(Some("Name"), false);
    assert!(!mirror.is_busy());
}
