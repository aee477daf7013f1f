#![forbid(unsafe_code)]

//! Dotted binding-path resolution over a bindable object graph.
//!
//! [`resolve_source`] walks successive property accesses to find the
//! *terminal source*: the object that directly owns the leaf property.
//! [`relative_path`] performs the same walk but returns the first
//! single-segment name the source actually declares, for use as a local
//! binding path once the terminal object is known.
//!
//! # Invariants
//!
//! 1. Sequence-view indirection is unwrapped at every recursion level, not
//!    just the first.
//! 2. Every recursive call strictly shortens the path, including the
//!    unresolved-remainder retry, so depth is bounded by the segment count
//!    and cycles elsewhere in the graph cannot cause non-termination.
//! 3. Property presence is checked by metadata lookup
//!    ([`BindableSource::has_property`]), never by attempting the read.
//!
//! # Failure Modes
//!
//! - Null root, or a sequence view with no current item: `None`. Callers
//!   treat this as "no source" (facets keep their defaults), not an error.
//! - A path one segment longer than the graph supports (ending in the
//!   direct property name) resolves to the deepest reachable object.
//!
//! [`BindableSource::has_property`]: fbind_core::BindableSource::has_property

use fbind_core::source::{SequenceView, SourceRef};

/// Trailing (single-name) segment of a dotted path.
#[must_use]
pub fn leaf(path: &str) -> &str {
    match path.rfind('.') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Locate the terminal object that directly owns the leaf property of
/// `path`, starting from `root`.
#[must_use]
pub fn resolve_source(root: Option<&SourceRef>, path: &str) -> Option<SourceRef> {
    let source = root?.clone();
    let unwrapped = source.as_sequence_view().map(SequenceView::current_item);
    let source = match unwrapped {
        // A view with no current item yields no source at all.
        Some(item) => item?,
        None => source,
    };

    if let Some((head, tail)) = path.split_once('.') {
        if source.has_property(head) {
            if let Some(child) = source.child(head) {
                if let Some(found) = resolve_source(Some(&child), tail) {
                    return Some(found);
                }
            }
        } else {
            // Path is one segment longer than the graph supports; retry the
            // remainder against the same object.
            return resolve_source(Some(&source), tail);
        }
    }
    Some(source)
}

/// The first single segment of `path` that `source` actually declares,
/// falling back through the remainder; a separator-free path is returned
/// as-is.
#[must_use]
pub fn relative_path(source: Option<&SourceRef>, path: &str) -> Option<String> {
    let source = source?;
    match path.split_once('.') {
        Some((head, tail)) => {
            if source.has_property(head) {
                Some(head.to_owned())
            } else {
                relative_path(Some(source), tail)
            }
        }
        None => Some(path.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbind_core::same_source;
    use fbind_core::testutil::StubSource;
    use std::rc::Rc;

    fn as_ref(stub: &Rc<StubSource>) -> SourceRef {
        Rc::clone(stub) as SourceRef
    }

    #[test]
    fn leaf_of_dotted_and_plain_paths() {
        assert_eq!(leaf("Address.City"), "City");
        assert_eq!(leaf("A.B.C"), "C");
        assert_eq!(leaf("Name"), "Name");
        assert_eq!(leaf(""), "");
    }

    #[test]
    fn single_segment_resolves_to_root() {
        let root = StubSource::bare();
        root.add_leaf("Name");
        let root = as_ref(&root);

        let found = resolve_source(Some(&root), "Name");
        assert!(same_source(found.as_ref(), Some(&root)));
    }

    #[test]
    fn dotted_path_resolves_to_terminal_owner() {
        let address = StubSource::bare();
        address.add_leaf("City");
        let root = StubSource::bare();
        root.add_child("Address", as_ref(&address));

        let found = resolve_source(Some(&as_ref(&root)), "Address.City");
        let address = as_ref(&address);
        assert!(same_source(found.as_ref(), Some(&address)));
    }

    #[test]
    fn unresolved_head_retries_remainder() {
        let root = StubSource::bare();
        root.add_leaf("Name");
        let root = as_ref(&root);

        // "Customer.Name" against an object that only has "Name".
        let found = resolve_source(Some(&root), "Customer.Name");
        assert!(same_source(found.as_ref(), Some(&root)));
    }

    #[test]
    fn declared_but_null_intermediate_stops_the_walk() {
        let root = StubSource::bare();
        root.add_child("Customer", StubSource::bare() as SourceRef);
        root.clear_child("Customer");
        let root = as_ref(&root);

        let found = resolve_source(Some(&root), "Customer.Name");
        assert!(same_source(found.as_ref(), Some(&root)));
    }

    #[test]
    fn view_substitutes_current_item() {
        let item = StubSource::bare();
        item.add_leaf("Name");
        let view = StubSource::view_over(Some(as_ref(&item)));

        let found = resolve_source(Some(&as_ref(&view)), "Name");
        let item = as_ref(&item);
        assert!(same_source(found.as_ref(), Some(&item)));
    }

    #[test]
    fn view_without_current_item_yields_none() {
        let view = StubSource::view_over(None);
        assert!(resolve_source(Some(&as_ref(&view)), "Name").is_none());
    }

    #[test]
    fn view_is_unwrapped_at_every_level() {
        let customer = StubSource::bare();
        customer.add_leaf("Name");
        let inner_view = StubSource::view_over(Some(as_ref(&customer)));
        let root = StubSource::bare();
        root.add_child("Customers", as_ref(&inner_view));

        let found = resolve_source(Some(&as_ref(&root)), "Customers.Name");
        let customer = as_ref(&customer);
        assert!(same_source(found.as_ref(), Some(&customer)));
    }

    #[test]
    fn null_root_yields_none() {
        assert!(resolve_source(None, "Name").is_none());
    }

    #[test]
    fn relative_path_returns_first_declared_segment() {
        let source = StubSource::bare();
        source.add_leaf("City");
        let source = as_ref(&source);

        assert_eq!(
            relative_path(Some(&source), "Address.City").as_deref(),
            Some("City")
        );
        assert_eq!(relative_path(Some(&source), "City").as_deref(), Some("City"));
        assert!(relative_path(None, "City").is_none());
    }

    #[test]
    fn relative_path_prefers_the_head_when_declared() {
        let source = StubSource::bare();
        source.add_child("Address", StubSource::bare() as SourceRef);
        let source = as_ref(&source);

        assert_eq!(
            relative_path(Some(&source), "Address.City").as_deref(),
            Some("Address")
        );
    }

    #[test]
    fn relative_path_undeclared_falls_through_to_raw_leaf() {
        let source = StubSource::bare();
        let source = as_ref(&source);
        assert_eq!(
            relative_path(Some(&source), "A.B.C").as_deref(),
            Some("C")
        );
    }

    mod termination {
        use super::*;
        use proptest::prelude::*;

        // A three-node graph with a cycle (root -> A -> B -> root) plus a
        // self-loop, so any non-termination bug would hang the walk.
        fn cyclic_graph() -> SourceRef {
            let root = StubSource::bare();
            let a = StubSource::bare();
            let b = StubSource::bare();
            root.add_child("A", as_ref(&a));
            a.add_child("B", as_ref(&b));
            a.add_child("Self", as_ref(&a));
            b.add_child("Root", as_ref(&root));
            b.add_leaf("Name");
            as_ref(&root)
        }

        proptest! {
            #[test]
            fn resolve_terminates_on_cyclic_graphs(
                segments in proptest::collection::vec("(A|B|Self|Root|Name|X)", 1..8)
            ) {
                let path = segments.join(".");
                let root = cyclic_graph();
                // Termination is the property; any result is acceptable.
                let _ = resolve_source(Some(&root), &path);
                let _ = relative_path(Some(&root), &path);
            }
        }
    }
}
