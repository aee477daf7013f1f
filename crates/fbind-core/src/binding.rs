#![forbid(unsafe_code)]

//! Binding expressions and the host-control facet registry.
//!
//! A [`BindingExpr`] is the consumed binding input: a data item, a dotted
//! property path, and a source-resolution [`RelativeMode`].
//!
//! [`FacetRegistry`] is the toolkit-agnostic replacement for an
//! ancestor-type reflection walk: the hosting adapter *registers* each
//! bindable facet by name, optionally chaining to the registry of the base
//! control type. Lookup walks the chain nearest-type-first, which preserves
//! the "search the type, then each ancestor" semantics without any naming
//! convention or reflection.
//!
//! # Failure Modes
//!
//! - A facet registered nowhere in the chain: [`FacetRegistry::lookup`]
//!   returns `None`. This is a normal outcome, not an error.

use core::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::source::SourceRef;

/// How a binding's source is resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelativeMode {
    /// Resolve against the supplied data item.
    Normal,
    /// Resolve against the control hosting the template.
    TemplatedParent,
}

/// A configured binding: data item, dotted property path, resolution mode.
#[derive(Clone)]
pub struct BindingExpr {
    /// The dotted (possibly multi-segment) property path.
    pub path: String,
    /// The data item the path is resolved against.
    pub source: Option<SourceRef>,
    /// Source-resolution mode.
    pub mode: RelativeMode,
}

impl BindingExpr {
    /// A normal binding against `source`.
    #[must_use]
    pub fn new(source: Option<SourceRef>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source,
            mode: RelativeMode::Normal,
        }
    }

    /// A templated-parent binding against the hosting control.
    #[must_use]
    pub fn templated(source: Option<SourceRef>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source,
            mode: RelativeMode::TemplatedParent,
        }
    }
}

impl fmt::Debug for BindingExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingExpr")
            .field("path", &self.path)
            .field("source", &self.source.is_some())
            .field("mode", &self.mode)
            .finish()
    }
}

/// Registered bindable facets of a control type, chained to its base type.
#[derive(Debug, Default)]
pub struct FacetRegistry {
    facets: AHashMap<String, BindingExpr>,
    base: Option<Rc<FacetRegistry>>,
}

impl FacetRegistry {
    /// An empty registry with no base chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry chained to `base` (the base control type's facets).
    #[must_use]
    pub fn with_base(base: Rc<FacetRegistry>) -> Self {
        Self {
            facets: AHashMap::new(),
            base: Some(base),
        }
    }

    /// Register (or replace) the binding for `facet` on this type.
    pub fn register(&mut self, facet: impl Into<String>, binding: BindingExpr) {
        self.facets.insert(facet.into(), binding);
    }

    /// Find the binding for `facet`; nearest registration wins, falling
    /// back through the base chain.
    #[must_use]
    pub fn lookup(&self, facet: &str) -> Option<&BindingExpr> {
        if let Some(found) = self.facets.get(facet) {
            return Some(found);
        }
        self.base.as_deref()?.lookup(facet)
    }
}

/// Visual-element capability: a control that hosts templated content.
pub trait HostControl {
    /// The control's inherited data context, when available.
    fn data_context(&self) -> Option<SourceRef>;

    /// The control's registered bindable facets.
    fn facets(&self) -> &FacetRegistry;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_base_chain() {
        let mut base = FacetRegistry::new();
        base.register("Person", BindingExpr::new(None, "Customer.Person"));
        let base = Rc::new(base);

        let derived = FacetRegistry::with_base(Rc::clone(&base));
        let found = derived.lookup("Person").map(|b| b.path.clone());
        assert_eq!(found.as_deref(), Some("Customer.Person"));
    }

    #[test]
    fn nearest_registration_wins() {
        let mut base = FacetRegistry::new();
        base.register("Person", BindingExpr::new(None, "base.path"));

        let mut derived = FacetRegistry::with_base(Rc::new(base));
        derived.register("Person", BindingExpr::new(None, "derived.path"));

        let found = derived.lookup("Person").map(|b| b.path.clone());
        assert_eq!(found.as_deref(), Some("derived.path"));
    }

    #[test]
    fn missing_facet_is_none() {
        let derived = FacetRegistry::with_base(Rc::new(FacetRegistry::new()));
        assert!(derived.lookup("Nope").is_none());
    }
}
