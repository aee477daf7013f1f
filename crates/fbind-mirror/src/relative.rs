#![forbid(unsafe_code)]

//! Relative-source (templated-parent) binding redirection.
//!
//! When a mirror lives inside a reusable template, its configured binding
//! may point at the control hosting the template rather than at a data
//! object. [`parse_relative_binding`] detects that case and redirects the
//! binding to the facet the control itself is bound to, looked up in the
//! control's [`FacetRegistry`] chain (nearest type first).
//!
//! # Failure Modes
//!
//! - Facet not registered anywhere in the chain: `None`. The caller treats
//!   the original expression as a normal binding; absence is a normal
//!   outcome, never an error.
//!
//! [`FacetRegistry`]: fbind_core::FacetRegistry

use fbind_core::binding::{BindingExpr, RelativeMode};

/// Redirect a templated-parent binding to the hosting control's own facet
/// binding.
///
/// Applies only when the expression's mode is
/// [`TemplatedParent`](RelativeMode::TemplatedParent) *and* its data item
/// is a visual control; any other expression is returned unchanged.
#[must_use]
pub fn parse_relative_binding(expr: &BindingExpr) -> Option<BindingExpr> {
    if expr.mode == RelativeMode::TemplatedParent {
        if let Some(control) = expr.source.as_ref().and_then(|s| s.as_host_control()) {
            return control.facets().lookup(&expr.path).cloned();
        }
    }
    Some(expr.clone())
}
