#![forbid(unsafe_code)]

//! Property metastate mirror for Frankenbind.
//!
//! [`PropertyMirror`] observes one property of a bound object graph and
//! mirrors its live metastate — read/write authorization, busy flag,
//! validity, and the worst broken rule — keeping the mirror correct as the
//! binding path re-resolves through sequence-view indirection, multi-segment
//! paths, and templated-parent bindings.
//!
//! The mirror never decides what is valid, never performs remote calls, and
//! never mutates the source; it only subscribes, reads, and reflects.
//!
//! Module map:
//!
//! - [`path`]: dotted-path resolution over the object graph.
//! - [`relative`]: templated-parent binding redirection.
//! - [`mirror`]: source attachment, metastate aggregation, notification.

pub mod mirror;
pub mod path;
pub mod relative;

pub use mirror::{Facet, PropertyMirror, RuleEdit};
pub use path::{leaf, relative_path, resolve_source};
pub use relative::parse_relative_binding;
