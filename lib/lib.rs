//! Tainttrace: the abstract domain and trace model of an interprocedural
//! taint analysis.
//!
//! Tainttrace does not walk programs itself. A fixed-point solver labels the
//! locations of its abstract store with [`access::AccessPath`]s, describes how
//! taint reached a location with [`trace::CallInfo`] hops, and, when a source
//! meets a sink under some [`rules::Rule`], records an [`issue::Issue`].
//!
//! # Layout
//!
//! * [`access`] - `Root`, `PathElement`, `Path` and `AccessPath`: a finite
//! lattice of storage locations.
//! * [`trace`] - `CallKind` and `CallInfo`: one hop of a trace.
//! * [`kind`] - source, sink and transform kinds.
//! * [`taint`] - the taint values carried by issues.
//! * [`rules`] - rule shapes, the rule collection, and coverage reporting.
//! * [`issue`] - detected vulnerabilities and how they are grouped.
//!
//! All types are values. They are `Send + Sync`, hold no hidden shared
//! mutable state, and can be built and joined independently on many threads.

pub mod access;
pub mod domain;
pub mod heuristics;
pub mod issue;
pub mod json;
pub mod kind;
pub mod method;
pub mod rules;
pub mod symbol;
pub mod taint;
#[cfg(test)]
mod tests;
pub mod trace;

pub use crate::domain::AbstractDomain;
pub use crate::symbol::Symbol;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error parsing JSON at {}, expected {expected}, got `{value}`", field_display(.field))]
    JsonValidation {
        value: String,
        field: Option<String>,
        expected: String,
    },
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

impl Error {
    /// Build a validation error for the offending literal `value`.
    pub fn json_validation<V, S>(value: V, field: Option<&str>, expected: S) -> Error
    where
        V: Into<String>,
        S: Into<String>,
    {
        Error::JsonValidation {
            value: value.into(),
            field: field.map(|field| field.to_string()),
            expected: expected.into(),
        }
    }
}

fn field_display(field: &Option<String>) -> String {
    match field {
        Some(field) => format!("`{}`", field),
        None => "top level".to_string(),
    }
}
