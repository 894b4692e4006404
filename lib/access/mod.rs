//! Access paths: abstract storage locations.
//!
//! An [`AccessPath`] is a [`Root`] (an argument, the return value, or a
//! synthetic anchor) refined by a [`Path`] of field and index selectors.
//! Access paths form a lattice where a longer path is a more specific
//! location and the join of two paths is their longest common prefix. The
//! height of this lattice is bounded by truncating paths, see
//! [`crate::heuristics::Heuristics`].

mod access_path;
mod path;
mod root;

pub use self::access_path::AccessPath;
pub use self::path::{Path, PathElement};
pub use self::root::{parse_parameter_position, ParameterPosition, Root};
