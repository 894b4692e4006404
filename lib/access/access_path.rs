use crate::access::path::{Path, PathElement};
use crate::access::root::Root;
use crate::json;
use crate::method::Method;
use crate::Error;
use serde_json::Value;
use std::fmt;

/// A storage location: a `Root` refined by a `Path`.
///
/// Access paths are ordered by specificity. `a.leq(b)` holds when both share
/// a root and `b.path()` is a prefix of `a.path()`, so the empty path denotes
/// everything reachable from its root.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AccessPath {
    root: Root,
    path: Path,
}

impl AccessPath {
    pub fn new(root: Root, path: Path) -> AccessPath {
        AccessPath { root, path }
    }

    /// An access path with an empty path.
    pub fn from_root(root: Root) -> AccessPath {
        AccessPath::new(root, Path::new())
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, element: PathElement) {
        self.path.append(element);
    }

    pub fn extend(&mut self, path: &Path) {
        self.path.extend(path);
    }

    pub fn pop_back(&mut self) {
        self.path.pop_back();
    }

    pub fn truncate(&mut self, max_size: usize) {
        self.path.truncate(max_size);
    }

    pub fn leq(&self, other: &AccessPath) -> bool {
        self.root == other.root && other.path.is_prefix_of(&self.path)
    }

    /// Join with an access path of the same root.
    ///
    /// Panics if the roots differ.
    pub fn join_with(&mut self, other: &AccessPath) {
        assert_eq!(
            self.root, other.root,
            "cannot join access paths with different roots"
        );
        self.path.reduce_to_common_prefix(&other.path);
    }

    /// The port other analyzers use for this access path in `method`:
    /// `Anchor` as the root and the canonical argument as a single field.
    ///
    /// Arguments of non-static methods are shifted down by one, so the
    /// receiver becomes `Argument(-1)`. Other roots, and arguments of static
    /// methods, keep their own textual form. The path is dropped.
    pub fn canonicalize_for_method(&self, method: &Method) -> AccessPath {
        let root = match self.root {
            Root::Argument(position) if !method.is_static() => match position.value() {
                0 => Root::CanonicalThis,
                position => Root::argument(position - 1),
            },
            root => root,
        };
        AccessPath::new(
            Root::Anchor,
            Path::from(vec![PathElement::field(root.to_string())]),
        )
    }

    /// Parse the textual form `Root.field[index]...`.
    pub fn from_string(value: &str) -> Result<AccessPath, Error> {
        let elements = Path::split_path(value)?;
        let (root, elements) = match elements.split_first() {
            Some(split) => split,
            None => {
                return Err(Error::json_validation(
                    value,
                    None,
                    "non-empty string for access path",
                ))
            }
        };
        let root = Root::parse(root)?;
        let path = elements
            .iter()
            .map(|element| PathElement::from_string(element))
            .collect::<Result<Path, Error>>()?;
        Ok(AccessPath::new(root, path))
    }

    pub fn from_json(value: &Value) -> Result<AccessPath, Error> {
        AccessPath::from_string(json::string(value)?)
    }

    pub fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.root, self.path)
    }
}
