use crate::access::root::{ParameterPosition, Root};
use crate::json;
use crate::symbol::Symbol;
use crate::Error;
use log::warn;
use serde_json::Value;
use std::fmt;
use std::slice;

/// One selector refining a location: a field, an index, any index, or an
/// index given by the constant value of an argument at the call site.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PathElement {
    Field(Symbol),
    Index(Symbol),
    AnyIndex,
    IndexFromValueOf(ParameterPosition),
}

impl PathElement {
    pub fn field<S: Into<Symbol>>(name: S) -> PathElement {
        PathElement::Field(name.into())
    }

    pub fn index<S: Into<Symbol>>(name: S) -> PathElement {
        PathElement::Index(name.into())
    }

    pub fn any_index() -> PathElement {
        PathElement::AnyIndex
    }

    /// Panics if `root` is not an argument.
    pub fn index_from_value_of(root: Root) -> PathElement {
        assert!(root.is_argument(), "index_from_value_of expects an argument, got {}", root);
        PathElement::IndexFromValueOf(root.parameter_position())
    }

    /// The field or index name, if this element has one.
    pub fn name(&self) -> Option<&Symbol> {
        match self {
            PathElement::Field(name) | PathElement::Index(name) => Some(name),
            PathElement::AnyIndex | PathElement::IndexFromValueOf(_) => None,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, PathElement::Field(_))
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PathElement::Index(_))
    }

    pub fn is_any_index(&self) -> bool {
        matches!(self, PathElement::AnyIndex)
    }

    pub fn is_index_from_value_of(&self) -> bool {
        matches!(self, PathElement::IndexFromValueOf(_))
    }

    /// Panics unless this is an `IndexFromValueOf` element.
    pub fn parameter_position(&self) -> ParameterPosition {
        match *self {
            PathElement::IndexFromValueOf(position) => position,
            _ => panic!("{} is not an index_from_value_of path element", self),
        }
    }

    /// Substitute the constant value of the referenced argument.
    ///
    /// `source_constant_arguments[i]` is the statically known value of
    /// argument `i` at the call site. An unknown value, or an argument
    /// position past the end of the list, yields `AnyIndex`.
    ///
    /// Panics unless this is an `IndexFromValueOf` element.
    pub fn resolve_index_from_value_of(
        &self,
        source_constant_arguments: &[Option<String>],
    ) -> PathElement {
        let position = self.parameter_position();
        match source_constant_arguments.get(position.value() as usize) {
            Some(Some(value)) => PathElement::index(value.as_str()),
            Some(None) => PathElement::AnyIndex,
            None => {
                warn!(
                    "Invalid argument index {} provided for index_from_value_of path element.",
                    position
                );
                PathElement::AnyIndex
            }
        }
    }

    /// Parse a single element as produced by `Path::split_path`.
    pub fn from_string(value: &str) -> Result<PathElement, Error> {
        let inner = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            Some(inner) => inner,
            None => return Ok(PathElement::field(value)),
        };

        if inner.is_empty() {
            return Err(Error::json_validation(
                value,
                None,
                format!("non-empty index for path element, got `{}`", inner),
            ));
        }

        if inner == "*" {
            return Ok(PathElement::AnyIndex);
        }

        let root = match inner.strip_prefix('<').and_then(|v| v.strip_suffix('>')) {
            Some(root) => root,
            None => return Ok(PathElement::index(inner)),
        };

        match Root::parse(root) {
            Ok(root) if root.is_argument() => Ok(PathElement::index_from_value_of(root)),
            _ => Err(Error::json_validation(
                value,
                None,
                format!(
                    "`[<Argument(<number>)>]` for value_of path element, got `{}`",
                    inner
                ),
            )),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathElement::Field(name) => write!(f, ".{}", name),
            PathElement::Index(name) => write!(f, "[{}]", name),
            PathElement::AnyIndex => write!(f, "[*]"),
            PathElement::IndexFromValueOf(position) => {
                write!(f, "[<{}>]", Root::Argument(*position))
            }
        }
    }
}

/// The path of an access path, without the root, e.g. `.x[*].y`.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    pub fn new() -> Path {
        Path::default()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn iter(&self) -> slice::Iter<PathElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn append(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    pub fn extend(&mut self, path: &Path) {
        self.elements.extend(path.elements.iter().cloned());
    }

    /// Panics on an empty path.
    pub fn pop_back(&mut self) {
        assert!(!self.elements.is_empty(), "pop_back on an empty path");
        self.elements.pop();
    }

    /// Drop every element past `max_size`.
    pub fn truncate(&mut self, max_size: usize) {
        self.elements.truncate(max_size);
    }

    pub fn is_prefix_of(&self, other: &Path) -> bool {
        self.elements.len() <= other.elements.len()
            && self
                .elements
                .iter()
                .zip(other.elements.iter())
                .all(|(lhs, rhs)| lhs == rhs)
    }

    /// Shorten this path to its longest common prefix with `other`, stopping
    /// at the first mismatching element.
    pub fn reduce_to_common_prefix(&mut self, other: &Path) {
        let common = self
            .elements
            .iter()
            .zip(other.elements.iter())
            .take_while(|(lhs, rhs)| lhs == rhs)
            .count();
        self.elements.truncate(common);
    }

    /// Resolve every `IndexFromValueOf` element against the constant
    /// arguments of a call.
    pub fn resolve(&self, source_constant_arguments: &[Option<String>]) -> Path {
        self.elements
            .iter()
            .map(|element| {
                if element.is_index_from_value_of() {
                    element.resolve_index_from_value_of(source_constant_arguments)
                } else {
                    element.clone()
                }
            })
            .collect()
    }

    /// Split a string into path elements.
    ///
    /// `.x.y` gives `["x", "y"]`, and `x[a].y[<Argument(1)>]` gives
    /// `["x", "[a]", "y", "[<Argument(1)>]"]`. Index elements keep their
    /// brackets. A leading `.` is optional.
    pub fn split_path(value: &str) -> Result<Vec<String>, Error> {
        let mut elements = Vec::new();
        let mut rest = value.strip_prefix('.').unwrap_or(value);

        while !rest.is_empty() {
            if rest.starts_with('[') {
                let end = rest.find(']').ok_or_else(|| {
                    Error::json_validation(value, None, "matching `]` for index path element")
                })?;
                if rest[1..end].contains('[') {
                    return Err(Error::json_validation(
                        value,
                        None,
                        "index path elements without nested `[`",
                    ));
                }
                elements.push(rest[..=end].to_string());
                rest = &rest[end + 1..];
                // A '.' after ']' only separates the next field.
                rest = rest.strip_prefix('.').unwrap_or(rest);
                continue;
            }

            let (field, next) = match rest.find(|c: char| c == '.' || c == '[') {
                None => (rest, ""),
                Some(0) => {
                    return Err(Error::json_validation(
                        value,
                        None,
                        "non-empty field for path element",
                    ))
                }
                Some(position) if rest.as_bytes()[position] == b'.' => {
                    (&rest[..position], &rest[position + 1..])
                }
                Some(position) => (&rest[..position], &rest[position..]),
            };
            if field.contains(']') {
                return Err(Error::json_validation(
                    value,
                    None,
                    "`]` only as the end of an index path element",
                ));
            }
            elements.push(field.to_string());
            rest = next;
        }

        Ok(elements)
    }

    pub fn from_string(value: &str) -> Result<Path, Error> {
        Path::split_path(value)?
            .iter()
            .map(|element| PathElement::from_string(element))
            .collect()
    }

    pub fn from_json(value: &Value) -> Result<Path, Error> {
        Path::from_string(json::string(value)?)
    }

    pub fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Path {
        Path { elements }
    }
}

impl std::iter::FromIterator<PathElement> for Path {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Path {
        Path {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'p> IntoIterator for &'p Path {
    type Item = &'p PathElement;
    type IntoIter = slice::Iter<'p, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
