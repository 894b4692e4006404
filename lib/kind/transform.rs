use crate::json;
use crate::kind::Kind;
use crate::symbol::Symbol;
use crate::Error;
use serde_json::Value;
use std::fmt;
use std::slice;

const SOURCE_AS_TRANSFORM_PREFIX: &str = "SourceAsTransform[";

/// An operation applied to taint on its way from a source to a sink.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Transform {
    /// A user-declared transform.
    Named(Symbol),
    /// The source of an exploitability rule, recorded as a transform on the
    /// sink it reached.
    SourceAsTransform(Box<Kind>),
}

impl Transform {
    pub fn named<S: Into<Symbol>>(name: S) -> Transform {
        Transform::Named(name.into())
    }

    pub fn source_as_transform(source: Kind) -> Transform {
        Transform::SourceAsTransform(Box::new(source))
    }

    pub fn is_source_as_transform(&self) -> bool {
        matches!(self, Transform::SourceAsTransform(_))
    }

    pub fn to_trace_string(&self) -> String {
        match self {
            Transform::Named(name) => name.to_string(),
            Transform::SourceAsTransform(kind) => {
                format!("{}{}]", SOURCE_AS_TRANSFORM_PREFIX, kind.to_trace_string())
            }
        }
    }

    pub fn from_trace_string(value: &str) -> Result<Transform, Error> {
        if value.is_empty() {
            return Err(Error::json_validation(value, None, "non-empty transform name"));
        }
        if let Some(kind) = value
            .strip_prefix(SOURCE_AS_TRANSFORM_PREFIX)
            .and_then(|kind| kind.strip_suffix(']'))
        {
            return Ok(Transform::source_as_transform(Kind::from_trace_string(kind)?));
        }
        if value.starts_with(SOURCE_AS_TRANSFORM_PREFIX) {
            return Err(Error::json_validation(
                value,
                None,
                "Could not be parsed as a valid SourceAsTransform",
            ));
        }
        Ok(Transform::named(value))
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_trace_string())
    }
}

/// A non-empty sequence of transforms, in application order.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TransformList {
    transforms: Vec<Transform>,
}

impl TransformList {
    /// Returns `None` for an empty sequence.
    pub fn new(transforms: Vec<Transform>) -> Option<TransformList> {
        if transforms.is_empty() {
            None
        } else {
            Some(TransformList { transforms })
        }
    }

    /// The single source-as-transform for `source`.
    pub fn from_kind(source: &Kind) -> TransformList {
        TransformList {
            transforms: vec![Transform::source_as_transform(source.clone())],
        }
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn iter(&self) -> slice::Iter<Transform> {
        self.transforms.iter()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn has_source_as_transform(&self) -> bool {
        self.transforms.iter().any(Transform::is_source_as_transform)
    }

    /// `left` followed by `right`, where either may be absent.
    pub fn concat(
        left: Option<&TransformList>,
        right: Option<&TransformList>,
    ) -> Option<TransformList> {
        let transforms = left
            .into_iter()
            .chain(right)
            .flat_map(|list| list.transforms.iter().cloned())
            .collect();
        TransformList::new(transforms)
    }

    pub fn reverse(&self) -> TransformList {
        TransformList {
            transforms: self.transforms.iter().rev().cloned().collect(),
        }
    }

    pub fn to_trace_string(&self) -> String {
        self.transforms
            .iter()
            .map(Transform::to_trace_string)
            .collect::<Vec<String>>()
            .join(":")
    }

    pub fn from_trace_string(value: &str) -> Result<TransformList, Error> {
        let transforms = value
            .split(':')
            .map(Transform::from_trace_string)
            .collect::<Result<Vec<Transform>, Error>>()?;
        TransformList::new(transforms)
            .ok_or_else(|| Error::json_validation(value, None, "non-empty transform list"))
    }

    /// A non-empty array of transform names, as written in rules.
    pub fn from_json(value: &Value) -> Result<TransformList, Error> {
        let transforms = match value.as_array() {
            Some(array) if !array.is_empty() => array,
            _ => {
                return Err(Error::json_validation(
                    value.to_string(),
                    None,
                    "non-empty array of transforms",
                ))
            }
        };
        let transforms = transforms
            .iter()
            .map(|transform| json::string(transform).and_then(Transform::from_trace_string))
            .collect::<Result<Vec<Transform>, Error>>()?;
        Ok(TransformList { transforms })
    }

    pub fn to_json(&self) -> Value {
        Value::Array(
            self.transforms
                .iter()
                .map(|transform| Value::String(transform.to_trace_string()))
                .collect(),
        )
    }
}

impl fmt::Display for TransformList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_trace_string())
    }
}

impl<'t> IntoIterator for &'t TransformList {
    type Item = &'t Transform;
    type IntoIter = slice::Iter<'t, Transform>;

    fn into_iter(self) -> Self::IntoIter {
        self.transforms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list(names: &[&str]) -> TransformList {
        TransformList::new(names.iter().map(|name| Transform::named(*name)).collect()).unwrap()
    }

    #[test]
    fn trace_strings() {
        let transforms = list(&["T1", "T2"]);
        assert_eq!(transforms.to_trace_string(), "T1:T2");
        assert_eq!(
            TransformList::from_trace_string("T1:T2").unwrap(),
            transforms
        );

        let source = TransformList::from_kind(&Kind::named("UserInput"));
        assert_eq!(source.to_trace_string(), "SourceAsTransform[UserInput]");
        assert!(source.has_source_as_transform());
        assert_eq!(
            TransformList::from_trace_string("SourceAsTransform[UserInput]").unwrap(),
            source
        );
        assert!(TransformList::from_trace_string("T1::T2").is_err());
        assert!(Transform::from_trace_string("SourceAsTransform[X").is_err());
    }

    #[test]
    fn concat_and_reverse() {
        let a = list(&["A"]);
        let bc = list(&["B", "C"]);
        assert_eq!(TransformList::concat(Some(&a), Some(&bc)), Some(list(&["A", "B", "C"])));
        assert_eq!(TransformList::concat(None, Some(&bc)), Some(bc.clone()));
        assert_eq!(TransformList::concat(None, None), None);
        assert_eq!(bc.reverse(), list(&["C", "B"]));
    }

    #[test]
    fn json() {
        let transforms = TransformList::from_json(&json!(["T1", "T2"])).unwrap();
        assert_eq!(transforms, list(&["T1", "T2"]));
        assert_eq!(transforms.to_json(), json!(["T1", "T2"]));
        assert!(TransformList::from_json(&json!([])).is_err());
        assert!(TransformList::from_json(&json!([1])).is_err());
        assert!(TransformList::from_json(&json!("T1")).is_err());
    }
}
