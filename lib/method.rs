//! Identities supplied by the front end: resolved methods, source positions
//! and exploitability origins.
//!
//! These are produced by bytecode parsing and call graph construction, which
//! live outside this crate. Tainttrace only needs their identity, whether a
//! method is static, and their JSON form.

use crate::json;
use crate::symbol::Symbol;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A resolved method.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Method {
    signature: Symbol,
    is_static: bool,
}

impl Method {
    pub fn new<S: Into<Symbol>>(signature: S, is_static: bool) -> Method {
        Method {
            signature: signature.into(),
            is_static,
        }
    }

    pub fn signature(&self) -> &Symbol {
        &self.signature
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Non-static methods serialize to their signature, static ones to
    /// `{"name": signature, "static": true}`.
    pub fn to_json(&self) -> Value {
        if self.is_static {
            serde_json::json!({"name": self.signature.as_str(), "static": true})
        } else {
            Value::String(self.signature.to_string())
        }
    }

    pub fn from_json(value: &Value) -> Result<Method, Error> {
        if let Some(signature) = value.as_str() {
            return Ok(Method::new(signature, false));
        }
        json::check_unexpected_members(value, &["name", "static"])?;
        let signature = json::string_field(value, "name")?;
        let is_static = match value.get("static") {
            None => false,
            Some(Value::Bool(is_static)) => *is_static,
            Some(other) => {
                return Err(Error::json_validation(
                    other.to_string(),
                    Some("static"),
                    "boolean",
                ))
            }
        };
        Ok(Method::new(signature, is_static))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.signature)
    }
}

/// A position in the analyzed sources.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Position {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<Symbol>,
    line: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<u32>,
}

impl Position {
    pub fn new(path: Option<&str>, line: i32) -> Position {
        Position {
            path: path.map(Symbol::intern),
            line,
            start: None,
            end: None,
        }
    }

    /// Narrow this position to a column range on its line.
    pub fn with_range(mut self, start: u32, end: u32) -> Position {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn path(&self) -> Option<&Symbol> {
        self.path.as_ref()
    }

    pub fn line(&self) -> i32 {
        self.line
    }

    pub fn start(&self) -> Option<u32> {
        self.start
    }

    pub fn end(&self) -> Option<u32> {
        self.end
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_json(value: &Value) -> Result<Position, Error> {
        json::deserialize(value)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.path {
            Some(ref path) => write!(f, "{}:{}", path, self.line),
            None => write!(f, "unknown:{}", self.line),
        }
    }
}

/// Where a source-as-transform sink was materialized for an exploitability
/// rule: the caller, the callee name and the position of the call.
///
/// Exploitability origins are created once by the analysis and shared; issues
/// refer to them through an `Arc`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExploitabilityOrigin {
    exploitability_root: Method,
    callee: Symbol,
    position: Position,
}

impl ExploitabilityOrigin {
    pub fn new<S: Into<Symbol>>(
        exploitability_root: Method,
        callee: S,
        position: Position,
    ) -> ExploitabilityOrigin {
        ExploitabilityOrigin {
            exploitability_root,
            callee: callee.into(),
            position,
        }
    }

    pub fn exploitability_root(&self) -> &Method {
        &self.exploitability_root
    }

    pub fn callee(&self) -> &Symbol {
        &self.callee
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "exploitability_root": self.exploitability_root.to_json(),
            "callee": self.callee.as_str(),
            "position": self.position.to_json(),
        })
    }
}

impl fmt::Display for ExploitabilityOrigin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ExploitabilityOrigin(root={}, callee={}, position={})",
            self.exploitability_root, self.callee, self.position
        )
    }
}
