//! Source, sink and transform kinds.

mod transform;

pub use self::transform::{Transform, TransformList};

use crate::json;
use crate::symbol::Symbol;
use crate::Error;
use serde_json::{Map, Value};
use std::fmt;

/// The label of taint: what a source produces or a sink consumes.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Kind {
    Named(Symbol),
    /// Half of a multi-source sink, reached by the sources of `label`.
    Partial { name: Symbol, label: Symbol },
    /// A partial sink created once the other half of the rule `rule_code`
    /// is fulfilled.
    TriggeredPartial {
        name: Symbol,
        label: Symbol,
        rule_code: i64,
    },
    /// A kind with the transforms applied to it along its flow.
    Transform {
        base: Box<Kind>,
        local: Option<TransformList>,
        global: Option<TransformList>,
    },
}

impl Kind {
    pub fn named<S: Into<Symbol>>(name: S) -> Kind {
        Kind::Named(name.into())
    }

    pub fn partial<S: Into<Symbol>, L: Into<Symbol>>(name: S, label: L) -> Kind {
        Kind::Partial {
            name: name.into(),
            label: label.into(),
        }
    }

    /// `base` with the given transforms. Transforms already on `base` are
    /// dropped, and without any transform this is `base` itself.
    pub fn transform(
        base: Kind,
        local: Option<TransformList>,
        global: Option<TransformList>,
    ) -> Kind {
        let base = base.discard_transforms().clone();
        if local.is_none() && global.is_none() {
            return base;
        }
        Kind::Transform {
            base: Box::new(base),
            local,
            global,
        }
    }

    /// The triggered counterpart of a partial kind for rule `rule_code`.
    ///
    /// Panics if this is not a partial kind.
    pub fn triggered(&self, rule_code: i64) -> Kind {
        match self {
            Kind::Partial { name, label } => Kind::TriggeredPartial {
                name: name.clone(),
                label: label.clone(),
                rule_code,
            },
            _ => panic!("{} is not a partial kind", self),
        }
    }

    /// The kind without any transform.
    pub fn discard_transforms(&self) -> &Kind {
        match self {
            Kind::Transform { base, .. } => base.as_ref(),
            kind => kind,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Kind::Named(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Kind::Partial { .. })
    }

    pub fn is_triggered_partial(&self) -> bool {
        matches!(self, Kind::TriggeredPartial { .. })
    }

    pub fn is_transform(&self) -> bool {
        matches!(self, Kind::Transform { .. })
    }

    pub fn local_transforms(&self) -> Option<&TransformList> {
        match self {
            Kind::Transform { local, .. } => local.as_ref(),
            _ => None,
        }
    }

    pub fn global_transforms(&self) -> Option<&TransformList> {
        match self {
            Kind::Transform { global, .. } => global.as_ref(),
            _ => None,
        }
    }

    /// Local transforms followed by global ones.
    pub fn all_transforms(&self) -> Option<TransformList> {
        TransformList::concat(self.local_transforms(), self.global_transforms())
    }

    pub fn has_source_as_transform(&self) -> bool {
        self.local_transforms()
            .map(TransformList::has_source_as_transform)
            .unwrap_or(false)
            || self
                .global_transforms()
                .map(TransformList::has_source_as_transform)
                .unwrap_or(false)
    }

    /// The label of a partial or triggered partial kind.
    pub fn partial_label(&self) -> Option<&Symbol> {
        match self {
            Kind::Partial { label, .. } | Kind::TriggeredPartial { label, .. } => Some(label),
            _ => None,
        }
    }

    pub fn to_trace_string(&self) -> String {
        match self {
            Kind::Named(name) => name.to_string(),
            Kind::Partial { name, label } => format!("Partial:{}:{}", name, label),
            Kind::TriggeredPartial {
                name,
                label,
                rule_code,
            } => format!("TriggeredPartial:{}:{}:{}", name, label, rule_code),
            Kind::Transform {
                base,
                local,
                global,
            } => {
                let mut value = String::new();
                if let Some(local) = local {
                    value.push_str(&local.to_trace_string());
                    value.push('@');
                }
                if let Some(global) = global {
                    value.push_str(&global.to_trace_string());
                    value.push(':');
                }
                value.push_str(&base.to_trace_string());
                value
            }
        }
    }

    /// Parse a named kind. Partial and transform kinds only have a JSON form.
    pub fn from_trace_string(value: &str) -> Result<Kind, Error> {
        let unsupported = if value.is_empty() {
            "non-empty kind"
        } else if value.starts_with("TriggeredPartial:") {
            "Non-TriggeredPartial Kind"
        } else if value.starts_with("Partial:") {
            "Non-Partial Kind"
        } else if value.contains(|c: char| c == ':' || c == '@') {
            "Non-Transform Kind"
        } else {
            return Ok(Kind::named(value));
        };
        Err(Error::json_validation(value, Some("kind"), unsupported))
    }

    pub fn to_json(&self) -> Value {
        let mut value = Map::new();
        match self {
            Kind::Named(name) => {
                value.insert("kind".to_string(), Value::String(name.to_string()));
            }
            Kind::Partial { name, label } => {
                value.insert("kind".to_string(), Value::String(name.to_string()));
                value.insert("partial_label".to_string(), Value::String(label.to_string()));
            }
            Kind::TriggeredPartial {
                name,
                label,
                rule_code,
            } => {
                value.insert("kind".to_string(), Value::String(name.to_string()));
                value.insert("partial_label".to_string(), Value::String(label.to_string()));
                value.insert("triggered_rule".to_string(), Value::from(*rule_code));
            }
            Kind::Transform {
                base,
                local,
                global,
            } => {
                let mut inner = Map::new();
                if let Some(local) = local {
                    inner.insert("local".to_string(), Value::String(local.to_trace_string()));
                }
                if let Some(global) = global {
                    inner.insert("global".to_string(), Value::String(global.to_trace_string()));
                }
                inner.insert("base".to_string(), Value::String(base.to_trace_string()));
                value.insert("kind".to_string(), Value::Object(inner));
            }
        }
        Value::Object(value)
    }

    pub fn from_json(value: &Value) -> Result<Kind, Error> {
        json::check_unexpected_members(value, &["kind", "partial_label", "triggered_rule"])?;
        let kind = match value.get("kind") {
            Some(kind) => kind,
            None => {
                return Err(Error::json_validation(
                    value.to_string(),
                    Some("kind"),
                    "string or object",
                ))
            }
        };

        if kind.is_object() {
            json::check_unexpected_members(kind, &["local", "global", "base"])?;
            let transforms = |field: &str| -> Result<Option<TransformList>, Error> {
                match kind.get(field) {
                    Some(_) => Ok(Some(TransformList::from_trace_string(json::string_field(
                        kind, field,
                    )?)?)),
                    None => Ok(None),
                }
            };
            let local = transforms("local")?;
            let global = transforms("global")?;
            let base = Kind::from_trace_string(json::string_field(kind, "base")?)?;
            return Ok(Kind::transform(base, local, global));
        }

        let name = json::string_field(value, "kind")?;
        if value.get("partial_label").is_none() {
            return Kind::from_trace_string(name);
        }
        let partial = Kind::partial(name, json::string_field(value, "partial_label")?);
        match value.get("triggered_rule") {
            None => Ok(partial),
            Some(_) => Ok(partial.triggered(json::integer_field(value, "triggered_rule")?)),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_trace_string())
    }
}
