use crate::json;
use crate::kind::{Kind, TransformList};
use crate::rules::{
    CoveredRule, KindSet, MultiSourceMultiSinkRule, SourceSinkRule,
    SourceSinkWithExploitabilityRule, TransformSet,
};
use crate::Error;
use serde_json::{Map, Value};
use std::fmt;

/// A class of vulnerability: which flows of taint are reported, and under
/// which code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rule {
    SourceSink(SourceSinkRule),
    MultiSource(MultiSourceMultiSinkRule),
    Exploitability(SourceSinkWithExploitabilityRule),
}

impl Rule {
    pub fn name(&self) -> &str {
        match self {
            Rule::SourceSink(rule) => &rule.name,
            Rule::MultiSource(rule) => &rule.name,
            Rule::Exploitability(rule) => &rule.name,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Rule::SourceSink(rule) => rule.code,
            Rule::MultiSource(rule) => rule.code,
            Rule::Exploitability(rule) => rule.code,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Rule::SourceSink(rule) => &rule.description,
            Rule::MultiSource(rule) => &rule.description,
            Rule::Exploitability(rule) => &rule.description,
        }
    }

    pub fn as_source_sink(&self) -> Option<&SourceSinkRule> {
        match self {
            Rule::SourceSink(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_multi_source(&self) -> Option<&MultiSourceMultiSinkRule> {
        match self {
            Rule::MultiSource(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_exploitability(&self) -> Option<&SourceSinkWithExploitabilityRule> {
        match self {
            Rule::Exploitability(rule) => Some(rule),
            _ => None,
        }
    }

    /// Every source kind the rule matches, effect sources included.
    pub fn source_kinds(&self) -> KindSet {
        match self {
            Rule::SourceSink(rule) => rule.source_kinds().clone(),
            Rule::MultiSource(rule) => rule.source_kinds(),
            Rule::Exploitability(rule) => rule
                .source_kinds()
                .iter()
                .chain(rule.effect_source_kinds())
                .cloned()
                .collect(),
        }
    }

    pub fn sink_kinds(&self) -> KindSet {
        match self {
            Rule::SourceSink(rule) => rule.sink_kinds().clone(),
            Rule::MultiSource(rule) => rule.partial_sink_kinds().clone(),
            Rule::Exploitability(rule) => rule.sink_kinds().clone(),
        }
    }

    pub fn transforms(&self) -> Option<&TransformList> {
        match self {
            Rule::SourceSink(rule) => rule.transforms(),
            _ => None,
        }
    }

    /// Whether any of the kinds of the rule is `kind`.
    pub fn uses(&self, kind: &Kind) -> bool {
        match self {
            Rule::SourceSink(rule) => rule.uses(kind),
            Rule::MultiSource(rule) => rule.uses(kind),
            Rule::Exploitability(rule) => rule.uses(kind),
        }
    }

    /// The part of the rule exercised by the given kinds, or `None` if the
    /// rule cannot fire with them.
    pub fn coverage(
        &self,
        sources: &KindSet,
        sinks: &KindSet,
        transforms: &TransformSet,
    ) -> Option<CoveredRule> {
        match self {
            Rule::SourceSink(rule) => rule.coverage(sources, sinks, transforms),
            Rule::MultiSource(rule) => rule.coverage(sources, sinks, transforms),
            Rule::Exploitability(rule) => rule.coverage(sources, sinks, transforms),
        }
    }

    /// Parse a rule. The shape is selected by the keys present, checked in
    /// the order `effect_sources`, `sources` with `sinks`, then
    /// `multi_sources` with `partial_sinks`.
    pub fn from_json(value: &Value) -> Result<Rule, Error> {
        let object = json::validate_object(value)?;
        let name = json::string_field(value, "name")?;
        let code = json::integer_field(value, "code")?;
        let description = json::string_field(value, "description")?;

        if object.contains_key("effect_sources") {
            Ok(Rule::Exploitability(SourceSinkWithExploitabilityRule::from_json(
                name,
                code,
                description,
                value,
            )?))
        } else if object.contains_key("sources") && object.contains_key("sinks") {
            Ok(Rule::SourceSink(SourceSinkRule::from_json(
                name,
                code,
                description,
                value,
            )?))
        } else if object.contains_key("multi_sources") && object.contains_key("partial_sinks") {
            Ok(Rule::MultiSource(MultiSourceMultiSinkRule::from_json(
                name,
                code,
                description,
                value,
            )?))
        } else {
            Err(Error::json_validation(
                value.to_string(),
                None,
                "keys: sources+[transforms+]sinks or multi_sources+partial_sinks or \
                 effect_sources+sources+sinks",
            ))
        }
    }

    pub fn to_json(&self) -> Value {
        let mut value = Map::new();
        value.insert("name".to_string(), Value::String(self.name().to_string()));
        value.insert("code".to_string(), Value::from(self.code()));
        value.insert(
            "description".to_string(),
            Value::String(self.description().to_string()),
        );
        match self {
            Rule::SourceSink(rule) => rule.to_json(&mut value),
            Rule::MultiSource(rule) => rule.to_json(&mut value),
            Rule::Exploitability(rule) => rule.to_json(&mut value),
        }
        Value::Object(value)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rule(name={}, code={})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Transform;
    use serde_json::json;

    fn kinds(names: &[&str]) -> KindSet {
        names.iter().map(|name| Kind::named(*name)).collect()
    }

    #[test]
    fn source_sink_rule() {
        let value = json!({
            "name": "Intent to log",
            "code": 1,
            "description": "User input flows into logs",
            "sources": ["UserInput"],
            "sinks": ["Logging", "Network"],
        });
        let rule = Rule::from_json(&value).unwrap();
        let source_sink = rule.as_source_sink().unwrap();
        assert_eq!(rule.code(), 1);
        assert_eq!(rule.name(), "Intent to log");
        assert_eq!(source_sink.source_kinds(), &kinds(&["UserInput"]));
        assert_eq!(source_sink.sink_kinds(), &kinds(&["Logging", "Network"]));
        assert!(rule.transforms().is_none());
        assert_eq!(rule.to_json(), value);
    }

    #[test]
    fn source_sink_rule_with_transforms() {
        let value = json!({
            "name": "Transformed",
            "code": 2,
            "description": "",
            "sources": ["UserInput"],
            "sinks": ["Logging"],
            "transforms": ["Encode", "Decode"],
        });
        let rule = Rule::from_json(&value).unwrap();
        assert_eq!(rule.transforms().unwrap().to_trace_string(), "Encode:Decode");
        assert!(rule.uses(&Kind::transform(
            Kind::named("Logging"),
            TransformList::new(vec![Transform::named("Encode")]),
            None
        )));
        assert_eq!(rule.to_json(), value);
    }

    #[test]
    fn multi_source_rule() {
        let value = json!({
            "name": "Multi",
            "code": 3,
            "description": "",
            "multi_sources": {"a": ["SourceA"], "b": ["SourceB"]},
            "partial_sinks": ["SinkX"],
        });
        let rule = Rule::from_json(&value).unwrap();
        let multi_source = rule.as_multi_source().unwrap();
        assert_eq!(multi_source.partial_sink_kinds().len(), 2);
        assert_eq!(
            multi_source.partial_sink_kinds_for(&"a".into()),
            vec![Kind::partial("SinkX", "a")].into_iter().collect()
        );
        assert!(rule.uses(&Kind::named("SourceB")));
        assert!(rule.uses(&Kind::partial("SinkX", "b")));
        assert!(!rule.uses(&Kind::named("SinkX")));
        assert_eq!(rule.to_json(), value);
    }

    #[test]
    fn multi_source_rule_requires_two_labels() {
        let value = json!({
            "name": "Multi",
            "code": 3,
            "description": "",
            "multi_sources": {"a": ["SourceA"]},
            "partial_sinks": ["SinkX"],
        });
        match Rule::from_json(&value) {
            Err(Error::JsonValidation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("multi_sources"))
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn exploitability_rule() {
        let value = json!({
            "name": "Exploitable",
            "code": 4,
            "description": "",
            "effect_sources": ["Exported"],
            "sources": ["UserInput"],
            "sinks": ["Exec"],
        });
        let rule = Rule::from_json(&value).unwrap();
        assert!(rule.as_exploitability().is_some());
        assert_eq!(rule.source_kinds(), kinds(&["Exported", "UserInput"]));
        assert_eq!(rule.to_json(), value);
    }

    #[test]
    fn invalid_rules() {
        let missing_shape = json!({"name": "Rule", "code": 5, "description": "", "sources": ["A"]});
        match Rule::from_json(&missing_shape) {
            Err(Error::JsonValidation { expected, .. }) => assert_eq!(
                expected,
                "keys: sources+[transforms+]sinks or multi_sources+partial_sinks or \
                 effect_sources+sources+sinks"
            ),
            other => panic!("unexpected result {:?}", other),
        }

        let unexpected = json!({
            "name": "Rule", "code": 5, "description": "",
            "sources": ["A"], "sinks": ["B"], "features": [],
        });
        assert!(Rule::from_json(&unexpected).is_err());

        let empty = json!({
            "name": "Rule", "code": 5, "description": "", "sources": [], "sinks": ["B"],
        });
        assert!(Rule::from_json(&empty).is_err());

        let unnamed = json!({"code": 5, "description": "", "sources": ["A"], "sinks": ["B"]});
        assert!(Rule::from_json(&unnamed).is_err());
        assert!(Rule::from_json(&json!([])).is_err());
    }
}
