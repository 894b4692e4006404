use crate::json;
use crate::kind::Kind;
use crate::rules::{
    intersecting_kinds, kinds_from_json, kinds_to_json, CoveredRule, KindSet, TransformSet,
};
use crate::Error;
use serde_json::{Map, Value};

/// A source-to-sink rule which is only reported when the flow is also
/// exploitable: one of `effect_source_kinds`, observed on a call effect port,
/// must reach the sink that the source reached.
///
/// Matching happens in two steps. A source reaching a sink partially fulfills
/// the rule. The sink is then carried towards call effects with the source
/// recorded as a transform, and an effect source meeting that transformed
/// sink fulfills it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceSinkWithExploitabilityRule {
    pub(crate) name: String,
    pub(crate) code: i64,
    pub(crate) description: String,
    effect_source_kinds: KindSet,
    source_kinds: KindSet,
    sink_kinds: KindSet,
}

impl SourceSinkWithExploitabilityRule {
    /// Panics if any of the kind sets is empty.
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        code: i64,
        description: D,
        effect_source_kinds: KindSet,
        source_kinds: KindSet,
        sink_kinds: KindSet,
    ) -> SourceSinkWithExploitabilityRule {
        assert!(!effect_source_kinds.is_empty(), "rule {} has no effect sources", code);
        assert!(!source_kinds.is_empty(), "rule {} has no source kinds", code);
        assert!(!sink_kinds.is_empty(), "rule {} has no sink kinds", code);
        SourceSinkWithExploitabilityRule {
            name: name.into(),
            code,
            description: description.into(),
            effect_source_kinds,
            source_kinds,
            sink_kinds,
        }
    }

    pub fn effect_source_kinds(&self) -> &KindSet {
        &self.effect_source_kinds
    }

    pub fn source_kinds(&self) -> &KindSet {
        &self.source_kinds
    }

    pub fn sink_kinds(&self) -> &KindSet {
        &self.sink_kinds
    }

    pub fn uses(&self, kind: &Kind) -> bool {
        let kind = kind.discard_transforms();
        self.effect_source_kinds.contains(kind)
            || self.source_kinds.contains(kind)
            || self.sink_kinds.contains(kind)
    }

    pub fn coverage(
        &self,
        sources: &KindSet,
        sinks: &KindSet,
        _transforms: &TransformSet,
    ) -> Option<CoveredRule> {
        let used_effect_sources = intersecting_kinds(&self.effect_source_kinds, sources);
        if used_effect_sources.is_empty() {
            return None;
        }

        let mut used_sources = intersecting_kinds(&self.source_kinds, sources);
        if used_sources.is_empty() {
            return None;
        }

        let used_sinks = intersecting_kinds(&self.sink_kinds, sinks);
        if used_sinks.is_empty() {
            return None;
        }

        used_sources.extend(used_effect_sources);
        Some(CoveredRule::new(
            self.code,
            used_sources,
            used_sinks,
            TransformSet::new(),
        ))
    }

    pub(crate) fn from_json(
        name: &str,
        code: i64,
        description: &str,
        value: &Value,
    ) -> Result<SourceSinkWithExploitabilityRule, Error> {
        json::check_unexpected_members(
            value,
            &[
                "name",
                "code",
                "description",
                "effect_sources",
                "sources",
                "sinks",
                "oncall",
            ],
        )?;
        Ok(SourceSinkWithExploitabilityRule::new(
            name,
            code,
            description,
            kinds_from_json(json::nonempty_array_field(value, "effect_sources")?)?,
            kinds_from_json(json::nonempty_array_field(value, "sources")?)?,
            kinds_from_json(json::nonempty_array_field(value, "sinks")?)?,
        ))
    }

    pub(crate) fn to_json(&self, value: &mut Map<String, Value>) {
        value.insert(
            "effect_sources".to_string(),
            kinds_to_json(&self.effect_source_kinds),
        );
        value.insert("sources".to_string(), kinds_to_json(&self.source_kinds));
        value.insert("sinks".to_string(), kinds_to_json(&self.sink_kinds));
    }
}
