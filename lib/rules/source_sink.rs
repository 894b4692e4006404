use crate::json;
use crate::kind::{Kind, Transform, TransformList};
use crate::rules::{
    intersecting_kinds, kinds_from_json, kinds_to_json, CoveredRule, KindSet, TransformSet,
};
use crate::Error;
use serde_json::{Map, Value};

/// Flows from any of `source_kinds` into any of `sink_kinds`, optionally
/// through exactly the transforms `transforms`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceSinkRule {
    pub(crate) name: String,
    pub(crate) code: i64,
    pub(crate) description: String,
    source_kinds: KindSet,
    sink_kinds: KindSet,
    transforms: Option<TransformList>,
}

impl SourceSinkRule {
    /// Panics if there are no source or no sink kinds.
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        code: i64,
        description: D,
        source_kinds: KindSet,
        sink_kinds: KindSet,
        transforms: Option<TransformList>,
    ) -> SourceSinkRule {
        assert!(!source_kinds.is_empty(), "rule {} has no source kinds", code);
        assert!(!sink_kinds.is_empty(), "rule {} has no sink kinds", code);
        SourceSinkRule {
            name: name.into(),
            code,
            description: description.into(),
            source_kinds,
            sink_kinds,
            transforms,
        }
    }

    pub fn source_kinds(&self) -> &KindSet {
        &self.source_kinds
    }

    pub fn sink_kinds(&self) -> &KindSet {
        &self.sink_kinds
    }

    pub fn transforms(&self) -> Option<&TransformList> {
        self.transforms.as_ref()
    }

    pub fn uses(&self, kind: &Kind) -> bool {
        let kind = kind.discard_transforms();
        self.source_kinds.contains(kind) || self.sink_kinds.contains(kind)
    }

    pub fn coverage(
        &self,
        sources: &KindSet,
        sinks: &KindSet,
        transforms: &TransformSet,
    ) -> Option<CoveredRule> {
        let used_sources = intersecting_kinds(&self.source_kinds, sources);
        if used_sources.is_empty() {
            return None;
        }

        let used_sinks = intersecting_kinds(&self.sink_kinds, sinks);
        if used_sinks.is_empty() {
            return None;
        }

        // Transform usage only matters for rules which have transforms.
        let used_transforms = match self.transforms {
            Some(ref rule_transforms) => {
                let rule_transforms: TransformSet = rule_transforms.iter().cloned().collect();
                let used_transforms = intersecting_kinds(&rule_transforms, transforms);
                if used_transforms.is_empty() {
                    return None;
                }
                used_transforms
            }
            None => TransformSet::new(),
        };

        Some(CoveredRule::new(self.code, used_sources, used_sinks, used_transforms))
    }

    pub(crate) fn from_json(
        name: &str,
        code: i64,
        description: &str,
        value: &Value,
    ) -> Result<SourceSinkRule, Error> {
        json::check_unexpected_members(
            value,
            &[
                "name",
                "code",
                "description",
                "sources",
                "sinks",
                "transforms",
                "oncall",
            ],
        )?;
        let source_kinds = kinds_from_json(json::nonempty_array_field(value, "sources")?)?;
        let sink_kinds = kinds_from_json(json::nonempty_array_field(value, "sinks")?)?;
        let transforms = value.get("transforms").map(TransformList::from_json).transpose()?;
        Ok(SourceSinkRule::new(
            name,
            code,
            description,
            source_kinds,
            sink_kinds,
            transforms,
        ))
    }

    pub(crate) fn to_json(&self, value: &mut Map<String, Value>) {
        value.insert("sources".to_string(), kinds_to_json(&self.source_kinds));
        value.insert("sinks".to_string(), kinds_to_json(&self.sink_kinds));
        if let Some(ref transforms) = self.transforms {
            value.insert(
                "transforms".to_string(),
                Value::Array(
                    transforms
                        .iter()
                        .map(Transform::to_trace_string)
                        .map(Value::String)
                        .collect(),
                ),
            );
        }
    }
}
