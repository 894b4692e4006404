use crate::json;
use crate::kind::Kind;
use crate::rules::{
    intersecting_kinds, kinds_from_json, kinds_to_json, CoveredRule, KindSet, TransformSet,
};
use crate::symbol::Symbol;
use crate::Error;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A rule fulfilled only when the sources of both labels reach the partial
/// sinks of their label at the same call.
///
/// With sources `{a: [SourceA], b: [SourceB]}` and partial sinks `[SinkX]`,
/// a flow `SourceA -> Partial(SinkX, a)` fulfills half of the rule. The
/// analysis then creates `TriggeredPartial(SinkX, b, code)`, and the rule
/// is fulfilled once `SourceB` reaches that triggered sink. Recording the
/// rule code in the triggered sink distinguishes rules that share sinks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultiSourceMultiSinkRule {
    pub(crate) name: String,
    pub(crate) code: i64,
    pub(crate) description: String,
    multi_source_kinds: BTreeMap<Symbol, KindSet>,
    partial_sink_kinds: KindSet,
}

impl MultiSourceMultiSinkRule {
    /// Panics unless there are exactly two labels, each with at least one
    /// source kind, and every sink kind is partial.
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        code: i64,
        description: D,
        multi_source_kinds: BTreeMap<Symbol, KindSet>,
        partial_sink_kinds: KindSet,
    ) -> MultiSourceMultiSinkRule {
        assert_eq!(multi_source_kinds.len(), 2, "rule {} needs exactly 2 labels", code);
        assert!(multi_source_kinds.values().all(|kinds| !kinds.is_empty()));
        assert!(!partial_sink_kinds.is_empty());
        assert!(partial_sink_kinds.iter().all(Kind::is_partial));
        MultiSourceMultiSinkRule {
            name: name.into(),
            code,
            description: description.into(),
            multi_source_kinds,
            partial_sink_kinds,
        }
    }

    pub fn multi_source_kinds(&self) -> &BTreeMap<Symbol, KindSet> {
        &self.multi_source_kinds
    }

    pub fn partial_sink_kinds(&self) -> &KindSet {
        &self.partial_sink_kinds
    }

    /// The partial sinks of `label`.
    pub fn partial_sink_kinds_for(&self, label: &Symbol) -> KindSet {
        self.partial_sink_kinds
            .iter()
            .filter(|kind| kind.partial_label() == Some(label))
            .cloned()
            .collect()
    }

    pub fn source_kinds(&self) -> KindSet {
        self.multi_source_kinds.values().flatten().cloned().collect()
    }

    pub fn uses(&self, kind: &Kind) -> bool {
        self.multi_source_kinds
            .values()
            .any(|kinds| kinds.contains(kind))
            || self.partial_sink_kinds.contains(kind)
    }

    /// Every label must be covered on both the source and sink side.
    pub fn coverage(
        &self,
        sources: &KindSet,
        sinks: &KindSet,
        _transforms: &TransformSet,
    ) -> Option<CoveredRule> {
        let used_sources = used_kinds_by_label(&self.multi_source_kinds, sources)?;

        let mut sink_kinds_by_label: BTreeMap<Symbol, KindSet> = BTreeMap::new();
        for kind in &self.partial_sink_kinds {
            if let Some(label) = kind.partial_label() {
                sink_kinds_by_label
                    .entry(label.clone())
                    .or_insert_with(KindSet::new)
                    .insert(kind.clone());
            }
        }
        let used_sinks = used_kinds_by_label(&sink_kinds_by_label, sinks)?;

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
    ) -> Result<MultiSourceMultiSinkRule, Error> {
        json::check_unexpected_members(
            value,
            &[
                "name",
                "code",
                "description",
                "multi_sources",
                "partial_sinks",
                "oncall",
            ],
        )?;

        let labels = json::object_field(value, "multi_sources")?;
        let sources = &value["multi_sources"];
        let mut multi_source_kinds = BTreeMap::new();
        for label in labels.keys() {
            let kinds = kinds_from_json(json::nonempty_array_field(sources, label)?)?;
            multi_source_kinds.insert(Symbol::intern(label), kinds);
        }
        if multi_source_kinds.len() != 2 {
            return Err(Error::json_validation(
                value.to_string(),
                Some("multi_sources"),
                "exactly 2 labels (as JSON object keys) in the multi_sources object",
            ));
        }

        let mut partial_sink_kinds = KindSet::new();
        for sink in json::nonempty_array_field(value, "partial_sinks")? {
            let sink = json::string(sink)?;
            for label in multi_source_kinds.keys() {
                partial_sink_kinds.insert(Kind::partial(sink, label.clone()));
            }
        }

        Ok(MultiSourceMultiSinkRule::new(
            name,
            code,
            description,
            multi_source_kinds,
            partial_sink_kinds,
        ))
    }

    pub(crate) fn to_json(&self, value: &mut Map<String, Value>) {
        let multi_sources = self
            .multi_source_kinds
            .iter()
            .map(|(label, kinds)| (label.to_string(), kinds_to_json(kinds)))
            .collect::<Map<String, Value>>();
        let partial_sink_names = self
            .partial_sink_kinds
            .iter()
            .filter_map(|kind| match kind {
                Kind::Partial { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect::<BTreeSet<Symbol>>();
        value.insert("multi_sources".to_string(), Value::Object(multi_sources));
        value.insert(
            "partial_sinks".to_string(),
            Value::Array(
                partial_sink_names
                    .iter()
                    .map(|name| Value::String(name.to_string()))
                    .collect(),
            ),
        );
    }
}

/// The union over labels of the kinds used in each label, or `None` if some
/// label is not used at all.
fn used_kinds_by_label(
    kinds_by_label: &BTreeMap<Symbol, KindSet>,
    used_kinds: &KindSet,
) -> Option<KindSet> {
    let mut result = KindSet::new();
    for kinds in kinds_by_label.values() {
        let used = intersecting_kinds(kinds, used_kinds);
        if used.is_empty() {
            return None;
        }
        result.extend(used);
    }
    Some(result)
}
