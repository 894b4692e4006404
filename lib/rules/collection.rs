use crate::json;
use crate::kind::{Kind, TransformList};
use crate::rules::{KindSet, Rule, RulesCoverage, TransformSet};
use crate::Error;
use log::{error, trace, warn};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type RuleIndex = FxHashMap<Kind, FxHashMap<Kind, Vec<Arc<Rule>>>>;

/// The rules of an analysis, indexed by the kinds that fire them.
#[derive(Clone, Debug, Default)]
pub struct Rules {
    rules: BTreeMap<i64, Arc<Rule>>,
    source_to_sink_to_rules: RuleIndex,
    source_to_partial_sink_to_rules: RuleIndex,
    source_to_sink_to_exploitability_rules: RuleIndex,
    effect_source_to_sink_to_exploitability_rules: RuleIndex,
}

fn insert(index: &mut RuleIndex, source: &Kind, sink: Kind, rule: &Arc<Rule>) {
    index
        .entry(source.clone())
        .or_insert_with(FxHashMap::default)
        .entry(sink)
        .or_insert_with(Vec::new)
        .push(rule.clone());
}

fn lookup<'r>(index: &'r RuleIndex, source: &Kind, sink: &Kind) -> &'r [Arc<Rule>] {
    index
        .get(source)
        .and_then(|sinks| sinks.get(sink))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Fold the transforms of the source, reversed, and of the sink into the
/// local transforms of the sink, which is how rules index transformed sinks.
fn canonicalize_sink_kind(source: &Kind, sink: &Kind) -> Kind {
    let source_transforms = source.all_transforms().map(|transforms| transforms.reverse());
    let all_transforms =
        TransformList::concat(source_transforms.as_ref(), sink.all_transforms().as_ref());
    match all_transforms {
        Some(transforms) => {
            Kind::transform(sink.discard_transforms().clone(), Some(transforms), None)
        }
        None => sink.clone(),
    }
}

impl Rules {
    pub fn new() -> Rules {
        Rules::default()
    }

    pub fn from_rules<I: IntoIterator<Item = Rule>>(rules: I) -> Rules {
        let mut result = Rules::new();
        for rule in rules {
            result.add(rule);
        }
        result
    }

    /// Parse `null` or an array of rules.
    pub fn from_json(value: &Value) -> Result<Rules, Error> {
        let mut rules = Rules::new();
        for rule in json::null_or_array(value)? {
            rules.add(Rule::from_json(rule)?);
        }
        Ok(rules)
    }

    /// Register a rule. A rule whose code is already taken is logged and
    /// dropped.
    pub fn add(&mut self, rule: Rule) {
        let code = rule.code();
        if let Some(existing) = self.rules.get(&code) {
            error!(
                "A rule for code {} already exists! Duplicate rules are:\n{}\n{}",
                code,
                rule.to_json(),
                existing.to_json()
            );
            return;
        }

        let rule = Arc::new(rule);
        self.rules.insert(code, rule.clone());

        match rule.as_ref() {
            Rule::SourceSink(source_sink) => {
                for source in source_sink.source_kinds() {
                    for sink in source_sink.sink_kinds() {
                        let sink = Kind::transform(
                            sink.clone(),
                            source_sink.transforms().cloned(),
                            None,
                        );
                        insert(&mut self.source_to_sink_to_rules, source, sink, &rule);
                    }
                }
            }
            Rule::MultiSource(multi_source) => {
                // Half of the rule is fulfilled by a source reaching a partial
                // sink of its label. It is then fully fulfilled by a source
                // of the other label reaching the triggered sink.
                for (label, sources) in multi_source.multi_source_kinds() {
                    for source in sources {
                        for sink in multi_source.partial_sink_kinds_for(label) {
                            let triggered = sink.triggered(code);
                            insert(&mut self.source_to_partial_sink_to_rules, source, sink, &rule);
                            insert(&mut self.source_to_sink_to_rules, source, triggered, &rule);
                        }
                    }
                }
            }
            Rule::Exploitability(exploitability) => {
                for source in exploitability.source_kinds() {
                    for sink in exploitability.sink_kinds() {
                        insert(
                            &mut self.source_to_sink_to_exploitability_rules,
                            source,
                            sink.clone(),
                            &rule,
                        );

                        let source_as_transform_sink = Kind::transform(
                            sink.clone(),
                            Some(TransformList::from_kind(source)),
                            None,
                        );
                        for effect_source in exploitability.effect_source_kinds() {
                            insert(
                                &mut self.effect_source_to_sink_to_exploitability_rules,
                                effect_source,
                                source_as_transform_sink.clone(),
                                &rule,
                            );
                        }
                    }
                }
            }
        }
    }

    pub fn get(&self, code: i64) -> Option<&Arc<Rule>> {
        self.rules.get(&code)
    }

    /// Rules in increasing order of code.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules fulfilled by `source` reaching `sink`.
    pub fn rules(&self, source: &Kind, sink: &Kind) -> &[Arc<Rule>] {
        trace!(
            "Searching for source-sink rules matching source: {} -> sink: {}",
            source,
            sink
        );
        let sink = canonicalize_sink_kind(source, sink);
        let rules = lookup(&self.source_to_sink_to_rules, source.discard_transforms(), &sink);
        if !rules.is_empty() {
            trace!(
                "Found rule match for: {}->{}",
                source.discard_transforms(),
                sink
            );
        }
        rules
    }

    /// Multi-source rules half fulfilled by `source` reaching `partial_sink`.
    pub fn partial_rules(&self, source: &Kind, partial_sink: &Kind) -> &[Arc<Rule>] {
        lookup(&self.source_to_partial_sink_to_rules, source, partial_sink)
    }

    /// Exploitability rules whose source and sink match. The effect source
    /// still has to be found.
    pub fn partially_fulfilled_exploitability_rules(
        &self,
        source: &Kind,
        sink: &Kind,
    ) -> &[Arc<Rule>] {
        trace!(
            "Searching for partially fulfilled exploitability rules matching \
             source: {} -> sink: {}",
            source,
            sink
        );
        let sink = canonicalize_sink_kind(source, sink);
        lookup(
            &self.source_to_sink_to_exploitability_rules,
            source.discard_transforms(),
            &sink,
        )
    }

    /// Exploitability rules fulfilled by `effect_source` reaching a sink
    /// which carries its source as a transform.
    ///
    /// Panics if the effect source is not a named kind, or the sink does not
    /// carry a source-as-transform.
    pub fn fulfilled_exploitability_rules(
        &self,
        effect_source: &Kind,
        source_as_transform_sink: &Kind,
    ) -> &[Arc<Rule>] {
        trace!(
            "Searching for fulfilled exploitability rules matching effect source: {} -> sink: {}",
            effect_source,
            source_as_transform_sink
        );
        assert!(effect_source.is_named(), "effect source {} is not named", effect_source);
        let sink = canonicalize_sink_kind(effect_source, source_as_transform_sink);
        assert!(
            sink.has_source_as_transform(),
            "sink {} has no source-as-transform",
            sink
        );
        lookup(
            &self.effect_source_to_sink_to_exploitability_rules,
            effect_source,
            &sink,
        )
    }

    /// The kinds of `kinds` which no rule uses. Triggered partial kinds are
    /// created by the analysis and never reported.
    pub fn collect_unused_kinds<'k, I>(&self, kinds: I) -> BTreeSet<Kind>
    where
        I: IntoIterator<Item = &'k Kind>,
    {
        let mut unused_kinds = BTreeSet::new();
        for kind in kinds {
            if kind.is_triggered_partial() {
                continue;
            }
            if self.rules.values().all(|rule| !rule.uses(kind)) {
                warn!(
                    "Kind `{}` is not used in any rule! You may want to add one for it.",
                    kind
                );
                unused_kinds.insert(kind.clone());
            }
        }
        unused_kinds
    }

    pub fn coverage(
        &self,
        used_sources: &KindSet,
        used_sinks: &KindSet,
        used_transforms: &TransformSet,
    ) -> RulesCoverage {
        RulesCoverage::create(self, used_sources, used_sinks, used_transforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Transform;
    use serde_json::json;

    fn named(name: &str) -> Kind {
        Kind::named(name)
    }

    fn transforms(names: &[&str]) -> Option<TransformList> {
        TransformList::new(names.iter().map(|name| Transform::named(*name)).collect())
    }

    fn codes(rules: &[Arc<Rule>]) -> Vec<i64> {
        rules.iter().map(|rule| rule.code()).collect()
    }

    fn rules() -> Rules {
        Rules::from_json(&json!([
            {
                "name": "Plain", "code": 1, "description": "",
                "sources": ["A"], "sinks": ["X"],
            },
            {
                "name": "Also plain", "code": 2, "description": "",
                "sources": ["A", "B"], "sinks": ["X"],
            },
            {
                "name": "Transformed", "code": 3, "description": "",
                "sources": ["A"], "sinks": ["X"], "transforms": ["T1", "T2"],
            },
            {
                "name": "Multi", "code": 4, "description": "",
                "multi_sources": {"a": ["A"], "b": ["B"]}, "partial_sinks": ["P"],
            },
            {
                "name": "Exploitable", "code": 5, "description": "",
                "effect_sources": ["E"], "sources": ["A"], "sinks": ["Y"],
            },
        ]))
        .unwrap()
    }

    #[test]
    fn from_json() {
        assert!(Rules::from_json(&Value::Null).unwrap().is_empty());
        assert_eq!(rules().len(), 5);
        assert!(Rules::from_json(&json!({})).is_err());
        assert!(Rules::from_json(&json!([{"name": "Bad"}])).is_err());
    }

    #[test]
    fn duplicate_codes_are_dropped() {
        let mut rules = rules();
        let duplicate = Rule::from_json(&json!({
            "name": "Duplicate", "code": 1, "description": "",
            "sources": ["C"], "sinks": ["Z"],
        }))
        .unwrap();
        rules.add(duplicate);
        assert_eq!(rules.len(), 5);
        assert_eq!(rules.get(1).unwrap().name(), "Plain");
        assert!(rules.rules(&named("C"), &named("Z")).is_empty());
    }

    #[test]
    fn source_sink_rules() {
        let rules = rules();
        assert_eq!(codes(rules.rules(&named("A"), &named("X"))), vec![1, 2]);
        assert_eq!(codes(rules.rules(&named("B"), &named("X"))), vec![2]);
        assert!(rules.rules(&named("C"), &named("X")).is_empty());
        assert!(rules.rules(&named("A"), &named("Y")).is_empty());
    }

    #[test]
    fn transforms_are_split_between_source_and_sink() {
        let rules = rules();
        let sink = Kind::transform(named("X"), transforms(&["T1", "T2"]), None);
        assert_eq!(codes(rules.rules(&named("A"), &sink)), vec![3]);

        // T1 was applied on the source side, T2 on the sink side.
        let source = Kind::transform(named("A"), transforms(&["T1"]), None);
        let sink = Kind::transform(named("X"), transforms(&["T2"]), None);
        assert_eq!(codes(rules.rules(&source, &sink)), vec![3]);

        let sink = Kind::transform(named("X"), transforms(&["T2", "T1"]), None);
        assert!(rules.rules(&named("A"), &sink).is_empty());
    }

    #[test]
    fn multi_source_rules() {
        let rules = rules();
        let partial_a = Kind::partial("P", "a");
        assert_eq!(codes(rules.partial_rules(&named("A"), &partial_a)), vec![4]);
        assert!(rules.partial_rules(&named("B"), &partial_a).is_empty());

        let triggered_b = Kind::partial("P", "b").triggered(4);
        assert_eq!(codes(rules.rules(&named("B"), &triggered_b)), vec![4]);
        let other_rule = Kind::partial("P", "b").triggered(40);
        assert!(rules.rules(&named("B"), &other_rule).is_empty());
    }

    #[test]
    fn exploitability_rules() {
        let rules = rules();
        assert_eq!(
            codes(rules.partially_fulfilled_exploitability_rules(&named("A"), &named("Y"))),
            vec![5]
        );
        assert!(rules.rules(&named("A"), &named("Y")).is_empty());

        let sink = Kind::transform(named("Y"), Some(TransformList::from_kind(&named("A"))), None);
        assert_eq!(codes(rules.fulfilled_exploitability_rules(&named("E"), &sink)), vec![5]);
        assert!(rules.fulfilled_exploitability_rules(&named("A"), &sink).is_empty());
    }

    #[test]
    #[should_panic]
    fn fulfilled_exploitability_requires_source_as_transform() {
        rules().fulfilled_exploitability_rules(&named("E"), &named("Y"));
    }

    #[test]
    fn unused_kinds() {
        let rules = rules();
        let kinds = vec![
            named("A"),
            named("Unused"),
            Kind::partial("P", "a"),
            Kind::partial("P", "b").triggered(4),
            Kind::transform(named("X"), transforms(&["T1"]), None),
        ];
        let unused = rules.collect_unused_kinds(&kinds);
        assert_eq!(unused, vec![named("Unused")].into_iter().collect());
    }
}
