use crate::rules::{KindSet, Rules, TransformSet};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The kinds of a rule that were actually used.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoveredRule {
    pub code: i64,
    pub used_sources: KindSet,
    pub used_sinks: KindSet,
    pub used_transforms: TransformSet,
}

impl CoveredRule {
    pub fn new(
        code: i64,
        used_sources: KindSet,
        used_sinks: KindSet,
        used_transforms: TransformSet,
    ) -> CoveredRule {
        CoveredRule {
            code,
            used_sources,
            used_sinks,
            used_transforms,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut cases = Map::new();
        cases.insert(
            "sources".to_string(),
            Value::Array(
                self.used_sources
                    .iter()
                    .map(|kind| Value::String(kind.to_trace_string()))
                    .collect(),
            ),
        );
        cases.insert(
            "sinks".to_string(),
            Value::Array(
                self.used_sinks
                    .iter()
                    .map(|kind| Value::String(kind.to_trace_string()))
                    .collect(),
            ),
        );
        if !self.used_transforms.is_empty() {
            cases.insert(
                "transforms".to_string(),
                Value::Array(
                    self.used_transforms
                        .iter()
                        .map(|transform| Value::String(transform.to_trace_string()))
                        .collect(),
                ),
            );
        }

        let mut value = Map::new();
        value.insert("code".to_string(), Value::from(self.code));
        value.insert("cases".to_string(), Value::Object(cases));
        Value::Object(value)
    }
}

/// Every rule code, either covered or lacking models.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RulesCoverage {
    pub covered_rules: BTreeMap<i64, CoveredRule>,
    pub non_covered_rule_codes: BTreeSet<i64>,
}

impl RulesCoverage {
    pub fn create(
        rules: &Rules,
        used_sources: &KindSet,
        used_sinks: &KindSet,
        used_transforms: &TransformSet,
    ) -> RulesCoverage {
        let mut coverage = RulesCoverage::default();
        for rule in rules.iter() {
            match rule.coverage(used_sources, used_sinks, used_transforms) {
                Some(covered_rule) => {
                    coverage.covered_rules.insert(rule.code(), covered_rule);
                }
                None => {
                    coverage.non_covered_rule_codes.insert(rule.code());
                }
            }
        }
        coverage
    }

    pub fn is_covered(&self, code: i64) -> bool {
        self.covered_rules.contains_key(&code)
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "category_coverage": {
                "rules_covered": self
                    .covered_rules
                    .values()
                    .map(CoveredRule::to_json)
                    .collect::<Vec<Value>>(),
                "rules_lacking_models": self
                    .non_covered_rule_codes
                    .iter()
                    .collect::<Vec<&i64>>(),
            }
        })
    }
}
