//! Rules: which flows of taint are vulnerabilities.
//!
//! A [`Rule`] has one of three shapes. The [`Rules`] collection indexes them
//! by the kinds they match, and [`RulesCoverage`] reports which rules the
//! kinds of a model set can fire at all.

mod collection;
mod coverage;
mod exploitability;
mod multi_source;
mod rule;
mod source_sink;

pub use self::collection::Rules;
pub use self::coverage::{CoveredRule, RulesCoverage};
pub use self::exploitability::SourceSinkWithExploitabilityRule;
pub use self::multi_source::MultiSourceMultiSinkRule;
pub use self::rule::Rule;
pub use self::source_sink::SourceSinkRule;

use crate::json;
use crate::kind::{Kind, Transform};
use crate::Error;
use serde_json::Value;
use std::collections::BTreeSet;

pub type KindSet = BTreeSet<Kind>;
pub type TransformSet = BTreeSet<Transform>;

/// The elements of `rule_kinds` present in `kinds`.
pub(crate) fn intersecting_kinds<T: Clone + Ord>(
    rule_kinds: &BTreeSet<T>,
    kinds: &BTreeSet<T>,
) -> BTreeSet<T> {
    rule_kinds.intersection(kinds).cloned().collect()
}

/// Named kinds, as written in rules.
fn kinds_from_json(values: &[Value]) -> Result<KindSet, Error> {
    values
        .iter()
        .map(|value| json::string(value).and_then(Kind::from_trace_string))
        .collect()
}

fn kinds_to_json(kinds: &KindSet) -> Value {
    Value::Array(
        kinds
            .iter()
            .map(|kind| Value::String(kind.to_trace_string()))
            .collect(),
    )
}
