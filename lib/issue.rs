//! Issues: sources meeting sinks under a rule.
//!
//! Every path through the code which realizes the same rule at the same call
//! produces its own `Issue`. The owner of the issues groups them with
//! [`Issue::group_key`] and joins each group into a single reported issue,
//! which keeps the number of issues bounded by the number of calls.

use crate::access::AccessPath;
use crate::domain::AbstractDomain;
use crate::kind::Kind;
use crate::method::{ExploitabilityOrigin, Method, Position};
use crate::rules::Rule;
use crate::symbol::Symbol;
use crate::taint::{ExportOriginsMode, Taint};
use crate::Error;
use rustc_hash::FxHasher;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Ordinal of a sink among the calls of a method, in textual order.
pub type TextualOrderIndex = u32;

/// Where the sink of an issue is.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Callee {
    /// The sink is on the return value of the method.
    Return,
    /// The sink is on a call that could not be resolved.
    Unresolved,
    /// The sink is on a call of this method.
    Named(Symbol),
    /// The sink was found through an exploitability origin, owned by the
    /// analysis.
    Exploitability(Arc<ExploitabilityOrigin>),
}

impl Callee {
    pub const RETURN: &'static str = "return";
    pub const UNRESOLVED: &'static str = "unresolved";

    pub fn named<S: Into<Symbol>>(name: S) -> Callee {
        Callee::Named(name.into())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Callee::Return => Value::String(Callee::RETURN.to_string()),
            Callee::Unresolved => Value::String(Callee::UNRESOLVED.to_string()),
            Callee::Named(name) => Value::String(name.to_string()),
            Callee::Exploitability(origin) => origin.to_json(),
        }
    }
}

impl Default for Callee {
    fn default() -> Callee {
        Callee::Return
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Callee::Return => write!(f, "{}", Callee::RETURN),
            Callee::Unresolved => write!(f, "{}", Callee::UNRESOLVED),
            Callee::Named(name) => write!(f, "{}", name),
            Callee::Exploitability(origin) => write!(f, "{}", origin),
        }
    }
}

/// What identifies a group of issues to be joined.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct IssueGroupKey {
    pub rule_code: Option<i64>,
    pub callee: Callee,
    pub sink_index: TextualOrderIndex,
}

#[derive(Clone, Debug)]
pub struct Issue {
    sources: Taint,
    sinks: Taint,
    rule: Option<Arc<Rule>>,
    callee: Callee,
    sink_index: TextualOrderIndex,
    position: Option<Position>,
}

impl Issue {
    pub fn new(
        sources: Taint,
        sinks: Taint,
        rule: Arc<Rule>,
        callee: Callee,
        sink_index: TextualOrderIndex,
        position: Position,
    ) -> Issue {
        Issue {
            sources,
            sinks,
            rule: Some(rule),
            callee,
            sink_index,
            position: Some(position),
        }
    }

    pub fn sources(&self) -> &Taint {
        &self.sources
    }

    pub fn sinks(&self) -> &Taint {
        &self.sinks
    }

    pub fn rule(&self) -> Option<&Arc<Rule>> {
        self.rule.as_ref()
    }

    pub fn rule_code(&self) -> Option<i64> {
        self.rule.as_ref().map(|rule| rule.code())
    }

    pub fn callee(&self) -> &Callee {
        &self.callee
    }

    pub fn sink_index(&self) -> TextualOrderIndex {
        self.sink_index
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Issues have no top element.
    pub fn top() -> Result<Issue, Error> {
        Err(Error::UnsupportedOperation("Issue::top"))
    }

    pub fn set_to_top(&mut self) -> Result<(), Error> {
        Err(Error::UnsupportedOperation("Issue::set_to_top"))
    }

    pub fn set_to_bottom(&mut self) {
        self.sources = Taint::bottom();
        self.sinks = Taint::bottom();
    }

    /// Keep the sources for which `predicate(callee, callee_port, kind)`
    /// holds. The issue becomes bottom if no source is left.
    pub fn filter_sources<P>(&mut self, predicate: P)
    where
        P: FnMut(Option<&Method>, Option<&AccessPath>, &Kind) -> bool,
    {
        self.sources.filter(predicate);
        if self.sources.is_bottom() {
            self.set_to_bottom();
        }
    }

    /// Keep the sinks for which `predicate(callee, callee_port, kind)` holds.
    /// The issue becomes bottom if no sink is left.
    pub fn filter_sinks<P>(&mut self, predicate: P)
    where
        P: FnMut(Option<&Method>, Option<&AccessPath>, &Kind) -> bool,
    {
        self.sinks.filter(predicate);
        if self.sinks.is_bottom() {
            self.set_to_bottom();
        }
    }

    pub fn group_key(&self) -> IssueGroupKey {
        IssueGroupKey {
            rule_code: self.rule_code(),
            callee: self.callee.clone(),
            sink_index: self.sink_index,
        }
    }

    /// Whether two issues belong to the same group. Sources, sinks and
    /// position are not compared.
    pub fn group_eq(&self, other: &Issue) -> bool {
        self.rule_code() == other.rule_code()
            && self.callee == other.callee
            && self.sink_index == other.sink_index
    }

    /// Hash consistent with `group_eq`.
    pub fn group_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.rule_code().hash(&mut hasher);
        self.callee.hash(&mut hasher);
        self.sink_index.hash(&mut hasher);
        hasher.finish()
    }

    fn assert_same_group(&self, other: &Issue) {
        assert!(
            self.group_eq(other),
            "cannot combine issues of different groups: {:?} and {:?}",
            self.group_key(),
            other.group_key()
        );
    }

    pub fn to_json(&self, mode: ExportOriginsMode) -> Value {
        serde_json::json!({
            "sources": self.sources.to_json(mode),
            "sinks": self.sinks.to_json(mode),
            "rule": self.rule_code(),
            "callee": self.callee.to_json(),
            "sink_index": self.sink_index,
            "position": self.position.as_ref().map(Position::to_json),
        })
    }
}

impl Default for Issue {
    fn default() -> Issue {
        Issue::bottom()
    }
}

impl AbstractDomain for Issue {
    fn bottom() -> Issue {
        Issue {
            sources: Taint::bottom(),
            sinks: Taint::bottom(),
            rule: None,
            callee: Callee::Return,
            sink_index: 0,
            position: None,
        }
    }

    fn is_bottom(&self) -> bool {
        self.sources.is_bottom()
            || self.sinks.is_bottom()
            || self.rule.is_none()
            || self.position.is_none()
    }

    fn leq(&self, other: &Issue) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        self.assert_same_group(other);
        self.sources.leq(&other.sources) && self.sinks.leq(&other.sinks)
    }

    fn join_with(&mut self, other: &Issue) {
        if other.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = other.clone();
            return;
        }
        self.assert_same_group(other);
        self.sources.join_with(&other.sources);
        self.sinks.join_with(&other.sinks);
    }

    fn widen_with(&mut self, other: &Issue) {
        if other.is_bottom() {
            return;
        }
        if self.is_bottom() {
            *self = other.clone();
            return;
        }
        self.assert_same_group(other);
        self.sources.widen_with(&other.sources);
        self.sinks.widen_with(&other.sinks);
    }

    fn meet_with(&mut self, other: &Issue) {
        if self.is_bottom() {
            return;
        }
        if other.is_bottom() {
            self.set_to_bottom();
            return;
        }
        self.assert_same_group(other);
        self.sources.meet_with(&other.sources);
        self.sinks.meet_with(&other.sinks);
        if self.sources.is_bottom() || self.sinks.is_bottom() {
            self.set_to_bottom();
        }
    }

    fn narrow_with(&mut self, other: &Issue) {
        if self.is_bottom() {
            return;
        }
        if other.is_bottom() {
            self.set_to_bottom();
            return;
        }
        self.assert_same_group(other);
        self.sources.narrow_with(&other.sources);
        self.sinks.narrow_with(&other.sinks);
        if self.sources.is_bottom() || self.sinks.is_bottom() {
            self.set_to_bottom();
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Issue(sources={:?}, sinks={:?}, rule={}, callee={}, sink_index={}, position={})",
            self.sources.kinds(),
            self.sinks.kinds(),
            self.rule
                .as_ref()
                .map(|rule| rule.code().to_string())
                .unwrap_or_else(|| "null".to_string()),
            self.callee,
            self.sink_index,
            self.position
                .as_ref()
                .map(|position| position.to_string())
                .unwrap_or_else(|| "null".to_string())
        )
    }
}
