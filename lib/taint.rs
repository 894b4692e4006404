//! Taint: which kinds reached a location, and through which frames.

use crate::access::AccessPath;
use crate::domain::AbstractDomain;
use crate::kind::Kind;
use crate::method::Method;
use crate::symbol::Symbol;
use crate::trace::CallInfo;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Whether origins are written for every frame or only for leaf frames.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExportOriginsMode {
    Always,
    OnlyOnOrigins,
}

/// The kinds of one frame, each with the set of origins it was introduced at.
pub type KindFrames = BTreeMap<Kind, BTreeSet<Symbol>>;

/// Taint grouped by frame.
///
/// Bottom is the empty taint. The order is inclusion of frames, kinds and
/// origins, so joins are unions and meets are intersections.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Taint {
    frames: BTreeMap<CallInfo, KindFrames>,
}

impl Taint {
    pub fn new() -> Taint {
        Taint::default()
    }

    /// Taint holding a single kind on a single frame.
    pub fn from_frame<I>(call_info: CallInfo, kind: Kind, origins: I) -> Taint
    where
        I: IntoIterator<Item = Symbol>,
    {
        let mut taint = Taint::new();
        taint.add(call_info, kind, origins);
        taint
    }

    pub fn add<I>(&mut self, call_info: CallInfo, kind: Kind, origins: I)
    where
        I: IntoIterator<Item = Symbol>,
    {
        self.frames
            .entry(call_info)
            .or_insert_with(BTreeMap::new)
            .entry(kind)
            .or_insert_with(BTreeSet::new)
            .extend(origins);
    }

    pub fn frames(&self) -> &BTreeMap<CallInfo, KindFrames> {
        &self.frames
    }

    pub fn call_infos(&self) -> impl Iterator<Item = &CallInfo> {
        self.frames.keys()
    }

    /// Every kind, on any frame.
    pub fn kinds(&self) -> BTreeSet<Kind> {
        self.frames
            .values()
            .flat_map(|kinds| kinds.keys().cloned())
            .collect()
    }

    pub fn contains_kind(&self, kind: &Kind) -> bool {
        self.frames.values().any(|kinds| kinds.contains_key(kind))
    }

    /// Keep the kinds for which `predicate(callee, callee_port, kind)`
    /// holds. Frames left without kinds are removed.
    pub fn filter<P>(&mut self, mut predicate: P)
    where
        P: FnMut(Option<&Method>, Option<&AccessPath>, &Kind) -> bool,
    {
        for (call_info, kinds) in self.frames.iter_mut() {
            kinds.retain(|kind, _| predicate(call_info.callee(), call_info.callee_port(), kind));
        }
        self.frames.retain(|_, kinds| !kinds.is_empty());
    }

    pub fn to_json(&self, mode: ExportOriginsMode) -> Value {
        let frames = self
            .frames
            .iter()
            .map(|(call_info, kinds)| {
                let export_origins = match mode {
                    ExportOriginsMode::Always => true,
                    ExportOriginsMode::OnlyOnOrigins => call_info.is_leaf(),
                };
                let kinds = kinds
                    .iter()
                    .map(|(kind, origins)| {
                        let mut value = Map::new();
                        value.insert("kind".to_string(), Value::String(kind.to_trace_string()));
                        if export_origins && !origins.is_empty() {
                            value.insert(
                                "origins".to_string(),
                                Value::Array(
                                    origins
                                        .iter()
                                        .map(|origin| Value::String(origin.to_string()))
                                        .collect(),
                                ),
                            );
                        }
                        Value::Object(value)
                    })
                    .collect();

                let mut value = match call_info.to_json() {
                    Value::Object(value) => value,
                    _ => Map::new(),
                };
                value.insert("kinds".to_string(), Value::Array(kinds));
                Value::Object(value)
            })
            .collect();
        Value::Array(frames)
    }
}

impl AbstractDomain for Taint {
    fn bottom() -> Taint {
        Taint::new()
    }

    fn is_bottom(&self) -> bool {
        self.frames.is_empty()
    }

    fn leq(&self, other: &Taint) -> bool {
        self.frames.iter().all(|(call_info, kinds)| {
            let other_kinds = match other.frames.get(call_info) {
                Some(other_kinds) => other_kinds,
                None => return false,
            };
            kinds.iter().all(|(kind, origins)| match other_kinds.get(kind) {
                Some(other_origins) => origins.is_subset(other_origins),
                None => false,
            })
        })
    }

    fn join_with(&mut self, other: &Taint) {
        for (call_info, kinds) in &other.frames {
            let frame = self
                .frames
                .entry(call_info.clone())
                .or_insert_with(BTreeMap::new);
            for (kind, origins) in kinds {
                frame
                    .entry(kind.clone())
                    .or_insert_with(BTreeSet::new)
                    .extend(origins.iter().cloned());
            }
        }
    }

    fn meet_with(&mut self, other: &Taint) {
        self.frames.retain(|call_info, kinds| {
            let other_kinds = match other.frames.get(call_info) {
                Some(other_kinds) => other_kinds,
                None => return false,
            };
            kinds.retain(|kind, origins| match other_kinds.get(kind) {
                Some(other_origins) => {
                    origins.retain(|origin| other_origins.contains(origin));
                    true
                }
                None => false,
            });
            !kinds.is_empty()
        });
    }
}
