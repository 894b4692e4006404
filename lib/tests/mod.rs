//! Scenarios spanning several modules.

use crate::access::{AccessPath, Path, PathElement, Root};
use crate::heuristics::{Heuristics, PortRole};
use crate::issue::{Callee, Issue};
use crate::kind::{Kind, Transform, TransformList};
use crate::method::{Method, Position};
use crate::rules::{KindSet, Rules, TransformSet};
use crate::taint::{ExportOriginsMode, Taint};
use crate::trace::{CallInfo, CallKind};
use crate::{AbstractDomain, Symbol};
use log::Level;
use serde_json::json;
use std::collections::{BTreeSet, HashMap};


fn method() -> Method {
    Method::new("LClass;.method:(LData;)V", false)
}

#[test]
fn access_path_from_configuration () {
    let access_path = AccessPath::from_string("Argument(1).x[*].y").unwrap();
    assert_eq!(access_path.root(), Root::argument(1));
    assert_eq!(
        access_path.path().elements(),
        &[
            PathElement::field("x"),
            PathElement::any_index(),
            PathElement::field("y"),
        ]
    );
    assert_eq!(access_path.to_string(), "Argument(1).x[*].y");
    assert_eq!(
        AccessPath::from_json(&access_path.to_json()).unwrap(),
        access_path
    );
}

#[test]
fn call_info_json_round_trip () {
    let call_infos = vec![
        CallInfo::make_default(),
        CallInfo::new(None, CallKind::origin(), None, Some(Position::new(Some("A.java"), 3))),
        CallInfo::new(
            Some(method()),
            CallKind::callsite(),
            Some(AccessPath::from_string("Argument(1).x").unwrap()),
            Some(Position::new(Some("A.java"), 7)),
        ),
        CallInfo::new(
            None,
            CallKind::propagation_with_trace(CallKind::callsite()),
            Some(AccessPath::from_root(Root::Return)),
            None,
        ),
    ];
    for call_info in call_infos {
        assert_eq!(CallInfo::from_json(&call_info.to_json()).unwrap(), call_info);
    }
}

#[test]
fn call_kind_propagation_is_closed () {
    let kinds = vec![
        CallKind::declaration(),
        CallKind::origin(),
        CallKind::callsite(),
        CallKind::propagation(),
        CallKind::propagation_with_trace(CallKind::declaration()),
        CallKind::propagation_with_trace(CallKind::origin()),
        CallKind::propagation_with_trace(CallKind::callsite()),
    ];
    for kind in kinds {
        let propagated = kind.propagate();
        assert_eq!(CallKind::decode(propagated.encode()), propagated);
        assert_eq!(
            propagated.is_propagation_with_trace(),
            kind.is_propagation_with_trace()
        );
        if !kind.is_propagation() {
            assert_eq!(propagated.propagate(), propagated.propagate().propagate());
        }
    }
}

#[test]
fn declaration_frames_become_origins () {
    let declaration = CallInfo::new(
        None,
        CallKind::declaration(),
        Some(AccessPath::from_root(Root::Anchor)),
        None,
    );
    let callee = Method::new("LClass;.exported:(I)V", false);
    let propagated = declaration.propagate(
        Some(callee),
        Some(AccessPath::from_root(Root::argument(1))),
        Some(Position::new(None, 4)),
    );
    assert!(propagated.call_kind().is_origin());
    assert!(propagated.callee().is_none());
    assert_eq!(
        propagated.callee_port().unwrap().to_string(),
        "Anchor.Argument(0)"
    );
}

#[test]
fn truncated_ports_are_bounded_prefixes () {
    let heuristics = Heuristics::from_json(&json!({"sink_max_port_size": 2})).unwrap();
    let original = AccessPath::from_string("Argument(0).a.b.c.d").unwrap();
    let mut port = original.clone();
    heuristics.truncate_port(&mut port, PortRole::Sink);
    assert_eq!(port.path().len(), 2);
    assert!(port.path().is_prefix_of(original.path()));
    assert!(original.leq(&port));

    let mut short = AccessPath::new(Root::Return, Path::from_string(".a").unwrap());
    heuristics.truncate_port(&mut short, PortRole::Sink);
    assert_eq!(short.path().len(), 1);
}

#[test]
fn taint_join_is_an_upper_bound () {
    let leaf = CallInfo::new(None, CallKind::origin(), None, Some(Position::new(None, 1)));
    let call_site = CallInfo::new(
        Some(method()),
        CallKind::callsite(),
        Some(AccessPath::from_root(Root::argument(0))),
        None,
    );
    let a = Taint::from_frame(leaf.clone(), Kind::named("A"), vec![Symbol::from("LOrigin;.a:()V")]);
    let mut b = Taint::from_frame(call_site, Kind::named("B"), vec![]);
    b.add(leaf, Kind::named("A"), vec![Symbol::from("LOrigin;.b:()V")]);

    let joined = a.clone().join(&b);
    assert!(a.leq(&joined));
    assert!(b.leq(&joined));
    assert!(joined.equals(&b.clone().join(&a)));

    let mut met = joined;
    met.meet_with(&a);
    assert!(met.equals(&a));
}

#[test]
fn issues_group_by_rule_callee_and_sink () {
    let rules = Rules::from_json(&json!([
        {"name": "R", "code": 1, "description": "", "sources": ["Source"], "sinks": ["Sink"]},
    ]))
    .unwrap();
    let rule = rules.get(1).unwrap().clone();
    let sink = Taint::from_frame(
        CallInfo::new(None, CallKind::origin(), None, None),
        Kind::named("Sink"),
        vec![],
    );
    let issue = |source: &str, sink_index: u32, line: i32| {
        Issue::new(
            Taint::from_frame(
                CallInfo::new(None, CallKind::origin(), None, None),
                Kind::named(source),
                vec![],
            ),
            sink.clone(),
            rule.clone(),
            Callee::named("LClass;.sink:()V"),
            sink_index,
            Position::new(None, line),
        )
    };

    let issues = vec![
        issue("Source", 0, 10),
        issue("Other", 0, 11),
        issue("Source", 1, 12),
    ];
    let mut groups: HashMap<_, Issue> = HashMap::new();
    for issue in issues {
        groups
            .entry(issue.group_key())
            .or_insert_with(Issue::bottom)
            .join_with(&issue);
    }
    assert_eq!(groups.len(), 2);

    let first = groups.values().find(|issue| issue.sink_index() == 0).unwrap();
    assert_eq!(first.sources().kinds().len(), 2);
    assert_eq!(first.to_json(ExportOriginsMode::Always)["rule"], json!(1));
}

#[test]
fn rules_dispatch_on_keys () {
    let rules = Rules::from_json(&json!([
        {
            "name": "Exploitable", "code": 1, "description": "",
            "effect_sources": ["Exported"], "sources": ["Input"], "sinks": ["Exec"],
        },
        {
            "name": "Plain", "code": 2, "description": "",
            "sources": ["Input"], "sinks": ["Exec"], "transforms": ["Decode"],
        },
        {
            "name": "Multi", "code": 3, "description": "",
            "multi_sources": {"a": ["Input"], "b": ["Secret"]}, "partial_sinks": ["Send"],
        },
    ]))
    .unwrap();
    assert!(rules.get(1).unwrap().as_exploitability().is_some());
    assert!(rules.get(2).unwrap().as_source_sink().is_some());
    assert!(rules.get(3).unwrap().as_multi_source().is_some());

    let decoded = Kind::transform(
        Kind::named("Exec"),
        TransformList::new(vec![Transform::named("Decode")]),
        None,
    );
    assert_eq!(rules.rules(&Kind::named("Input"), &decoded).len(), 1);
    assert!(rules.rules(&Kind::named("Input"), &Kind::named("Exec")).is_empty());
    assert_eq!(
        rules
            .partial_rules(&Kind::named("Secret"), &Kind::partial("Send", "b"))
            .len(),
        1
    );

    let sources: KindSet = vec![Kind::named("Input"), Kind::named("Exported")]
        .into_iter()
        .collect();
    let sinks: KindSet = vec![Kind::named("Exec")].into_iter().collect();
    let coverage = rules.coverage(&sources, &sinks, &TransformSet::new());
    assert!(coverage.is_covered(1));
    assert!(!coverage.is_covered(2));
    assert!(!coverage.is_covered(3));
}

#[test]
fn values_are_shareable_across_threads () {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AccessPath>();
    assert_send_sync::<CallInfo>();
    assert_send_sync::<Kind>();
    assert_send_sync::<Taint>();
    assert_send_sync::<Rules>();
    assert_send_sync::<Issue>();
}

#[test]
fn unknown_constant_argument_is_reported () {
    logger::install();
    let element = PathElement::index_from_value_of(Root::argument(4242));
    assert_eq!(
        element.resolve_index_from_value_of(&[Some("key".to_string())]),
        PathElement::AnyIndex
    );
    assert_eq!(
        logger::messages(Level::Warn, "Invalid argument index 4242 provided").len(),
        1
    );

    // A known argument without a constant value degrades silently.
    let element = PathElement::index_from_value_of(Root::argument(4243));
    let constants: Vec<Option<String>> = vec![None; 4244];
    assert_eq!(element.resolve_index_from_value_of(&constants), PathElement::AnyIndex);
    assert!(logger::messages(Level::Warn, "index 4243").is_empty());
}

#[test]
fn inconsistent_heuristics_are_reported () {
    logger::install();
    let heuristics = Heuristics::from_json(&json!({
        "propagation_max_output_path_size": 3,
        "propagation_max_collapse_depth": 77,
    }))
    .unwrap();
    assert_eq!(heuristics.propagation_max_collapse_depth, 3);
    assert_eq!(
        logger::messages(Level::Warn, "propagation_max_collapse_depth (77)").len(),
        1
    );
}

#[test]
fn duplicate_rule_codes_are_reported () {
    logger::install();
    let rules = Rules::from_json(&json!([
        {"name": "First", "code": 9001, "description": "", "sources": ["A"], "sinks": ["B"]},
        {"name": "Second", "code": 9001, "description": "", "sources": ["C"], "sinks": ["D"]},
    ]))
    .unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules.get(9001).unwrap().name(), "First");
    assert_eq!(
        logger::messages(Level::Error, "A rule for code 9001 already exists").len(),
        1
    );
}

#[test]
fn largest_argument_round_trips () {
    let max = Root::MAX_ARGUMENT;
    let path = Path::from(vec![
        PathElement::index_from_value_of(Root::argument(max)),
        PathElement::field("x"),
    ]);
    assert_eq!(Path::from_string(&path.to_string()).unwrap(), path);

    let access_path = AccessPath::new(Root::argument(max), path);
    assert_eq!(
        AccessPath::from_string(&access_path.to_string()).unwrap(),
        access_path
    );

    assert!(Path::from_string(&format!("[<Argument({})>]", u32::MAX)).is_err());
    assert!(AccessPath::from_string(&format!("Argument({}).x", max + 1)).is_err());
}

#[test]
fn argument_roots_stay_below_sentinels_in_ordered_maps () {
    let roots = vec![
        Root::Return,
        Root::argument(Root::MAX_ARGUMENT),
        Root::CallEffectIntent,
        Root::argument(0),
        Root::Leaf,
    ];
    let set: BTreeSet<AccessPath> = roots.iter().map(|root| AccessPath::from_root(*root)).collect();
    assert_eq!(set.len(), roots.len());
    for root in roots {
        assert!(set.contains(&AccessPath::from_root(root)));
        assert_eq!(root.is_argument(), root.encode() <= Root::MAX_ARGUMENT);
    }
}
