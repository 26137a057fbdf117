use owwiki::criteria::{
    parse, Condition, CriteriaError, CriteriaParser, HeroTarget, LookupTables, MissionTarget,
    NestedGroup, ParseContext, ParserOptions, Predicate, ReferenceKind, ReferencePolicy,
    SingleCondition, Team, MAX_NESTING_DEPTH,
};
use proptest::prelude::*;

fn tables() -> LookupTables {
    let mut tables = LookupTables::default();
    tables.hero_keys.insert("Tracer".to_string(), "tracer".to_string());
    tables.hero_keys.insert("Genji".to_string(), "genji".to_string());
    tables.hero_tags.insert("Omnic".to_string(), "omnic".to_string());
    tables.scripts.insert("000ABC".to_string(), "Payload stops moving".to_string());
    tables.celebrations.insert("2B".to_string(), "Lunar New Year".to_string());
    tables
}

fn leaf(predicate: Predicate, negative: bool) -> Condition {
    Condition::Single(SingleCondition {
        predicate,
        negative,
    })
}

fn hero(key: &str) -> Predicate {
    Predicate::ToHero {
        target: HeroTarget::Hero(key.to_string()),
    }
}

#[test]
fn hero_interaction_resolves_hero_key() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0001");
    assert_eq!(
        parse("Hero Interaction: Tracer", &ctx).unwrap(),
        leaf(hero("tracer"), false)
    );
}

#[test]
fn negated_team_line_is_attack_and_negative() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0002");
    assert_eq!(
        parse("NOT (On Team Number: TeamRed. UnkBool: True)", &ctx).unwrap(),
        leaf(Predicate::Team { team: Team::Attack }, true)
    );
}

#[test]
fn nested_group_collects_indented_children() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0003");
    let raw = "Nested - 1/2 Required:\n    Hero Interaction: Tracer\n    On Map: Hanamura. Allow Event Variants: true\n";
    assert_eq!(
        parse(raw, &ctx).unwrap(),
        Condition::Nested(NestedGroup {
            total: 2,
            needed: 1,
            children: vec![
                leaf(hero("tracer"), false),
                leaf(
                    Predicate::Map {
                        map: "Hanamura".to_string(),
                        not_event_variants: false,
                    },
                    false
                ),
            ],
        })
    );
}

#[test]
fn mission_objective_keeps_trailing_text() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0004");
    assert_eq!(
        parse("On Mission Objective: Escort the Payload", &ctx).unwrap(),
        leaf(
            Predicate::Mission {
                target: MissionTarget::Objective("Escort the Payload".to_string()),
            },
            false
        )
    );
}

#[test]
fn unknown_celebration_gets_placeholder() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0005");
    assert_eq!(
        parse("Active Celebration: Unknown12", &ctx).unwrap(),
        leaf(
            Predicate::Celebration {
                celebration: "未知节日（12）".to_string(),
            },
            false
        )
    );
}

#[test]
fn unknown_prefix_degrades_in_npc_context() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "npc/0006");
    let outcome = CriteriaParser::default()
        .parse("Weird Predicate: xyz", &ctx)
        .unwrap();
    assert_eq!(outcome.condition, Condition::unknown("Weird Predicate: xyz", false));
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].miss.reason(), "no-match");
    assert_eq!(outcome.diagnostics[0].record_id, "npc/0006");
}

#[test]
fn strict_policy_aborts_on_unresolved_hero() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0007").with_policy(ReferencePolicy::Strict);
    let raw = "Nested - 2/2 Required:\n    Hero Interaction: Tracer\n    NOT (Hero Interaction: Nobody)";
    let err = parse(raw, &ctx).unwrap_err();
    assert_eq!(
        err,
        CriteriaError::UnresolvedReference {
            record_id: "tracer/0007".to_string(),
            line_number: 3,
            line: "NOT (Hero Interaction: Nobody)".to_string(),
            kind: ReferenceKind::Hero,
            name: "Nobody".to_string(),
        }
    );
    assert!(!err.is_structural());
}

#[test]
fn strict_policy_still_degrades_vocabulary_misses() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0008").with_policy(ReferencePolicy::Strict);
    let condition = parse("Required Gender: Robot", &ctx).unwrap();
    assert!(condition.is_unknown());
}

#[test]
fn lenient_policy_keeps_unresolved_hero_as_unknown() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "npc/0009");
    assert_eq!(
        parse("Hero Interaction: Nobody", &ctx).unwrap(),
        Condition::unknown("Hero Interaction: Nobody", false)
    );
}

#[test]
fn sibling_at_header_indent_ends_group() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0010");
    let raw = "Nested - 2/2 Required:\n    Nested - 1/1 Required:\n        Hero Interaction: Tracer\n    Hero Interaction: Genji";
    let Condition::Nested(outer) = parse(raw, &ctx).unwrap() else {
        panic!("expected nested");
    };
    assert_eq!(outer.children.len(), 2);
    let Condition::Nested(inner) = &outer.children[0] else {
        panic!("expected inner group");
    };
    assert_eq!(inner.children, vec![leaf(hero("tracer"), false)]);
    assert_eq!(outer.children[1], leaf(hero("genji"), false));
}

#[test]
fn structural_errors_are_hard_failures() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0011");

    let short = parse("Nested - 1/3 Required:\n    Hero Interaction: Tracer", &ctx).unwrap_err();
    assert!(matches!(
        short,
        CriteriaError::ChildCountMismatch {
            declared: 3,
            found: 1,
            ..
        }
    ));

    let trailing = parse("Hero Interaction: Tracer\nHero Interaction: Genji", &ctx).unwrap_err();
    assert!(matches!(
        trailing,
        CriteriaError::TrailingLines { line_number: 2, .. }
    ));

    let header = parse("Nested - one/2 Required:", &ctx).unwrap_err();
    assert!(matches!(header, CriteriaError::MalformedNested { .. }));

    let over = parse("Nested - 3/2 Required:\n    Has Talent: a\n    Has Talent: b", &ctx)
        .unwrap_err();
    assert!(matches!(over, CriteriaError::NeededExceedsTotal { .. }));

    assert!(matches!(
        parse("  \r\n\n", &ctx),
        Err(CriteriaError::EmptyInput { .. })
    ));
    for err in [short, trailing, header, over] {
        assert!(err.is_structural());
    }
}

#[test]
fn oversized_declared_total_is_a_count_mismatch() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0013");
    let err = parse("Nested - 0/99999999999999 Required:\n    Has Talent: a", &ctx).unwrap_err();
    assert!(matches!(
        err,
        CriteriaError::ChildCountMismatch {
            declared: 99_999_999_999_999,
            found: 1,
            line_number: 1,
            ..
        }
    ));
}

#[test]
fn deeply_nested_dump_fails_without_overflowing() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0014");
    let levels = 1_000;
    let mut raw = String::new();
    for depth in 0..levels {
        raw.push_str(&"    ".repeat(depth));
        raw.push_str("Nested - 1/1 Required:\n");
    }
    raw.push_str(&"    ".repeat(levels));
    raw.push_str("Has Talent: a");

    let err = parse(&raw, &ctx).unwrap_err();
    assert!(matches!(
        err,
        CriteriaError::NestingTooDeep { limit: MAX_NESTING_DEPTH, .. }
    ));
    assert!(err.is_structural());
}

#[test]
fn custom_indent_width_drives_nesting() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0015");
    let parser = CriteriaParser::new(ParserOptions {
        indent_width: 2,
        ..ParserOptions::default()
    });
    let raw = "Nested - 2/2 Required:\n  Hero Interaction: Tracer\n  NOT (Hero Interaction: Genji)";
    let outcome = parser.parse(raw, &ctx).unwrap();
    assert_eq!(
        outcome.condition,
        Condition::Nested(NestedGroup {
            total: 2,
            needed: 2,
            children: vec![leaf(hero("tracer"), false), leaf(hero("genji"), true)],
        })
    );
}

#[test]
fn crlf_dump_parses_like_lf() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0012");
    let lf = "Nested - 1/2 Required:\n    Hero Interaction: Tracer\n    On Game Mode: Push";
    let crlf = lf.replace('\n', "\r\n");
    assert_eq!(parse(lf, &ctx).unwrap(), parse(&crlf, &ctx).unwrap());
}

#[test]
fn single_child_group_unwraps_only_when_asked() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0013");
    let raw = "Nested - 1/1 Required:\n    Hero Interaction: Tracer";

    let kept = parse(raw, &ctx).unwrap();
    assert!(matches!(kept, Condition::Nested(_)));

    let parser = CriteriaParser::new(ParserOptions {
        unwrap_single_group: true,
        ..ParserOptions::default()
    });
    assert_eq!(
        parser.parse(raw, &ctx).unwrap().condition,
        leaf(hero("tracer"), false)
    );
    assert_eq!(kept.unwrap_single(), leaf(hero("tracer"), false));
}

#[test]
fn condition_json_matches_stored_wiki_form() {
    let tables = tables();
    let ctx = ParseContext::new(&tables, "tracer/0014");
    let raw = "Nested - 1/2 Required:\n    NOT (Tag On Teammate: Omnic)\n    On Map: Ilios. Allow Event Variants: false";
    let json = parse(raw, &ctx).unwrap().to_json().unwrap();
    assert_eq!(
        json,
        r#"{"type":"nested","total":2,"needed":1,"conditions":[{"type":"withHero","heroTag":"omnic","negative":true},{"type":"map","map":"Ilios","notEventVariants":true}]}"#
    );
    let back: Condition = serde_json::from_str(&json).unwrap();
    assert_eq!(back, parse(raw, &ctx).unwrap());
}

const LEAVES: &[&str] = &[
    "Hero Interaction: Tracer",
    "Is Hero: Genji",
    "Hero On Team: Genji",
    "Tag On Teammate: Omnic",
    "Required Gender: Female",
    "On Team Number: TeamBlue. UnkBool: True",
    "On Map: Numbani. Allow Event Variants: true",
    "Scripted Event: Victory Lap (ABC)",
    "Active Celebration: Lunar New Year (2B)",
    "On Game Mode: Control",
    "On Mission: Storm Rising",
    "Has Talent: Tactical Visor",
    "Foo Bar: Baz",
];

fn leaf_line() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(LEAVES)
}

proptest! {
    #[test]
    fn negation_yields_same_leaf(text in leaf_line()) {
        let tables = tables();
        let ctx = ParseContext::new(&tables, "prop");
        let plain = parse(text, &ctx).unwrap();
        let negated = parse(&format!("NOT ({text})"), &ctx).unwrap();
        let (Condition::Single(plain), Condition::Single(negated)) = (plain, negated) else {
            panic!("leaf lines must parse to single conditions");
        };
        prop_assert!(!plain.negative);
        prop_assert!(negated.negative);
        prop_assert_eq!(plain.predicate, negated.predicate);
    }

    #[test]
    fn nested_block_keeps_declared_shape(
        children in proptest::collection::vec((leaf_line(), any::<bool>()), 1..8),
        needed_seed in any::<usize>(),
    ) {
        let total = children.len();
        let needed = needed_seed % (total + 1);
        let mut raw = format!("Nested - {needed}/{total} Required:\n");
        for (text, negative) in &children {
            if *negative {
                raw.push_str(&format!("    NOT ({text})\n"));
            } else {
                raw.push_str(&format!("    {text}\n"));
            }
        }

        let tables = tables();
        let ctx = ParseContext::new(&tables, "prop");
        let Condition::Nested(group) = parse(&raw, &ctx).unwrap() else {
            panic!("expected nested group");
        };
        prop_assert_eq!(group.total, total);
        prop_assert_eq!(group.needed, needed);
        prop_assert_eq!(group.children.len(), total);
        for (child, (text, negative)) in group.children.iter().zip(&children) {
            let expected = parse(text, &ctx).unwrap();
            let Condition::Single(child) = child else {
                panic!("children are leaves");
            };
            let Condition::Single(expected) = expected else {
                panic!("leaf parses to single");
            };
            prop_assert_eq!(&child.predicate, &expected.predicate);
            prop_assert_eq!(child.negative, *negative);
        }
    }

    #[test]
    fn parsing_is_idempotent(
        children in proptest::collection::vec(leaf_line(), 1..6),
    ) {
        let body: String = children.iter().map(|c| format!("    {c}\n")).collect();
        let raw = format!("Nested - 1/{} Required:\n{body}", children.len());
        let tables = tables();
        let ctx = ParseContext::new(&tables, "prop");
        let first = parse(&raw, &ctx).unwrap();
        let second = parse(&raw, &ctx).unwrap();
        prop_assert_eq!(first, second);
    }
}
