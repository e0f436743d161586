#![allow(missing_docs)]

use kdl_params::{Decode, ErrorKind, Payload, Segment, Value, ValueKind, ValueTree};

fn string(text: &str) -> Payload {
    Payload::Atom(format!("\"{text}\""))
}

#[test]
fn insert_then_find_round_trips() {
    let mut tree = ValueTree::new();
    tree.insert("a.b", false, ValueKind::String, string("x"))
        .unwrap();

    let expected = Value::new(false, ValueKind::String, string("x")).unwrap();
    assert_eq!(tree.find("a.b").unwrap(), &expected);
    assert!(tree.exists("a"));
    assert!(tree.find("a").unwrap().is_a(ValueKind::Table));
}

#[test]
fn insert_rejects_payload_of_wrong_shape() {
    let mut tree = ValueTree::new();
    let err = tree
        .insert("a", false, ValueKind::Table, Payload::Atom("1".to_owned()))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    assert_eq!(err.key(), Some("a"));
    assert!(!tree.exists("a"));
}

#[test]
fn protected_value_blocks_unprotected_writes() {
    let mut tree = ValueTree::new();
    tree.insert("k", true, ValueKind::String, string("v1"))
        .unwrap();

    let err = tree
        .insert("k", false, ValueKind::String, string("v2"))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ProtectionViolation));
    assert_eq!(tree.get::<String>("k").unwrap(), "v1");

    let err = tree.update("k").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ProtectionViolation));
    assert!(tree.locate("k").is_none());

    tree.insert("k", true, ValueKind::String, string("v3"))
        .unwrap();
    assert_eq!(tree.get::<String>("k").unwrap(), "v3");
}

#[test]
fn protection_covers_put_helpers() {
    let mut tree = ValueTree::new();
    tree.put("p", &1, true).unwrap();

    for result in [
        tree.clone().put_nil("p", false),
        tree.clone().put_empty_table("p", false),
        tree.clone().put_empty_sequence("p", false),
        tree.clone().put("p", &2, false),
    ] {
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::ProtectionViolation
        ));
    }
}

#[test]
fn unprotected_value_can_be_updated_in_place() {
    let mut tree = ValueTree::new();
    tree.put("n", &1, false).unwrap();

    *tree.update("n").unwrap() = Value::new(false, ValueKind::Number, Payload::Atom("2".into()))
        .unwrap();
    assert_eq!(tree.get::<i32>("n").unwrap(), 2);
    assert!(tree.locate("n").is_some());
    assert!(tree.locate("missing").is_none());
    assert!(matches!(
        tree.update("missing").unwrap_err().kind(),
        ErrorKind::NotFound
    ));
}

#[test]
fn iteration_is_in_key_order() {
    let mut tree = ValueTree::new();
    for key in ["zeta", "alpha", "mid"] {
        tree.put(key, &1, false).unwrap();
    }
    let keys: Vec<&str> = tree.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, ["alpha", "mid", "zeta"]);
}

#[test]
fn sequences_grow_only_at_their_end() {
    let mut tree = ValueTree::new();
    tree.put_empty_sequence("s", false).unwrap();
    tree.put("s[0]", &1, false).unwrap();

    let err = tree.put("s[2]", &3, false).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::IndexOutOfRange { index: 2, len: 1 }
    ));

    tree.put("s[1]", &2, false).unwrap();
    tree.put("s[2]", &3, false).unwrap();
    assert_eq!(tree.get::<Vec<i32>>("s").unwrap(), [1, 2, 3]);
}

#[test]
fn heterogeneous_sequence_scenario() {
    let mut tree = ValueTree::new();
    tree.put_empty_sequence("a.b", false).unwrap();
    tree.put("a.b[0]", &10, false).unwrap();
    tree.put("a.b[1]", &20, false).unwrap();
    tree.put("a.b[2]", "x", false).unwrap();

    let items = tree.get::<Vec<Value>>("a.b").unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(i32::decode(&items[0]).unwrap(), 10);
    assert_eq!(i32::decode(&items[1]).unwrap(), 20);
    assert_eq!(String::decode(&items[2]).unwrap(), "x");

    assert!(tree.update("a.b").is_ok());
    tree.put("a.b[3]", &30, false).unwrap();
    assert_eq!(tree.get::<Vec<Value>>("a.b").unwrap().len(), 4);
}

#[test]
fn indexing_one_past_the_end_appends_a_table() {
    let mut tree = ValueTree::new();
    tree.put_empty_sequence("list", false).unwrap();
    tree.put("list[0].name", "first", false).unwrap();
    tree.put("list[1].name", "second", false).unwrap();

    assert_eq!(tree.get::<String>("list[1].name").unwrap(), "second");
    assert!(tree.find("list[0]").unwrap().is_a(ValueKind::Table));
}

#[test]
fn descending_into_a_scalar_fails() {
    let mut tree = ValueTree::new();
    tree.put("n", &1, false).unwrap();

    let err = tree.put("n.x", &2, false).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::NotAContainer {
            expected: ValueKind::Table,
            found: ValueKind::Number,
        }
    ));
    assert_eq!(err.key(), Some("n.x"));

    let err = tree.put("n[0]", &2, false).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::NotAContainer {
            expected: ValueKind::Sequence,
            ..
        }
    ));
}

#[test]
fn find_reports_missing_and_malformed_keys() {
    let tree = ValueTree::new();

    let err = tree.find("a.b").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFound));
    assert_eq!(err.key(), Some("a.b"));

    for key in ["", "a..b", "[0]", "a[", "a[x]", "a.", "a b"] {
        let err = tree.find(key).unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::InvalidKey(_)),
            "{key:?} gave {err}"
        );
        assert!(!tree.exists(key));
    }
}

#[test]
fn erase_respects_protection() {
    let mut tree = ValueTree::new();
    tree.put("x", &1, false).unwrap();
    tree.put("p", &1, true).unwrap();

    assert!(tree.erase("x", false).unwrap());
    assert!(!tree.erase("x", false).unwrap());
    assert!(!tree.erase("nowhere.deep", false).unwrap());

    let err = tree.erase("p", false).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ProtectionViolation));
    assert!(tree.exists("p"));
    assert!(tree.erase("p", true).unwrap());
    assert!(tree.is_empty());
}

#[test]
fn protected_members_guard_their_containers() {
    let mut tree = ValueTree::new();
    tree.put_empty_table("a", false).unwrap();
    tree.put("a.b", &1, true).unwrap();
    tree.put("a.c", &1, false).unwrap();

    let err = tree.put_empty_table("a", false).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ProtectionViolation));
    assert_eq!(err.key(), Some("a"));
    assert_eq!(tree.get::<i32>("a.b").unwrap(), 1);

    let err = tree.erase("a", false).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ProtectionViolation));
    assert!(tree.exists("a.b"));

    let err = tree.update("a").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ProtectionViolation));
    assert!(tree.locate("a").is_none());

    // Unprotected siblings stay writable.
    tree.put("a.c", &2, false).unwrap();
    assert!(tree.update("a.c").is_ok());

    tree.put_empty_table("a", true).unwrap();
    assert!(!tree.exists("a.b"));
}

#[test]
fn protected_elements_guard_their_sequence() {
    let mut tree = ValueTree::new();
    tree.put_empty_sequence("s", false).unwrap();
    tree.put("s[0].x", &1, true).unwrap();

    for result in [
        tree.clone().put("s", &vec![2], false),
        tree.clone().put_nil("s", false),
        tree.clone().erase("s", false).map(drop),
        tree.clone().erase("s[0]", false).map(drop),
    ] {
        assert!(matches!(
            result.unwrap_err().kind(),
            ErrorKind::ProtectionViolation
        ));
    }
    assert!(tree.erase("s", true).unwrap());
}

#[test]
fn erasing_a_sequence_element_shifts_the_rest() {
    let mut tree = ValueTree::new();
    tree.put("s", &[1, 2, 3][..], false).unwrap();

    assert!(tree.erase("s[0]", false).unwrap());
    assert_eq!(tree.get::<Vec<i32>>("s").unwrap(), [2, 3]);
}

#[test]
fn display_renders_canonical_text() {
    let mut tree = ValueTree::new();
    tree.put("a", &1, false).unwrap();
    tree.put("b", &vec![1, 2], false).unwrap();
    tree.put("c.x", "y", false).unwrap();
    tree.put_empty_table("d", false).unwrap();
    tree.put_nil("e", false).unwrap();

    assert_eq!(
        tree.to_string(),
        "a: 1\nb: [1, 2]\nc: { x: \"y\" }\nd: {}\ne: @nil\n"
    );
}

#[test]
fn keys_split_into_names_and_indices() {
    assert_eq!(
        kdl_params::split("a.b[2].c").unwrap(),
        [
            Segment::Name("a".into()),
            Segment::Name("b".into()),
            Segment::Index(2),
            Segment::Name("c".into()),
        ]
    );
    assert_eq!(
        kdl_params::split("m[0][1]").unwrap(),
        [
            Segment::Name("m".into()),
            Segment::Index(0),
            Segment::Index(1),
        ]
    );
    assert_eq!(kdl_params::join("", &Segment::Name("a".into())), "a");
    assert_eq!(kdl_params::join("a", &Segment::Name("b".into())), "a.b");
    assert_eq!(kdl_params::join("a.b", &Segment::Index(3)), "a.b[3]");
}
