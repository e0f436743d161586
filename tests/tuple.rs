#![allow(missing_docs)]

use indoc::indoc;
use kdl_params::{
    Atom, ErrorKind, NameContext, OptionalTuple, Parameter, ParameterKind, Presence, Sequence,
    Table, TableSchema, Tuple, TupleElements, ValueTree, Visitor,
};

#[derive(Debug)]
struct Style {
    bold: Atom<bool>,
}

impl TableSchema for Style {
    fn declare(cx: &mut NameContext) -> Self {
        Self {
            bold: Atom::with_default(cx, "bold", false),
        }
    }

    fn members(&self) -> Vec<&dyn Parameter> {
        vec![&self.bold]
    }
}

#[test]
fn positions_resolve_in_order() {
    let mut cx = NameContext::new();
    let endpoint = Tuple::<(Atom<String>, Atom<u16>, Atom<bool>)>::new(&mut cx, "endpoint");

    let tree = kdl_params::from_str(r#"endpoint "localhost" 8080 #true"#).unwrap();
    assert_eq!(
        endpoint.get(&tree).unwrap(),
        ("localhost".to_owned(), 8080, true)
    );
}

#[test]
fn arity_is_part_of_the_type() {
    assert_eq!(<(Atom<i32>,) as TupleElements>::ARITY, 1);
    assert_eq!(<(Atom<i32>, Atom<i32>, Atom<i32>) as TupleElements>::ARITY, 3);
    assert_eq!(
        <(
            Atom<i32>,
            Atom<i32>,
            Atom<i32>,
            Atom<i32>,
            Atom<i32>,
            Atom<i32>,
            Atom<i32>,
            Atom<i32>,
        ) as TupleElements>::ARITY,
        8
    );
}

#[test]
fn stored_length_must_match_arity() {
    let mut cx = NameContext::new();
    let pair = Tuple::<(Atom<i32>, Atom<i32>)>::new(&mut cx, "pair");

    for (kdl, found) in [("pair 1", None), ("pair 1 2 3", Some(3))] {
        let tree = kdl_params::from_str(kdl).unwrap();
        let err = pair.get(&tree).unwrap_err();
        match found {
            Some(found) => assert!(matches!(
                err.kind(),
                ErrorKind::LengthMismatch { expected: 2, found: f } if *f == found
            )),
            None => assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. })),
        }
        assert_eq!(err.key(), Some("pair"));
    }
}

#[test]
fn position_errors_name_the_position() {
    let mut cx = NameContext::new();
    let pair = Tuple::<(Atom<i32>, Atom<i32>)>::new(&mut cx, "pair");

    let tree = kdl_params::from_str(r#"pair 1 "two""#).unwrap();
    let err = pair.get(&tree).unwrap_err();
    assert_eq!(err.key(), Some("pair[1]"));
}

#[test]
fn missing_required_tuple() {
    let mut cx = NameContext::new();
    let pair = Tuple::<(Atom<i32>, Atom<i32>)>::new(&mut cx, "pair");

    let err = pair.get(&ValueTree::new()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingRequiredParameter));
}

#[test]
fn defaults_fill_every_position() {
    let mut cx = NameContext::new();
    let size = Tuple::<(Atom<u32>, Atom<u32>)>::with_defaults(&mut cx, "size", (640, 480));
    assert_eq!(size.presence(), Presence::Default);
    assert_eq!(size.defaults(), Some(&(640, 480)));

    assert_eq!(size.get(&ValueTree::new()).unwrap(), (640, 480));
    let tree = kdl_params::from_str("size 800 600").unwrap();
    assert_eq!(size.get(&tree).unwrap(), (800, 600));
}

#[test]
fn positions_are_named_by_index() {
    let mut cx = NameContext::new();
    let size = Tuple::<(Atom<u32>, Atom<u32>)>::with_defaults(&mut cx, "size", (640, 480));

    let (width, height) = size.elements();
    assert_eq!(width.key(), "size[0]");
    assert_eq!(height.key(), "size[1]");
    assert_eq!(height.default_value(), Some(&480));
}

#[test]
fn composite_positions() {
    let mut cx = NameContext::new();
    let entry =
        Tuple::<(Atom<String>, Sequence<Atom<i32>>, Table<Style>)>::new(&mut cx, "entry");

    let kdl = indoc! {r#"
        entry {
            - "title"
            - 1 2 3
            - bold=#true
        }
    "#};
    let tree = kdl_params::from_str(kdl).unwrap();
    let (name, values, style) = entry.get(&tree).unwrap();
    assert_eq!(name, "title");
    assert_eq!(values, [1, 2, 3]);
    assert!(style.get(&style.bold).unwrap());
    assert_eq!(style.bold.key(), "entry[2].bold");
}

#[test]
fn nested_tuple_defaults() {
    let mut cx = NameContext::new();
    let span = Tuple::<(Tuple<(Atom<i32>, Atom<i32>)>, Atom<String>)>::with_defaults(
        &mut cx,
        "span",
        ((1, 2), "unit".to_owned()),
    );

    assert_eq!(
        span.get(&ValueTree::new()).unwrap(),
        ((1, 2), "unit".to_owned())
    );

    let kdl = indoc! {r#"
        span {
            - 5 6
            - "cm"
        }
    "#};
    let tree = kdl_params::from_str(kdl).unwrap();
    assert_eq!(span.get(&tree).unwrap(), ((5, 6), "cm".to_owned()));
}

#[test]
fn optional_tuple() {
    let mut cx = NameContext::new();
    let range = OptionalTuple::<(Atom<i32>, Atom<i32>)>::new(&mut cx, "range");

    assert_eq!(range.get(&ValueTree::new()).unwrap(), None);
    let tree = kdl_params::from_str("range 1 9").unwrap();
    assert_eq!(range.get(&tree).unwrap(), Some((1, 9)));
    assert!(range.has_value(&tree));
}

#[test]
fn walking_visits_every_position() {
    #[derive(Default)]
    struct Keys(Vec<(String, ParameterKind)>, usize);

    impl Visitor for Keys {
        fn visit(&mut self, parameter: &dyn Parameter) {
            self.0.push((parameter.key().to_owned(), parameter.kind()));
        }

        fn leave(&mut self, _parameter: &dyn Parameter) {
            self.1 += 1;
        }
    }

    let mut cx = NameContext::new();
    let entry = Tuple::<(Atom<String>, Table<Style>)>::new(&mut cx, "entry");

    let mut keys = Keys::default();
    entry.walk(&mut keys);
    assert_eq!(
        keys.0,
        [
            ("entry".to_owned(), ParameterKind::Tuple),
            ("entry[0]".to_owned(), ParameterKind::Atom),
            ("entry[1]".to_owned(), ParameterKind::Table),
            ("entry[1].bold".to_owned(), ParameterKind::Atom),
        ]
    );
    assert_eq!(keys.1, 2);
}
