#![allow(missing_docs)]

use indoc::indoc;
use kdl_params::{
    Atom, ErrorKind, NameContext, OptionalTable, Parameter, ParameterKind, Resolve, Schema,
    Sequence, Table, TableFragment, TableSchema, ValueKind, ValueTree, Visitor,
};

#[derive(Debug)]
struct Tls {
    cert: Atom<String>,
    verify: Atom<bool>,
}

impl TableSchema for Tls {
    fn declare(cx: &mut NameContext) -> Self {
        Self {
            cert: Atom::new(cx, "cert"),
            verify: Atom::with_default(cx, "verify", true),
        }
    }

    fn members(&self) -> Vec<&dyn Parameter> {
        vec![&self.cert, &self.verify]
    }
}

#[derive(Debug)]
struct Server {
    host: Atom<String>,
    port: Atom<u16>,
    tls: OptionalTable<Tls>,
}

impl TableSchema for Server {
    fn declare(cx: &mut NameContext) -> Self {
        Self {
            host: Atom::new(cx, "host"),
            port: Atom::with_default(cx, "port", 8080),
            tls: OptionalTable::new(cx, "tls"),
        }
    }

    fn members(&self) -> Vec<&dyn Parameter> {
        vec![&self.host, &self.port, &self.tls]
    }
}

#[derive(Debug)]
struct Limits {
    low: Atom<i32>,
    high: Atom<i32>,
}

impl TableSchema for Limits {
    fn declare(cx: &mut NameContext) -> Self {
        Self {
            low: Atom::with_default(cx, "low", 0),
            high: Atom::with_default(cx, "high", 100),
        }
    }

    fn members(&self) -> Vec<&dyn Parameter> {
        vec![&self.low, &self.high]
    }
}

#[test]
fn nested_tables() {
    let mut cx = NameContext::new();
    let server = Table::<Server>::new(&mut cx, "server");
    assert_eq!(server.schema().tls.schema().cert.key(), "server.tls.cert");

    let kdl = indoc! {r#"
        server host="example.org" {
            tls {
                cert "server.pem"
            }
        }
    "#};
    let tree = kdl_params::from_str(kdl).unwrap();
    let server = server.get(&tree).unwrap();
    assert_eq!(server.get(&server.host).unwrap(), "example.org");
    assert_eq!(server.get(&server.port).unwrap(), 8080);

    let tls = server.get_opt(&server.tls).unwrap().unwrap();
    assert_eq!(tls.get(&tls.cert).unwrap(), "server.pem");
    assert!(tls.get(&tls.verify).unwrap());
}

#[test]
fn an_absent_table_of_defaults_still_resolves() {
    let mut cx = NameContext::new();
    let limits = Table::<Limits>::new(&mut cx, "limits");

    let tree = ValueTree::new();
    let limits = limits.get(&tree).unwrap();
    assert_eq!(limits.get(&limits.low).unwrap(), 0);
    assert_eq!(limits.get(&limits.high).unwrap(), 100);
}

#[test]
fn an_absent_table_reports_its_required_members() {
    let mut cx = NameContext::new();
    let server = Table::<Server>::new(&mut cx, "server");

    let err = server.get(&ValueTree::new()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingRequiredParameter));
    assert_eq!(err.key(), Some("server.host"));
}

#[test]
fn a_scalar_is_not_a_table() {
    let mut cx = NameContext::new();
    let limits = Table::<Limits>::new(&mut cx, "limits");

    let tree = kdl_params::from_str("limits 5").unwrap();
    let err = limits.get(&tree).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::TypeMismatch {
            expected: "table",
            found: ValueKind::Number,
        }
    ));
    assert_eq!(err.key(), Some("limits"));
}

#[test]
fn optional_tables() {
    let mut cx = NameContext::new();
    let tls = OptionalTable::<Tls>::new(&mut cx, "tls");

    assert!(tls.get(&ValueTree::new()).unwrap().is_none());
    assert!(!tls.has_value(&ValueTree::new()));

    let tree = kdl_params::from_str(r#"tls cert="a.pem" verify=#false"#).unwrap();
    assert!(tls.has_value(&tree));
    let resolved = tls.get(&tree).unwrap().unwrap();
    assert!(!resolved.get(&resolved.verify).unwrap());

    // Once present, the members are held to their own presence policy.
    let tree = kdl_params::from_str("tls verify=#false").unwrap();
    let err = tls.get(&tree).unwrap_err();
    assert_eq!(err.key(), Some("tls.cert"));
}

#[test]
fn conditional_tables_contribute_nothing_when_inactive() {
    let mut cx = NameContext::new();
    let tls = Table::<Tls>::new(&mut cx, "tls").when(|tree| tree.exists("secure"));

    assert!(tls.resolve(&ValueTree::new()).unwrap().is_none());
    assert!(tls.validate(&ValueTree::new()).is_ok());

    let err = tls.validate(&kdl_params::from_str("secure").unwrap()).unwrap_err();
    assert_eq!(err.key(), Some("tls.cert"));
}

#[derive(Debug)]
struct Common {
    verbose: Atom<bool>,
    label: Atom<String>,
}

impl TableSchema for Common {
    fn declare(cx: &mut NameContext) -> Self {
        Self {
            verbose: Atom::with_default(cx, "verbose", false),
            label: Atom::new(cx, "label"),
        }
    }

    fn members(&self) -> Vec<&dyn Parameter> {
        vec![&self.verbose, &self.label]
    }
}

#[derive(Debug)]
struct Job {
    name: Atom<String>,
    common: TableFragment<Common>,
}

impl TableSchema for Job {
    fn declare(cx: &mut NameContext) -> Self {
        Self {
            name: Atom::new(cx, "name"),
            common: TableFragment::new(cx),
        }
    }

    fn members(&self) -> Vec<&dyn Parameter> {
        vec![&self.name, &self.common]
    }
}

#[test]
fn fragments_splice_members_into_the_enclosing_table() {
    let mut cx = NameContext::new();
    let job = Table::<Job>::new(&mut cx, "job");
    assert_eq!(job.schema().common.key(), "job");
    assert_eq!(job.schema().common.kind(), ParameterKind::TableFragment);
    assert_eq!(job.schema().common.label.key(), "job.label");

    let tree = kdl_params::from_str(r#"job name="build" label="ci""#).unwrap();
    let job = job.get(&tree).unwrap();
    assert_eq!(job.get(&job.name).unwrap(), "build");
    assert_eq!(job.get(&job.common.label).unwrap(), "ci");

    let common = job.get(&job.common).unwrap();
    assert!(!common.get(&common.verbose).unwrap());
}

#[test]
fn fragment_members_are_validated_with_the_table() {
    let mut cx = NameContext::new();
    let job = Table::<Job>::new(&mut cx, "job");

    let tree = kdl_params::from_str(r#"job name="build""#).unwrap();
    let err = job.get(&tree).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingRequiredParameter));
    assert_eq!(err.key(), Some("job.label"));
}

#[test]
fn fragments_at_the_root() {
    #[derive(Debug)]
    struct Root {
        common: TableFragment<Common>,
        jobs: Sequence<Table<Job>>,
    }

    impl TableSchema for Root {
        fn declare(cx: &mut NameContext) -> Self {
            Self {
                common: TableFragment::new(cx),
                jobs: Sequence::new(cx, "jobs"),
            }
        }

        fn members(&self) -> Vec<&dyn Parameter> {
            vec![&self.common, &self.jobs]
        }
    }

    let schema = Schema::<Root>::declare().unwrap();
    assert_eq!(schema.common.verbose.key(), "verbose");
    assert_eq!(schema.jobs.element().schema().common.label.key(), "jobs[0].label");

    let kdl = indoc! {r#"
        label "top"
        verbose #true
        jobs {
            - name="a" label="first"
        }
    "#};
    let tree = kdl_params::from_str(kdl).unwrap();
    let root = schema.resolve(&tree).unwrap();
    assert!(root.get(&root.common.verbose).unwrap());
    assert_eq!(root.get(&root.common.label).unwrap(), "top");

    let jobs = root.get(&root.jobs).unwrap();
    assert_eq!(jobs[0].get(&jobs[0].common.label).unwrap(), "first");
}

#[derive(Debug)]
struct Dup {
    a: Atom<i32>,
    b: Atom<i32>,
}

impl TableSchema for Dup {
    fn declare(cx: &mut NameContext) -> Self {
        Self {
            a: Atom::new(cx, "a"),
            b: Atom::new(cx, "a"),
        }
    }

    fn members(&self) -> Vec<&dyn Parameter> {
        vec![&self.a, &self.b]
    }
}

#[test]
fn duplicate_keys_are_structural_violations() {
    let err = Schema::<Dup>::declare().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::StructuralViolation(_)));
    assert!(err.to_string().contains("`a`"));
}

#[test]
fn duplicates_are_found_inside_composites() {
    #[derive(Debug)]
    struct Nested {
        inner: Table<Dup>,
    }

    impl TableSchema for Nested {
        fn declare(cx: &mut NameContext) -> Self {
            Self {
                inner: Table::new(cx, "inner"),
            }
        }

        fn members(&self) -> Vec<&dyn Parameter> {
            vec![&self.inner]
        }
    }

    #[derive(Debug)]
    struct Listed {
        items: Sequence<Table<Dup>>,
    }

    impl TableSchema for Listed {
        fn declare(cx: &mut NameContext) -> Self {
            Self {
                items: Sequence::new(cx, "items"),
            }
        }

        fn members(&self) -> Vec<&dyn Parameter> {
            vec![&self.items]
        }
    }

    let err = Schema::<Nested>::declare().unwrap_err();
    assert!(err.to_string().contains("`inner.a`"));

    let err = Schema::<Listed>::declare().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::StructuralViolation(_)));
}

#[test]
fn fragments_may_not_shadow_members() {
    #[derive(Debug)]
    struct Clash {
        label: Atom<String>,
        common: TableFragment<Common>,
    }

    impl TableSchema for Clash {
        fn declare(cx: &mut NameContext) -> Self {
            Self {
                label: Atom::new(cx, "label"),
                common: TableFragment::new(cx),
            }
        }

        fn members(&self) -> Vec<&dyn Parameter> {
            vec![&self.label, &self.common]
        }
    }

    let err = Schema::<Clash>::declare().unwrap_err();
    assert!(err.to_string().contains("`label`"));
}

#[test]
fn walking_enters_and_leaves_tables() {
    #[derive(Default)]
    struct Events(Vec<String>);

    impl Visitor for Events {
        fn visit(&mut self, parameter: &dyn Parameter) {
            self.0.push(format!("visit {}", parameter.key()));
        }

        fn leave(&mut self, parameter: &dyn Parameter) {
            self.0.push(format!("leave {}", parameter.key()));
        }
    }

    let mut cx = NameContext::new();
    let server = Table::<Server>::new(&mut cx, "server");

    let mut events = Events::default();
    server.walk(&mut events);
    assert_eq!(
        events.0,
        [
            "visit server",
            "visit server.host",
            "visit server.port",
            "visit server.tls",
            "visit server.tls.cert",
            "visit server.tls.verify",
            "leave server.tls",
            "leave server",
        ]
    );
}

#[test]
fn a_panicking_declaration_leaves_its_scope() {
    #[derive(Debug)]
    struct Broken;

    impl TableSchema for Broken {
        fn declare(_cx: &mut NameContext) -> Self {
            panic!("declaration failed");
        }

        fn members(&self) -> Vec<&dyn Parameter> {
            Vec::new()
        }
    }

    let mut cx = NameContext::rooted("outer");
    let depth = cx.depth();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        Table::<Broken>::new(&mut cx, "broken")
    }));
    assert!(result.is_err());
    assert_eq!(cx.depth(), depth);
    assert_eq!(cx.current(), "outer");

    let next = Atom::<i32>::new(&mut cx, "next");
    assert_eq!(next.key(), "outer.next");
}
