//! Embedded collections: null positions, empty versus null, container types.

use entimap_core::{
    Config, Container, ContainerShape, CoreError, FlatRecord, KeyId, Mapped, Registry, Schema,
    Value,
};
use std::collections::{BTreeSet, HashSet, VecDeque};

#[derive(Debug, Default, Clone, PartialEq)]
struct Item {
    n: i64,
    label: Option<String>,
}

impl Mapped for Item {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("n", |i| &i.n, |i| &mut i.n);
        schema.field("label", |i| &i.label, |i| &mut i.label);
    }
}

fn item(n: i64) -> Option<Item> {
    Some(Item {
        n,
        label: Some(format!("#{n}")),
    })
}

#[derive(Debug, Default, PartialEq)]
struct Basket {
    id: i64,
    items: Option<Vec<Option<Item>>>,
}

impl Mapped for Basket {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |b| &b.id, |b| &mut b.id);
        schema.embed_many("items", |b| &b.items, |b| &mut b.items);
    }
}

fn registry() -> Registry {
    Registry::new(Config::default())
}

#[test]
fn null_positions_survive_a_round_trip() {
    let basket = Basket {
        id: 1,
        items: Some(vec![item(0), None, item(2), None, item(4)]),
    };
    let registry = registry();
    let record = registry.flatten(&basket).unwrap();

    assert_eq!(
        record.value("items.n"),
        Some(&Value::Array(vec![
            Value::Integer(0),
            Value::Integer(2),
            Value::Integer(4)
        ]))
    );
    assert_eq!(record.null_indexes("items").unwrap(), Some(vec![1, 3]));

    let rebuilt: Basket = registry.rebuild(&record).unwrap();
    assert_eq!(rebuilt, basket);
}

#[test]
fn all_null_elements() {
    let basket = Basket {
        id: 1,
        items: Some(vec![None, None]),
    };
    let registry = registry();
    let record = registry.flatten(&basket).unwrap();
    assert_eq!(record.value("items.n"), Some(&Value::Array(Vec::new())));

    let rebuilt: Basket = registry.rebuild(&record).unwrap();
    assert_eq!(rebuilt, basket);
}

#[test]
fn empty_and_null_collections_differ() {
    let registry = registry();

    let empty = Basket {
        id: 1,
        items: Some(Vec::new()),
    };
    let record = registry.flatten(&empty).unwrap();
    assert!(!record.contains("items^null"));
    assert!(record.has_prefix("items."));
    assert_eq!(registry.rebuild::<Basket>(&record).unwrap(), empty);

    let null = Basket { id: 1, items: None };
    let record = registry.flatten(&null).unwrap();
    assert!(!record.has_prefix("items"));
    assert_eq!(registry.rebuild::<Basket>(&record).unwrap(), null);
}

#[test]
fn sideband_alone_rebuilds_null_elements() {
    let mut record = FlatRecord::new("Basket");
    record.set_id(Some(KeyId::Id(1)));
    record.set_null_indexes("items", &[0, 1, 2]);

    let rebuilt: Basket = registry().rebuild(&record).unwrap();
    assert_eq!(rebuilt.items, Some(vec![None, None, None]));
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Discount {
    percent: u8,
}

impl Mapped for Discount {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("percent", |d| &d.percent, |d| &mut d.percent);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Line {
    sku: String,
    discount: Option<Discount>,
}

impl Mapped for Line {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("sku", |l| &l.sku, |l| &mut l.sku);
        schema.embed("discount", |l| &l.discount, |l| &mut l.discount);
    }
}

#[derive(Debug, Default, PartialEq)]
struct Order {
    id: i64,
    lines: Vec<Option<Line>>,
}

impl Mapped for Order {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |o| &o.id, |o| &mut o.id);
        schema.embed_many("lines", |o| &o.lines, |o| &mut o.lines);
    }
}

fn line(sku: &str, percent: Option<u8>) -> Option<Line> {
    Some(Line {
        sku: sku.into(),
        discount: percent.map(|percent| Discount { percent }),
    })
}

#[test]
fn nested_nulls_inside_elements_keep_lists_aligned() {
    let order = Order {
        id: 7,
        lines: vec![line("a", Some(10)), line("b", None), None, line("c", Some(30))],
    };
    let registry = registry();
    let record = registry.flatten(&order).unwrap();

    assert_eq!(
        record.value("lines.discount.percent"),
        Some(&Value::Array(vec![Value::Integer(10), Value::Integer(30)]))
    );
    assert_eq!(record.null_indexes("lines.discount").unwrap(), Some(vec![1]));
    assert_eq!(record.null_indexes("lines").unwrap(), Some(vec![2]));

    let rebuilt: Order = registry.rebuild(&record).unwrap();
    assert_eq!(rebuilt, order);
}

#[derive(Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Clone)]
struct Tag {
    name: String,
}

impl Mapped for Tag {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("name", |t| &t.name, |t| &mut t.name);
    }
}

#[derive(Debug, Default, PartialEq)]
struct Shapes {
    id: i64,
    ordered: BTreeSet<Tag>,
    hashed: HashSet<Tag>,
    queue: VecDeque<Tag>,
    fixed: Box<[Tag]>,
    numbers: Option<BTreeSet<i64>>,
}

impl Mapped for Shapes {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |s| &s.id, |s| &mut s.id);
        schema.embed_many("ordered", |s| &s.ordered, |s| &mut s.ordered);
        schema.embed_many("hashed", |s| &s.hashed, |s| &mut s.hashed);
        schema.embed_many("queue", |s| &s.queue, |s| &mut s.queue);
        schema.embed_many("fixed", |s| &s.fixed, |s| &mut s.fixed);
        schema.list("numbers", |s| &s.numbers, |s| &mut s.numbers);
    }
}

fn tag(name: &str) -> Tag {
    Tag { name: name.into() }
}

#[test]
fn every_container_family_round_trips() {
    let shapes = Shapes {
        id: 1,
        ordered: [tag("b"), tag("a")].into_iter().collect(),
        hashed: [tag("x"), tag("y")].into_iter().collect(),
        queue: [tag("q1"), tag("q2")].into_iter().collect(),
        fixed: vec![tag("f1"), tag("f2"), tag("f3")].into_boxed_slice(),
        numbers: Some([3, 1, 2].into_iter().collect()),
    };
    let registry = registry();
    let record = registry.flatten(&shapes).unwrap();
    assert_eq!(
        record.value("ordered.name"),
        Some(&Value::Array(vec![Value::from("a"), Value::from("b")]))
    );

    let rebuilt: Shapes = registry.rebuild(&record).unwrap();
    assert_eq!(rebuilt, shapes);

    let desc = registry.describe::<Shapes>().unwrap();
    assert_eq!(
        desc.find("ordered").unwrap().container_shape(),
        Some(ContainerShape::OrderedSet)
    );
    assert_eq!(
        desc.find("fixed").unwrap().container_shape(),
        Some(ContainerShape::Array)
    );
    assert_eq!(
        desc.find("numbers").unwrap().container_shape(),
        Some(ContainerShape::OrderedSet)
    );
}

#[test]
fn existing_containers_are_cleared_and_reused() {
    let registry = registry();
    let mut record = FlatRecord::new("Shapes");
    record.set_id(Some(KeyId::Id(1)));
    record.set("queue.name", Value::Array(vec![Value::from("new")]), true);

    let mut shapes = Shapes::default();
    shapes.queue.reserve(64);
    shapes.queue.push_back(tag("old"));
    let capacity = shapes.queue.capacity();

    registry.rebuild_into(&record, &mut shapes).unwrap();
    assert_eq!(shapes.queue, VecDeque::from(vec![tag("new")]));
    assert_eq!(shapes.queue.capacity(), capacity);
}

#[test]
fn single_value_loads_as_one_element_list() {
    let mut record = FlatRecord::new("Shapes");
    record.set_id(Some(KeyId::Id(1)));
    record.set("numbers", Value::Integer(5), true);

    let shapes: Shapes = registry().rebuild(&record).unwrap();
    assert_eq!(shapes.numbers, Some([5].into_iter().collect()));
    assert!(shapes.ordered.is_empty());
    assert!(Container::is_empty(&shapes.fixed));
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Badge {
    label: String,
    legacy: Option<String>,
}

impl Mapped for Badge {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("label", |b| &b.label, |b| &mut b.label);
        schema.load_hook(&["oldLabel"], |b, value| match value {
            Value::Text(text) => {
                b.legacy = Some(text);
                Ok(())
            }
            other => Err(CoreError::TypeMismatch {
                path: "oldLabel".into(),
                expected: "text",
                found: other.type_name(),
            }),
        });
    }
}

#[derive(Debug, Default, PartialEq)]
struct Board {
    id: i64,
    single: Option<Badge>,
    many: Vec<Option<Badge>>,
}

impl Mapped for Board {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |b| &b.id, |b| &mut b.id);
        schema.embed("single", |b| &b.single, |b| &mut b.single);
        schema.embed_many("many", |b| &b.many, |b| &mut b.many);
    }
}

#[test]
fn element_hooks_run_per_element() {
    let mut record = FlatRecord::new("Board");
    record.set_id(Some(KeyId::Id(1)));
    record.set("single.oldLabel", Value::from("s"), false);
    record.set(
        "many.oldLabel",
        Value::Array(vec![Value::from("a"), Value::from("b")]),
        false,
    );

    let board: Board = registry().rebuild(&record).unwrap();
    assert_eq!(board.single.unwrap().legacy.as_deref(), Some("s"));
    let legacy: Vec<_> = board
        .many
        .iter()
        .map(|badge| badge.as_ref().and_then(|b| b.legacy.clone()))
        .collect();
    assert_eq!(legacy, vec![Some("a".to_string()), Some("b".to_string())]);
}

#[test]
fn element_hooks_skip_null_positions() {
    let mut record = FlatRecord::new("Board");
    record.set_id(Some(KeyId::Id(1)));
    record.set(
        "many.label",
        Value::Array(vec![Value::from("x"), Value::from("y")]),
        true,
    );
    record.set(
        "many.oldLabel",
        Value::Array(vec![Value::from("a"), Value::from("b")]),
        false,
    );
    record.set_null_indexes("many", &[1]);

    let board: Board = registry().rebuild(&record).unwrap();
    assert_eq!(
        board.many,
        vec![
            Some(Badge {
                label: "x".into(),
                legacy: Some("a".into()),
            }),
            None,
            Some(Badge {
                label: "y".into(),
                legacy: Some("b".into()),
            }),
        ]
    );
}

#[test]
fn failing_element_hook_aborts_the_rebuild() {
    let mut record = FlatRecord::new("Board");
    record.set_id(Some(KeyId::Id(1)));
    record.set("many.oldLabel", Value::Array(vec![Value::Integer(3)]), false);
    let err = registry().rebuild::<Board>(&record).unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch { ref path, .. } if path == "oldLabel"));
}
