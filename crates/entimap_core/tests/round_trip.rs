//! Round trips through flatten, rebuild and the mapper.

use entimap_core::{
    Always, Config, CoreError, FlatRecord, IfDefault, IfEmptyString, IfNull, KeyId, Mapped,
    Mapper, MemoryStore, RecordKey, Registry, Schema, Value,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Prefs {
    theme: String,
    sizes: Vec<u16>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Employee {
    id: Option<i64>,
    company: Option<RecordKey>,
    name: String,
    manager: Option<RecordKey>,
    level: u8,
    nickname: Option<String>,
    motto: String,
    skills: Vec<String>,
    prefs: Prefs,
    cache: Vec<u8>,
    scratch: i32,
}

impl Mapped for Employee {
    fn schema(schema: &mut Schema<Self>) {
        schema
            .kind("Staff")
            .default_constructor()
            .id("id", |e| &e.id, |e| &mut e.id)
            .parent("company", |e| &e.company, |e| &mut e.company);
        schema.field("name", |e| &e.name, |e| &mut e.name);
        schema.field("manager", |e| &e.manager, |e| &mut e.manager);
        schema
            .field("level", |e| &e.level, |e| &mut e.level)
            .unsaved::<IfDefault>();
        schema
            .field("nickname", |e| &e.nickname, |e| &mut e.nickname)
            .unsaved::<IfNull>();
        schema
            .field("motto", |e| &e.motto, |e| &mut e.motto)
            .unsaved::<IfEmptyString>();
        schema.list("skills", |e| &e.skills, |e| &mut e.skills);
        schema.serialized("prefs", |e| &e.prefs, |e| &mut e.prefs);
        schema
            .field("cache", |e| &e.cache, |e| &mut e.cache)
            .unsaved::<Always>();
        schema
            .field("scratch", |e| &e.scratch, |e| &mut e.scratch)
            .transient();
    }
}

fn employee() -> Employee {
    Employee {
        id: Some(42),
        company: Some(RecordKey::new("Company", "acme")),
        name: "Linus".into(),
        manager: Some(RecordKey::new("Staff", 7_i64)),
        level: 3,
        nickname: Some("lt".into()),
        motto: "ship it".into(),
        skills: vec!["c".into(), "git".into()],
        prefs: Prefs {
            theme: "dark".into(),
            sizes: vec![10, 12],
        },
        cache: vec![1, 2, 3],
        scratch: 99,
    }
}

#[test]
fn persisted_fields_round_trip() {
    let registry = Registry::new(Config::default());
    let original = employee();
    let record = registry.flatten(&original).unwrap();

    assert_eq!(record.kind(), "Staff");
    assert_eq!(record.id(), Some(&KeyId::Id(42)));
    assert_eq!(record.parent(), Some(&RecordKey::new("Company", "acme")));
    assert!(!record.contains("cache"));
    assert!(!record.contains("scratch"));
    assert!(!record.get("prefs").unwrap().indexed);
    assert_eq!(
        record.value("manager"),
        Some(&Value::Key(RecordKey::new("Staff", 7_i64)))
    );

    let rebuilt: Employee = registry.rebuild(&record).unwrap();
    assert_eq!(
        rebuilt,
        Employee {
            cache: Vec::new(),
            scratch: 0,
            ..original
        }
    );
}

#[test]
fn unsaved_values_come_back_as_defaults() {
    let registry = Registry::new(Config::default());
    let original = Employee {
        id: Some(1),
        level: 0,
        nickname: None,
        motto: String::new(),
        ..Employee::default()
    };
    let record = registry.flatten(&original).unwrap();
    assert!(!record.contains("level"));
    assert!(!record.contains("nickname"));
    assert!(!record.contains("motto"));

    let rebuilt: Employee = registry.rebuild(&record).unwrap();
    assert_eq!(rebuilt, original);
}

#[test]
fn key_of_record_includes_parent() {
    let registry = Registry::new(Config::default());
    let record = registry.flatten(&employee()).unwrap();
    let key = record.key().unwrap();
    assert_eq!(key.kind(), "Staff");
    assert_eq!(key.parent(), Some(&RecordKey::new("Company", "acme")));
}

#[test]
fn undecodable_blob_is_a_mapping_error() {
    let registry = Registry::new(Config::default());
    let mut record = registry.flatten(&employee()).unwrap();
    record.set("prefs", Value::Bytes(vec![0xff, 0x00]), false);
    let err = registry.rebuild::<Employee>(&record).unwrap_err();
    assert!(matches!(err, CoreError::Codec(_)));
    assert!(!err.is_config());
}

#[test]
fn type_mismatch_names_the_property() {
    let registry = Registry::new(Config::default());
    let mut record = FlatRecord::new("Staff");
    record.set_id(Some(KeyId::Id(1)));
    record.set("name", Value::Integer(5), true);
    let err = registry.rebuild::<Employee>(&record).unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch { ref path, .. } if path == "name"));
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Reading {
    id: i64,
    celsius: f64,
    ratio: f32,
    offset: Option<f64>,
    samples: Vec<f64>,
}

impl Mapped for Reading {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |r| &r.id, |r| &mut r.id);
        schema.field("celsius", |r| &r.celsius, |r| &mut r.celsius);
        schema.field("ratio", |r| &r.ratio, |r| &mut r.ratio);
        schema.field("offset", |r| &r.offset, |r| &mut r.offset);
        schema.list("samples", |r| &r.samples, |r| &mut r.samples);
    }
}

#[test]
#[allow(clippy::float_cmp)]
fn float_fields_round_trip() {
    let registry = Registry::new(Config::default());
    let reading = Reading {
        id: 1,
        celsius: -12.75,
        ratio: 0.1,
        offset: None,
        samples: vec![0.5, f64::MAX, -0.0, f64::NAN],
    };
    let record = registry.flatten(&reading).unwrap();
    assert_eq!(record.value("celsius"), Some(&Value::Float(-12.75)));
    assert_eq!(record.value("ratio"), Some(&Value::Float(f64::from(0.1_f32))));
    assert_eq!(record.value("offset"), Some(&Value::Null));

    let rebuilt: Reading = registry.rebuild(&record).unwrap();
    assert_eq!(rebuilt.celsius, reading.celsius);
    assert_eq!(rebuilt.ratio, 0.1_f32);
    assert_eq!(rebuilt.offset, None);
    assert_eq!(rebuilt.samples.len(), 4);
    assert_eq!(rebuilt.samples[1], f64::MAX);
    assert!(rebuilt.samples[2].is_sign_negative());
    assert!(rebuilt.samples[3].is_nan());
    assert_eq!(registry.flatten(&rebuilt).unwrap(), record);
}

#[test]
fn integers_do_not_load_into_float_fields() {
    let registry = Registry::new(Config::default());
    let mut record = FlatRecord::new("Reading");
    record.set_id(Some(KeyId::Id(1)));
    record.set("celsius", Value::Integer(3), true);
    let err = registry.rebuild::<Reading>(&record).unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch { ref path, .. } if path == "celsius"));
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Memo {
    text: Option<String>,
}

impl Mapped for Memo {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema
            .field("text", |m| &m.text, |m| &mut m.text)
            .unsaved::<IfNull>();
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Folder {
    memo: Option<Memo>,
}

impl Mapped for Folder {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.embed("memo", |f| &f.memo, |f| &mut f.memo);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Wrap {
    id: i64,
    note: Option<Memo>,
    folder: Option<Folder>,
}

impl Mapped for Wrap {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |w| &w.id, |w| &mut w.id);
        schema.embed("note", |w| &w.note, |w| &mut w.note);
        schema.embed("folder", |w| &w.folder, |w| &mut w.folder);
    }
}

#[test]
fn present_objects_without_saved_fields_stay_present() {
    let registry = Registry::new(Config::default());
    let wrap = Wrap {
        id: 5,
        note: Some(Memo { text: None }),
        folder: Some(Folder {
            memo: Some(Memo::default()),
        }),
    };
    let record = registry.flatten(&wrap).unwrap();
    assert!(!record.has_prefix("note."));
    let rebuilt: Wrap = registry.rebuild(&record).unwrap();
    assert_eq!(rebuilt, wrap);

    let empty = Wrap {
        id: 5,
        ..Wrap::default()
    };
    let rebuilt: Wrap = registry.rebuild(&registry.flatten(&empty).unwrap()).unwrap();
    assert_eq!(rebuilt, empty);
}

#[test]
fn mapper_writes_allocated_ids_back() {
    let mapper = Mapper::new(MemoryStore::new());
    let mut first = Employee {
        id: None,
        ..employee()
    };
    let mut second = first.clone();

    let first_key = mapper.put(&mut first).unwrap();
    let second_key = mapper.put(&mut second).unwrap();
    assert_eq!(first.id, Some(1));
    assert_eq!(second.id, Some(2));
    assert_ne!(first_key, second_key);

    let loaded: Employee = mapper.get(&first_key).unwrap().unwrap();
    assert_eq!(loaded.id, Some(1));
    assert_eq!(loaded.name, first.name);
    assert_eq!(loaded.company, first.company);
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Point {
    x: i64,
    y: Option<i64>,
}

impl Mapped for Point {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("x", |p| &p.x, |p| &mut p.x);
        schema.field("y", |p| &p.y, |p| &mut p.y);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Path {
    id: String,
    flags: Vec<bool>,
    start: Option<Point>,
    points: Option<Vec<Option<Point>>>,
}

impl Mapped for Path {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |p| &p.id, |p| &mut p.id);
        schema.list("flags", |p| &p.flags, |p| &mut p.flags);
        schema.embed("start", |p| &p.start, |p| &mut p.start);
        schema.embed_many("points", |p| &p.points, |p| &mut p.points);
    }
}

fn point() -> impl Strategy<Value = Point> {
    (any::<i64>(), proptest::option::of(any::<i64>())).prop_map(|(x, y)| Point { x, y })
}

fn path() -> impl Strategy<Value = Path> {
    (
        "[a-z]{1,8}",
        proptest::collection::vec(any::<bool>(), 0..4),
        proptest::option::of(point()),
        proptest::option::of(proptest::collection::vec(
            proptest::option::of(point()),
            0..6,
        )),
    )
        .prop_map(|(id, flags, start, points)| Path {
            id,
            flags,
            start,
            points,
        })
}

proptest! {
    #[test]
    fn rebuild_inverts_flatten(original in path()) {
        let registry = Registry::new(Config::default());
        let record = registry.flatten(&original).unwrap();
        let rebuilt: Path = registry.rebuild(&record).unwrap();
        prop_assert_eq!(rebuilt, original);
    }

    #[test]
    fn records_survive_serde(original in path()) {
        let registry = Registry::new(Config::default());
        let record = registry.flatten(&original).unwrap();
        let decoded = json_round_trip(&record);
        prop_assert_eq!(decoded, record);
    }
}

fn json_round_trip(record: &FlatRecord) -> FlatRecord {
    let json = serde_json::to_string(record).unwrap();
    serde_json::from_str(&json).unwrap()
}
