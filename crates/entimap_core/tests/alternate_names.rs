//! Loading under historical names and load hooks.

use entimap_core::{Config, CoreError, FlatRecord, KeyId, Mapped, Registry, Schema, Value};

#[derive(Debug, Default, PartialEq)]
struct Contact {
    id: i64,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    first: String,
    last: String,
}

impl Mapped for Contact {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |c| &c.id, |c| &mut c.id);
        schema
            .field("name", |c| &c.name, |c| &mut c.name)
            .old_name("fullName");
        schema
            .field("email", |c| &c.email, |c| &mut c.email)
            .also_load(&["mail", "eMail"]);
        // Both fields accept "contact"; the earlier declaration wins it.
        schema
            .field("phone", |c| &c.phone, |c| &mut c.phone)
            .old_name("contact");
        schema
            .field("first", |c| &c.first, |c| &mut c.first)
            .old_name("contact");
        schema.field("last", |c| &c.last, |c| &mut c.last);
        schema.load_hook(&["surname", "familyName"], |c, value| {
            if let Value::Text(last) = value {
                c.last = last;
            }
            Ok(())
        });
    }
}

fn record() -> FlatRecord {
    let mut record = FlatRecord::new("Contact");
    record.set_id(Some(KeyId::Id(1)));
    record
}

fn registry() -> Registry {
    Registry::new(Config::default())
}

#[test]
fn historical_name_only() {
    let mut record = record();
    record.set("fullName", Value::from("Grace Hopper"), true);
    let contact: Contact = registry().rebuild(&record).unwrap();
    assert_eq!(contact.name, "Grace Hopper");
}

#[test]
fn declared_name_beats_historical_name() {
    let mut record = record();
    record.set("fullName", Value::from("old"), true);
    record.set("name", Value::from("new"), true);
    let contact: Contact = registry().rebuild(&record).unwrap();
    assert_eq!(contact.name, "new");
}

#[test]
fn alternates_are_tried_in_declaration_order() {
    let mut record = record();
    record.set("eMail", Value::from("second@example.com"), true);
    record.set("mail", Value::from("first@example.com"), true);
    let contact: Contact = registry().rebuild(&record).unwrap();
    assert_eq!(contact.email.as_deref(), Some("first@example.com"));
}

#[test]
fn shared_alternate_goes_to_the_earlier_field() {
    let mut record = record();
    record.set("contact", Value::from("555-0100"), true);
    let contact: Contact = registry().rebuild(&record).unwrap();
    assert_eq!(contact.phone.as_deref(), Some("555-0100"));
    assert_eq!(contact.first, "");
}

#[test]
fn flatten_uses_only_the_declared_name() {
    let registry = registry();
    let contact = Contact {
        id: 1,
        name: "Ada".into(),
        ..Contact::default()
    };
    let record = registry.flatten(&contact).unwrap();
    assert!(record.contains("name"));
    assert!(!record.contains("fullName"));
    assert!(!record.contains("contact"));
}

#[test]
fn hook_receives_unclaimed_property() {
    let mut record = record();
    record.set("familyName", Value::from("Lovelace"), true);
    let contact: Contact = registry().rebuild(&record).unwrap();
    assert_eq!(contact.last, "Lovelace");
}

#[test]
fn hook_runs_after_fields() {
    let mut record = record();
    record.set("last", Value::from("field"), true);
    record.set("surname", Value::from("hook"), true);
    let contact: Contact = registry().rebuild(&record).unwrap();
    assert_eq!(contact.last, "hook");
}

#[derive(Debug, Default)]
struct Strict {
    id: i64,
    level: i64,
}

impl Mapped for Strict {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |s| &s.id, |s| &mut s.id);
        schema.load_hook(&["legacyLevel"], |s, value| match value {
            Value::Integer(level) => {
                s.level = level;
                Ok(())
            }
            other => Err(CoreError::TypeMismatch {
                path: "legacyLevel".into(),
                expected: "integer",
                found: other.type_name(),
            }),
        });
    }
}

#[test]
fn hook_errors_propagate() {
    let mut record = FlatRecord::new("Strict");
    record.set_id(Some(KeyId::Id(1)));
    record.set("legacyLevel", Value::from("high"), false);
    let err = registry().rebuild::<Strict>(&record).unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch { .. }));

    record.set("legacyLevel", Value::Integer(4), false);
    assert_eq!(registry().rebuild::<Strict>(&record).unwrap().level, 4);
}

#[derive(Debug, Default)]
struct BlankAlias {
    id: i64,
    v: i32,
}

impl Mapped for BlankAlias {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor().id("id", |b| &b.id, |b| &mut b.id);
        schema.field("v", |b| &b.v, |b| &mut b.v).old_name("  ");
    }
}

#[test]
fn blank_alternate_name_is_a_config_error() {
    let err = registry().describe::<BlankAlias>().unwrap_err();
    assert!(err.is_config());
    assert!(matches!(err, CoreError::InvalidAlternateName { .. }));
}
