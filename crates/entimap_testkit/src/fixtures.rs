//! Entity fixtures and logging helpers.
//!
//! The fixture types cover the shapes most mappings run into: an entity
//! with an allocated numeric id and a parent, embedded singles, embedded
//! collections with null elements, a serialized field, and a hierarchy
//! with a class-level indexing tag.

use entimap_core::{IfNull, IfZero, Mapped, RecordKey, Schema};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG` and falls back to `warn`. Safe to call from every test.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A postal address, embedded in [`Person`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Address {
    /// Street line.
    pub street: String,
    /// City name.
    pub city: String,
    /// Optional postal code.
    pub zip: Option<String>,
}

impl Mapped for Address {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("street", |a| &a.street, |a| &mut a.street);
        schema.field("city", |a| &a.city, |a| &mut a.city);
        schema
            .field("zip", |a| &a.zip, |a| &mut a.zip)
            .old_name("postcode");
    }
}

/// A phone number, embedded many times in [`Person`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Phone {
    /// Label such as `home` or `work`.
    pub label: String,
    /// The number itself.
    pub number: String,
}

impl Mapped for Phone {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("label", |p| &p.label, |p| &mut p.label);
        schema.field("number", |p| &p.number, |p| &mut p.number);
    }
}

/// Display preferences stored as an opaque blob.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefs {
    /// Color theme name.
    pub theme: String,
    /// Preferred font sizes.
    pub sizes: Vec<u16>,
}

/// The main fixture entity.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    /// Allocated on first put.
    pub id: Option<i64>,
    /// Owning record.
    pub company: Option<RecordKey>,
    /// Full name.
    pub name: String,
    /// Age in years; zero is not stored.
    pub age: u8,
    /// Email; not stored when absent.
    pub email: Option<String>,
    /// Reference to another person.
    pub manager: Option<RecordKey>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Home address.
    pub home: Option<Address>,
    /// Phone numbers; elements may be null.
    pub phones: Option<Vec<Option<Phone>>>,
    /// Serialized preferences.
    pub prefs: Prefs,
    /// In-memory only.
    pub visits: u32,
}

impl Mapped for Person {
    fn schema(schema: &mut Schema<Self>) {
        schema
            .default_constructor()
            .id("id", |p| &p.id, |p| &mut p.id)
            .parent("company", |p| &p.company, |p| &mut p.company);
        schema
            .field("name", |p| &p.name, |p| &mut p.name)
            .old_name("fullName");
        schema
            .field("age", |p| &p.age, |p| &mut p.age)
            .unsaved::<IfZero>();
        schema
            .field("email", |p| &p.email, |p| &mut p.email)
            .unsaved::<IfNull>()
            .unindexed();
        schema.field("manager", |p| &p.manager, |p| &mut p.manager);
        schema.list("tags", |p| &p.tags, |p| &mut p.tags);
        schema.embed("home", |p| &p.home, |p| &mut p.home);
        schema.embed_many("phones", |p| &p.phones, |p| &mut p.phones);
        schema.serialized("prefs", |p| &p.prefs, |p| &mut p.prefs);
        schema
            .field("visits", |p| &p.visits, |p| &mut p.visits)
            .transient();
    }
}

/// Bookkeeping shared by documents. Its fields are unindexed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Audit {
    /// Who created the document.
    pub created_by: String,
    /// Revision counter.
    pub revision: i64,
}

impl Mapped for Audit {
    fn schema(schema: &mut Schema<Self>) {
        schema.unindexed();
        schema.field("createdBy", |a| &a.created_by, |a| &mut a.created_by);
        schema.field("revision", |a| &a.revision, |a| &mut a.revision);
    }
}

/// A discount applied to one invoice line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Discount {
    /// Percentage off.
    pub percent: u8,
}

impl Mapped for Discount {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("percent", |d| &d.percent, |d| &mut d.percent);
    }
}

/// An invoice line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Line {
    /// Stock keeping unit.
    pub sku: String,
    /// Quantity ordered.
    pub qty: u32,
    /// Optional discount.
    pub discount: Option<Discount>,
}

impl Mapped for Line {
    fn schema(schema: &mut Schema<Self>) {
        schema.default_constructor();
        schema.field("sku", |l| &l.sku, |l| &mut l.sku);
        schema.field("qty", |l| &l.qty, |l| &mut l.qty);
        schema.embed("discount", |l| &l.discount, |l| &mut l.discount);
    }
}

/// A named-id entity extending [`Audit`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Invoice {
    /// Inherited bookkeeping.
    pub audit: Audit,
    /// Invoice number, used as the record name.
    pub number: String,
    /// Customer reference.
    pub customer: Option<RecordKey>,
    /// Lines; elements may be null.
    pub lines: Vec<Option<Line>>,
    /// Internal note.
    pub note: String,
}

impl Mapped for Invoice {
    fn schema(schema: &mut Schema<Self>) {
        schema
            .default_constructor()
            .indexed()
            .extends(|i| &i.audit, |i| &mut i.audit)
            .id("number", |i| &i.number, |i| &mut i.number);
        schema.field("customer", |i| &i.customer, |i| &mut i.customer);
        schema.embed_many("lines", |i| &i.lines, |i| &mut i.lines);
        schema
            .field("note", |i| &i.note, |i| &mut i.note)
            .unindexed();
    }
}

/// A person with every field populated.
pub fn sample_person() -> Person {
    Person {
        id: None,
        company: Some(RecordKey::new("Company", "acme")),
        name: "Ada Lovelace".into(),
        age: 36,
        email: Some("ada@example.com".into()),
        manager: Some(RecordKey::new("Person", 7_i64)),
        tags: vec!["math".into(), "engines".into()],
        home: Some(Address {
            street: "12 St James's Square".into(),
            city: "London".into(),
            zip: None,
        }),
        phones: Some(vec![
            Some(Phone {
                label: "home".into(),
                number: "555-0100".into(),
            }),
            None,
            Some(Phone {
                label: "work".into(),
                number: "555-0199".into(),
            }),
        ]),
        prefs: Prefs {
            theme: "dark".into(),
            sizes: vec![11, 14],
        },
        visits: 0,
    }
}

/// An invoice with a null line and a line without discount.
pub fn sample_invoice() -> Invoice {
    Invoice {
        audit: Audit {
            created_by: "billing".into(),
            revision: 2,
        },
        number: "INV-0001".into(),
        customer: Some(RecordKey::new("Person", 1_i64)),
        lines: vec![
            Some(Line {
                sku: "gear".into(),
                qty: 4,
                discount: Some(Discount { percent: 10 }),
            }),
            Some(Line {
                sku: "lever".into(),
                qty: 1,
                discount: None,
            }),
            None,
        ],
        note: "net 30".into(),
    }
}
