//! Property-based test generators using proptest.
//!
//! Strategies produce fixture entities whose persisted state survives a
//! flatten and rebuild unchanged: transient fields are left at their
//! defaults and identifiers are always present.

use crate::fixtures::{Address, Audit, Discount, Invoice, Line, Person, Phone, Prefs};
use entimap_codec::{RecordKey, Value};
use proptest::prelude::*;

/// Strategy for generating short printable words.
pub fn word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ._-]{0,16}").expect("Invalid regex")
}

/// Strategy for generating valid kind names.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z0-9]{0,15}").expect("Invalid regex")
}

/// Strategy for generating record keys with numeric or named ids.
///
/// Some keys carry a parent key of their own.
pub fn record_key_strategy() -> impl Strategy<Value = RecordKey> {
    let name = || prop::string::string_regex("[a-z][a-z0-9-]{0,11}").expect("Invalid regex");
    prop_oneof![
        (kind_strategy(), 1..i64::MAX).prop_map(|(kind, id)| RecordKey::new(kind, id)),
        (kind_strategy(), name()).prop_map(|(kind, id)| RecordKey::new(kind, id)),
        (name(), kind_strategy(), 1..i64::MAX).prop_map(|(company, kind, id)| {
            RecordKey::with_parent(RecordKey::new("Company", company), kind, id)
        }),
    ]
}

/// Strategy for generating atomic property values.
///
/// Arrays hold scalar elements only, mirroring what a flat record stores.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9..1.0e9_f64).prop_map(Value::Float),
        word_strategy().prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        record_key_strategy().prop_map(Value::Key),
    ]
}

/// Strategy for generating property values, including flat arrays.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => scalar_value_strategy(),
        1 => prop::collection::vec(scalar_value_strategy(), 0..8).prop_map(Value::Array),
    ]
}

/// Strategy for generating addresses.
pub fn address_strategy() -> impl Strategy<Value = Address> {
    (
        word_strategy(),
        word_strategy(),
        prop::option::of(word_strategy()),
    )
        .prop_map(|(street, city, zip)| Address { street, city, zip })
}

/// Strategy for generating phones.
pub fn phone_strategy() -> impl Strategy<Value = Phone> {
    (word_strategy(), "[0-9]{3}-[0-9]{4}").prop_map(|(label, number)| Phone { label, number })
}

/// Strategy for generating element lists with null positions.
pub fn nullable_elements<S>(element: S, max: usize) -> impl Strategy<Value = Vec<Option<S::Value>>>
where
    S: Strategy,
{
    prop::collection::vec(prop::option::of(element), 0..=max)
}

/// Strategy for generating people with persisted ids.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    let identity = (
        prop::option::of(1..i64::MAX),
        prop::option::of(record_key_strategy()),
        word_strategy(),
        any::<u8>(),
        prop::option::of(word_strategy()),
        prop::option::of(record_key_strategy()),
    );
    let body = (
        prop::collection::vec(word_strategy(), 0..5),
        prop::option::of(address_strategy()),
        prop::option::of(nullable_elements(phone_strategy(), 5)),
        word_strategy(),
        prop::collection::vec(any::<u16>(), 0..4),
    );
    (identity, body).prop_map(
        |((id, company, name, age, email, manager), (tags, home, phones, theme, sizes))| Person {
            id: id.or(Some(1)),
            company,
            name,
            age,
            email,
            manager,
            tags,
            home,
            phones,
            prefs: Prefs { theme, sizes },
            visits: 0,
        },
    )
}

/// Strategy for generating invoice lines.
pub fn line_strategy() -> impl Strategy<Value = Line> {
    (
        word_strategy(),
        any::<u32>(),
        prop::option::of((0u8..=100).prop_map(|percent| Discount { percent })),
    )
        .prop_map(|(sku, qty, discount)| Line { sku, qty, discount })
}

/// Strategy for generating invoices.
pub fn invoice_strategy() -> impl Strategy<Value = Invoice> {
    (
        word_strategy(),
        any::<i64>(),
        prop::string::string_regex("INV-[0-9]{4}").expect("Invalid regex"),
        prop::option::of(record_key_strategy()),
        nullable_elements(line_strategy(), 6),
        word_strategy(),
    )
        .prop_map(|(created_by, revision, number, customer, lines, note)| Invoice {
            audit: Audit {
                created_by,
                revision,
            },
            number,
            customer,
            lines,
            note,
        })
}
