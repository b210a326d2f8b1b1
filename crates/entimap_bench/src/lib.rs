//! Benchmark utilities.
//!
//! Builds reproducible batches of fixture entities so runs compare.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use entimap_core::RecordKey;
use entimap_testkit::{Address, Discount, Invoice, Line, Person, Phone, Prefs};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seed shared by every benchmark batch.
pub const SEED: u64 = 0x5eed_0001;

fn word(rng: &mut impl Rng, len: usize) -> String {
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// Generate a person with `phones` phone slots, roughly one in five null.
pub fn random_person(rng: &mut impl Rng, phones: usize) -> Person {
    Person {
        id: Some(rng.gen_range(1..i64::MAX)),
        company: Some(RecordKey::new("Company", word(rng, 6))),
        name: word(rng, 12),
        age: rng.gen(),
        email: rng.gen_bool(0.5).then(|| format!("{}@example.com", word(rng, 8))),
        manager: rng
            .gen_bool(0.5)
            .then(|| RecordKey::new("Person", rng.gen_range(1..1_000_i64))),
        tags: (0..rng.gen_range(0..4)).map(|_| word(rng, 5)).collect(),
        home: Some(Address {
            street: word(rng, 16),
            city: word(rng, 8),
            zip: rng.gen_bool(0.7).then(|| word(rng, 5)),
        }),
        phones: Some(
            (0..phones)
                .map(|_| {
                    (!rng.gen_bool(0.2)).then(|| Phone {
                        label: word(rng, 4),
                        number: format!("{:03}-{:04}", rng.gen_range(0..1000), rng.gen_range(0..10000)),
                    })
                })
                .collect(),
        ),
        prefs: Prefs {
            theme: word(rng, 5),
            sizes: vec![rng.gen(), rng.gen()],
        },
        visits: 0,
    }
}

/// Generate a batch of people with a fixed seed.
pub fn generate_people(count: usize, phones: usize) -> Vec<Person> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count).map(|_| random_person(&mut rng, phones)).collect()
}

/// Generate an invoice with `lines` line slots.
pub fn random_invoice(rng: &mut impl Rng, number: usize, lines: usize) -> Invoice {
    let mut invoice = Invoice {
        number: format!("INV-{number:06}"),
        customer: Some(RecordKey::new("Person", rng.gen_range(1..1_000_i64))),
        note: word(rng, 24),
        ..Invoice::default()
    };
    invoice.audit.created_by = word(rng, 6);
    invoice.audit.revision = rng.gen_range(0..10);
    invoice.lines = (0..lines)
        .map(|_| {
            (!rng.gen_bool(0.1)).then(|| Line {
                sku: word(rng, 8),
                qty: rng.gen_range(1..100),
                discount: rng.gen_bool(0.3).then(|| Discount {
                    percent: rng.gen_range(1..=50),
                }),
            })
        })
        .collect();
    invoice
}

/// Generate a batch of invoices with a fixed seed.
pub fn generate_invoices(count: usize, lines: usize) -> Vec<Invoice> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count).map(|n| random_invoice(&mut rng, n, lines)).collect()
}
