//! # EntiMap Core
//!
//! Metadata-driven mapping between typed entity graphs and flat records.
//!
//! This crate provides:
//! - [`Schema`], the declarative layout of a [`Mapped`] type
//! - [`Registry`], which resolves layouts into cached [`TypeDescriptor`]s
//! - flattening of entities into [`FlatRecord`]s and rebuilding them back
//! - [`RecordStore`] with an in-memory implementation, [`MemoryStore`]
//! - [`Mapper`], a typed facade over a registry and a store
//!
//! ## Design Principles
//!
//! - Embedded objects flatten to dotted paths (`address.city`)
//! - Embedded collections flatten to one list per leaf path, with null
//!   element positions kept in a `path^null` sideband property
//! - Indexing is resolved per field from field tags, class tags along the
//!   hierarchy and the registry's default
//! - Descriptors are built once per type and shared read-only
//!
//! ## Example
//!
//! ```rust
//! use entimap_core::{Config, Mapped, Registry, Schema, Value};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Address {
//!     city: String,
//! }
//!
//! impl Mapped for Address {
//!     fn schema(schema: &mut Schema<Self>) {
//!         schema.default_constructor();
//!         schema.field("city", |a| &a.city, |a| &mut a.city);
//!     }
//! }
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     id: i64,
//!     name: String,
//!     home: Option<Address>,
//! }
//!
//! impl Mapped for Person {
//!     fn schema(schema: &mut Schema<Self>) {
//!         schema.default_constructor().id("id", |p| &p.id, |p| &mut p.id);
//!         schema.field("name", |p| &p.name, |p| &mut p.name);
//!         schema.embed("home", |p| &p.home, |p| &mut p.home);
//!     }
//! }
//!
//! let registry = Registry::new(Config::default());
//! let person = Person {
//!     id: 1,
//!     name: "Ada".into(),
//!     home: Some(Address { city: "London".into() }),
//! };
//!
//! let record = registry.flatten(&person).unwrap();
//! assert_eq!(record.value("home.city"), Some(&Value::Text("London".into())));
//!
//! let rebuilt: Person = registry.rebuild(&record).unwrap();
//! assert_eq!(rebuilt, person);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod atomic;
mod condition;
mod config;
mod container;
mod descriptor;
mod error;
mod flatten;
mod introspect;
mod mapper;
mod policy;
mod rebuild;
mod record;
mod registry;
mod schema;
mod store;
mod types;

pub use atomic::{Atomic, IdValue, ValueError};
pub use condition::{
    Always, Condition, ConditionClass, ConditionContext, IfDefault, IfEmpty, IfEmptyString,
    IfFalse, IfNotNull, IfNull, IfTrue, IfZero, IfZeroFloat, Probe, ResolvedCondition,
};
pub use config::{Config, KindNaming};
pub use container::{fill, materialize, Container, ContainerShape, ContainerSlot};
pub use descriptor::{FieldDescriptor, NestedType, TypeDescriptor};
pub use error::{CoreError, CoreResult};
pub use introspect::{ClassLayout, FieldLayout, LevelLayout};
pub use mapper::Mapper;
pub use policy::IndexPolicy;
pub use record::{FlatRecord, Property};
pub use registry::Registry;
pub use schema::{FieldTags, Mapped, ObjectSlot, Schema};
pub use store::{MemoryStore, RecordStore};
pub use types::{extend_path, null_index_path, ValueKind, NULL_INDEX_SUFFIX};

pub use entimap_codec::{KeyId, RecordKey, Value};
