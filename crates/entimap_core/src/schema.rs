//! Declarative entity metadata.
//!
//! Types opt into mapping by implementing [`Mapped`] and describing their
//! persistent fields on a [`Schema`]:
//!
//! ```
//! use entimap_core::{IfNull, Mapped, Schema};
//!
//! #[derive(Default)]
//! struct Employee {
//!     id: Option<i64>,
//!     name: String,
//!     nickname: Option<String>,
//! }
//!
//! impl Mapped for Employee {
//!     fn schema(schema: &mut Schema<Self>) {
//!         schema
//!             .default_constructor()
//!             .id("id", |e| &e.id, |e| &mut e.id);
//!         schema.field("name", |e| &e.name, |e| &mut e.name).old_name("fullName");
//!         schema
//!             .field("nickname", |e| &e.nickname, |e| &mut e.nickname)
//!             .unindexed()
//!             .unsaved::<IfNull>();
//!     }
//! }
//! ```

use crate::access::{
    Construct, Ctor, ElementsAccess, FieldRef, HookAccess, HookRef, IdAccess, Lens, ListRef,
    ObjectAccess, OpaqueRef, ParentAccess, ValueAccess,
};
use crate::atomic::{Atomic, IdValue};
use crate::condition::{ConditionClass, ConditionSpec};
use crate::container::{Container, ContainerShape, ContainerSlot};
use crate::error::CoreResult;
use crate::introspect::ClassLayout;
use crate::registry::Registry;
use crate::types::ValueKind;
use entimap_codec::{RecordKey, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

/// A type that can be flattened into and rebuilt from a flat record.
///
/// Entity types must declare an identifier; types used only as embedded
/// values or as bases need not. Every type that is described or embedded
/// needs a constructor.
pub trait Mapped: Sized + Send + Sync + 'static {
    /// Declares the type's persistent layout.
    fn schema(schema: &mut Schema<Self>);
}

/// A field slot holding an embedded object: `U` or `Option<U>`.
pub trait ObjectSlot: Sized + Send + Sync + 'static {
    /// The embedded type.
    type Target: Mapped;

    /// The object, or `None` when the slot is null.
    fn object(&self) -> Option<&Self::Target>;

    /// Mutable access to the object, if present.
    fn object_mut(&mut self) -> Option<&mut Self::Target>;

    /// Wraps an object (or null) into a slot value. Returns `None` when the
    /// slot cannot represent null.
    fn from_object(object: Option<Self::Target>) -> Option<Self>;
}

impl<U: Mapped> ObjectSlot for U {
    type Target = U;

    fn object(&self) -> Option<&U> {
        Some(self)
    }

    fn object_mut(&mut self) -> Option<&mut U> {
        Some(self)
    }

    fn from_object(object: Option<U>) -> Option<Self> {
        object
    }
}

impl<U: Mapped> ObjectSlot for Option<U> {
    type Target = U;

    fn object(&self) -> Option<&U> {
        self.as_ref()
    }

    fn object_mut(&mut self) -> Option<&mut U> {
        self.as_mut()
    }

    fn from_object(object: Option<U>) -> Option<Self> {
        Some(object)
    }
}

/// An `indexed`/`unindexed` tag, remembering contradictory declarations.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct IndexTag {
    pub(crate) value: Option<bool>,
    pub(crate) conflicting: bool,
}

impl IndexTag {
    fn set(&mut self, indexed: bool) {
        if self.value.is_some_and(|current| current != indexed) {
            self.conflicting = true;
        }
        self.value = Some(indexed);
    }
}

#[derive(Debug, Default)]
pub(crate) struct TagSet {
    pub(crate) index: IndexTag,
    pub(crate) alternates: Vec<String>,
    pub(crate) unsaved: Vec<ConditionSpec>,
    pub(crate) transient: bool,
    pub(crate) serialized: bool,
}

/// The embedded type behind an embedded field.
#[derive(Clone, Copy)]
pub(crate) struct TargetRef {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) layout: fn(&Registry) -> CoreResult<Arc<ClassLayout>>,
}

impl TargetRef {
    fn of<U: Mapped>() -> Self {
        Self {
            type_id: TypeId::of::<U>(),
            type_name: type_name::<U>(),
            layout: Registry::layout::<U>,
        }
    }
}

pub(crate) enum DeclShape {
    Value {
        access: Arc<dyn ValueAccess>,
        kind: ValueKind,
    },
    List {
        access: Arc<dyn ValueAccess>,
        element_type: &'static str,
        shape: ContainerShape,
    },
    Opaque {
        access: Arc<dyn ValueAccess>,
    },
    Embed {
        access: Arc<dyn ObjectAccess>,
        target: TargetRef,
    },
    EmbedMany {
        access: Arc<dyn ElementsAccess>,
        target: TargetRef,
        shape: ContainerShape,
    },
}

pub(crate) struct FieldDecl {
    pub(crate) name: String,
    pub(crate) tags: TagSet,
    pub(crate) shape: DeclShape,
}

pub(crate) struct KeyDecl<A: ?Sized> {
    pub(crate) name: String,
    pub(crate) access: Arc<A>,
}

pub(crate) struct HookDecl {
    pub(crate) names: Vec<String>,
    pub(crate) access: Arc<dyn HookAccess>,
}

pub(crate) struct BaseDecl {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) lens: Arc<dyn Lens>,
    pub(crate) declare: fn() -> SchemaDecl,
}

/// Everything one type declares, with its field types erased.
pub(crate) struct SchemaDecl {
    pub(crate) type_name: &'static str,
    pub(crate) kind: Option<String>,
    pub(crate) index: IndexTag,
    pub(crate) constructor: Option<Arc<dyn Construct>>,
    pub(crate) base: Option<BaseDecl>,
    pub(crate) id: Option<KeyDecl<dyn IdAccess>>,
    pub(crate) parent: Option<KeyDecl<dyn ParentAccess>>,
    pub(crate) fields: Vec<FieldDecl>,
    pub(crate) hooks: Vec<HookDecl>,
}

/// Runs `T`'s schema declaration.
pub(crate) fn declare<T: Mapped>() -> SchemaDecl {
    let mut schema = Schema::<T>::new();
    T::schema(&mut schema);
    schema.decl
}

/// Builder for a type's persistent layout. See [`Mapped`].
pub struct Schema<T> {
    decl: SchemaDecl,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Mapped> Schema<T> {
    fn new() -> Self {
        Self {
            decl: SchemaDecl {
                type_name: type_name::<T>(),
                kind: None,
                index: IndexTag::default(),
                constructor: None,
                base: None,
                id: None,
                parent: None,
                fields: Vec::new(),
                hooks: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Sets the store kind. Defaults to a name derived from the Rust type.
    pub fn kind(&mut self, kind: impl Into<String>) -> &mut Self {
        self.decl.kind = Some(kind.into());
        self
    }

    /// Indexes fields declared at this level (and below) by default.
    pub fn indexed(&mut self) -> &mut Self {
        self.decl.index.set(true);
        self
    }

    /// Leaves fields declared at this level (and below) unindexed by default.
    pub fn unindexed(&mut self) -> &mut Self {
        self.decl.index.set(false);
        self
    }

    /// Sets the zero-argument constructor used when rebuilding.
    pub fn constructor(&mut self, make: fn() -> T) -> &mut Self {
        self.decl.constructor = Some(Arc::new(Ctor { make }));
        self
    }

    /// Uses `T::default` as the constructor.
    pub fn default_constructor(&mut self) -> &mut Self
    where
        T: Default,
    {
        self.constructor(T::default)
    }

    /// Declares that `T` extends `P`, which it holds by value.
    ///
    /// `P`'s fields come before `T`'s and `P`'s class-level tags apply to
    /// them. `P` needs no constructor of its own.
    pub fn extends<P: Mapped>(&mut self, get: fn(&T) -> &P, get_mut: fn(&mut T) -> &mut P) -> &mut Self {
        self.decl.base = Some(BaseDecl {
            type_id: TypeId::of::<P>(),
            type_name: type_name::<P>(),
            lens: Arc::new(FieldRef::new(get, get_mut)),
            declare: declare::<P>,
        });
        self
    }

    /// Declares the identifier field.
    ///
    /// Only entities have keys. When the type is embedded in another, the
    /// identifier is neither saved nor loaded, and a regular field declared
    /// under the same name is dropped with it.
    pub fn id<I: IdValue>(
        &mut self,
        name: &str,
        get: fn(&T) -> &I,
        get_mut: fn(&mut T) -> &mut I,
    ) -> &mut Self {
        self.decl.id = Some(KeyDecl {
            name: name.to_string(),
            access: Arc::new(FieldRef::new(get, get_mut)),
        });
        self
    }

    /// Declares the parent key field.
    ///
    /// Like [`id`](Self::id), ignored when the type is embedded.
    pub fn parent(
        &mut self,
        name: &str,
        get: fn(&T) -> &Option<RecordKey>,
        get_mut: fn(&mut T) -> &mut Option<RecordKey>,
    ) -> &mut Self {
        self.decl.parent = Some(KeyDecl {
            name: name.to_string(),
            access: Arc::new(FieldRef::new(get, get_mut)),
        });
        self
    }

    /// Declares an atomic field.
    pub fn field<V: Atomic>(
        &mut self,
        name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> FieldTags<'_> {
        self.push(
            name,
            DeclShape::Value {
                access: Arc::new(FieldRef::new(get, get_mut)),
                kind: V::KIND,
            },
        )
    }

    /// Declares a collection of atomic values, stored as one list property.
    pub fn list<C>(&mut self, name: &str, get: fn(&T) -> &C, get_mut: fn(&mut T) -> &mut C) -> FieldTags<'_>
    where
        C: ContainerSlot,
        <C::Target as Container>::Elem: Atomic,
    {
        self.push(
            name,
            DeclShape::List {
                access: Arc::new(ListRef(FieldRef::new(get, get_mut))),
                element_type: type_name::<<C::Target as Container>::Elem>(),
                shape: <C::Target as Container>::SHAPE,
            },
        )
    }

    /// Declares an embedded object, flattened under the field's name.
    pub fn embed<F: ObjectSlot>(
        &mut self,
        name: &str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> FieldTags<'_> {
        self.push(
            name,
            DeclShape::Embed {
                access: Arc::new(FieldRef::new(get, get_mut)),
                target: TargetRef::of::<F::Target>(),
            },
        )
    }

    /// Declares an embedded collection. Each element is flattened under the
    /// field's name and the values of each leaf collect into one list.
    pub fn embed_many<C>(
        &mut self,
        name: &str,
        get: fn(&T) -> &C,
        get_mut: fn(&mut T) -> &mut C,
    ) -> FieldTags<'_>
    where
        C: ContainerSlot,
        <C::Target as Container>::Elem: ObjectSlot,
    {
        self.push(
            name,
            DeclShape::EmbedMany {
                access: Arc::new(FieldRef::new(get, get_mut)),
                target: TargetRef::of::<<<C::Target as Container>::Elem as ObjectSlot>::Target>(),
                shape: <C::Target as Container>::SHAPE,
            },
        )
    }

    /// Declares a field stored as an opaque, unindexed CBOR blob.
    pub fn serialized<V>(
        &mut self,
        name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> FieldTags<'_>
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let mut tags = self.push(
            name,
            DeclShape::Opaque {
                access: Arc::new(OpaqueRef(FieldRef::new(get, get_mut))),
            },
        );
        tags.tags.serialized = true;
        tags
    }

    /// Registers a hook receiving the value stored under any of `names`.
    ///
    /// Hooks run after the fields are loaded and only see properties no
    /// field has claimed. The first present name wins.
    pub fn load_hook(&mut self, names: &[&str], hook: fn(&mut T, Value) -> CoreResult<()>) -> &mut Self {
        self.decl.hooks.push(HookDecl {
            names: names.iter().map(|n| (*n).to_string()).collect(),
            access: Arc::new(HookRef { hook }),
        });
        self
    }

    fn push(&mut self, name: &str, shape: DeclShape) -> FieldTags<'_> {
        let index = self.decl.fields.len();
        self.decl.fields.push(FieldDecl {
            name: name.to_string(),
            tags: TagSet::default(),
            shape,
        });
        FieldTags {
            tags: &mut self.decl.fields[index].tags,
        }
    }
}

/// Per-field tags, returned by the [`Schema`] field methods.
pub struct FieldTags<'a> {
    tags: &'a mut TagSet,
}

impl FieldTags<'_> {
    /// Always index this field.
    pub fn indexed(self) -> Self {
        self.tags.index.set(true);
        self
    }

    /// Never index this field.
    pub fn unindexed(self) -> Self {
        self.tags.index.set(false);
        self
    }

    /// Also load the field from these property names.
    pub fn also_load(self, names: &[&str]) -> Self {
        self.tags
            .alternates
            .extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    /// Also load the field from a former name.
    pub fn old_name(self, name: &str) -> Self {
        self.tags.alternates.push(name.to_string());
        self
    }

    /// Skip the field when condition `C` matches its value.
    pub fn unsaved<C: ConditionClass>(self) -> Self {
        self.tags.unsaved.push(ConditionSpec::of::<C>());
        self
    }

    /// Exclude the field from mapping.
    pub fn transient(self) -> Self {
        self.tags.transient = true;
        self
    }

    /// Store the field as an opaque, unindexed CBOR blob.
    pub fn serialized(self) -> Self {
        self.tags.serialized = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Base {
        label: String,
    }

    impl Mapped for Base {
        fn schema(schema: &mut Schema<Self>) {
            schema.unindexed();
            schema.field("label", |b| &b.label, |b| &mut b.label);
        }
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        id: i64,
        count: i32,
        tags: Vec<String>,
    }

    impl Mapped for Derived {
        fn schema(schema: &mut Schema<Self>) {
            schema
                .kind("Thing")
                .default_constructor()
                .extends(|d| &d.base, |d| &mut d.base)
                .id("id", |d| &d.id, |d| &mut d.id);
            schema
                .field("count", |d| &d.count, |d| &mut d.count)
                .indexed()
                .old_name("num");
            schema.list("tags", |d| &d.tags, |d| &mut d.tags).unindexed();
        }
    }

    #[test]
    fn declaration_is_recorded() {
        let decl = declare::<Derived>();
        assert_eq!(decl.kind.as_deref(), Some("Thing"));
        assert!(decl.constructor.is_some());
        assert_eq!(decl.id.as_ref().map(|id| id.name.as_str()), Some("id"));
        assert_eq!(decl.fields.len(), 2);
        assert_eq!(decl.fields[0].tags.index.value, Some(true));
        assert_eq!(decl.fields[0].tags.alternates, vec!["num".to_string()]);
        assert!(matches!(
            decl.fields[1].shape,
            DeclShape::List {
                shape: ContainerShape::List,
                ..
            }
        ));

        let base = decl.base.as_ref().unwrap();
        assert_eq!(base.type_id, TypeId::of::<Base>());
        let base_decl = (base.declare)();
        assert_eq!(base_decl.index.value, Some(false));
        assert!(base_decl.constructor.is_none());
    }

    #[test]
    fn contradictory_tags_are_remembered() {
        let mut tag = IndexTag::default();
        tag.set(true);
        tag.set(true);
        assert!(!tag.conflicting);
        tag.set(false);
        assert!(tag.conflicting);
    }
}
