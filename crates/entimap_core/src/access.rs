//! Type-erased field access.
//!
//! A schema hands out plain accessor functions (`fn(&T) -> &V`). They are
//! wrapped in small generic structs that implement object-safe traits over
//! `dyn Any`, so descriptors stay non-generic and can be cached per type.

use crate::atomic::{Atomic, IdValue};
use crate::container::{fill, Container, ContainerSlot};
use crate::error::{CoreError, CoreResult};
use crate::schema::{Mapped, ObjectSlot};
use entimap_codec::{from_blob, to_cbor, KeyId, RecordKey, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, Any};
use std::sync::Arc;

fn downcast_ref<T: Any>(obj: &dyn Any) -> CoreResult<&T> {
    obj.downcast_ref::<T>().ok_or(CoreError::WrongInstance {
        expected: type_name::<T>(),
    })
}

fn downcast_mut<T: Any>(obj: &mut dyn Any) -> CoreResult<&mut T> {
    obj.downcast_mut::<T>().ok_or(CoreError::WrongInstance {
        expected: type_name::<T>(),
    })
}

fn null_into_object(path: &str) -> CoreError {
    CoreError::TypeMismatch {
        path: path.to_string(),
        expected: "object",
        found: "null",
    }
}

/// How a value field is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoding {
    /// The property holds the value as read.
    Native,
    /// The property holds the value as a CBOR blob.
    Cbor,
}

impl Encoding {
    pub(crate) fn encode(self, value: Value) -> CoreResult<Value> {
        match self {
            Encoding::Native => Ok(value),
            Encoding::Cbor => Ok(Value::Bytes(to_cbor(&value)?)),
        }
    }

    pub(crate) fn decode(self, value: Value) -> CoreResult<Value> {
        match self {
            Encoding::Native => Ok(value),
            Encoding::Cbor => Ok(from_blob(&value)?),
        }
    }
}

/// Projects a subtype onto the base it extends.
pub(crate) trait Lens: Send + Sync {
    fn project<'a>(&self, obj: &'a dyn Any) -> CoreResult<&'a dyn Any>;
    fn project_mut<'a>(&self, obj: &'a mut dyn Any) -> CoreResult<&'a mut dyn Any>;
}

/// Applies a lens chain, outermost first.
pub(crate) fn project<'a>(lenses: &[Arc<dyn Lens>], obj: &'a dyn Any) -> CoreResult<&'a dyn Any> {
    lenses.iter().try_fold(obj, |obj, lens| lens.project(obj))
}

pub(crate) fn project_mut<'a>(
    lenses: &[Arc<dyn Lens>],
    obj: &'a mut dyn Any,
) -> CoreResult<&'a mut dyn Any> {
    lenses.iter().try_fold(obj, |obj, lens| lens.project_mut(obj))
}

/// Atomic, list and opaque fields: anything stored as a single [`Value`].
pub(crate) trait ValueAccess: Send + Sync {
    fn read(&self, obj: &dyn Any) -> CoreResult<Value>;
    fn write(&self, obj: &mut dyn Any, path: &str, value: Value) -> CoreResult<()>;
}

/// Embedded single objects.
pub(crate) trait ObjectAccess: Send + Sync {
    fn read<'a>(&self, obj: &'a dyn Any) -> CoreResult<Option<&'a dyn Any>>;
    fn read_mut<'a>(&self, obj: &'a mut dyn Any) -> CoreResult<Option<&'a mut dyn Any>>;
    fn write(&self, obj: &mut dyn Any, path: &str, value: Option<Box<dyn Any>>) -> CoreResult<()>;
}

/// Embedded collections.
pub(crate) trait ElementsAccess: Send + Sync {
    fn read<'a>(&self, obj: &'a dyn Any) -> CoreResult<Option<Vec<Option<&'a dyn Any>>>>;
    fn write(
        &self,
        obj: &mut dyn Any,
        path: &str,
        elements: Vec<Option<Box<dyn Any>>>,
    ) -> CoreResult<()>;
}

pub(crate) trait IdAccess: Send + Sync {
    fn read(&self, obj: &dyn Any) -> CoreResult<Option<KeyId>>;
    fn write(&self, obj: &mut dyn Any, path: &str, id: KeyId) -> CoreResult<()>;
}

pub(crate) trait ParentAccess: Send + Sync {
    fn read(&self, obj: &dyn Any) -> CoreResult<Option<RecordKey>>;
    fn write(&self, obj: &mut dyn Any, parent: Option<RecordKey>) -> CoreResult<()>;
}

pub(crate) trait HookAccess: Send + Sync {
    fn call(&self, obj: &mut dyn Any, value: Value) -> CoreResult<()>;
}

pub(crate) trait Construct: Send + Sync {
    fn construct(&self) -> Box<dyn Any>;
}

/// A field of `T` holding a `V`.
pub(crate) struct FieldRef<T, V> {
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T: Any, V> FieldRef<T, V> {
    pub(crate) fn new(get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self { get, get_mut }
    }

    fn slot<'a>(&self, obj: &'a dyn Any) -> CoreResult<&'a V> {
        Ok((self.get)(downcast_ref::<T>(obj)?))
    }

    fn slot_mut<'a>(&self, obj: &'a mut dyn Any) -> CoreResult<&'a mut V> {
        Ok((self.get_mut)(downcast_mut::<T>(obj)?))
    }
}

impl<T: Mapped, P: Mapped> Lens for FieldRef<T, P> {
    fn project<'a>(&self, obj: &'a dyn Any) -> CoreResult<&'a dyn Any> {
        Ok(self.slot(obj)?)
    }

    fn project_mut<'a>(&self, obj: &'a mut dyn Any) -> CoreResult<&'a mut dyn Any> {
        Ok(self.slot_mut(obj)?)
    }
}

impl<T: Mapped, V: Atomic> ValueAccess for FieldRef<T, V> {
    fn read(&self, obj: &dyn Any) -> CoreResult<Value> {
        Ok(self.slot(obj)?.to_value())
    }

    fn write(&self, obj: &mut dyn Any, path: &str, value: Value) -> CoreResult<()> {
        let value = V::from_value(value).map_err(|e| CoreError::value_at(path, e))?;
        *self.slot_mut(obj)? = value;
        Ok(())
    }
}

impl<T: Mapped, F: ObjectSlot> ObjectAccess for FieldRef<T, F> {
    fn read<'a>(&self, obj: &'a dyn Any) -> CoreResult<Option<&'a dyn Any>> {
        Ok(self.slot(obj)?.object().map(|o| o as &dyn Any))
    }

    fn read_mut<'a>(&self, obj: &'a mut dyn Any) -> CoreResult<Option<&'a mut dyn Any>> {
        Ok(self.slot_mut(obj)?.object_mut().map(|o| o as &mut dyn Any))
    }

    fn write(&self, obj: &mut dyn Any, path: &str, value: Option<Box<dyn Any>>) -> CoreResult<()> {
        let object = value.map(unbox::<F::Target>).transpose()?;
        let slot = F::from_object(object).ok_or_else(|| null_into_object(path))?;
        *self.slot_mut(obj)? = slot;
        Ok(())
    }
}

impl<T, C> ElementsAccess for FieldRef<T, C>
where
    T: Mapped,
    C: ContainerSlot,
    <C::Target as Container>::Elem: ObjectSlot,
{
    fn read<'a>(&self, obj: &'a dyn Any) -> CoreResult<Option<Vec<Option<&'a dyn Any>>>> {
        Ok(self.slot(obj)?.container().map(|c| {
            c.elements()
                .map(|e| e.object().map(|o| o as &dyn Any))
                .collect()
        }))
    }

    fn write(
        &self,
        obj: &mut dyn Any,
        path: &str,
        elements: Vec<Option<Box<dyn Any>>>,
    ) -> CoreResult<()> {
        let items = elements
            .into_iter()
            .map(|element| {
                let object = element
                    .map(unbox::<<<C::Target as Container>::Elem as ObjectSlot>::Target>)
                    .transpose()?;
                <<C::Target as Container>::Elem as ObjectSlot>::from_object(object)
                    .ok_or_else(|| null_into_object(path))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        fill(self.slot_mut(obj)?, Some(items));
        Ok(())
    }
}

impl<T: Mapped, I: IdValue> IdAccess for FieldRef<T, I> {
    fn read(&self, obj: &dyn Any) -> CoreResult<Option<KeyId>> {
        Ok(self.slot(obj)?.to_key_id())
    }

    fn write(&self, obj: &mut dyn Any, path: &str, id: KeyId) -> CoreResult<()> {
        let id = I::from_key_id(id).map_err(|e| CoreError::value_at(path, e))?;
        *self.slot_mut(obj)? = id;
        Ok(())
    }
}

impl<T: Mapped> ParentAccess for FieldRef<T, Option<RecordKey>> {
    fn read(&self, obj: &dyn Any) -> CoreResult<Option<RecordKey>> {
        Ok(self.slot(obj)?.clone())
    }

    fn write(&self, obj: &mut dyn Any, parent: Option<RecordKey>) -> CoreResult<()> {
        *self.slot_mut(obj)? = parent;
        Ok(())
    }
}

fn unbox<U: Any>(boxed: Box<dyn Any>) -> CoreResult<U> {
    boxed
        .downcast::<U>()
        .map(|b| *b)
        .map_err(|_| CoreError::WrongInstance {
            expected: type_name::<U>(),
        })
}

/// A non-embedded collection of atomic values, stored as one list property.
pub(crate) struct ListRef<T, C>(pub(crate) FieldRef<T, C>);

impl<T, C> ValueAccess for ListRef<T, C>
where
    T: Mapped,
    C: ContainerSlot,
    <C::Target as Container>::Elem: Atomic,
{
    fn read(&self, obj: &dyn Any) -> CoreResult<Value> {
        Ok(match self.0.slot(obj)?.container() {
            Some(c) => Value::Array(c.elements().map(Atomic::to_value).collect()),
            None => Value::Null,
        })
    }

    fn write(&self, obj: &mut dyn Any, path: &str, value: Value) -> CoreResult<()> {
        let stored = match value {
            Value::Null => None,
            Value::Array(items) => Some(items),
            // A single value loads as a one-element collection.
            single => Some(vec![single]),
        };
        let items = stored
            .map(|items| {
                items
                    .into_iter()
                    .map(|item| {
                        <<C::Target as Container>::Elem as Atomic>::from_value(item)
                            .map_err(|e| CoreError::value_at(path, e))
                    })
                    .collect::<CoreResult<Vec<_>>>()
            })
            .transpose()?;
        fill(self.0.slot_mut(obj)?, items);
        Ok(())
    }
}

/// A serde value stored as an opaque blob.
pub(crate) struct OpaqueRef<T, V>(pub(crate) FieldRef<T, V>);

impl<T, V> ValueAccess for OpaqueRef<T, V>
where
    T: Mapped,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn read(&self, obj: &dyn Any) -> CoreResult<Value> {
        Ok(Value::Bytes(to_cbor(self.0.slot(obj)?)?))
    }

    fn write(&self, obj: &mut dyn Any, _path: &str, value: Value) -> CoreResult<()> {
        *self.0.slot_mut(obj)? = from_blob(&value)?;
        Ok(())
    }
}

pub(crate) struct HookRef<T> {
    pub(crate) hook: fn(&mut T, Value) -> CoreResult<()>,
}

impl<T: Mapped> HookAccess for HookRef<T> {
    fn call(&self, obj: &mut dyn Any, value: Value) -> CoreResult<()> {
        (self.hook)(downcast_mut::<T>(obj)?, value)
    }
}

pub(crate) struct Ctor<T> {
    pub(crate) make: fn() -> T,
}

impl<T: Mapped> Construct for Ctor<T> {
    fn construct(&self) -> Box<dyn Any> {
        Box::new((self.make)())
    }
}
