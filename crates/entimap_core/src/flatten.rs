//! Entity → flat record.
//!
//! Embedded objects are flattened under dotted paths. The elements of an
//! embedded collection all write to the same paths, so each leaf becomes a
//! list with one entry per non-null element. Null elements are recorded by
//! position in a `^null` sideband property next to the collection's path.
//! An embedded single that is present but wrote nothing leaves `false` in
//! the same sideband slot.

use crate::access::project;
use crate::condition::Probe;
use crate::descriptor::{Binding, FieldDescriptor, TypeDescriptor};
use crate::error::CoreResult;
use crate::record::FlatRecord;
use crate::schema::Mapped;
use entimap_codec::Value;
use std::any::Any;
use tracing::trace;

/// Where the fields being flattened sit.
#[derive(Debug, Clone, Copy)]
enum Context {
    /// Directly in the entity, or in an embedded single object.
    Single,
    /// In element `index` of an embedded collection.
    Element(usize),
}

pub(crate) fn flatten_entity<T: Mapped>(descriptor: &TypeDescriptor, entity: &T) -> CoreResult<FlatRecord> {
    let obj: &dyn Any = entity;
    let mut record = FlatRecord::new(descriptor.kind());

    let id = &descriptor.id;
    record.set_id(id.access.read(project(&id.lenses, obj)?)?);
    if let Some(parent) = &descriptor.parent {
        record.set_parent(parent.access.read(project(&parent.lenses, obj)?)?);
    }

    flatten_fields(descriptor.fields(), obj, &mut record, Context::Single)?;
    Ok(record)
}

fn flatten_fields(
    fields: &[FieldDescriptor],
    obj: &dyn Any,
    record: &mut FlatRecord,
    context: Context,
) -> CoreResult<()> {
    for field in fields {
        let target = project(&field.lenses, obj)?;
        match &field.binding {
            Binding::Value { access, encoding } => {
                let value = access.read(target)?;
                if field.skips(&Probe::Value(&value)) {
                    trace!(path = field.path(), "unsaved field skipped");
                    continue;
                }
                let value = encoding.encode(value)?;
                match context {
                    Context::Single => record.set(field.path(), value, field.is_indexed()),
                    Context::Element(_) => record.append(field.path(), value, field.is_indexed()),
                }
            }
            Binding::Embedded { access, nested } => {
                let inner = access.read(target)?;
                if field.skips(&Probe::Object(inner.is_some())) {
                    trace!(path = field.path(), "unsaved field skipped");
                    continue;
                }
                match (inner, context) {
                    (Some(inner), Context::Single) => {
                        flatten_fields(&nested.fields, inner, record, context)?;
                        if !record.has_prefix(&format!("{}.", field.path())) {
                            record.mark_present(field.path());
                        }
                    }
                    (Some(inner), Context::Element(_)) => {
                        flatten_fields(&nested.fields, inner, record, context)?;
                    }
                    // Keeps the leaf lists of sibling elements aligned.
                    (None, Context::Element(index)) => record.push_null_index(field.path(), index),
                    (None, Context::Single) => {}
                }
            }
            Binding::EmbeddedMany { access, nested } => {
                let elements = access.read(target)?;
                if field.skips(&Probe::Elements(elements.as_ref().map(Vec::len))) {
                    trace!(path = field.path(), "unsaved field skipped");
                    continue;
                }
                let Some(elements) = elements else {
                    continue;
                };

                seed_leaves(&nested.fields, record);
                let mut nulls = Vec::new();
                for (index, element) in elements.into_iter().enumerate() {
                    match element {
                        Some(element) => {
                            flatten_fields(&nested.fields, element, record, Context::Element(index))?;
                        }
                        None => nulls.push(index),
                    }
                }
                if !nulls.is_empty() {
                    record.set_null_indexes(field.path(), &nulls);
                }
            }
        }
    }
    Ok(())
}

/// Writes every leaf of an embedded collection as an empty list, so an empty
/// collection stays distinguishable from a null one.
fn seed_leaves(fields: &[FieldDescriptor], record: &mut FlatRecord) {
    for field in fields {
        // Inside collections the only condition is `Always`.
        if !field.unsaved_conditions().is_empty() {
            continue;
        }
        match &field.binding {
            Binding::Value { .. } => {
                record.set(field.path(), Value::Array(Vec::new()), field.is_indexed());
            }
            Binding::Embedded { nested, .. } => seed_leaves(&nested.fields, record),
            Binding::EmbeddedMany { .. } => {}
        }
    }
}
