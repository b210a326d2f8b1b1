//! Flat record → entity.
//!
//! Fields are matched against their declared name first and then their
//! alternate names. The first present name wins and is claimed, so a later
//! field never loads a property an earlier one already took. Fields whose
//! names are all absent keep whatever the constructor put there.

use crate::access::{project_mut, Encoding, ObjectAccess, ValueAccess};
use crate::descriptor::{Binding, FieldDescriptor, NestedType, TypeDescriptor};
use crate::error::{CoreError, CoreResult};
use crate::introspect::HookLayout;
use crate::record::FlatRecord;
use crate::schema::Mapped;
use crate::types::{extend_path, null_index_path, NULL_INDEX_SUFFIX};
use entimap_codec::Value;
use std::any::{type_name, Any};
use std::collections::HashSet;
use tracing::{trace, Level};

pub(crate) fn rebuild_entity<T: Mapped>(descriptor: &TypeDescriptor, record: &FlatRecord) -> CoreResult<T> {
    let mut entity = descriptor.constructor.construct();
    load(descriptor, record, entity.as_mut())?;
    entity
        .downcast::<T>()
        .map(|entity| *entity)
        .map_err(|_| CoreError::WrongInstance {
            expected: type_name::<T>(),
        })
}

pub(crate) fn rebuild_into<T: Mapped>(
    descriptor: &TypeDescriptor,
    record: &FlatRecord,
    entity: &mut T,
) -> CoreResult<()> {
    load(descriptor, record, entity)
}

fn load(descriptor: &TypeDescriptor, record: &FlatRecord, obj: &mut dyn Any) -> CoreResult<()> {
    let id = record
        .id()
        .ok_or_else(|| CoreError::missing_identifier(record.kind()))?;
    if record.kind() != descriptor.kind() {
        return Err(CoreError::KindMismatch {
            expected: descriptor.kind().to_string(),
            found: record.kind().to_string(),
        });
    }

    let binding = &descriptor.id;
    binding
        .access
        .write(project_mut(&binding.lenses, obj)?, &binding.name, id.clone())?;
    if let Some(parent) = &descriptor.parent {
        parent
            .access
            .write(project_mut(&parent.lenses, obj)?, record.parent().cloned())?;
    }

    let mut loader = Loader {
        record,
        claimed: HashSet::new(),
    };
    loader.level(descriptor.fields(), &descriptor.hooks, obj, "")?;
    loader.trace_unclaimed();
    Ok(())
}

struct Loader<'r> {
    record: &'r FlatRecord,
    claimed: HashSet<String>,
}

/// A field of an embedded collection's element type, resolved once for all
/// elements.
enum Slot<'d> {
    Leaf {
        field: &'d FieldDescriptor,
        access: &'d dyn ValueAccess,
        encoding: Encoding,
        path: String,
        cursor: usize,
    },
    Nested {
        field: &'d FieldDescriptor,
        access: &'d dyn ObjectAccess,
        nested: &'d NestedType,
        path: String,
        nulls: Vec<usize>,
        slots: Vec<Slot<'d>>,
    },
    Hook {
        hook: &'d HookLayout,
        path: String,
        cursor: usize,
    },
}

impl Loader<'_> {
    /// Claims the first present, unclaimed name of a field.
    fn claim(
        &mut self,
        names: &[String],
        prefix: &str,
        present: impl Fn(&FlatRecord, &str) -> bool,
    ) -> Option<String> {
        let mut found: Option<String> = None;
        for name in names {
            let candidate = extend_path(prefix, name);
            if self.claimed.contains(&candidate) || !present(self.record, &candidate) {
                continue;
            }
            match &found {
                Some(winner) => trace!(%winner, ignored = %candidate, "ambiguous names, first match wins"),
                None => found = Some(candidate),
            }
        }
        if let Some(candidate) = &found {
            self.claimed.insert(candidate.clone());
        }
        found
    }

    fn level(
        &mut self,
        fields: &[FieldDescriptor],
        hooks: &[HookLayout],
        obj: &mut dyn Any,
        prefix: &str,
    ) -> CoreResult<()> {
        for field in fields {
            self.field(field, obj, prefix)?;
        }
        for hook in hooks {
            let Some(path) = self.claim(&hook.names, prefix, |r, c| r.contains(c)) else {
                continue;
            };
            let value = self.record.value(&path).cloned().unwrap_or(Value::Null);
            hook.access.call(project_mut(&hook.lenses, obj)?, value)?;
        }
        Ok(())
    }

    fn field(&mut self, field: &FieldDescriptor, obj: &mut dyn Any, prefix: &str) -> CoreResult<()> {
        let target = project_mut(&field.lenses, obj)?;
        match &field.binding {
            Binding::Value { access, encoding } => {
                let Some(path) = self.claim(field.names(), prefix, |r, c| r.contains(c)) else {
                    return Ok(());
                };
                let Some(value) = self.record.value(&path).cloned() else {
                    return Ok(());
                };
                access.write(target, &path, encoding.decode(value)?)
            }
            Binding::Embedded { access, nested } => {
                let Some(path) = self.claim(field.names(), prefix, embedded_present) else {
                    return Ok(());
                };
                match access.read_mut(target)? {
                    Some(existing) => self.level(&nested.fields, &nested.hooks, existing, &path),
                    None => {
                        let mut fresh = nested.constructor.construct();
                        self.level(&nested.fields, &nested.hooks, fresh.as_mut(), &path)?;
                        access.write(target, &path, Some(fresh))
                    }
                }
            }
            Binding::EmbeddedMany { access, nested } => {
                let Some(path) = self.claim(field.names(), prefix, collection_present) else {
                    return Ok(());
                };
                let elements = self.elements(nested, &path)?;
                access.write(target, &path, elements)
            }
        }
    }

    fn elements(&mut self, nested: &NestedType, path: &str) -> CoreResult<Vec<Option<Box<dyn Any>>>> {
        let nulls: HashSet<usize> = self
            .record
            .null_indexes(path)?
            .unwrap_or_default()
            .into_iter()
            .collect();
        let mut slots = self.plan(&nested.fields, &nested.hooks, path)?;
        let total = count(self.record, &slots) + nulls.len();
        trace!(path, total, nulls = nulls.len(), "loading embedded collection");

        let mut elements = Vec::with_capacity(total);
        for index in 0..total {
            if nulls.contains(&index) {
                elements.push(None);
                continue;
            }
            let mut element = nested.constructor.construct();
            fill_element(self.record, &mut slots, element.as_mut(), index)?;
            elements.push(Some(element));
        }
        Ok(elements)
    }

    fn plan<'d>(
        &mut self,
        fields: &'d [FieldDescriptor],
        hooks: &'d [HookLayout],
        prefix: &str,
    ) -> CoreResult<Vec<Slot<'d>>> {
        let mut slots = Vec::new();
        for field in fields {
            match &field.binding {
                Binding::Value { access, encoding } => {
                    if let Some(path) = self.claim(field.names(), prefix, |r, c| r.contains(c)) {
                        slots.push(Slot::Leaf {
                            field,
                            access: access.as_ref(),
                            encoding: *encoding,
                            path,
                            cursor: 0,
                        });
                    }
                }
                Binding::Embedded { access, nested } => {
                    if let Some(path) = self.claim(field.names(), prefix, collection_present) {
                        let nulls = self.record.null_indexes(&path)?.unwrap_or_default();
                        let children = self.plan(&nested.fields, &nested.hooks, &path)?;
                        slots.push(Slot::Nested {
                            field,
                            access: access.as_ref(),
                            nested,
                            path,
                            nulls,
                            slots: children,
                        });
                    }
                }
                // Registration rejects collections inside collections.
                Binding::EmbeddedMany { .. } => {}
            }
        }
        // After the fields, as on a single object.
        for hook in hooks {
            if let Some(path) = self.claim(&hook.names, prefix, |r, c| r.contains(c)) {
                slots.push(Slot::Hook { hook, path, cursor: 0 });
            }
        }
        Ok(slots)
    }

    fn trace_unclaimed(&self) {
        if !tracing::enabled!(Level::TRACE) {
            return;
        }
        for (path, _) in self.record.properties() {
            let base = path.strip_suffix(NULL_INDEX_SUFFIX).unwrap_or(path);
            let head = base.split('.').next().unwrap_or(base);
            if !self.claimed.contains(head) && !self.claimed.contains(base) {
                trace!(path, "ignoring unmapped property");
            }
        }
    }
}

fn embedded_present(record: &FlatRecord, path: &str) -> bool {
    record.has_prefix(&format!("{path}.")) || record.is_marked_present(path)
}

fn collection_present(record: &FlatRecord, path: &str) -> bool {
    embedded_present(record, path) || record.contains(&null_index_path(path))
}

/// Number of elements the stored leaves account for.
fn count(record: &FlatRecord, slots: &[Slot<'_>]) -> usize {
    slots
        .iter()
        .map(|slot| match slot {
            Slot::Leaf { path, .. } | Slot::Hook { path, .. } => match record.value(path) {
                Some(Value::Array(items)) => items.len(),
                Some(_) => 1,
                None => 0,
            },
            Slot::Nested { nulls, slots, .. } => count(record, slots) + nulls.len(),
        })
        .max()
        .unwrap_or(0)
}

fn element_at(value: Option<&Value>, position: usize) -> Option<Value> {
    match value? {
        Value::Array(items) => items.get(position).cloned(),
        single if position == 0 => Some(single.clone()),
        _ => None,
    }
}

fn fill_element(
    record: &FlatRecord,
    slots: &mut [Slot<'_>],
    obj: &mut dyn Any,
    index: usize,
) -> CoreResult<()> {
    for slot in slots.iter_mut() {
        match slot {
            Slot::Leaf {
                field,
                access,
                encoding,
                path,
                cursor,
            } => {
                let value = element_at(record.value(path), *cursor);
                *cursor += 1;
                if let Some(value) = value {
                    let target = project_mut(&field.lenses, obj)?;
                    access.write(target, path, encoding.decode(value)?)?;
                }
            }
            Slot::Nested {
                field,
                access,
                nested,
                path,
                nulls,
                slots: children,
            } => {
                let target = project_mut(&field.lenses, obj)?;
                if nulls.contains(&index) {
                    access.write(target, path, None)?;
                    continue;
                }
                match access.read_mut(target)? {
                    Some(existing) => fill_element(record, children, existing, index)?,
                    None => {
                        let mut fresh = nested.constructor.construct();
                        fill_element(record, children, fresh.as_mut(), index)?;
                        access.write(target, path, Some(fresh))?;
                    }
                }
            }
            Slot::Hook { hook, path, cursor } => {
                let value = element_at(record.value(path), *cursor);
                *cursor += 1;
                if let Some(value) = value {
                    hook.access.call(project_mut(&hook.lenses, obj)?, value)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::CoreError;
    use crate::record::FlatRecord;
    use crate::registry::Registry;
    use crate::schema::{Mapped, Schema};
    use entimap_codec::{KeyId, Value};

    #[derive(Debug, Default, PartialEq)]
    struct Note {
        id: i64,
        body: String,
        stars: u8,
    }

    impl Mapped for Note {
        fn schema(schema: &mut Schema<Self>) {
            schema.default_constructor().id("id", |n| &n.id, |n| &mut n.id);
            schema
                .field("body", |n| &n.body, |n| &mut n.body)
                .old_name("text");
            schema.field("stars", |n| &n.stars, |n| &mut n.stars);
        }
    }

    fn note_record() -> FlatRecord {
        let mut record = FlatRecord::new("Note");
        record.set_id(Some(KeyId::Id(3)));
        record
    }

    #[test]
    fn missing_identifier_is_fatal() {
        let registry = Registry::new(Config::default());
        let err = registry.rebuild::<Note>(&FlatRecord::new("Note")).unwrap_err();
        assert!(matches!(err, CoreError::MissingIdentifier { .. }));
    }

    #[test]
    fn other_kinds_are_rejected() {
        let registry = Registry::new(Config::default());
        let mut record = FlatRecord::new("Memo");
        record.set_id(Some(KeyId::Id(1)));
        let err = registry.rebuild::<Note>(&record).unwrap_err();
        assert!(matches!(err, CoreError::KindMismatch { .. }));
    }

    #[test]
    fn alternate_name_loads_and_unknown_paths_are_ignored() {
        let registry = Registry::new(Config::default());
        let mut record = note_record();
        record.set("text", Value::Text("hello".into()), true);
        record.set("unknown.path", Value::Integer(1), true);
        let note = registry.rebuild::<Note>(&record).unwrap();
        assert_eq!(
            note,
            Note {
                id: 3,
                body: "hello".into(),
                stars: 0
            }
        );
    }

    #[test]
    fn out_of_range_integer_is_a_mapping_error() {
        let registry = Registry::new(Config::default());
        let mut record = note_record();
        record.set("stars", Value::Integer(256), true);
        let err = registry.rebuild::<Note>(&record).unwrap_err();
        assert!(matches!(err, CoreError::ValueOutOfRange { ref path, .. } if path == "stars"));
    }

    #[test]
    fn rebuild_into_keeps_unlisted_fields() {
        let registry = Registry::new(Config::default());
        let mut record = note_record();
        record.set("stars", Value::Integer(5), true);
        let mut note = Note {
            id: 0,
            body: "kept".into(),
            stars: 1,
        };
        registry.rebuild_into(&record, &mut note).unwrap();
        assert_eq!(note.id, 3);
        assert_eq!(note.body, "kept");
        assert_eq!(note.stars, 5);
    }
}
