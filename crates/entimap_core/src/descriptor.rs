//! Resolved type and field descriptors.
//!
//! A [`TypeDescriptor`] is the layout of an entity type with every policy
//! applied: each field knows its property path, whether it is indexed and
//! which conditions leave it unsaved. Embedded fields carry the resolved
//! fields of their embedded type, since the same type can resolve differently
//! depending on the field that embeds it.

use crate::access::{Construct, ElementsAccess, Encoding, IdAccess, Lens, ObjectAccess, ParentAccess, ValueAccess};
use crate::condition::ResolvedCondition;
use crate::container::ContainerShape;
use crate::error::{CoreError, CoreResult};
use crate::introspect::{ClassLayout, FieldLayout, FieldShape, HookLayout, KeyBinding};
use crate::policy::{self, IndexPolicy};
use crate::registry::Registry;
use crate::schema::TargetRef;
use crate::types::{extend_path, ValueKind};
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub(crate) enum Binding {
    Value {
        access: Arc<dyn ValueAccess>,
        encoding: Encoding,
    },
    Embedded {
        access: Arc<dyn ObjectAccess>,
        nested: NestedType,
    },
    EmbeddedMany {
        access: Arc<dyn ElementsAccess>,
        nested: NestedType,
    },
}

/// The resolved fields of a type embedded in another.
pub struct NestedType {
    type_name: &'static str,
    pub(crate) constructor: Arc<dyn Construct>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) hooks: Vec<HookLayout>,
}

impl NestedType {
    /// Rust name of the embedded type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolved fields of the embedded type.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

impl fmt::Debug for NestedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedType")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// One persistent field with its policy resolved.
pub struct FieldDescriptor {
    name: String,
    names: Vec<String>,
    path: String,
    indexed: bool,
    forced_index_policy: bool,
    unsaved_conditions: Vec<ResolvedCondition>,
    serialized: bool,
    kind: ValueKind,
    element_type: Option<&'static str>,
    container: Option<ContainerShape>,
    declared_by: &'static str,
    pub(crate) lenses: Vec<Arc<dyn Lens>>,
    pub(crate) binding: Binding,
}

impl FieldDescriptor {
    /// Declared name; the only name used when flattening.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every name accepted when rebuilding, declared name first.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Dotted property path, prefixed by the embedding chain.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the field's properties are indexed.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Whether the indexing came from an explicit field tag.
    #[must_use]
    pub fn forced_index_policy(&self) -> bool {
        self.forced_index_policy
    }

    /// Conditions under which the field is left unsaved.
    #[must_use]
    pub fn unsaved_conditions(&self) -> &[ResolvedCondition] {
        &self.unsaved_conditions
    }

    /// Whether the field is stored as an opaque blob.
    #[must_use]
    pub fn is_serialized(&self) -> bool {
        self.serialized
    }

    /// Whether the field is mapped recursively.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        !matches!(self.binding, Binding::Value { .. })
    }

    /// Whether the field holds a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.container.is_some()
    }

    /// Container family of a collection field.
    #[must_use]
    pub fn container_shape(&self) -> Option<ContainerShape> {
        self.container
    }

    /// Kind of the field's value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Declared element type of a collection field.
    #[must_use]
    pub fn element_type(&self) -> Option<&'static str> {
        self.element_type
    }

    /// Rust type of the hierarchy level declaring the field.
    #[must_use]
    pub fn declared_by(&self) -> &'static str {
        self.declared_by
    }

    /// The embedded type, for embedded fields.
    #[must_use]
    pub fn nested(&self) -> Option<&NestedType> {
        match &self.binding {
            Binding::Value { .. } => None,
            Binding::Embedded { nested, .. } | Binding::EmbeddedMany { nested, .. } => Some(nested),
        }
    }

    pub(crate) fn skips(&self, probe: &crate::condition::Probe<'_>) -> bool {
        self.unsaved_conditions.iter().any(|c| c.matches(probe))
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("path", &self.path)
            .field("names", &self.names)
            .field("indexed", &self.indexed)
            .field("forced_index_policy", &self.forced_index_policy)
            .field("unsaved_conditions", &self.unsaved_conditions)
            .field("serialized", &self.serialized)
            .field("kind", &self.kind)
            .field("nested", &self.nested())
            .finish_non_exhaustive()
    }
}

/// The resolved, immutable description of an entity type.
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    kind: String,
    default_indexed: bool,
    fields: Vec<FieldDescriptor>,
    pub(crate) id: KeyBinding<dyn IdAccess>,
    pub(crate) parent: Option<KeyBinding<dyn ParentAccess>>,
    pub(crate) constructor: Arc<dyn Construct>,
    pub(crate) hooks: Vec<HookLayout>,
}

impl TypeDescriptor {
    /// The described type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust name of the described type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Store kind of records of this type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Effective class-level default of the most derived level.
    #[must_use]
    pub fn default_indexed(&self) -> bool {
        self.default_indexed
    }

    /// Name of the identifier field.
    #[must_use]
    pub fn id_name(&self) -> &str {
        &self.id.name
    }

    /// Name of the parent field, if declared.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.name.as_str())
    }

    /// Top-level fields, base fields first, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Finds a field, at any depth, by its property path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&FieldDescriptor> {
        fn search<'a>(fields: &'a [FieldDescriptor], path: &str) -> Option<&'a FieldDescriptor> {
            fields.iter().find_map(|field| {
                if field.path == path {
                    Some(field)
                } else {
                    field
                        .nested()
                        .and_then(|nested| search(&nested.fields, path))
                }
            })
        }
        search(&self.fields, path)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("default_indexed", &self.default_indexed)
            .field("id", &self.id.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

struct Builder<'r> {
    registry: &'r Registry,
    root: &'static str,
    stack: Vec<TypeId>,
    paths: HashSet<String>,
}

impl Builder<'_> {
    fn fields(
        &mut self,
        layout: &ClassLayout,
        seed: bool,
        forced: bool,
        prefix: &str,
        in_collection: bool,
    ) -> CoreResult<(Vec<FieldDescriptor>, Vec<HookLayout>)> {
        // A forced embedding field overrides the embedded type's class tags.
        let tags: Vec<Option<bool>> = layout
            .levels()
            .iter()
            .map(|level| if forced { None } else { level.class_indexed() })
            .collect();
        let defaults = policy::class_defaults(&tags, seed);

        let mut fields = Vec::new();
        let mut hooks = Vec::new();
        for (level, class_default) in layout.levels().iter().zip(defaults) {
            for field in level.fields() {
                fields.push(self.field(field, class_default, prefix, in_collection)?);
            }
            hooks.extend(level.hooks.iter().cloned());
        }
        Ok((fields, hooks))
    }

    fn field(
        &mut self,
        field: &FieldLayout,
        class_default: bool,
        prefix: &str,
        in_collection: bool,
    ) -> CoreResult<FieldDescriptor> {
        let path = extend_path(prefix, field.name());
        if !self.paths.insert(path.clone()) {
            return Err(CoreError::DuplicatePath {
                type_name: self.root.to_string(),
                path,
            });
        }

        let policy = policy::resolve(field.index_tag(), class_default, field.is_serialized());

        if in_collection {
            if let Some(condition) = field.conditions.iter().find(|c| !c.is_always()) {
                return Err(CoreError::ConditionInCollection {
                    condition: condition.name,
                    field: path,
                });
            }
        }

        let (binding, element_type, container) = match &field.shape {
            FieldShape::Value { access, encoding } => (
                Binding::Value {
                    access: Arc::clone(access),
                    encoding: *encoding,
                },
                None,
                None,
            ),
            FieldShape::List { .. } | FieldShape::EmbedMany { .. } if in_collection => {
                return Err(CoreError::NestedCollection { field: path });
            }
            FieldShape::List {
                access,
                encoding,
                element_type,
                shape,
            } => (
                Binding::Value {
                    access: Arc::clone(access),
                    encoding: *encoding,
                },
                Some(*element_type),
                Some(*shape),
            ),
            FieldShape::Embed { access, target } => (
                Binding::Embedded {
                    access: Arc::clone(access),
                    nested: self.nested(target, policy, &path, in_collection)?,
                },
                None,
                None,
            ),
            FieldShape::EmbedMany {
                access,
                target,
                shape,
            } => (
                Binding::EmbeddedMany {
                    access: Arc::clone(access),
                    nested: self.nested(target, policy, &path, true)?,
                },
                Some(target.type_name),
                Some(*shape),
            ),
        };

        Ok(FieldDescriptor {
            name: field.name().to_string(),
            names: field.names().to_vec(),
            path,
            indexed: policy.indexed,
            forced_index_policy: policy.forced,
            unsaved_conditions: field.conditions.clone(),
            serialized: field.is_serialized(),
            kind: field.kind(),
            element_type,
            container,
            declared_by: field.declared_by,
            lenses: field.lenses.clone(),
            binding,
        })
    }

    fn nested(
        &mut self,
        target: &TargetRef,
        policy: IndexPolicy,
        path: &str,
        in_collection: bool,
    ) -> CoreResult<NestedType> {
        if self.stack.contains(&target.type_id) {
            return Err(CoreError::RecursiveEmbedding {
                type_name: target.type_name.to_string(),
                field: path.to_string(),
            });
        }

        let layout = (target.layout)(self.registry)?;
        for key in layout.id_name().into_iter().chain(layout.parent_name()) {
            tracing::debug!(
                type_name = target.type_name,
                field = key,
                path,
                "key binding of embedded type not mapped"
            );
        }
        let constructor = layout
            .constructor
            .clone()
            .ok_or_else(|| CoreError::MissingConstructor {
                type_name: target.type_name.to_string(),
            })?;

        self.stack.push(target.type_id);
        let built = self.fields(&layout, policy.indexed, policy.forced, path, in_collection);
        self.stack.pop();
        let (fields, hooks) = built?;

        Ok(NestedType {
            type_name: target.type_name,
            constructor,
            fields,
            hooks,
        })
    }
}

/// Resolves a layout into the descriptor of an entity type.
pub(crate) fn build_descriptor(registry: &Registry, layout: &ClassLayout) -> CoreResult<TypeDescriptor> {
    let type_name = layout.type_name();
    let constructor = layout
        .constructor
        .clone()
        .ok_or_else(|| CoreError::MissingConstructor {
            type_name: type_name.to_string(),
        })?;
    let id = layout.id.clone().ok_or_else(|| CoreError::MissingIdField {
        type_name: type_name.to_string(),
    })?;

    let seed = registry.config().default_indexed;
    let mut builder = Builder {
        registry,
        root: type_name,
        stack: vec![layout.type_id()],
        paths: HashSet::new(),
    };
    let (fields, hooks) = builder.fields(layout, seed, false, "", false)?;

    let tags: Vec<Option<bool>> = layout.levels().iter().map(|l| l.class_indexed()).collect();
    let default_indexed = policy::class_defaults(&tags, seed)
        .last()
        .copied()
        .unwrap_or(seed);

    Ok(TypeDescriptor {
        type_id: layout.type_id(),
        type_name,
        kind: layout.kind().to_string(),
        default_indexed,
        fields,
        id,
        parent: layout.parent.clone(),
        constructor,
        hooks,
    })
}
