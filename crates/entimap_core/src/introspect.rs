//! Type introspection.
//!
//! Turns a type's [`Schema`](crate::Schema) declaration, and those of the
//! bases it extends, into a [`ClassLayout`]: the persistent fields of every
//! level of the hierarchy, root first, with their names and tags validated.
//! Layouts do not depend on where a type is embedded and are cached per type
//! by the [`Registry`](crate::Registry).

use crate::access::{
    project, Construct, ElementsAccess, Encoding, HookAccess, IdAccess, Lens, ObjectAccess,
    ParentAccess, ValueAccess,
};
use crate::condition::{ConditionContext, ResolvedCondition};
use crate::config::Config;
use crate::container::ContainerShape;
use crate::error::{CoreError, CoreResult};
use crate::schema::{declare, DeclShape, IndexTag, KeyDecl, Mapped, SchemaDecl, TargetRef};
use crate::types::ValueKind;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// The identifier or parent binding of a type.
pub(crate) struct KeyBinding<A: ?Sized> {
    pub(crate) name: String,
    pub(crate) lenses: Vec<Arc<dyn Lens>>,
    pub(crate) access: Arc<A>,
}

impl<A: ?Sized> Clone for KeyBinding<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            lenses: self.lenses.clone(),
            access: Arc::clone(&self.access),
        }
    }
}

impl<A: ?Sized> KeyBinding<A> {
    fn from_decl(decl: &KeyDecl<A>, lenses: &[Arc<dyn Lens>]) -> Self {
        Self {
            name: decl.name.clone(),
            lenses: lenses.to_vec(),
            access: Arc::clone(&decl.access),
        }
    }
}

pub(crate) enum FieldShape {
    Value {
        access: Arc<dyn ValueAccess>,
        encoding: Encoding,
    },
    List {
        access: Arc<dyn ValueAccess>,
        encoding: Encoding,
        element_type: &'static str,
        shape: ContainerShape,
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

impl FieldShape {
    fn value_access(&self) -> Option<&Arc<dyn ValueAccess>> {
        match self {
            FieldShape::Value { access, .. } | FieldShape::List { access, .. } => Some(access),
            FieldShape::Embed { .. } | FieldShape::EmbedMany { .. } => None,
        }
    }
}

/// One persistent field as declared, before indexing policy is applied.
pub struct FieldLayout {
    name: String,
    names: Vec<String>,
    index_tag: Option<bool>,
    serialized: bool,
    kind: ValueKind,
    pub(crate) declared_by: &'static str,
    pub(crate) conditions: Vec<ResolvedCondition>,
    pub(crate) lenses: Vec<Arc<dyn Lens>>,
    pub(crate) shape: FieldShape,
}

impl FieldLayout {
    /// Declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared name followed by the alternate names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Explicit `indexed`/`unindexed` tag, if any.
    #[must_use]
    pub fn index_tag(&self) -> Option<bool> {
        self.index_tag
    }

    /// Whether the field is stored as an opaque blob.
    #[must_use]
    pub fn is_serialized(&self) -> bool {
        self.serialized
    }

    /// Whether the field is an embedded object or collection.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(self.shape, FieldShape::Embed { .. } | FieldShape::EmbedMany { .. })
    }

    /// Kind of the field's value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

#[derive(Clone)]
pub(crate) struct HookLayout {
    pub(crate) names: Vec<String>,
    pub(crate) lenses: Vec<Arc<dyn Lens>>,
    pub(crate) access: Arc<dyn HookAccess>,
}

/// The fields one level of a hierarchy declares.
pub struct LevelLayout {
    type_name: &'static str,
    class_indexed: Option<bool>,
    fields: Vec<FieldLayout>,
    pub(crate) hooks: Vec<HookLayout>,
}

impl LevelLayout {
    /// Rust type declaring this level.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Class-level indexing tag, if declared.
    #[must_use]
    pub fn class_indexed(&self) -> Option<bool> {
        self.class_indexed
    }

    /// Fields declared at this level, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }
}

/// The persistent layout of a type and the bases it extends.
pub struct ClassLayout {
    type_id: TypeId,
    type_name: &'static str,
    kind: String,
    levels: Vec<LevelLayout>,
    pub(crate) id: Option<KeyBinding<dyn IdAccess>>,
    pub(crate) parent: Option<KeyBinding<dyn ParentAccess>>,
    pub(crate) constructor: Option<Arc<dyn Construct>>,
}

impl std::fmt::Debug for ClassLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassLayout")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ClassLayout {
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

    /// Store kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Hierarchy levels, root first.
    #[must_use]
    pub fn levels(&self) -> &[LevelLayout] {
        &self.levels
    }

    /// All fields, root level first, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldLayout> {
        self.levels.iter().flat_map(|level| level.fields.iter())
    }

    /// Name of the identifier field, if declared.
    #[must_use]
    pub fn id_name(&self) -> Option<&str> {
        self.id.as_ref().map(|id| id.name.as_str())
    }

    /// Name of the parent field, if declared.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_ref().map(|parent| parent.name.as_str())
    }

    /// Whether the type can be constructed for rebuilding.
    #[must_use]
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }
}

fn class_tag(tag: IndexTag, target: &str) -> CoreResult<Option<bool>> {
    if tag.conflicting {
        return Err(CoreError::ConflictingIndexTags {
            target: target.to_string(),
        });
    }
    Ok(tag.value)
}

/// Declared name first, then every distinct alternate.
fn load_names(name: &str, alternates: &[String], owner: &str) -> CoreResult<Vec<String>> {
    let mut names = vec![name.to_string()];
    for alternate in alternates {
        if alternate.trim().is_empty() {
            return Err(CoreError::invalid_alternate_name(owner, alternate.as_str()));
        }
        if !names.contains(alternate) {
            names.push(alternate.clone());
        }
    }
    Ok(names)
}

/// Walks `T` and the bases it extends, returning levels root first.
fn collect_chain<T: Mapped>() -> CoreResult<Vec<(SchemaDecl, Vec<Arc<dyn Lens>>)>> {
    let mut chain = Vec::new();
    let mut next = Some((declare::<T>(), Vec::new()));
    let mut seen = vec![TypeId::of::<T>()];

    while let Some((decl, lenses)) = next.take() {
        if let Some(base) = &decl.base {
            if seen.contains(&base.type_id) {
                return Err(CoreError::RecursiveEmbedding {
                    type_name: base.type_name.to_string(),
                    field: "extends".to_string(),
                });
            }
            seen.push(base.type_id);
            let mut base_lenses: Vec<Arc<dyn Lens>> = lenses.clone();
            base_lenses.push(Arc::clone(&base.lens));
            next = Some(((base.declare)(), base_lenses));
        }
        chain.push((decl, lenses));
    }

    chain.reverse();
    Ok(chain)
}

/// Builds the layout of `T`.
pub(crate) fn build_layout<T: Mapped>(config: &Config) -> CoreResult<ClassLayout> {
    let chain = collect_chain::<T>()?;
    let type_id = TypeId::of::<T>();
    let type_name = std::any::type_name::<T>();
    let own = chain.last().map(|(decl, _)| decl);
    let kind = own
        .and_then(|decl| decl.kind.clone())
        .unwrap_or_else(|| config.kind_naming.kind_for(type_name));
    let constructor = own.and_then(|decl| decl.constructor.clone());

    let mut id: Option<KeyBinding<dyn IdAccess>> = None;
    let mut parent: Option<KeyBinding<dyn ParentAccess>> = None;
    for (decl, lenses) in &chain {
        if let Some(decl_id) = &decl.id {
            if id.is_some() {
                return Err(CoreError::DuplicatePath {
                    type_name: type_name.to_string(),
                    path: decl_id.name.clone(),
                });
            }
            id = Some(KeyBinding::from_decl(decl_id, lenses));
        }
        if let Some(decl_parent) = &decl.parent {
            if parent.is_some() {
                return Err(CoreError::DuplicatePath {
                    type_name: type_name.to_string(),
                    path: decl_parent.name.clone(),
                });
            }
            parent = Some(KeyBinding::from_decl(decl_parent, lenses));
        }
    }

    // A fresh instance supplies the defaults contextual conditions compare to.
    let needs_sample = chain
        .iter()
        .any(|(decl, _)| decl.fields.iter().any(|f| !f.tags.unsaved.is_empty()));
    let sample: Option<Box<dyn Any>> = if needs_sample {
        constructor.as_ref().map(|c| c.construct())
    } else {
        None
    };

    let reserved: Vec<String> = id
        .iter()
        .map(|k| k.name.clone())
        .chain(parent.iter().map(|k| k.name.clone()))
        .collect();

    let mut levels = Vec::with_capacity(chain.len());
    for (decl, lenses) in chain {
        let class_indexed = class_tag(decl.index, decl.type_name)?;
        let mut fields = Vec::with_capacity(decl.fields.len());

        for field in decl.fields {
            if field.tags.transient {
                tracing::trace!(type_name = decl.type_name, field = %field.name, "skipping transient field");
                continue;
            }
            if reserved.contains(&field.name) {
                tracing::trace!(type_name = decl.type_name, field = %field.name, "field shadowed by key binding");
                continue;
            }

            let owner = format!("{}.{}", decl.type_name, field.name);
            let index_tag = class_tag(field.tags.index, &owner)?;
            let names = load_names(&field.name, &field.tags.alternates, &owner)?;
            let encoding = if field.tags.serialized {
                Encoding::Cbor
            } else {
                Encoding::Native
            };

            let (shape, kind) = match field.shape {
                DeclShape::Value { access, kind } => (FieldShape::Value { access, encoding }, kind),
                DeclShape::Opaque { access } => (
                    FieldShape::Value {
                        access,
                        encoding: Encoding::Native,
                    },
                    ValueKind::Opaque,
                ),
                DeclShape::List {
                    access,
                    element_type,
                    shape,
                } => (
                    FieldShape::List {
                        access,
                        encoding,
                        element_type,
                        shape,
                    },
                    ValueKind::List,
                ),
                DeclShape::Embed { .. } | DeclShape::EmbedMany { .. } if field.tags.serialized => {
                    return Err(CoreError::EmbeddedAndSerialized { field: owner });
                }
                DeclShape::Embed { access, target } => (FieldShape::Embed { access, target }, ValueKind::Object),
                DeclShape::EmbedMany {
                    access,
                    target,
                    shape,
                } => (FieldShape::EmbedMany { access, target, shape }, ValueKind::List),
            };

            let mut conditions = Vec::with_capacity(field.tags.unsaved.len());
            if !field.tags.unsaved.is_empty() {
                let default = match (shape.value_access(), sample.as_deref()) {
                    (Some(access), Some(sample)) => project(&lenses, sample)
                        .and_then(|level| access.read(level))
                        .ok(),
                    _ => None,
                };
                let context = ConditionContext {
                    type_name: decl.type_name,
                    field: field.name.clone(),
                    kind,
                    default,
                };
                for spec in &field.tags.unsaved {
                    conditions.push(spec.resolve(&context)?);
                }
            }

            fields.push(FieldLayout {
                name: field.name,
                names,
                index_tag,
                serialized: field.tags.serialized,
                kind,
                declared_by: decl.type_name,
                conditions,
                lenses: lenses.clone(),
                shape,
            });
        }

        let mut hooks = Vec::with_capacity(decl.hooks.len());
        for hook in decl.hooks {
            let owner = format!("{}.<load hook>", decl.type_name);
            for name in &hook.names {
                if name.trim().is_empty() {
                    return Err(CoreError::invalid_alternate_name(owner, name.as_str()));
                }
            }
            hooks.push(HookLayout {
                names: hook.names,
                lenses: lenses.clone(),
                access: hook.access,
            });
        }

        levels.push(LevelLayout {
            type_name: decl.type_name,
            class_indexed,
            fields,
            hooks,
        });
    }

    tracing::debug!(type_name, kind = %kind, levels = levels.len(), "built class layout");

    Ok(ClassLayout {
        type_id,
        type_name,
        kind,
        levels,
        id,
        parent,
        constructor,
    })
}
