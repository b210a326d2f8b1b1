//! Process-wide descriptor cache.

use crate::config::Config;
use crate::descriptor::{build_descriptor, TypeDescriptor};
use crate::error::CoreResult;
use crate::flatten::flatten_entity;
use crate::introspect::{build_layout, ClassLayout};
use crate::rebuild::{rebuild_entity, rebuild_into};
use crate::record::FlatRecord;
use crate::schema::Mapped;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Caches the layout and descriptor of every type it has seen.
///
/// Descriptors are built on first use, outside the lock, and the first one
/// inserted for a type wins. Failed builds are not cached, so a type with a
/// configuration error fails on every use.
pub struct Registry {
    config: Config,
    layouts: RwLock<HashMap<TypeId, Arc<ClassLayout>>>,
    descriptors: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            layouts: RwLock::new(HashMap::new()),
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// The shared registry with the default configuration.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| Registry::new(Config::default()))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the layout of `T`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `T`'s schema is invalid.
    pub fn layout<T: Mapped>(&self) -> CoreResult<Arc<ClassLayout>> {
        let type_id = TypeId::of::<T>();
        if let Some(layout) = self.layouts.read().get(&type_id) {
            return Ok(Arc::clone(layout));
        }

        let built = Arc::new(build_layout::<T>(&self.config)?);
        let mut layouts = self.layouts.write();
        Ok(Arc::clone(layouts.entry(type_id).or_insert(built)))
    }

    /// Returns the descriptor of entity type `T`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `T` or a type it embeds is invalid.
    pub fn describe<T: Mapped>(&self) -> CoreResult<Arc<TypeDescriptor>> {
        let type_id = TypeId::of::<T>();
        if let Some(descriptor) = self.descriptors.read().get(&type_id) {
            return Ok(Arc::clone(descriptor));
        }

        let layout = self.layout::<T>()?;
        let built = Arc::new(build_descriptor(self, &layout)?);
        tracing::debug!(
            type_name = built.type_name(),
            kind = built.kind(),
            fields = built.fields().len(),
            "built type descriptor"
        );

        let mut descriptors = self.descriptors.write();
        Ok(Arc::clone(descriptors.entry(type_id).or_insert(built)))
    }

    /// Number of described types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    /// Returns true if no type has been described yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }

    /// Flattens an entity into a record.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` cannot be described or a serialized field
    /// fails to encode.
    pub fn flatten<T: Mapped>(&self, entity: &T) -> CoreResult<FlatRecord> {
        let descriptor = self.describe::<T>()?;
        flatten_entity(&descriptor, entity)
    }

    /// Rebuilds an entity from a record.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` cannot be described, the record has no
    /// identifier or belongs to another kind, or a stored value does not fit
    /// its field.
    pub fn rebuild<T: Mapped>(&self, record: &FlatRecord) -> CoreResult<T> {
        let descriptor = self.describe::<T>()?;
        rebuild_entity(&descriptor, record)
    }

    /// Loads a record into an existing entity, reusing the objects and
    /// containers it already holds.
    ///
    /// # Errors
    ///
    /// Same as [`Registry::rebuild`].
    pub fn rebuild_into<T: Mapped>(&self, record: &FlatRecord, entity: &mut T) -> CoreResult<()> {
        let descriptor = self.describe::<T>()?;
        rebuild_into(&descriptor, record, entity)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("descriptors", &self.len())
            .finish()
    }
}
