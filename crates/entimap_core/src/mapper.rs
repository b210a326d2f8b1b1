//! Typed facade over a registry and a record store.

use crate::access::project_mut;
use crate::config::Config;
use crate::descriptor::TypeDescriptor;
use crate::error::CoreResult;
use crate::record::FlatRecord;
use crate::registry::Registry;
use crate::schema::Mapped;
use crate::store::RecordStore;
use entimap_codec::{KeyId, RecordKey};
use std::sync::Arc;

/// Stores and loads entities through a [`RecordStore`].
///
/// # Example
///
/// ```rust
/// use entimap_core::{Mapped, Mapper, MemoryStore, Schema};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Note {
///     id: Option<i64>,
///     title: String,
/// }
///
/// impl Mapped for Note {
///     fn schema(schema: &mut Schema<Self>) {
///         schema.default_constructor().id("id", |n| &n.id, |n| &mut n.id);
///         schema.field("title", |n| &n.title, |n| &mut n.title);
///     }
/// }
///
/// let mapper = Mapper::new(MemoryStore::new());
/// let mut note = Note { id: None, title: "hello".into() };
/// let key = mapper.put(&mut note).unwrap();
/// assert_eq!(note.id, Some(1));
///
/// let loaded: Note = mapper.get(&key).unwrap().unwrap();
/// assert_eq!(loaded, note);
/// ```
pub struct Mapper<S> {
    registry: Arc<Registry>,
    store: S,
}

impl<S: RecordStore> Mapper<S> {
    /// Creates a mapper with its own registry and the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, Config::default())
    }

    /// Creates a mapper with its own registry.
    pub fn with_config(store: S, config: Config) -> Self {
        Self::with_registry(store, Arc::new(Registry::new(config)))
    }

    /// Creates a mapper sharing an existing registry.
    pub fn with_registry(store: S, registry: Arc<Registry>) -> Self {
        Self { registry, store }
    }

    /// The registry describing entity types.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the descriptor of `T`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `T` cannot be described.
    pub fn describe<T: Mapped>(&self) -> CoreResult<Arc<TypeDescriptor>> {
        self.registry.describe::<T>()
    }

    /// Flattens an entity without storing it.
    ///
    /// # Errors
    ///
    /// See [`Registry::flatten`].
    pub fn flatten<T: Mapped>(&self, entity: &T) -> CoreResult<FlatRecord> {
        self.registry.flatten(entity)
    }

    /// Rebuilds an entity from a record without touching the store.
    ///
    /// # Errors
    ///
    /// See [`Registry::rebuild`].
    pub fn rebuild<T: Mapped>(&self, record: &FlatRecord) -> CoreResult<T> {
        self.registry.rebuild(record)
    }

    /// Stores an entity and writes the identifier it was stored under back
    /// into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be flattened, the store rejects
    /// it, or the allocated identifier does not fit the identifier field.
    pub fn put<T: Mapped>(&self, entity: &mut T) -> CoreResult<RecordKey> {
        let descriptor = self.registry.describe::<T>()?;
        let record = self.registry.flatten(entity)?;
        let allocated = record.id().is_none();
        let key = self.store.put(record)?;

        if allocated {
            let id = &descriptor.id;
            id.access
                .write(project_mut(&id.lenses, entity)?, &id.name, key.id().clone())?;
        }
        Ok(key)
    }

    /// Loads an entity by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the record cannot be rebuilt.
    pub fn get<T: Mapped>(&self, key: &RecordKey) -> CoreResult<Option<T>> {
        self.store
            .get(key)?
            .map(|record| self.registry.rebuild(&record))
            .transpose()
    }

    /// Loads a root entity of `T`'s kind by identifier.
    ///
    /// # Errors
    ///
    /// Same as [`Mapper::get`].
    pub fn get_by_id<T: Mapped>(&self, id: impl Into<KeyId>) -> CoreResult<Option<T>> {
        let descriptor = self.registry.describe::<T>()?;
        self.get(&RecordKey::new(descriptor.kind(), id))
    }

    /// Deletes the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn delete(&self, key: &RecordKey) -> CoreResult<()> {
        self.store.delete(key)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Mapper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("registry", &self.registry)
            .field("store", &self.store)
            .finish()
    }
}
