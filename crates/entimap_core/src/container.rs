//! Collection adapter.
//!
//! Collection fields are rebuilt into the container type the field declares.
//! A container the field already holds is reused in place (cleared, then
//! refilled) so caller-installed containers keep their extra state; otherwise
//! a new one is materialized, pre-sized for the number of stored elements.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};

/// The family a container type belongs to, which decides how it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape {
    /// Fixed-length array (`Box<[T]>`), built at exactly the stored length.
    Array,
    /// Array-backed list (`Vec`, `VecDeque`), pre-sized to the hint.
    List,
    /// Hash set, pre-sized with a load-factor margin over the hint.
    Set,
    /// Balanced ordered set (`BTreeSet`).
    OrderedSet,
    /// A caller-defined container built through its own constructor.
    Concrete,
}

/// A collection type that can back a collection field.
///
/// Implement this with [`ContainerShape::Concrete`] to use a custom container.
pub trait Container: Send + Sync + Sized + 'static {
    /// Element type.
    type Elem: Send + Sync + 'static;

    /// How this container is materialized.
    const SHAPE: ContainerShape;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Returns true if the container holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in iteration order.
    fn elements(&self) -> Box<dyn Iterator<Item = &Self::Elem> + '_>;

    /// Creates an empty container ready to take `size_hint` elements.
    fn with_size_hint(size_hint: usize) -> Self;

    /// Removes all elements, keeping the container itself.
    fn clear(&mut self);

    /// Appends elements in order.
    fn extend_elems(&mut self, items: Vec<Self::Elem>);
}

impl<E: Send + Sync + 'static> Container for Vec<E> {
    type Elem = E;
    const SHAPE: ContainerShape = ContainerShape::List;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }

    fn with_size_hint(size_hint: usize) -> Self {
        Vec::with_capacity(size_hint)
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn extend_elems(&mut self, items: Vec<E>) {
        self.extend(items);
    }
}

impl<E: Send + Sync + 'static> Container for VecDeque<E> {
    type Elem = E;
    const SHAPE: ContainerShape = ContainerShape::List;

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }

    fn with_size_hint(size_hint: usize) -> Self {
        VecDeque::with_capacity(size_hint)
    }

    fn clear(&mut self) {
        VecDeque::clear(self);
    }

    fn extend_elems(&mut self, items: Vec<E>) {
        self.extend(items);
    }
}

impl<E, S> Container for HashSet<E, S>
where
    E: Eq + Hash + Send + Sync + 'static,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    type Elem = E;
    const SHAPE: ContainerShape = ContainerShape::Set;

    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }

    fn with_size_hint(size_hint: usize) -> Self {
        HashSet::with_capacity_and_hasher(size_hint + size_hint / 2, S::default())
    }

    fn clear(&mut self) {
        HashSet::clear(self);
    }

    fn extend_elems(&mut self, items: Vec<E>) {
        self.extend(items);
    }
}

impl<E: Ord + Send + Sync + 'static> Container for BTreeSet<E> {
    type Elem = E;
    const SHAPE: ContainerShape = ContainerShape::OrderedSet;

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }

    fn with_size_hint(_size_hint: usize) -> Self {
        BTreeSet::new()
    }

    fn clear(&mut self) {
        BTreeSet::clear(self);
    }

    fn extend_elems(&mut self, items: Vec<E>) {
        self.extend(items);
    }
}

impl<E: Send + Sync + 'static> Container for Box<[E]> {
    type Elem = E;
    const SHAPE: ContainerShape = ContainerShape::Array;

    fn len(&self) -> usize {
        <[E]>::len(self)
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        Box::new(self.iter())
    }

    fn with_size_hint(_size_hint: usize) -> Self {
        Box::default()
    }

    fn clear(&mut self) {
        *self = Box::default();
    }

    fn extend_elems(&mut self, items: Vec<E>) {
        let mut all = std::mem::take(self).into_vec();
        all.extend(items);
        *self = all.into_boxed_slice();
    }
}

/// A field slot holding a container, either always present (`C`) or
/// nullable (`Option<C>`).
pub trait ContainerSlot: Send + Sync + 'static {
    /// The container type.
    type Target: Container;

    /// The container, or `None` when the field is null.
    fn container(&self) -> Option<&Self::Target>;

    /// Mutable access to the container, if present.
    fn container_mut(&mut self) -> Option<&mut Self::Target>;

    /// Installs a freshly materialized container.
    fn install(&mut self, container: Self::Target);

    /// Sets the field to null; non-nullable slots are emptied instead.
    fn set_null(&mut self);
}

impl<C: Container> ContainerSlot for C {
    type Target = C;

    fn container(&self) -> Option<&C> {
        Some(self)
    }

    fn container_mut(&mut self) -> Option<&mut C> {
        Some(self)
    }

    fn install(&mut self, container: C) {
        *self = container;
    }

    fn set_null(&mut self) {
        self.clear();
    }
}

impl<C: Container> ContainerSlot for Option<C> {
    type Target = C;

    fn container(&self) -> Option<&C> {
        self.as_ref()
    }

    fn container_mut(&mut self) -> Option<&mut C> {
        self.as_mut()
    }

    fn install(&mut self, container: C) {
        *self = Some(container);
    }

    fn set_null(&mut self) {
        *self = None;
    }
}

/// Materializes an empty container of type `C` for `size_hint` elements.
#[must_use]
pub fn materialize<C: Container>(size_hint: usize) -> C {
    tracing::trace!(shape = ?C::SHAPE, size_hint, "materializing container");
    C::with_size_hint(size_hint)
}

/// Stores `items` into a container slot.
///
/// `None` nulls the slot. Otherwise an existing container is cleared and
/// refilled in place, and a missing one is materialized first.
pub fn fill<S: ContainerSlot>(slot: &mut S, items: Option<Vec<<S::Target as Container>::Elem>>) {
    let Some(items) = items else {
        slot.set_null();
        return;
    };

    match slot.container_mut() {
        Some(existing) => {
            existing.clear();
            existing.extend_elems(items);
        }
        None => {
            let mut container = materialize::<S::Target>(items.len());
            container.extend_elems(items);
            slot.install(container);
        }
    }
}
