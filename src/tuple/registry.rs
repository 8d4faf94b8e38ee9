//! Type descriptors and the registry that hands them out.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::tuple::{Element, TupleValues};

type EqFn = fn(&dyn Any, &dyn Any) -> bool;
type DebugFn = fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result;

/// Runtime description of one concrete element type.
///
/// Descriptors are shared: every tuple slot of type `T` created through the
/// same [`TypeRegistry`] points at the same descriptor.
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    eq: EqFn,
    debug: DebugFn,
}

impl TypeDescriptor {
    /// Builds the descriptor for `T`.
    pub fn of<T: Element>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            eq: |a, b| match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            debug: |value, f| match value.downcast_ref::<T>() {
                Some(value) => fmt::Debug::fmt(value, f),
                None => f.write_str("<?>"),
            },
        }
    }

    /// Identity of the described type.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Compares two erased values of the described type.
    ///
    /// Returns false if either value is of another type.
    pub fn equals(&self, a: &dyn Any, b: &dyn Any) -> bool {
        (self.eq)(a, b)
    }

    /// Formats an erased value of the described type.
    pub fn fmt_value(&self, value: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.debug)(value, f)
    }

    /// Returns true if both descriptors describe the same type.
    pub fn same_type(&self, other: &TypeDescriptor) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .finish()
    }
}

/// Shared descriptor array for one native tuple type.
pub type TupleTypes = Arc<[Arc<TypeDescriptor>]>;

/// Registry of type descriptors keyed by [`TypeId`].
///
/// Descriptors are materialized on first request and then shared. The
/// registry is an explicit service: actors get it from their
/// [`ActorConfig`](crate::ActorConfig) and hand it to the tuples they build.
#[derive(Default)]
pub struct TypeRegistry {
    elements: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
    tuples: RwLock<HashMap<TypeId, TupleTypes>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared descriptor for `T`, creating it if needed.
    pub fn descriptor<T: Element>(&self) -> Arc<TypeDescriptor> {
        let key = TypeId::of::<T>();
        if let Some(found) = self.elements.read().get(&key) {
            return Arc::clone(found);
        }
        let mut elements = self.elements.write();
        Arc::clone(
            elements
                .entry(key)
                .or_insert_with(|| Arc::new(TypeDescriptor::of::<T>())),
        )
    }

    /// Looks up an already materialized descriptor.
    pub fn lookup(&self, id: TypeId) -> Option<Arc<TypeDescriptor>> {
        self.elements.read().get(&id).cloned()
    }

    /// Returns the descriptor array for the native tuple type `V`.
    pub fn tuple_types<V: TupleValues>(&self) -> TupleTypes {
        let key = TypeId::of::<V>();
        if let Some(found) = self.tuples.read().get(&key) {
            return Arc::clone(found);
        }
        // Built outside the lock: `descriptors` takes the element lock.
        let built: TupleTypes = V::descriptors(self).into();
        let mut tuples = self.tuples.write();
        Arc::clone(tuples.entry(key).or_insert(built))
    }

    /// Number of element descriptors materialized so far.
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Returns true if no descriptor has been materialized yet.
    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("elements", &self.len())
            .finish()
    }
}
