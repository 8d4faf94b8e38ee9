use std::any::{Any, TypeId};
use std::fmt;

use crate::tuple::{slot_wise_equals, ErasedTuple, TupleTypes, TupleValues, TypeDescriptor, TypeRegistry};

/// Tuple whose values live inline in a native Rust tuple.
///
/// The arity is fixed by `V`. Slot access is a compile-time generated
/// projection from `&self`, so views always point into this instance and
/// are recomputed after a move or a copy. The descriptor array is shared by
/// every tuple of type `V` built from the same registry.
pub struct FixedArityTuple<V: TupleValues> {
    data: V,
    types: TupleTypes,
}

impl<V: TupleValues> FixedArityTuple<V> {
    /// Wraps `data`, resolving slot descriptors through `registry`.
    pub fn new(registry: &TypeRegistry, data: V) -> Self {
        let types = registry.tuple_types::<V>();
        debug_assert_eq!(types.len(), V::ARITY);
        Self { data, types }
    }

    /// Typed view of the backing record.
    pub fn data(&self) -> &V {
        &self.data
    }

    /// Typed writable view of the backing record.
    pub fn data_mut(&mut self) -> &mut V {
        &mut self.data
    }

    /// Unwraps the backing record.
    pub fn into_inner(self) -> V {
        self.data
    }
}

impl<V: TupleValues> Clone for FixedArityTuple<V> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            types: self.types.clone(),
        }
    }
}

impl<V: TupleValues> ErasedTuple for FixedArityTuple<V> {
    fn size(&self) -> usize {
        V::ARITY
    }

    fn get(&self, index: usize) -> Option<&dyn Any> {
        self.data.slot(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Any> {
        self.data.slot_mut(index)
    }

    fn descriptor(&self, index: usize) -> Option<&TypeDescriptor> {
        self.types.get(index).map(|desc| desc.as_ref())
    }

    fn copy(&self) -> Box<dyn ErasedTuple> {
        Box::new(self.clone())
    }

    fn impl_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn equals(&self, other: &dyn ErasedTuple) -> bool {
        if self.size() != other.size() {
            return false;
        }
        if other.impl_type() == self.impl_type() {
            if let Some(other) = other.as_any().downcast_ref::<Self>() {
                return self.data == other.data;
            }
        }
        slot_wise_equals(self, other)
    }
}

impl<V: TupleValues> PartialEq for FixedArityTuple<V> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<V: TupleValues + fmt::Debug> fmt::Debug for FixedArityTuple<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.data, f)
    }
}
