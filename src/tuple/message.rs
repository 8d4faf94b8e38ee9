use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::tuple::{ErasedTuple, FixedArityTuple, TupleValues, TypeDescriptor, TypeRegistry};

/// Reference-counted, copy-on-write handle to a message payload.
///
/// Cloning is cheap and shares the payload. Mutation goes through
/// [`Message::make_mut`], which copies the payload first if anyone else
/// still holds it, so writes are never visible through other handles.
#[derive(Clone)]
pub struct Message(Arc<dyn ErasedTuple>);

impl Message {
    /// Wraps an already built tuple.
    pub fn new(tuple: impl ErasedTuple) -> Self {
        Self(Arc::new(tuple))
    }

    /// Builds a [`FixedArityTuple`] message from native values.
    pub fn of<V: TupleValues>(registry: &TypeRegistry, values: V) -> Self {
        Self::new(FixedArityTuple::new(registry, values))
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// Read-only view of slot `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    #[track_caller]
    pub fn at(&self, index: usize) -> &dyn Any {
        self.0.at(index)
    }

    /// Descriptor of slot `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    #[track_caller]
    pub fn type_at(&self, index: usize) -> &TypeDescriptor {
        self.0.type_at(index)
    }

    /// Typed view of slot `index` if it holds a `T`.
    pub fn get_as<T: Any>(&self, index: usize) -> Option<&T> {
        self.0.get_as::<T>(index)
    }

    /// Typed view of the whole payload if it is a `FixedArityTuple<V>`.
    pub fn values<V: TupleValues>(&self) -> Option<&V> {
        self.0
            .as_any()
            .downcast_ref::<FixedArityTuple<V>>()
            .map(FixedArityTuple::data)
    }

    /// The erased payload.
    pub fn tuple(&self) -> &dyn ErasedTuple {
        self.0.as_ref()
    }

    /// Returns true if no other handle shares the payload.
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    /// Returns true if both handles share the same payload.
    pub fn ptr_eq(&self, other: &Message) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Exclusive access to the payload, detaching it from other handles first.
    pub fn make_mut(&mut self) -> &mut dyn ErasedTuple {
        if Arc::get_mut(&mut self.0).is_none() {
            self.0 = Arc::from(self.0.copy());
        }
        match Arc::get_mut(&mut self.0) {
            Some(tuple) => tuple,
            None => unreachable!("a freshly copied payload has a single owner"),
        }
    }

    /// Writable view of slot `index`, detaching the payload if shared.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    #[track_caller]
    pub fn mutable_at(&mut self, index: usize) -> &mut dyn Any {
        self.make_mut().mutable_at(index)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.equals(other.0.as_ref())
    }
}

impl<V: TupleValues> From<FixedArityTuple<V>> for Message {
    fn from(tuple: FixedArityTuple<V>) -> Self {
        Self::new(tuple)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct SlotDebug<'a>(&'a TypeDescriptor, &'a dyn Any);

        impl fmt::Debug for SlotDebug<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt_value(self.1, f)
            }
        }

        let mut tuple = f.debug_tuple("");
        for index in 0..self.size() {
            tuple.field(&SlotDebug(self.type_at(index), self.at(index)));
        }
        tuple.finish()
    }
}
