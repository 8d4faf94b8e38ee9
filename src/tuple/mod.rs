//! Type-erased message payloads.
//!
//! [`ErasedTuple`] is the runtime-inspectable view the actor core works
//! with. [`FixedArityTuple`] stores a native Rust tuple inline and is the
//! representation produced by [`Message::of`]; [`DynamicTuple`] is a
//! heap-backed representation assembled slot by slot.

/// Heap-backed tuple assembled at runtime.
pub mod dynamic;
/// Inline, statically typed tuple.
pub mod fixed;
/// Copy-on-write message handle.
pub mod message;
/// Type descriptors and their registry.
pub mod registry;

use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::sync::Arc;

pub use dynamic::{DynamicTuple, DynamicTupleBuilder};
pub use fixed::FixedArityTuple;
pub use message::Message;
pub use registry::{TupleTypes, TypeDescriptor, TypeRegistry};

/// Bound shared by every value that can live in a tuple slot.
pub trait Element: Any + Clone + PartialEq + Debug + Send + Sync {}

impl<T> Element for T where T: Any + Clone + PartialEq + Debug + Send + Sync {}

/// Runtime-polymorphic access to a fixed-size heterogeneous tuple.
pub trait ErasedTuple: Any + Send + Sync {
    /// Number of slots. Fixed for the lifetime of the instance.
    fn size(&self) -> usize;

    /// Read-only view of slot `index`, or `None` if out of range.
    fn get(&self, index: usize) -> Option<&dyn Any>;

    /// Writable view of slot `index`, or `None` if out of range.
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Any>;

    /// Descriptor of slot `index`, or `None` if out of range.
    fn descriptor(&self, index: usize) -> Option<&TypeDescriptor>;

    /// Deep copy with its own backing storage.
    fn copy(&self) -> Box<dyn ErasedTuple>;

    /// Identity of the concrete representation.
    ///
    /// Only used to pick the equality fast path.
    fn impl_type(&self) -> TypeId;

    /// Upcast used for representation-specific downcasts.
    fn as_any(&self) -> &dyn Any;

    /// Value equality across representations.
    fn equals(&self, other: &dyn ErasedTuple) -> bool {
        slot_wise_equals(self, other)
    }

    /// Read-only view of slot `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    #[track_caller]
    fn at(&self, index: usize) -> &dyn Any {
        let size = self.size();
        match self.get(index) {
            Some(value) => value,
            None => out_of_range(index, size),
        }
    }

    /// Writable view of slot `index`.
    ///
    /// Taking `&mut self` is the proof of exclusive access; shared payloads
    /// go through [`Message::mutable_at`], which detaches first.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    #[track_caller]
    fn mutable_at(&mut self, index: usize) -> &mut dyn Any {
        let size = self.size();
        match self.get_mut(index) {
            Some(value) => value,
            None => out_of_range(index, size),
        }
    }

    /// Descriptor of slot `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.size()`.
    #[track_caller]
    fn type_at(&self, index: usize) -> &TypeDescriptor {
        let size = self.size();
        match self.descriptor(index) {
            Some(desc) => desc,
            None => out_of_range(index, size),
        }
    }
}

impl dyn ErasedTuple {
    /// Typed view of slot `index` if it holds a `T`.
    pub fn get_as<T: Any>(&self, index: usize) -> Option<&T> {
        self.get(index)?.downcast_ref::<T>()
    }

    /// Typed writable view of slot `index` if it holds a `T`.
    pub fn get_mut_as<T: Any>(&mut self, index: usize) -> Option<&mut T> {
        self.get_mut(index)?.downcast_mut::<T>()
    }
}

/// Slow-path equality: compares slot by slot through the descriptors.
///
/// Slots holding different types never compare equal, even when the values
/// would be numerically alike (`1u8` vs `1u32`).
pub fn slot_wise_equals<L>(left: &L, right: &dyn ErasedTuple) -> bool
where
    L: ErasedTuple + ?Sized,
{
    if left.size() != right.size() {
        return false;
    }
    (0..left.size()).all(|index| {
        match (
            left.descriptor(index),
            right.descriptor(index),
            left.get(index),
            right.get(index),
        ) {
            (Some(ld), Some(rd), Some(lv), Some(rv)) => ld.same_type(rd) && ld.equals(lv, rv),
            _ => false,
        }
    })
}

#[cold]
#[track_caller]
fn out_of_range(index: usize, size: usize) -> ! {
    panic!("tuple index {index} out of range for tuple of size {size}")
}

/// Native Rust tuples usable as the backing record of a [`FixedArityTuple`].
///
/// Implemented for tuples of one to twelve [`Element`]s. The empty tuple is
/// deliberately not supported.
pub trait TupleValues: Clone + PartialEq + Send + Sync + 'static {
    /// Number of slots.
    const ARITY: usize;

    /// Erased view of slot `index`.
    fn slot(&self, index: usize) -> Option<&dyn Any>;

    /// Erased writable view of slot `index`.
    fn slot_mut(&mut self, index: usize) -> Option<&mut dyn Any>;

    /// Descriptors of all slots, in order.
    fn descriptors(registry: &TypeRegistry) -> Vec<Arc<TypeDescriptor>>;
}

macro_rules! tuple_values {
    ($arity:expr; $($idx:tt : $ty:ident),+) => {
        impl<$($ty: Element),+> TupleValues for ($($ty,)+) {
            const ARITY: usize = $arity;

            fn slot(&self, index: usize) -> Option<&dyn Any> {
                match index {
                    $($idx => Some(&self.$idx as &dyn Any),)+
                    _ => None,
                }
            }

            fn slot_mut(&mut self, index: usize) -> Option<&mut dyn Any> {
                match index {
                    $($idx => Some(&mut self.$idx as &mut dyn Any),)+
                    _ => None,
                }
            }

            fn descriptors(registry: &TypeRegistry) -> Vec<Arc<TypeDescriptor>> {
                vec![$(registry.descriptor::<$ty>()),+]
            }
        }
    };
}

tuple_values!(1; 0: A);
tuple_values!(2; 0: A, 1: B);
tuple_values!(3; 0: A, 1: B, 2: C);
tuple_values!(4; 0: A, 1: B, 2: C, 3: D);
tuple_values!(5; 0: A, 1: B, 2: C, 3: D, 4: E);
tuple_values!(6; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F);
tuple_values!(7; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G);
tuple_values!(8; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H);
tuple_values!(9; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I);
tuple_values!(10; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J);
tuple_values!(11; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J, 10: K);
tuple_values!(12; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L);
