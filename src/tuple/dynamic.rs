use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::tuple::{ErasedTuple, Element, TypeDescriptor, TypeRegistry};

trait SlotValue: Any + Send + Sync {
    fn clone_box(&self) -> Box<dyn SlotValue>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Element> SlotValue for T {
    fn clone_box(&self) -> Box<dyn SlotValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Slot {
    descriptor: Arc<TypeDescriptor>,
    value: Box<dyn SlotValue>,
}

/// Tuple assembled slot by slot at runtime, each value boxed separately.
///
/// Never takes the equality fast path of [`FixedArityTuple`](super::FixedArityTuple);
/// comparisons against it always go through the descriptors.
pub struct DynamicTuple {
    slots: Vec<Slot>,
}

impl DynamicTuple {
    /// Starts an empty builder resolving descriptors through `registry`.
    pub fn builder(registry: &TypeRegistry) -> DynamicTupleBuilder<'_> {
        DynamicTupleBuilder {
            registry,
            slots: Vec::new(),
        }
    }
}

impl ErasedTuple for DynamicTuple {
    fn size(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, index: usize) -> Option<&dyn Any> {
        self.slots.get(index).map(|slot| slot.value.as_any())
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Any> {
        self.slots
            .get_mut(index)
            .map(|slot| slot.value.as_any_mut())
    }

    fn descriptor(&self, index: usize) -> Option<&TypeDescriptor> {
        self.slots.get(index).map(|slot| slot.descriptor.as_ref())
    }

    fn copy(&self) -> Box<dyn ErasedTuple> {
        Box::new(DynamicTuple {
            slots: self
                .slots
                .iter()
                .map(|slot| Slot {
                    descriptor: Arc::clone(&slot.descriptor),
                    value: slot.value.clone_box(),
                })
                .collect(),
        })
    }

    fn impl_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for [`DynamicTuple`].
pub struct DynamicTupleBuilder<'r> {
    registry: &'r TypeRegistry,
    slots: Vec<Slot>,
}

impl DynamicTupleBuilder<'_> {
    /// Appends a slot holding `value`.
    pub fn push<T: Element>(mut self, value: T) -> Self {
        self.slots.push(Slot {
            descriptor: self.registry.descriptor::<T>(),
            value: Box::new(value),
        });
        self
    }

    /// Finishes the tuple.
    pub fn build(self) -> DynamicTuple {
        DynamicTuple { slots: self.slots }
    }
}
