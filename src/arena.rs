use std::num::NonZeroUsize;

use tracing::warn;

use crate::error::{MapError, Result};

/// Stable address of an element stored in an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct Handle(NonZeroUsize);

impl Handle {
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(NonZeroUsize::MIN.saturating_add(index))
    }

    #[inline]
    pub(crate) fn to_index(self) -> usize {
        self.0.get() - 1
    }
}

/// Slot storage for tree and list nodes.
///
/// Elements are addressed by [`Handle`]. Freed slots go onto a free list and
/// are reused by later allocations, so handles stay valid until the element
/// they address is taken out.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Handle>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `element` and returns its handle.
    ///
    /// Fails with [`MapError::AllocationFailure`] if the backing storage cannot
    /// grow. The arena is left untouched in that case.
    pub(crate) fn try_alloc(&mut self, element: T) -> Result<Handle> {
        if let Some(handle) = self.free.pop() {
            self.slots[handle.to_index()] = Some(element);
            return Ok(handle);
        }

        // The free list must be able to hold every slot, so `take` never reallocates.
        let needed = self.slots.len() + 1;
        if self.slots.try_reserve(1).is_err() || self.free.try_reserve(needed).is_err() {
            warn!(slots = self.slots.len(), "arena could not reserve a new slot");
            return Err(MapError::AllocationFailure);
        }

        self.slots.push(Some(element));
        Ok(Handle::from_index(self.slots.len() - 1))
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()]
            .as_ref()
            .expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.to_index()]
            .as_mut()
            .expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    /// Returns a mutable reference to an element by handle from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid `Arena<T>` that outlives `'a`.
    /// - No other reference to the element addressed by `handle` may be alive
    ///   for `'a`. References to other elements are unaffected.
    #[inline]
    pub(crate) unsafe fn get_mut_ptr<'a>(ptr: *mut Self, handle: Handle) -> &'a mut T {
        // SAFETY: `Vec::as_mut_ptr` does not materialize a reference to the
        // whole buffer, so only the addressed slot is borrowed.
        let slots = unsafe { (*ptr).slots.as_mut_ptr() };
        let len = unsafe { (*ptr).slots.len() };
        let index = handle.to_index();
        assert!(index < len, "`Arena::get_mut_ptr()` - `handle` is invalid!");
        unsafe { &mut *slots.add(index) }
            .as_mut()
            .expect("`Arena::get_mut_ptr()` - `handle` is invalid!")
    }

    /// Moves the element out of the arena and frees its slot.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element = self.slots[handle.to_index()]
            .take()
            .expect("`Arena::take()` - `handle` is invalid!");
        self.free.push(handle);
        element
    }

    pub(crate) fn free(&mut self, handle: Handle) {
        drop(self.take(handle));
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_handle_index() {
        assert_eq!(Handle::from_index(0).to_index(), 0);
        assert_eq!(Handle::from_index(41).to_index(), 41);
        assert_eq!(
            std::mem::size_of::<Handle>(),
            std::mem::size_of::<Option<Handle>>()
        );
    }

    #[test]
    fn test_free_slot_is_reused() {
        let mut arena = Arena::new();
        let a = arena.try_alloc("a").unwrap();
        let b = arena.try_alloc("b").unwrap();
        assert_eq!(arena.len(), 2);

        arena.free(a);
        assert_eq!(arena.len(), 1);
        let c = arena.try_alloc("c").unwrap();
        assert_eq!(c, a);
        assert_eq!(*arena.get(c), "c");
        assert_eq!(*arena.get(b), "b");

        arena.clear();
        assert!(arena.is_empty());
    }

    #[test]
    fn test_get_mut_ptr_disjoint() {
        let mut arena = Arena::new();
        let a = arena.try_alloc(1).unwrap();
        let b = arena.try_alloc(2).unwrap();

        let ptr: *mut Arena<i32> = &mut arena;
        let (x, y) = unsafe { (Arena::get_mut_ptr(ptr, a), Arena::get_mut_ptr(ptr, b)) };
        *x += 10;
        *y += 20;
        assert_eq!(*arena.get(a), 11);
        assert_eq!(*arena.get(b), 22);
    }

    #[test]
    #[should_panic(expected = "`Arena::get()` - `handle` is invalid!")]
    fn test_get_taken() {
        let mut arena = Arena::new();
        let a = arena.try_alloc(7).unwrap();
        assert_eq!(arena.take(a), 7);
        arena.get(a);
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Alloc(u32),
        GetMut(usize, u32),
        Take(usize),
        Clear,
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            20 => any::<u32>().prop_map(Operation::Alloc),
            5 => (any::<usize>(), any::<u32>()).prop_map(|(which, value)| Operation::GetMut(which, value)),
            8 => any::<usize>().prop_map(Operation::Take),
            1 => Just(Operation::Clear),
        ]
    }

    proptest! {
        #[test]
        fn arena_behaves_like_vec(operations in prop::collection::vec(strategy(), 0..256)) {
            let mut model: Vec<(Handle, u32)> = Vec::new();
            let mut arena: Arena<u32> = Arena::new();

            for operation in operations {
                match operation {
                    Operation::Alloc(value) => {
                        let handle = arena.try_alloc(value).unwrap();
                        model.push((handle, value));
                    }
                    Operation::GetMut(which, value) => {
                        if model.is_empty() {
                            continue;
                        }
                        let index = which % model.len();
                        *arena.get_mut(model[index].0) = value;
                        model[index].1 = value;
                    }
                    Operation::Take(which) => {
                        if model.is_empty() {
                            continue;
                        }
                        let index = which % model.len();
                        let (handle, value) = model.swap_remove(index);
                        prop_assert_eq!(arena.take(handle), value);
                    }
                    Operation::Clear => {
                        arena.clear();
                        model.clear();
                    }
                }

                prop_assert_eq!(arena.len(), model.len());
                for &(handle, value) in &model {
                    prop_assert_eq!(*arena.get(handle), value);
                }
            }
        }
    }
}
