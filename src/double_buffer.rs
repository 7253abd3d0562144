use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

/// Two slots and an atomic front index.
///
/// The writer fills the back slot under its write lock and then flips the
/// index; readers lock the front slot. A writer that wraps around to a slot
/// still held by a reader waits for it, so a reader never sees a partial frame.
pub struct DoubleBuffer<T> {
    slots: [RwLock<T>; 2],
    front: AtomicUsize,
    writer: Mutex<()>,
}

impl<T: Clone> DoubleBuffer<T> {
    pub fn new(initial: T) -> DoubleBuffer<T> {
        DoubleBuffer {
            slots: [RwLock::new(initial.clone()), RwLock::new(initial)],
            front: AtomicUsize::new(0),
            writer: Mutex::new(()),
        }
    }
}

impl<T> DoubleBuffer<T> {
    /// Runs `fill` on the back slot, then makes it the front.
    pub fn write<R>(&self, fill: impl FnOnce(&mut T) -> R) -> R {
        let _writer = self.writer.lock();
        let back = 1 - self.front.load(Ordering::Acquire);
        let result = {
            let mut slot = self.slots[back].write();
            fill(&mut slot)
        };
        self.front.store(back, Ordering::Release);
        result
    }

    /// Latest completely written slot.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.slots[self.front.load(Ordering::Acquire)].read()
    }
}
