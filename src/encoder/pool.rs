//! Free-list pools for per-call scratch objects

use parking_lot::Mutex;

/// Objects that can be returned to a pool and reused
pub trait Reset {
    /// Return to the freshly constructed state
    fn reset(&mut self);
}

/// A bounded free list guarded by a short mutex
///
/// `acquire` pops an idle object or builds a new one with `Default`;
/// `release` resets the object and keeps it unless the pool is full.
pub struct Pool<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
}

impl<T: Reset + Default> Pool<T> {
    pub const DEFAULT_MAX_IDLE: usize = 64;

    pub fn new() -> Self {
        Self::with_max_idle(Self::DEFAULT_MAX_IDLE)
    }

    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    pub fn acquire(&self) -> T {
        self.idle.lock().pop().unwrap_or_default()
    }

    pub fn release(&self, mut item: T) {
        item.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    /// Number of objects currently waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl<T: Reset + Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
