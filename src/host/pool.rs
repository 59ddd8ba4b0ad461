//! Pooled scratch collections with size accounting.
//!
//! Instrumented host methods rent scratch collections from shared pools and return them
//! before exiting. When a patch introduces an early-return path, every pool rental the
//! original method performed *before* the anchor must be returned on that path too -
//! which set of rentals that is belongs to each instrumentation point's own contract.
//! The `size` accessor exists so tests can assert the before/after accounting.

use std::sync::Mutex;

/// A pool of reusable collections.
///
/// `get` hands out a pooled value or a fresh default; `put` clears and stores it back.
#[derive(Debug, Default)]
pub struct Pool<T> {
    items: Mutex<Vec<T>>,
}

impl<T: Default + Clearable> Pool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Pool {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Create a pool pre-seeded with `count` default values.
    #[must_use]
    pub fn with_capacity(count: usize) -> Self {
        let pool = Pool {
            items: Mutex::new(Vec::with_capacity(count)),
        };
        {
            let mut items = pool.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            items.resize_with(count, T::default);
        }
        pool
    }

    /// Rent a value from the pool, or a fresh default when the pool is empty.
    pub fn get(&self) -> T {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    /// Return a value to the pool, clearing it first.
    pub fn put(&self, mut value: T) {
        value.clear();
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(value);
    }

    /// Number of values currently resting in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Collections that can be emptied for reuse.
pub trait Clearable {
    /// Empty the collection, keeping its capacity.
    fn clear(&mut self);
}

impl<T> Clearable for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self);
    }
}

impl<T, S> Clearable for std::collections::HashSet<T, S> {
    fn clear(&mut self) {
        std::collections::HashSet::clear(self);
    }
}
