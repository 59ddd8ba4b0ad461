//! Process-wide identity cache mapping host objects to their single wrapper.
//!
//! The cache is the only source of wrappers: for the lifetime of a host object, lookup
//! is idempotent and get-or-create converges to one instance no matter how many
//! concurrent or reentrant callers race on it. Identity is reference identity of the
//! host handle - the host recycles raw ids, so a recycled id arriving as a fresh object
//! gets a fresh wrapper and a fresh serial.
//!
//! # Index layout
//!
//! Two indices, mirroring the multi-index registry pattern used for type lookup:
//! - primary: host identity -> wrapper (`DashMap`, sharded, exactly-once construction
//!   through the vacant-entry path)
//! - secondary: serial -> wrapper (`SkipMap`, ordered, backs serial lookup and ordered
//!   listing)
//!
//! # Reentrancy
//!
//! Wrapper construction is pure classification plus serial assignment and never calls
//! back into the cache, so a subscriber reentering `get_or_create` for the same host
//! object from within event handling observes either "already registered" or "not yet
//! visible", never a partially constructed entry.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::host::HostHandle;
use crate::wrappers::{ShapeTable, Wrapper, WrapperRc};

/// Cache key: reference identity of the host handle.
///
/// An entry keeps its handle alive, so an address can never be recycled while the entry
/// exists; after eviction the key is dead and a new object at the same address is,
/// correctly, a new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct HostKey(usize);

impl HostKey {
    fn of(host: &HostHandle) -> Self {
        HostKey(Arc::as_ptr(host) as usize)
    }
}

/// The bidirectional, deduplicating wrapper identity cache.
///
/// Explicitly constructed and owned - typically one per [`crate::runtime::Runtime`] -
/// rather than ambient global state, so its lifecycle is testable in isolation.
#[derive(Debug)]
pub struct WrapperCache {
    entries: DashMap<HostKey, WrapperRc>,
    by_serial: SkipMap<u16, WrapperRc>,
    next_serial: AtomicU16,
    shapes: ShapeTable,
}

impl WrapperCache {
    /// Create a cache using the given shape catalog.
    #[must_use]
    pub fn new(shapes: ShapeTable) -> Self {
        WrapperCache {
            entries: DashMap::new(),
            by_serial: SkipMap::new(),
            next_serial: AtomicU16::new(1),
            shapes,
        }
    }

    /// Create a cache with the standard shape catalog.
    #[must_use]
    pub fn with_standard_shapes() -> Self {
        Self::new(ShapeTable::standard())
    }

    /// Look up the wrapper for a host object, if one is registered.
    ///
    /// Returns `None` for the empty host reference and after eviction; callers treat
    /// absence as "object no longer exists" and fail their operation gracefully.
    #[must_use]
    pub fn get(&self, host: &HostHandle) -> Option<WrapperRc> {
        if host.is_empty() {
            return None;
        }
        self.entries
            .get(&HostKey::of(host))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Get the registered wrapper for a host object, constructing and registering one
    /// if none exists yet.
    ///
    /// Construction happens exactly once per host object identity: concurrent callers
    /// racing on the same object all receive the single registered instance. If the
    /// host object carries no serial, a fresh one is generated and assigned before the
    /// wrapper becomes visible.
    ///
    /// Returns `None` only for the empty host reference.
    #[must_use]
    pub fn get_or_create(&self, host: &HostHandle) -> Option<WrapperRc> {
        if host.is_empty() {
            return None;
        }

        match self.entries.entry(HostKey::of(host)) {
            Entry::Occupied(occupied) => Some(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                let serial = match host.serial() {
                    0 => {
                        let fresh = self.next_serial.fetch_add(1, Ordering::AcqRel);
                        host.assign_serial(fresh)
                    }
                    assigned => assigned,
                };
                let kind = self.shapes.classify(host);
                let wrapper = Arc::new(Wrapper::new(serial, kind, Arc::clone(host)));
                vacant.insert(Arc::clone(&wrapper));
                self.by_serial.insert(serial, Arc::clone(&wrapper));
                Some(wrapper)
            }
        }
    }

    /// Look up a wrapper by its stable serial.
    #[must_use]
    pub fn get_by_serial(&self, serial: u16) -> Option<WrapperRc> {
        self.by_serial
            .get(&serial)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Evict the wrapper for a host object that left the host's domain.
    ///
    /// The returned wrapper (and any copy obtained earlier) remains a valid value
    /// object; it just no longer resolves through the cache.
    pub fn evict(&self, host: &HostHandle) -> Option<WrapperRc> {
        let (_, wrapper) = self.entries.remove(&HostKey::of(host))?;
        self.by_serial.remove(&wrapper.serial());
        Some(wrapper)
    }

    /// All registered wrappers, ordered by serial.
    #[must_use]
    pub fn list(&self) -> Vec<WrapperRc> {
        self.by_serial
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of registered wrappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no wrappers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WrapperCache {
    fn default() -> Self {
        Self::with_standard_shapes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostKind, HostObject, HostTraits};
    use crate::wrappers::WrapperKind;

    fn usable(raw: u64) -> HostHandle {
        HostObject::new(raw, HostKind::Item, HostTraits::USABLE)
    }

    #[test]
    fn lookup_is_idempotent() {
        let cache = WrapperCache::with_standard_shapes();
        let host = usable(10);

        let first = cache.get_or_create(&host).unwrap();
        let second = cache.get_or_create(&host).unwrap();
        let looked_up = cache.get(&host).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &looked_up));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.kind(), WrapperKind::Usable);
    }

    #[test]
    fn empty_reference_never_resolves() {
        let cache = WrapperCache::with_standard_shapes();
        let null = HostObject::new(0, HostKind::Other, HostTraits::empty());
        assert!(cache.get(&null).is_none());
        assert!(cache.get_or_create(&null).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn serial_is_generated_once_and_indexed() {
        let cache = WrapperCache::with_standard_shapes();
        let host = usable(11);
        assert_eq!(host.serial(), 0);

        let wrapper = cache.get_or_create(&host).unwrap();
        assert_ne!(wrapper.serial(), 0);
        assert_eq!(host.serial(), wrapper.serial());

        let by_serial = cache.get_by_serial(wrapper.serial()).unwrap();
        assert!(Arc::ptr_eq(&wrapper, &by_serial));
    }

    #[test]
    fn preassigned_serial_is_kept() {
        let cache = WrapperCache::with_standard_shapes();
        let host = usable(12);
        host.assign_serial(500);

        let wrapper = cache.get_or_create(&host).unwrap();
        assert_eq!(wrapper.serial(), 500);
        assert!(cache.get_by_serial(500).is_some());
    }

    #[test]
    fn concurrent_get_or_create_converges() {
        let cache = Arc::new(WrapperCache::with_standard_shapes());
        let host = usable(13);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let host = Arc::clone(&host);
            handles.push(std::thread::spawn(move || {
                cache.get_or_create(&host).unwrap()
            }));
        }

        let wrappers: Vec<WrapperRc> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for wrapper in &wrappers[1..] {
            assert!(Arc::ptr_eq(&wrappers[0], wrapper));
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn eviction_leaves_wrapper_valid_but_unresolvable() {
        let cache = WrapperCache::with_standard_shapes();
        let host = usable(14);

        let wrapper = cache.get_or_create(&host).unwrap();
        let serial = wrapper.serial();

        let evicted = cache.evict(&host).unwrap();
        assert!(Arc::ptr_eq(&wrapper, &evicted));
        assert!(cache.get(&host).is_none());
        assert!(cache.get_by_serial(serial).is_none());
        assert_eq!(cache.len(), 0);

        // The value object itself is still usable.
        assert_eq!(evicted.serial(), serial);
    }

    #[test]
    fn recycled_raw_identity_is_a_new_entity() {
        let cache = WrapperCache::with_standard_shapes();

        let first = usable(77);
        let old = cache.get_or_create(&first).unwrap();
        let old_serial = old.serial();
        cache.evict(&first);

        // Host recycles raw id 77 for a brand-new object with no serial assigned.
        let recycled = usable(77);
        let fresh = cache.get_or_create(&recycled).unwrap();

        assert!(!Arc::ptr_eq(&old, &fresh));
        assert_ne!(fresh.serial(), old_serial);
        assert_ne!(fresh.serial(), 0);
    }

    #[test]
    fn list_is_ordered_by_serial() {
        let cache = WrapperCache::with_standard_shapes();
        let hosts: Vec<HostHandle> = (0..4).map(|i| usable(20 + i)).collect();
        for host in &hosts {
            cache.get_or_create(host);
        }

        let serials: Vec<u16> = cache.list().iter().map(|w| w.serial()).collect();
        let mut sorted = serials.clone();
        sorted.sort_unstable();
        assert_eq!(serials, sorted);
        assert_eq!(serials.len(), 4);
    }
}
