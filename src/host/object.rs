//! Opaque model of a host-owned mutable entity.
//!
//! The host hands out references to its own objects; this library never constructs or
//! mutates their domain state, it only classifies them (for wrapper construction) and
//! assigns stable serial numbers where the host has not yet done so. Raw id `0` is the
//! host's null/empty reference, and serial `0` means "no serial assigned yet" - the host
//! recycles raw ids, and a recycled object always arrives with serial 0.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// Shape traits of a host object, consumed by the wrapper catalog's ordered
    /// predicates.
    ///
    /// Traits compose: a consumable is also usable, a frag grenade is also throwable.
    /// The ordered rule table relies on that layering to match most-specific first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HostTraits: u32 {
        /// Can be actively used by its owner
        const USABLE = 1 << 0;
        /// Destroyed on use
        const CONSUMABLE = 1 << 1;
        /// Can be thrown, producing a projectile
        const THROWABLE = 1 << 2;
        /// Throwable whose projectile explodes
        const EXPLOSIVE = 1 << 3;
        /// Broadcasts over the host's radio channel
        const TRANSMITTER = 1 << 4;
        /// Worn, absorbing damage
        const PROTECTIVE = 1 << 5;
        /// Opens access-controlled doors
        const ACCESS_PASS = 1 << 6;
    }
}

/// Coarse classification reported by the host for one of its objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// Inventory item
    Item,
    /// Item dropped into the world
    Pickup,
    /// In-flight projectile
    Projectile,
    /// Anything the host does not classify further
    Other,
}

/// A host-owned object as seen across the instrumentation boundary.
///
/// Identity is reference identity of the handle, matching the host's own semantics: two
/// handles to the same live object are the same [`Arc`]. The `raw` id is host-internal
/// and *recycled* - it must never be used as a cache key on its own.
#[derive(Debug)]
pub struct HostObject {
    raw: u64,
    kind: HostKind,
    traits: HostTraits,
    serial: AtomicU16,
}

/// Shared handle to a [`HostObject`].
pub type HostHandle = Arc<HostObject>;

impl HostObject {
    /// Create a handle to a host object with no serial assigned.
    #[must_use]
    pub fn new(raw: u64, kind: HostKind, traits: HostTraits) -> HostHandle {
        Arc::new(HostObject {
            raw,
            kind,
            traits,
            serial: AtomicU16::new(0),
        })
    }

    /// The host-internal raw id. Recycled by the host; informational only.
    #[must_use]
    pub fn raw(&self) -> u64 {
        self.raw
    }

    /// Whether this is the host's null/empty reference.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw == 0
    }

    /// The host's coarse classification of this object.
    #[must_use]
    pub fn kind(&self) -> HostKind {
        self.kind
    }

    /// Shape traits of this object.
    #[must_use]
    pub fn traits(&self) -> HostTraits {
        self.traits
    }

    /// The stable serial currently assigned, or 0 when none has been.
    #[must_use]
    pub fn serial(&self) -> u16 {
        self.serial.load(Ordering::Acquire)
    }

    /// Assign `serial` if the object does not carry one yet, returning the serial the
    /// object ends up with.
    ///
    /// First writer wins; a concurrent or reentrant second assignment observes the
    /// already-stored value.
    pub fn assign_serial(&self, serial: u16) -> u16 {
        match self
            .serial
            .compare_exchange(0, serial, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => serial,
            Err(existing) => existing,
        }
    }
}
