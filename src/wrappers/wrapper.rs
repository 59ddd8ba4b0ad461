//! The stable typed façade over a host-owned mutable object.

use std::fmt;
use std::sync::Arc;

use crate::host::{HostHandle, HostKind, HostTraits};

/// Concrete wrapper subtype, chosen by the catalog's ordered shape rules.
///
/// This is the tagged-variant rendering of the wrapper hierarchy: the full domain
/// catalog carries hundreds of thin property-mapping subtypes, of which this slice is
/// enough to exercise most-specific-first ordering (a frag grenade is also throwable,
/// a consumable is also usable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// Fallback when no shape rule matches
    Generic,
    /// Any usable item
    Usable,
    /// Usable item destroyed on use
    Consumable,
    /// Any throwable item
    Throwable,
    /// Throwable with an explosive projectile
    FragGrenade,
    /// Transmitting radio item
    Radio,
    /// Worn protective item
    Armor,
    /// Door access pass
    Keycard,
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WrapperKind::Generic => "generic",
            WrapperKind::Usable => "usable",
            WrapperKind::Consumable => "consumable",
            WrapperKind::Throwable => "throwable",
            WrapperKind::FragGrenade => "frag-grenade",
            WrapperKind::Radio => "radio",
            WrapperKind::Armor => "armor",
            WrapperKind::Keycard => "keycard",
        };
        f.write_str(name)
    }
}

/// A long-lived typed façade for one host object.
///
/// Wrappers are handed out through the identity cache, which guarantees at most one
/// wrapper per live host object. A wrapper obtained before its host object left the
/// host's domain stays a valid value object - its serial and kind remain readable - it
/// just no longer resolves through the cache.
#[derive(Debug)]
pub struct Wrapper {
    serial: u16,
    kind: WrapperKind,
    host: HostHandle,
}

/// Shared reference to a cached [`Wrapper`].
pub type WrapperRc = Arc<Wrapper>;

impl Wrapper {
    pub(crate) fn new(serial: u16, kind: WrapperKind, host: HostHandle) -> Self {
        Wrapper { serial, kind, host }
    }

    /// The stable serial identifying this wrapper's host object.
    #[must_use]
    pub fn serial(&self) -> u16 {
        self.serial
    }

    /// The concrete subtype the catalog chose for this wrapper.
    #[must_use]
    pub fn kind(&self) -> WrapperKind {
        self.kind
    }

    /// The wrapped host object.
    #[must_use]
    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    /// The host's coarse classification of the wrapped object.
    #[must_use]
    pub fn host_kind(&self) -> HostKind {
        self.host.kind()
    }

    /// Shape traits of the wrapped object.
    #[must_use]
    pub fn traits(&self) -> HostTraits {
        self.host.traits()
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.kind, self.serial)
    }
}
