//! Stable typed wrappers over host-owned objects, and the identity cache that
//! deduplicates them.
//!
//! Extension code never touches raw host handles: it works through [`Wrapper`] façades
//! handed out by the [`WrapperCache`], which maintains a one-to-one mapping from live
//! host object to wrapper. Which concrete [`WrapperKind`] a host object gets is decided
//! by the ordered [`ShapeTable`] - configuration supplied by the domain catalog, most
//! specific rule first.
//!
//! # Example
//! ```rust
//! use hookscope::host::{HostKind, HostObject, HostTraits};
//! use hookscope::wrappers::{WrapperCache, WrapperKind};
//!
//! let cache = WrapperCache::with_standard_shapes();
//! let grenade = HostObject::new(1, HostKind::Item,
//!     HostTraits::USABLE | HostTraits::THROWABLE | HostTraits::EXPLOSIVE);
//!
//! let wrapper = cache.get_or_create(&grenade).unwrap();
//! assert_eq!(wrapper.kind(), WrapperKind::FragGrenade);
//! // Repeated resolution yields the same instance.
//! assert!(std::sync::Arc::ptr_eq(&wrapper, &cache.get(&grenade).unwrap()));
//! ```

mod cache;
mod catalog;
mod wrapper;

pub use cache::WrapperCache;
pub use catalog::{ShapePredicate, ShapeRule, ShapeTable};
pub use wrapper::{Wrapper, WrapperKind, WrapperRc};
