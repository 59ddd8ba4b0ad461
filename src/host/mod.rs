//! Boundary types for the host process being instrumented.
//!
//! Everything in this module models what the host exposes, not what this library owns:
//! opaque object handles with host-controlled identity ([`HostObject`]), the method-body
//! introspection and installation facility ([`MethodTable`]), and the shared scratch
//! pools instrumented methods rent collections from ([`Pool`]).

mod method;
mod object;
mod pool;

pub use method::{MethodBody, MethodTable};
pub use object::{HostHandle, HostKind, HostObject, HostTraits};
pub use pool::{Clearable, Pool};
