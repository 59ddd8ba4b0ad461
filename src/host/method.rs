//! The host's method-body introspection and installation facility.
//!
//! A [`MethodTable`] maps method names to their current instruction streams. The patch
//! engine *checks out* a body, giving the in-flight patch operation exclusive ownership
//! of the stream, and installs the edited stream back (or the original, untouched, when
//! the patch failed). Each body carries a `patched` latch so a plan can never be applied
//! on top of an earlier patch.

use dashmap::DashMap;

use crate::il::InstructionStream;
use crate::Result;

/// One method body: the instruction stream and whether a patch has been installed.
#[derive(Debug)]
pub struct MethodBody {
    /// The method's current instruction stream
    pub stream: InstructionStream,
    /// Whether an instrumentation patch has already been installed
    pub patched: bool,
}

/// Table of host methods addressable by name.
///
/// Concurrent checkout of *different* methods is safe; checking out the same method
/// twice simply fails the second caller, which is how the engine serializes points that
/// target one method.
#[derive(Debug, Default)]
pub struct MethodTable {
    methods: DashMap<String, MethodBody>,
}

impl MethodTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        MethodTable {
            methods: DashMap::new(),
        }
    }

    /// Register a method body under `name`, replacing any previous body.
    pub fn register(&self, name: impl Into<String>, stream: InstructionStream) {
        self.methods.insert(
            name.into(),
            MethodBody {
                stream,
                patched: false,
            },
        );
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the table holds no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Whether the named method has a patch installed.
    #[must_use]
    pub fn is_patched(&self, name: &str) -> bool {
        self.methods
            .get(name)
            .map(|body| body.patched)
            .unwrap_or(false)
    }

    /// Check out the named method body for exclusive editing.
    ///
    /// The entry is removed from the table for the duration; the caller must hand the
    /// body back through [`MethodTable::install`] or [`MethodTable::restore`].
    ///
    /// # Errors
    /// [`crate::Error::Error`] when the method is unknown, or currently checked out;
    /// [`crate::Error::AlreadyPatched`] when a patch is already installed.
    pub fn checkout(&self, name: &str) -> Result<MethodBody> {
        let (_, body) = self
            .methods
            .remove(name)
            .ok_or_else(|| crate::Error::Error(format!("unknown or busy method '{name}'")))?;
        if body.patched {
            // Put it back before failing; the caller owns nothing.
            self.methods.insert(name.to_string(), body);
            return Err(crate::Error::AlreadyPatched(name.to_string()));
        }
        Ok(body)
    }

    /// Install a patched stream for `name`, setting the patched latch.
    pub fn install(&self, name: &str, stream: InstructionStream) {
        self.methods.insert(
            name.to_string(),
            MethodBody {
                stream,
                patched: true,
            },
        );
    }

    /// Return an unmodified body to the table after a failed patch.
    pub fn restore(&self, name: &str, body: MethodBody) {
        self.methods.insert(name.to_string(), body);
    }

    /// Clone the named method's current stream, e.g. for execution or inspection.
    #[must_use]
    pub fn stream_of(&self, name: &str) -> Option<InstructionStream> {
        self.methods.get(name).map(|body| body.stream.clone())
    }
}
