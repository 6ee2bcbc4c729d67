//! The execution lock around an object space.

use crate::config::SpaceConfig;
use crate::space::ObjectSpace;
use parking_lot::{Mutex, MutexGuard};

/// An object space shared between threads.
///
/// Only one thread runs against the space at a time. Arrays carry no locks
/// of their own; holding the guard is what makes their mutation safe.
#[derive(Debug, Default)]
pub struct Runtime {
    space: Mutex<ObjectSpace>,
}

impl Runtime {
    /// Create a runtime with a fresh object space.
    pub fn new(config: SpaceConfig) -> Self {
        Runtime {
            space: Mutex::new(ObjectSpace::new(config)),
        }
    }

    /// Acquire the execution lock.
    pub fn lock(&self) -> MutexGuard<'_, ObjectSpace> {
        self.space.lock()
    }

    /// Run `f` while holding the execution lock.
    pub fn with_space<R>(&self, f: impl FnOnce(&mut ObjectSpace) -> R) -> R {
        f(&mut self.space.lock())
    }

    /// Take the space back out of the runtime.
    pub fn into_inner(self) -> ObjectSpace {
        self.space.into_inner()
    }
}
