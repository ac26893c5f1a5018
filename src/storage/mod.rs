mod in_memory;

pub use in_memory::InMemoryEngine;

use bytes::Bytes;
use thiserror::Error as ThisError;

use crate::context::{Context, ContextError};

/// Initial capacity of the key space created by [`Storage::new`].
const INIT_SIZE: usize = 1024;

/// The storage primitive behind [`Storage`]. Implementations must make each operation atomic
/// with respect to concurrent callers; none of them can fail.
pub trait Engine: Send + Sync {
    /// Creates or overwrites `key`.
    fn set(&self, key: Bytes, value: Bytes);
    /// Returns the last value written to `key`, or `None` when the key is absent.
    fn get(&self, key: &[u8]) -> Option<Bytes>;
    /// Removes `key`. Removing an absent key does nothing.
    fn del(&self, key: &[u8]);
}

/// Cancellable façade over an [`Engine`]. Every operation checks its [`Context`] first and
/// returns without touching the engine when the context is done.
#[derive(Clone, Debug)]
pub struct Storage<E = InMemoryEngine> {
    engine: E,
}

impl Storage {
    pub fn new() -> Storage {
        Storage {
            engine: InMemoryEngine::with_capacity(INIT_SIZE),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> Storage<E> {
    pub fn with_engine(engine: E) -> Storage<E> {
        Storage { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn set(&self, ctx: &Context, key: Bytes, value: Bytes) -> Result<(), StorageError> {
        ctx.err()?;
        self.engine.set(key, value);
        Ok(())
    }

    pub fn get(&self, ctx: &Context, key: &[u8]) -> Result<Bytes, StorageError> {
        ctx.err()?;
        self.engine.get(key).ok_or(StorageError::NotFound)
    }

    pub fn del(&self, ctx: &Context, key: &[u8]) -> Result<(), StorageError> {
        ctx.err()?;
        self.engine.del(key);
        Ok(())
    }
}

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("storage: not found")]
    NotFound,
    #[error(transparent)]
    Context(#[from] ContextError),
    /// Failure reported by a storage backend other than the in-memory one.
    #[error("storage: {0}")]
    Backend(crate::Error),
}
