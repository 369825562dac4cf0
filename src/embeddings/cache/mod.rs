
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

/// Load state of a named model handle
#[derive(Debug)]
pub enum ModelState<T> {
    Uninitialized,
    Ready(Arc<T>),
}

impl<T> ModelState<T> {
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Process-wide cache of expensive model handles, keyed by model name.
///
/// A handle is built on first use and shared read-only afterwards. The lock is
/// held while a handle initializes, so concurrent callers never load the same
/// model twice. A failed initialization leaves the slot uninitialized.
#[derive(Debug)]
pub struct ModelCache<T> {
    models: Mutex<HashMap<String, ModelState<T>>>,
}

impl<T> Default for ModelCache<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ModelCache<T> {
    #[inline]
    pub fn new() -> Self {
        Self {
            models: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for `name`, building it with `init` if needed
    #[inline]
    pub fn get_or_try_init<F, E>(&self, name: &str, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = models
            .entry(name.to_string())
            .or_insert(ModelState::Uninitialized);

        if let ModelState::Ready(handle) = slot {
            debug!("Reusing cached model handle for {}", name);
            return Ok(Arc::clone(handle));
        }

        info!("Loading model {}", name);
        let handle = Arc::new(init()?);
        *slot = ModelState::Ready(Arc::clone(&handle));
        Ok(handle)
    }

    #[inline]
    pub fn is_ready(&self, name: &str) -> bool {
        self.models
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .is_some_and(ModelState::is_ready)
    }
}
