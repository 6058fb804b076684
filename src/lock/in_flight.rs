use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

use super::LockError;

/// Keyed claims backed by `Mutex<HashMap<..>>` + `Condvar`.
///
/// A key can be claimed by one thread at a time. Another thread claiming the
/// same key blocks until the holder drops its [`Claim`]. The holding thread
/// claiming its own key again gets `None` instead of deadlocking, which is
/// how re-entrant dispatch of an already in-flight (event, handler) pair is
/// detected.
///
/// The mutex is only held while the map is updated, never while the claim is
/// alive.
pub struct InFlight {
    held: Mutex<HashMap<String, ThreadId>>,
    wake: Condvar,
}

impl InFlight {
    pub fn new() -> Self {
        InFlight {
            held: Mutex::new(HashMap::new()),
            wake: Condvar::new(),
        }
    }

    /// Claim `key`, blocking while another thread holds it.
    ///
    /// Returns `Ok(None)` when the current thread already holds the key.
    pub fn claim(&self, key: String) -> Result<Option<Claim<'_>>, LockError> {
        let me = thread::current().id();
        let mut held = self
            .held
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))?;

        loop {
            match held.get(&key) {
                None => break,
                Some(owner) if *owner == me => return Ok(None),
                Some(_) => {
                    held = self
                        .wake
                        .wait(held)
                        .map_err(|e| LockError::Poisoned(e.to_string()))?;
                }
            }
        }

        held.insert(key.clone(), me);
        Ok(Some(Claim { owner: self, key }))
    }

    /// Number of keys currently claimed.
    pub fn len(&self) -> usize {
        self.held.lock().map(|held| held.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

/// A held key. Released on drop.
pub struct Claim<'a> {
    owner: &'a InFlight,
    key: String,
}

impl Claim<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        // Release even if poisoned, otherwise waiters would block forever.
        let mut held = match self.owner.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(&self.key);
        self.owner.wake.notify_all();
    }
}
