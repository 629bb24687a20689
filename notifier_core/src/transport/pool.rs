/**
 * Connection context pool.
 *
 * Keeps idle transport handles per destination key (`host:port`) so repeated
 * notifications to the same subscriber reuse connection state instead of
 * paying setup cost every time.
 *
 * ```text
 *   send A ──acquire("h:80")──► [idle h:80: H1 H2] ──pop──► H2 (exclusively A's)
 *   send B ──acquire("h:80")──► [idle h:80: H1]    ──pop──► H1 (exclusively B's)
 *   send C ──acquire("h:80")──► [idle h:80: ]      ──open─► H3 (fresh)
 *
 *   PooledHandle dropped ──► pushed back to idle (or dropped when discarded
 *                            or when the idle list is full)
 * ```
 *
 * A handle is removed from the idle table for the whole time it is
 * borrowed, so two concurrent sends can never hold the same handle. Release
 * happens in `Drop`, which covers every exit path of a send.
 */
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct ConnectionPool<H> {
    /// Idle handles per destination key.
    idle: Mutex<HashMap<String, Vec<H>>>,

    /// Idle handles kept per key; extra releases drop the handle.
    max_idle_per_key: usize,

    /// Handles opened over the pool's lifetime.
    created: AtomicUsize,
}

impl<H> ConnectionPool<H> {
    pub fn new(max_idle_per_key: usize) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            max_idle_per_key,
            created: AtomicUsize::new(0),
        }
    }

    /**
     * Borrows an idle handle for `key`, or opens a new one with `open`.
     *
     * `open` runs outside the table lock. Its error is returned unchanged
     * and nothing is pooled.
     */
    pub fn acquire<E>(
        &self,
        key: &str,
        open: impl FnOnce(&str) -> Result<H, E>,
    ) -> Result<PooledHandle<'_, H>, E> {
        let reused = match self.idle.lock() {
            Ok(mut idle) => take_idle(&mut idle, key),
            Err(_) => None,
        };

        let handle = match reused {
            Some(handle) => {
                tracing::debug!(destination = key, "Reusing pooled handle");
                handle
            }
            None => {
                let handle = open(key)?;
                self.created.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(destination = key, "Opened new handle");
                handle
            }
        };

        Ok(PooledHandle {
            pool: self,
            key: key.to_string(),
            handle: Some(handle),
            reusable: true,
        })
    }

    fn release(&self, key: String, handle: H) {
        if self.max_idle_per_key == 0 {
            return;
        }
        let Ok(mut idle) = self.idle.lock() else {
            return;
        };
        let slot = idle.entry(key).or_default();
        if slot.len() < self.max_idle_per_key {
            slot.push(handle);
        }
    }

    /// Idle handles currently pooled for `key`.
    pub fn idle_count(&self, key: &str) -> usize {
        match self.idle.lock() {
            Ok(idle) => idle.get(key).map_or(0, Vec::len),
            Err(_) => 0,
        }
    }

    /// Handles opened so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Destinations with at least one idle handle.
    pub fn idle_destinations(&self) -> usize {
        match self.idle.lock() {
            Ok(idle) => idle.len(),
            Err(_) => 0,
        }
    }
}

/// Pops an idle handle; a destination left with none is dropped from the table.
fn take_idle<H>(idle: &mut HashMap<String, Vec<H>>, key: &str) -> Option<H> {
    let slot = idle.get_mut(key)?;
    let handle = slot.pop();
    if slot.is_empty() {
        idle.remove(key);
    }
    handle
}

// ---------------------------------------------------------------------------
// PooledHandle
// ---------------------------------------------------------------------------

/**
 * Exclusive borrow of a pooled handle. Returns it to the pool on drop,
 * unless `discard` was called.
 */
pub struct PooledHandle<'a, H> {
    pool: &'a ConnectionPool<H>,
    key: String,
    handle: Option<H>,
    reusable: bool,
}

impl<H> PooledHandle<'_, H> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Marks the handle as unusable; it is dropped instead of pooled.
    pub fn discard(&mut self) {
        self.reusable = false;
    }
}

impl<H> Deref for PooledHandle<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!("pooled handle used after release"),
        }
    }
}

impl<H> DerefMut for PooledHandle<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        match &mut self.handle {
            Some(handle) => handle,
            None => unreachable!("pooled handle used after release"),
        }
    }
}

impl<H> Drop for PooledHandle<'_, H> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.reusable {
            tracing::trace!(destination = %self.key, "Returned handle to pool");
            self.pool.release(std::mem::take(&mut self.key), handle);
        } else {
            tracing::trace!(destination = %self.key, "Discarded handle");
        }
    }
}
