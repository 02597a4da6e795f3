// SPDX-License-Identifier: GPL-3.0-only

//! Scoped "current GPU context" binding
//!
//! Every GPU-touching call binds its stage's context for the duration of the
//! call with [`ContextGuard::bind`]. The guard restores whatever was bound
//! before when it is dropped, so early returns and `?` leave the caller's
//! binding intact.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// Identity of one GPU context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Context bound on the calling thread, if any
pub fn current() -> Option<ContextId> {
    CURRENT.with(Cell::get)
}

/// Binding that lasts until dropped
///
/// Not `Send`: the binding belongs to the thread that made it.
#[must_use = "the context is unbound as soon as the guard is dropped"]
pub struct ContextGuard {
    bound: ContextId,
    previous: Option<ContextId>,
    _thread_bound: PhantomData<*const ()>,
}

impl ContextGuard {
    /// Make `id` current on this thread
    pub fn bind(id: ContextId) -> Self {
        let previous = CURRENT.with(|slot| slot.replace(Some(id)));
        if previous != Some(id) {
            trace!(context = id.0, previous = ?previous.map(|p| p.0), "Bound GPU context");
        }
        Self {
            bound: id,
            previous,
            _thread_bound: PhantomData,
        }
    }

    /// Context this guard bound
    pub fn context(&self) -> ContextId {
        self.bound
    }

    /// Context that will be restored on drop
    pub fn previous(&self) -> Option<ContextId> {
        self.previous
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT.with(|slot| slot.set(self.previous));
    }
}
