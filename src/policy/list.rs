use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::crypto::KeyId;
use crate::transaction::{AssetId, TxOut};

struct PolicyState<S> {
    entries: BTreeSet<KeyId>,
    side: S,
}

/// Thread-safe ordered set of addresses subject to one policy, scoped to
/// a single asset.
///
/// The lock is reentrant so policy operations can call back into the list
/// they already hold. `S` carries per-policy side state (lookup maps and
/// the like) under the same lock as the entry set, so a policy update is
/// atomic across both.
pub struct PolicyList<S = ()> {
    asset: AssetId,
    inner: ReentrantMutex<RefCell<PolicyState<S>>>,
}

impl<S: Default> PolicyList<S> {
    pub fn new(asset: AssetId) -> Self {
        PolicyList {
            asset,
            inner: ReentrantMutex::new(RefCell::new(PolicyState {
                entries: BTreeSet::new(),
                side: S::default(),
            })),
        }
    }
}

impl<S> PolicyList<S> {
    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    // Outputs of other assets are invisible to this policy
    pub fn is_asset_relevant(&self, output: &TxOut) -> bool {
        output.asset == self.asset
    }

    pub fn lock(&self) -> PolicyGuard<'_, S> {
        PolicyGuard {
            guard: self.inner.lock(),
        }
    }

    pub fn add(&self, address: KeyId) -> bool {
        self.lock().add(address)
    }

    pub fn remove(&self, address: &KeyId) -> bool {
        self.lock().remove(address)
    }

    pub fn contains(&self, address: &KeyId) -> bool {
        self.lock().contains(address)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }

    /// Entries in ascending order.
    pub fn snapshot(&self) -> Vec<KeyId> {
        self.lock().snapshot()
    }

    /// Exchange entry sets with another list. Side state stays put.
    pub fn swap(&self, other: &PolicyList<S>) {
        if std::ptr::eq(self, other) {
            return;
        }

        // Lock in address order so concurrent swaps over the same pair
        // cannot deadlock
        let (first, second) = if (self as *const Self as usize) < (other as *const Self as usize)
        {
            (self, other)
        } else {
            (other, self)
        };
        let first_guard = first.inner.lock();
        let second_guard = second.inner.lock();
        std::mem::swap(
            &mut first_guard.borrow_mut().entries,
            &mut second_guard.borrow_mut().entries,
        );
    }
}

/// Holds the list's reentrant lock for the lifetime of a compound
/// operation. Each method borrows the state only for its own duration, so
/// nested calls through the same guard never conflict.
pub struct PolicyGuard<'a, S> {
    guard: ReentrantMutexGuard<'a, RefCell<PolicyState<S>>>,
}

impl<S> PolicyGuard<'_, S> {
    pub fn add(&self, address: KeyId) -> bool {
        self.guard.borrow_mut().entries.insert(address)
    }

    pub fn remove(&self, address: &KeyId) -> bool {
        self.guard.borrow_mut().entries.remove(address)
    }

    pub fn contains(&self, address: &KeyId) -> bool {
        self.guard.borrow().entries.contains(address)
    }

    pub fn len(&self) -> usize {
        self.guard.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.borrow().entries.is_empty()
    }

    pub fn clear(&self) {
        self.guard.borrow_mut().entries.clear()
    }

    pub fn snapshot(&self) -> Vec<KeyId> {
        self.guard.borrow().entries.iter().copied().collect()
    }

    pub fn side<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.guard.borrow().side)
    }

    pub fn side_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.guard.borrow_mut().side)
    }

    /// Mutate entries and side state together under one borrow.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BTreeSet<KeyId>, &mut S) -> R) -> R {
        let mut state = self.guard.borrow_mut();
        let state = &mut *state;
        f(&mut state.entries, &mut state.side)
    }
}
