use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;
use slotmap::Key;

use crate::error::{Result, TreeError};

/// Callback fired after an item entered or left a [`ChildList`].
pub type ListHook<K> = Arc<dyn Fn(K) + Send + Sync>;

struct Entries<K> {
    items: Vec<K>,
    /// Bumped on every structural change, lets sorted insertion detect
    /// concurrent edits made while keys were computed unlocked.
    revision: u64,
}

struct Hooks<K> {
    after_addition: Option<ListHook<K>>,
    after_removal: Option<ListHook<K>>,
}

impl<K> Default for Hooks<K> {
    fn default() -> Self {
        Self {
            after_addition: None,
            after_removal: None,
        }
    }
}

/// Ordered, thread-safe sequence of opaque handles.
///
/// Every instance owns a single lock that is held only for the structural
/// change itself. Hooks run after the lock is released, so a hook may call
/// back into the same list (query its length, insert, remove) without
/// deadlocking.
///
/// The null key of `K` is the absence value and is rejected with
/// [`TreeError::NilArgument`].
pub struct ChildList<K: Key> {
    entries: Mutex<Entries<K>>,
    hooks: Mutex<Hooks<K>>,
}

impl<K: Key> Default for ChildList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> fmt::Debug for ChildList<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("ChildList")
            .field("items", &entries.items)
            .field("revision", &entries.revision)
            .finish_non_exhaustive()
    }
}

impl<K: Key> ChildList<K> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries {
                items: Vec::new(),
                revision: 0,
            }),
            hooks: Mutex::new(Hooks::default()),
        }
    }

    /// Register the callback fired after every successful insertion.
    pub fn set_on_after_addition(
        &self,
        hook: impl Fn(K) + Send + Sync + 'static,
    ) {
        self.hooks.lock().after_addition = Some(Arc::new(hook));
    }

    /// Register the callback fired after every successful removal.
    pub fn set_on_after_removal(
        &self,
        hook: impl Fn(K) + Send + Sync + 'static,
    ) {
        self.hooks.lock().after_removal = Some(Arc::new(hook));
    }

    pub fn clear_hooks(&self) {
        *self.hooks.lock() = Hooks::default();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().items.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<K> {
        self.entries.lock().items.get(position).copied()
    }

    pub fn first(&self) -> Option<K> {
        self.get(0)
    }

    pub fn contains(&self, item: K) -> bool {
        self.index_of(item).is_some()
    }

    /// Copy of the current sequence.
    pub fn to_vec(&self) -> Vec<K> {
        self.entries.lock().items.clone()
    }

    /// Position of the first occurrence of `item`, if present.
    pub fn index_of(&self, item: K) -> Option<usize> {
        self.entries
            .lock()
            .items
            .iter()
            .position(|existing| *existing == item)
    }

    /// Add `item` at the end of the list.
    pub fn append(&self, item: K) -> Result<()> {
        if item.is_null() {
            return Err(TreeError::NilArgument);
        }

        let len = {
            let mut entries = self.entries.lock();
            entries.items.push(item);
            entries.revision += 1;
            entries.items.len()
        };
        trace!("child list append: {item:?}, len={len}");

        self.notify_addition(item);
        Ok(())
    }

    /// Insert `item` at `position`, shifting later items one slot back.
    ///
    /// `position == len()` behaves exactly like [`ChildList::append`].
    pub fn insert_at(&self, position: usize, item: K) -> Result<()> {
        if item.is_null() {
            return Err(TreeError::NilArgument);
        }

        {
            let mut entries = self.entries.lock();
            let len = entries.items.len();
            if position > len {
                return Err(TreeError::IndexOutOfBounds { position, len });
            }
            entries.items.insert(position, item);
            entries.revision += 1;
        }
        trace!("child list insert: {item:?} at {position}");

        self.notify_addition(item);
        Ok(())
    }

    /// Insert `item` before the first element whose key is greater than or
    /// equal to the key of `item`, or at the end if there is none.
    ///
    /// Equal keys keep the new item in front of the existing ones. Keys are
    /// computed without holding the lock; if the list changes meanwhile the
    /// scan starts over. Returns the position the item landed at.
    pub fn insert_sorted_by_key<T, F>(&self, item: K, key: F) -> Result<usize>
    where
        T: Ord,
        F: Fn(K) -> T,
    {
        if item.is_null() {
            return Err(TreeError::NilArgument);
        }

        let item_key = key(item);
        loop {
            let (snapshot, revision) = {
                let entries = self.entries.lock();
                (entries.items.clone(), entries.revision)
            };
            let position = snapshot
                .iter()
                .position(|existing| item_key <= key(*existing))
                .unwrap_or(snapshot.len());

            let mut entries = self.entries.lock();
            if entries.revision != revision {
                trace!("child list changed during sorted insert, rescanning");
                continue;
            }
            entries.items.insert(position, item);
            entries.revision += 1;
            drop(entries);

            trace!("child list sorted insert: {item:?} at {position}");
            self.notify_addition(item);
            return Ok(position);
        }
    }

    /// Remove and return the item at `position`.
    pub fn remove_at(&self, position: usize) -> Result<K> {
        let removed = {
            let mut entries = self.entries.lock();
            let len = entries.items.len();
            if position >= len {
                return Err(TreeError::IndexOutOfBounds { position, len });
            }
            entries.revision += 1;
            entries.items.remove(position)
        };
        trace!("child list remove: {removed:?} from {position}");

        self.notify_removal(removed);
        Ok(removed)
    }

    /// Remove the first occurrence of `item` and return it.
    pub fn remove(&self, item: K) -> Result<K> {
        if item.is_null() {
            return Err(TreeError::NilArgument);
        }

        let removed = {
            let mut entries = self.entries.lock();
            let position = entries
                .items
                .iter()
                .position(|existing| *existing == item)
                .ok_or(TreeError::NotFound)?;
            entries.revision += 1;
            entries.items.remove(position)
        };
        trace!("child list remove: {removed:?}");

        self.notify_removal(removed);
        Ok(removed)
    }

    /// Empty the list in one step and hand back what it held.
    ///
    /// Removal hooks are not fired; callers that drain are expected to emit
    /// their own notification.
    pub fn drain(&self) -> Vec<K> {
        let mut entries = self.entries.lock();
        if !entries.items.is_empty() {
            entries.revision += 1;
        }
        mem::take(&mut entries.items)
    }

    /// Drop every occurrence of the given items without firing hooks.
    /// Returns how many entries were removed.
    pub fn purge(&self, items: &HashSet<K>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.items.len();
        entries.items.retain(|existing| !items.contains(existing));
        let purged = before - entries.items.len();
        if purged > 0 {
            entries.revision += 1;
            trace!("child list purge: {purged} entries");
        }
        purged
    }

    fn notify_addition(&self, item: K) {
        let hook = self.hooks.lock().after_addition.clone();
        if let Some(hook) = hook {
            hook(item);
        }
    }

    fn notify_removal(&self, item: K) {
        let hook = self.hooks.lock().after_removal.clone();
        if let Some(hook) = hook {
            hook(item);
        }
    }
}
