//! Change listeners
//!
//! Listeners live in a fixed-size slab guarded by a blocking mutex. Each
//! registration is addressed by `(index, generation)`, so a stale handle can
//! never remove a slot that has since been reused. Notification and removal
//! both run under the same mutex: once a [`ListenerHandle`] has been dropped,
//! its wakeup is never signalled again.

use alloc::sync::Arc;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use super::params::ParamSet;

/// Maximum number of listeners attached to one registry at a time
pub const MAX_LISTENERS: usize = 32;

/// Binary wait primitive used to wake a worker
///
/// `signal(())` releases it, `wait().await` acquires it and `try_take()`
/// acquires it without blocking.
pub type Wakeup = Signal<CriticalSectionRawMutex, ()>;

struct Entry {
    params: ParamSet,
    wakeup: Arc<Wakeup>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListenerKey {
    index: usize,
    generation: u32,
}

struct Slab {
    slots: [Slot; MAX_LISTENERS],
    attached: usize,
}

impl Slab {
    fn insert(&mut self, params: ParamSet, wakeup: Arc<Wakeup>) -> Option<ListenerKey> {
        let index = self.slots.iter().position(|slot| slot.entry.is_none())?;
        let slot = &mut self.slots[index];
        slot.entry = Some(Entry { params, wakeup });
        self.attached += 1;

        Some(ListenerKey {
            index,
            generation: slot.generation,
        })
    }

    fn remove(&mut self, key: ListenerKey) -> bool {
        let Some(slot) = self.slots.get_mut(key.index) else {
            return false;
        };
        if slot.generation != key.generation || slot.entry.is_none() {
            return false;
        }

        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.attached -= 1;
        true
    }
}

/// A set of listeners, each waiting on a subset of parameters
pub struct Listeners {
    slab: Mutex<CriticalSectionRawMutex, RefCell<Slab>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self {
            slab: Mutex::new(RefCell::new(Slab {
                slots: core::array::from_fn(|_| Slot::default()),
                attached: 0,
            })),
        }
    }

    /// Register `wakeup` to be signalled when any parameter in `params` changes
    ///
    /// Returns `None` when all `MAX_LISTENERS` slots are taken.
    pub fn attach(&self, params: ParamSet, wakeup: Arc<Wakeup>) -> Option<ListenerHandle<'_>> {
        let key = self
            .slab
            .lock(|slab| slab.borrow_mut().insert(params, wakeup));

        match key {
            Some(key) => Some(ListenerHandle {
                listeners: self,
                key,
            }),
            None => {
                warn!("Listener slab full ({} entries)", MAX_LISTENERS);
                None
            }
        }
    }

    /// Signal every listener interested in any parameter of `changed`
    pub fn notify(&self, changed: ParamSet) {
        if changed.is_empty() {
            return;
        }

        self.slab.lock(|slab| {
            for entry in slab.borrow().slots.iter().filter_map(|s| s.entry.as_ref()) {
                if entry.params.intersects(changed) {
                    entry.wakeup.signal(());
                }
            }
        });
    }

    /// Number of attached listeners
    pub fn attached(&self) -> usize {
        self.slab.lock(|slab| slab.borrow().attached)
    }

    fn detach(&self, key: ListenerKey) {
        let removed = self.slab.lock(|slab| slab.borrow_mut().remove(key));
        debug_assert!(removed, "listener detached twice");
    }
}

impl Default for Listeners {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration token returned by [`Listeners::attach`]
///
/// Dropping the handle deregisters the listener.
#[must_use = "dropping the handle detaches the listener"]
pub struct ListenerHandle<'a> {
    listeners: &'a Listeners,
    key: ListenerKey,
}

impl Drop for ListenerHandle<'_> {
    fn drop(&mut self) {
        self.listeners.detach(self.key);
    }
}

impl core::fmt::Debug for ListenerHandle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("index", &self.key.index)
            .field("generation", &self.key.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wakeup() -> Arc<Wakeup> {
        Arc::new(Wakeup::new())
    }

    #[test]
    fn test_notify_matching_listener() {
        let listeners = Listeners::new();
        let a = wakeup();
        let b = wakeup();
        let _ha = listeners.attach(ParamSet::single(0), a.clone()).unwrap();
        let _hb = listeners.attach(ParamSet::single(1), b.clone()).unwrap();

        listeners.notify(ParamSet::single(0));

        assert!(a.try_take().is_some());
        assert!(b.try_take().is_none());
    }

    #[test]
    fn test_detached_listener_is_not_notified() {
        let listeners = Listeners::new();
        let a = wakeup();
        let handle = listeners.attach(ParamSet::ALL, a.clone()).unwrap();
        drop(handle);

        listeners.notify(ParamSet::ALL);
        assert!(a.try_take().is_none());
        assert_eq!(listeners.attached(), 0);
    }

    #[test]
    fn test_capacity_and_reuse() {
        let listeners = Listeners::new();
        let mut handles = Vec::new();
        for _ in 0..MAX_LISTENERS {
            handles.push(listeners.attach(ParamSet::ALL, wakeup()).unwrap());
        }
        assert!(listeners.attach(ParamSet::ALL, wakeup()).is_none());

        handles.pop();
        let again = listeners.attach(ParamSet::ALL, wakeup());
        assert!(again.is_some());
        assert_eq!(listeners.attached(), MAX_LISTENERS);
    }

    #[test]
    fn test_stale_key_does_not_remove_new_registration() {
        let listeners = Listeners::new();
        let first = listeners.attach(ParamSet::ALL, wakeup()).unwrap();
        let stale = first.key;
        drop(first);

        let w = wakeup();
        let _second = listeners.attach(ParamSet::ALL, w.clone()).unwrap();
        let removed = listeners.slab.lock(|slab| slab.borrow_mut().remove(stale));
        assert!(!removed);

        listeners.notify(ParamSet::ALL);
        assert!(w.try_take().is_some());
    }
}
