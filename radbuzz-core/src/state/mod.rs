//! Shared application state
//!
//! One [`ApplicationState`] is constructed by the application and passed by
//! reference to every producer and consumer. It offers:
//!
//! - [`ReadOnlyHandle`]: `get` any parameter
//! - [`ReadWriteHandle`]: `get` and `set`; unchanged writes are dropped
//! - [`PartialSnapshot`]: batched writes to a declared subset, committed on drop
//! - [`ApplicationState::attach_listener`]: wake a worker when parameters change
//!
//! Values are installed under one internal mutex, and listeners are signalled
//! only after the mutex has been released with the new value in place.

pub mod listener;
pub mod params;
pub mod types;

use alloc::sync::Arc;
use core::cell::RefCell;
use core::marker::PhantomData;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

pub use listener::{ListenerHandle, Listeners, Wakeup, MAX_LISTENERS};
pub use params::*;
pub use types::{GpsData, GpsPosition};

/// Process-wide set of application parameters
pub struct ApplicationState {
    values: Mutex<CriticalSectionRawMutex, RefCell<Values>>,
    listeners: Listeners,
}

impl ApplicationState {
    /// Create a state with every parameter at its default
    pub fn new() -> Self {
        Self {
            values: Mutex::new(RefCell::new(Values::default())),
            listeners: Listeners::new(),
        }
    }

    /// Read-only access to the global values
    pub fn checkout_readonly(&self) -> ReadOnlyHandle<'_> {
        ReadOnlyHandle { state: self }
    }

    /// Read-write access to the global values
    pub fn checkout_read_write(&self) -> ReadWriteHandle<'_> {
        ReadWriteHandle { state: self }
    }

    /// Local copy of the parameters in `L`, written back when dropped
    pub fn checkout_partial_snapshot<L: ParamList>(&self) -> PartialSnapshot<'_, L> {
        let local = self.values.lock(|values| values.borrow().clone());

        PartialSnapshot {
            state: self,
            local,
            in_set: L::set(),
            changed: ParamSet::EMPTY,
            _list: PhantomData,
        }
    }

    /// Signal `wakeup` whenever any parameter in `L` changes
    ///
    /// Returns `None` if the listener slab is full.
    pub fn attach_listener<L: ParamList>(&self, wakeup: Arc<Wakeup>) -> Option<ListenerHandle<'_>> {
        self.listeners.attach(L::set(), wakeup)
    }

    fn get<P: Parameter>(&self) -> P::Output {
        self.values.lock(|values| P::get(&values.borrow()))
    }

    fn set<P: Parameter>(&self, value: P::Value) {
        let changed = self.values.lock(|values| {
            let mut values = values.borrow_mut();
            if !P::differs(&values, &value) {
                return false;
            }
            P::put(&mut values, value);
            true
        });

        if changed {
            trace!("state: {} changed", P::NAME);
            self.listeners.notify(ParamSet::single(P::INDEX));
        }
    }

    fn commit(&self, local: &Values, set: ParamSet) {
        let changed = self
            .values
            .lock(|values| values.borrow_mut().merge_from(local, set));
        self.listeners.notify(changed);
    }
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only accessor to the global state
#[derive(Clone, Copy)]
pub struct ReadOnlyHandle<'a> {
    state: &'a ApplicationState,
}

impl ReadOnlyHandle<'_> {
    /// Current value of `P`
    pub fn get<P: Parameter>(&self) -> P::Output {
        self.state.get::<P>()
    }
}

/// Read-write accessor to the global state
#[derive(Clone, Copy)]
pub struct ReadWriteHandle<'a> {
    state: &'a ApplicationState,
}

impl ReadWriteHandle<'_> {
    /// Current value of `P`
    pub fn get<P: Parameter>(&self) -> P::Output {
        self.state.get::<P>()
    }

    /// Install `value` for `P` and notify its listeners
    ///
    /// Writing the current value is a no-op.
    pub fn set<P: Parameter>(&self, value: P::Value) {
        self.state.set::<P>(value);
    }
}

/// Batched view over the parameters in `L`
///
/// Reads of parameters in `L` come from the local copy taken at checkout;
/// other reads and writes go straight to the global state. Changed
/// parameters are written back together when the snapshot is dropped, with
/// one notification per parameter.
pub struct PartialSnapshot<'a, L: ParamList> {
    state: &'a ApplicationState,
    local: Values,
    in_set: ParamSet,
    changed: ParamSet,
    _list: PhantomData<L>,
}

impl<L: ParamList> PartialSnapshot<'_, L> {
    pub fn get<P: Parameter>(&self) -> P::Output {
        if self.in_set.contains(P::INDEX) {
            P::get(&self.local)
        } else {
            self.state.get::<P>()
        }
    }

    pub fn set<P: Parameter>(&mut self, value: P::Value) {
        if !self.in_set.contains(P::INDEX) {
            self.state.set::<P>(value);
            return;
        }

        if P::differs(&self.local, &value) {
            P::put(&mut self.local, value);
            self.changed.insert(P::INDEX);
        }
    }
}

impl<L: ParamList> Drop for PartialSnapshot<'_, L> {
    fn drop(&mut self) {
        if !self.changed.is_empty() {
            self.state.commit(&self.local, self.changed);
        }
    }
}
