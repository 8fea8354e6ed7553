/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * Subscription registry with revocable listener handles. The registry
 * only keeps weak references: dropping the handle is the unsubscribe.
*/
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

pub type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;
pub type Gate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// One registered listener. The callback sits behind its own mutex so a
/// handle drop can revoke it even while a publish is in flight.
struct ListenerSlot<T> {
    callback: Mutex<Option<Callback<T>>>,
    gate: Option<Gate<T>>,
}

impl<T> ListenerSlot<T> {
    fn deliver(&self, value: &T) {
        if let Some(gate) = &self.gate {
            if !gate(value) {
                return;
            }
        }
        let callback = self.callback.lock();
        if let Some(callback) = callback.as_ref() {
            callback(value);
        }
    }
}

/// Owning handle of one subscription. Dropping it revokes the callback:
/// once `drop` returns the listener receives zero further deliveries, a
/// delivery already executing is waited out first.
///
/// A callback must not drop its own handle, that would deadlock on the
/// slot lock it is running under.
pub struct ListenerHandle<T> {
    slot: Arc<ListenerSlot<T>>,
}

impl<T> Drop for ListenerHandle<T> {
    fn drop(&mut self) {
        self.slot.callback.lock().take();
    }
}

/// Fan-out registry: any number of producers may publish while consumers
/// subscribe and drop handles concurrently.
pub struct Dispatcher<T> {
    slots: Mutex<Vec<Weak<ListenerSlot<T>>>>,
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Dispatcher<T> {
    pub fn new() -> Self {
        Dispatcher { slots: Mutex::new(Vec::new()) }
    }

    /// Register a listener for every published value. Never fails.
    pub fn subscribe(&self, callback: Callback<T>) -> ListenerHandle<T> {
        self.register(callback, None)
    }

    /// Register a listener gated by a predicate evaluated per value.
    pub fn subscribe_gated(&self, gate: Gate<T>, callback: Callback<T>) -> ListenerHandle<T> {
        self.register(callback, Some(gate))
    }

    fn register(&self, callback: Callback<T>, gate: Option<Gate<T>>) -> ListenerHandle<T> {
        let slot = Arc::new(ListenerSlot { callback: Mutex::new(Some(callback)), gate });
        self.slots.lock().push(Arc::downgrade(&slot));
        ListenerHandle { slot }
    }

    /// Deliver `value` to every live, matching listener, exactly once each.
    /// Stale registrations are pruned on the way. Callbacks run outside the
    /// registry lock so they may subscribe further listeners.
    pub fn publish(&self, value: &T) {
        let live: Vec<Arc<ListenerSlot<T>>> = {
            let mut slots = self.slots.lock();
            slots.retain(|slot| slot.strong_count() > 0);
            slots.iter().filter_map(Weak::upgrade).collect()
        };

        for slot in live {
            slot.deliver(value);
        }
    }

    /// Number of live registrations (stale entries not yet pruned excluded).
    pub fn listener_count(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.strong_count() > 0).count()
    }
}
