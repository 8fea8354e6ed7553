/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * Driver boundary: the state machine (closed -> opened -> ready) belongs
 * to the concrete driver, this module defines the contract plus a pure
 * in-process loopback driver for tests and demos.
*/
use crate::dispatch::{Callback, Dispatcher, ListenerHandle};
use crate::filter::CanFilterPtr;
use crate::frame::{CanFrame, CanHeader};
use log::{debug, warn};
use parking_lot::Mutex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum DriverState {
    #[default]
    Closed,
    Opened,
    Ready,
}

/// Driver status snapshot. `error_code` carries the OS errno of the last
/// device failure, `internal_error` a driver specific code translatable
/// through `DriverInterface::translate_error`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CanState {
    pub driver_state: DriverState,
    pub error_code: Option<i32>,
    pub internal_error: u32,
}

impl CanState {
    /// sends and receives are only expected to succeed when ready
    pub fn is_ready(&self) -> bool {
        self.driver_state == DriverState::Ready
    }
}

pub type FrameCallback = Callback<CanFrame>;
pub type StateCallback = Callback<CanState>;
pub type FrameListener = ListenerHandle<CanFrame>;
pub type StateListener = ListenerHandle<CanState>;

/// Frame side of the driver contract.
pub trait CommInterface {
    /// Hand a frame to the transport for sending. The boolean reports
    /// acceptance for transmission, not physical delivery.
    fn send(&self, frame: &CanFrame) -> bool;

    /// Listen to every received frame. Never fails; dropping the returned
    /// handle is the unsubscribe.
    fn subscribe(&self, callback: FrameCallback) -> FrameListener;

    /// Listen to frames passing `filter`.
    fn subscribe_filtered(&self, filter: CanFilterPtr, callback: FrameCallback) -> FrameListener;

    /// Listen to frames sharing `header`'s dispatch key.
    fn subscribe_header(&self, header: CanHeader, callback: FrameCallback) -> FrameListener;
}

/// State side of the driver contract.
pub trait StateInterface {
    fn state(&self) -> CanState;

    /// Listen to every state change.
    fn subscribe_state(&self, callback: StateCallback) -> StateListener;
}

/// Full contract a concrete bus driver implements.
pub trait DriverInterface: CommInterface + StateInterface {
    /// Open `device` and bring the driver to ready. `loopback` requests
    /// that own sent frames are delivered back to subscribers.
    fn init(&self, device: &str, loopback: bool) -> bool;

    /// Attempt to bring an errored driver back to ready.
    fn recover(&self) -> bool;

    /// Drive any state back to closed.
    fn shutdown(&self);

    /// Human readable text for a driver specific error code, when known.
    fn translate_error(&self, internal_error: u32) -> Option<String>;

    fn does_loopback(&self) -> bool;
}

/// Dispatch plumbing shared by driver implementations: the frame and
/// state registries plus the current state. Concrete drivers embed one
/// and feed it from their receive path.
#[derive(Default)]
pub struct DriverBase {
    frames: Dispatcher<CanFrame>,
    states: Dispatcher<CanState>,
    state: Mutex<CanState>,
}

impl DriverBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CanState {
        self.state.lock().clone()
    }

    /// Fan one received frame out to the matching subscribers.
    pub fn dispatch_frame(&self, frame: &CanFrame) {
        debug!("dispatch frame {frame}");
        self.frames.publish(frame);
    }

    /// Move the state machine and notify state listeners. A transition
    /// into `Ready` clears any pending error codes.
    pub fn set_driver_state(&self, driver_state: DriverState) {
        let state = {
            let mut state = self.state.lock();
            state.driver_state = driver_state;
            if driver_state == DriverState::Ready {
                state.error_code = None;
                state.internal_error = 0;
            }
            state.clone()
        };
        debug!("driver state {:?}", state.driver_state);
        self.states.publish(&state);
    }

    /// Record a device failure and notify state listeners.
    pub fn set_error(&self, error_code: i32, internal_error: u32) {
        let state = {
            let mut state = self.state.lock();
            state.error_code = Some(error_code);
            state.internal_error = internal_error;
            state.clone()
        };
        warn!("driver error errno:{error_code} internal:{internal_error}");
        self.states.publish(&state);
    }

    pub fn subscribe(&self, callback: FrameCallback) -> FrameListener {
        self.frames.subscribe(callback)
    }

    pub fn subscribe_filtered(
        &self,
        filter: CanFilterPtr,
        callback: FrameCallback,
    ) -> FrameListener {
        self.frames.subscribe_gated(Box::new(move |frame| filter.matches(frame)), callback)
    }

    pub fn subscribe_header(&self, header: CanHeader, callback: FrameCallback) -> FrameListener {
        let key = header.key();
        self.frames.subscribe_gated(Box::new(move |frame| frame.key() == key), callback)
    }

    pub fn subscribe_state(&self, callback: StateCallback) -> StateListener {
        self.states.subscribe(callback)
    }
}

/// In-process driver without any bus underneath. `send` succeeds once the
/// driver is ready and, with loopback enabled, republishes the frame to
/// the subscribers; `inject_frame` plays the role of the receive path.
#[derive(Default)]
pub struct LoopbackDriver {
    base: DriverBase,
    device: Mutex<Option<String>>,
    loopback: AtomicBool,
}

impl LoopbackDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate one frame arriving from the bus.
    pub fn inject_frame(&self, frame: &CanFrame) {
        self.base.dispatch_frame(frame);
    }

    /// Simulate a device failure, e.g. a bus-off condition.
    pub fn inject_error(&self, error_code: i32, internal_error: u32) {
        self.base.set_error(error_code, internal_error);
    }
}

impl CommInterface for LoopbackDriver {
    fn send(&self, frame: &CanFrame) -> bool {
        if !self.base.state().is_ready() {
            warn!("send rejected, driver not ready");
            return false;
        }
        if !frame.is_valid() {
            warn!("send rejected, invalid frame {frame}");
            return false;
        }
        if self.loopback.load(Ordering::Relaxed) {
            self.base.dispatch_frame(frame);
        }
        true
    }

    fn subscribe(&self, callback: FrameCallback) -> FrameListener {
        self.base.subscribe(callback)
    }

    fn subscribe_filtered(&self, filter: CanFilterPtr, callback: FrameCallback) -> FrameListener {
        self.base.subscribe_filtered(filter, callback)
    }

    fn subscribe_header(&self, header: CanHeader, callback: FrameCallback) -> FrameListener {
        self.base.subscribe_header(header, callback)
    }
}

impl StateInterface for LoopbackDriver {
    fn state(&self) -> CanState {
        self.base.state()
    }

    fn subscribe_state(&self, callback: StateCallback) -> StateListener {
        self.base.subscribe_state(callback)
    }
}

impl DriverInterface for LoopbackDriver {
    fn init(&self, device: &str, loopback: bool) -> bool {
        if device.is_empty() {
            warn!("init rejected, empty device name");
            return false;
        }
        *self.device.lock() = Some(device.to_string());
        self.loopback.store(loopback, Ordering::Relaxed);
        self.base.set_driver_state(DriverState::Opened);
        self.base.set_driver_state(DriverState::Ready);
        true
    }

    fn recover(&self) -> bool {
        if self.device.lock().is_none() {
            return false;
        }
        if self.base.state().driver_state == DriverState::Closed {
            return false;
        }
        self.base.set_driver_state(DriverState::Ready);
        true
    }

    fn shutdown(&self) {
        self.base.set_driver_state(DriverState::Closed);
    }

    fn translate_error(&self, internal_error: u32) -> Option<String> {
        match internal_error {
            0 => None,
            code => Some(format!("loopback internal error {code}")),
        }
    }

    fn does_loopback(&self) -> bool {
        self.loopback.load(Ordering::Relaxed)
    }
}
