// Licensed under the Apache-2.0 license

//! Bus ownership arbitration between controller handles.
//!
//! Several controller handles can drive the same physical bus, each with
//! its own preferred clock. The arbiter tracks which handle programmed
//! the shared timing registers last, so a handle only reprograms them
//! when it takes over from another one.

use core::cell::Cell;

use critical_section::Mutex;

use crate::i2c::traits::I2cHardwareCore;

/// Identity of one controller handle, unique per physical bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HandleId(pub u8);

/// Owner registry for one physical bus (or bus family).
///
/// Usable as a `static`; all state sits behind a critical section.
pub struct BusArbiter {
    owner: Mutex<Cell<Option<HandleId>>>,
}

impl BusArbiter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner: Mutex::new(Cell::new(None)),
        }
    }

    #[must_use]
    pub fn owner(&self) -> Option<HandleId> {
        critical_section::with(|cs| self.owner.borrow(cs).get())
    }

    /// Claim the bus for `id` before a transfer.
    ///
    /// Timing is reprogrammed only when ownership actually changes;
    /// returns the programmed frequency in that case. The critical
    /// section covers the decision and the timing program, never the
    /// transfer that follows.
    pub fn acquire<H: I2cHardwareCore>(&self, id: HandleId, hz: u32, hw: &mut H) -> Option<u32> {
        critical_section::with(|cs| {
            let owner = self.owner.borrow(cs);
            if owner.get() == Some(id) {
                return None;
            }
            owner.set(Some(id));
            Some(hw.configure_timing(hz))
        })
    }

    /// Program a new frequency for `id`, unconditionally.
    ///
    /// Reprogramming makes `id` the owner even if it already was; returns
    /// the frequency the hardware achieved.
    pub fn set_frequency<H: I2cHardwareCore>(&self, id: HandleId, hz: u32, hw: &mut H) -> u32 {
        critical_section::with(|cs| {
            self.owner.borrow(cs).set(Some(id));
            hw.configure_timing(hz)
        })
    }

    /// Forget ownership if `id` currently holds it. Called on teardown.
    pub fn release(&self, id: HandleId) {
        critical_section::with(|cs| {
            let owner = self.owner.borrow(cs);
            if owner.get() == Some(id) {
                owner.set(None);
            }
        });
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new()
    }
}
