// Licensed under the Apache-2.0 license

//! Routing table from hardware instance numbers to controller handles.
//!
//! Interrupt entry points only know which peripheral instance fired; this
//! arena maps that index to the [`HandleId`] whose state machine must run.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::i2c::arbiter::HandleId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Instance index beyond the arena capacity.
    OutOfRange,
    /// The instance already has a registered handle.
    SlotTaken,
}

/// Fixed-capacity instance table, usable as a `static`.
pub struct HandleRegistry<const N: usize> {
    slots: Mutex<RefCell<[Option<HandleId>; N]>>,
}

impl<const N: usize> HandleRegistry<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([None; N])),
        }
    }

    /// Bind `instance` to `id`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::OutOfRange`] for an index beyond the capacity,
    /// [`RegistryError::SlotTaken`] if the slot is already bound.
    pub fn register(&self, instance: usize, id: HandleId) -> Result<(), RegistryError> {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            let slot = slots.get_mut(instance).ok_or(RegistryError::OutOfRange)?;
            if slot.is_some() {
                return Err(RegistryError::SlotTaken);
            }
            *slot = Some(id);
            Ok(())
        })
    }

    #[must_use]
    pub fn lookup(&self, instance: usize) -> Option<HandleId> {
        critical_section::with(|cs| self.slots.borrow_ref(cs).get(instance).copied().flatten())
    }

    /// Unbind `instance`, returning whichever handle held it.
    pub fn unregister(&self, instance: usize) -> Option<HandleId> {
        critical_section::with(|cs| {
            self.slots
                .borrow_ref_mut(cs)
                .get_mut(instance)
                .and_then(Option::take)
        })
    }
}

impl<const N: usize> Default for HandleRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
