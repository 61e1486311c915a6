// Licensed under the Apache-2.0 license

//! I2C driver module.
//!
//! Portable controller and responder state machines over the
//! register-interface traits in [`traits`], designed for bare-metal and
//! `no_std` environments. Hardware bindings implement the traits; the
//! engines, arbitration, recovery and timeout policy live here.

pub mod arbiter;
pub mod common;
pub mod controller;
pub mod recovery;
pub mod registry;
pub mod sequencer;
pub mod slave;
pub mod timeout;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use arbiter::{BusArbiter, HandleId};
pub use common::{
    closest_supported, Capabilities, Event, I2cConfig, I2cConfigBuilder, I2cStatus, Mode,
    SlaveStatus,
};
pub use controller::{I2cBus, TransferEvent, TransferHandler};
pub use recovery::{recover, RecoveryError};
pub use registry::{HandleRegistry, RegistryError};
pub use sequencer::FrameTag;
pub use slave::I2cSlaveDevice;
pub use traits::{
    AddressMatch, Cause, Fault, I2cHardwareCore, I2cMasterHardware, I2cSlaveHardware, IrqPriority,
    NoPower, PowerManager,
};
