// Licensed under the Apache-2.0 license

//! Portable I2C bus-controller kit: transaction sequencing, blocking and
//! interrupt-driven master engines, bus ownership arbitration, bus recovery
//! and a slave responder, all over a mockable register-interface seam.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), no_std)]
pub mod common;
pub mod i2c;
