//! Button debouncing, event routing and DMA paced console output for interrupt driven labs.
//!
//! Edge interrupts arm a [`debounce::DebounceTimer`]; its task confirms a press once the line
//! was quiet for the debounce period and hands an [`event::InputEvent`] to a queue or an event
//! group. [`worker::Worker`]s turn events into LED [`action::Action`]s and report every change
//! through the shared [`transmit::Transmitter`]. [`labs`] wires complete exercises out of these
//! pieces.
//!
//! Time comes from any [`rtlab_time::Monotonic`]; the synchronization primitives are those of
//! [`rtlab_sync`].

#![no_std]
#![deny(missing_docs)]
#![allow(async_fn_in_trait)]

#[macro_use]
mod fmt;

pub mod action;
pub mod config;
pub mod console;
pub mod debounce;
pub mod error;
pub mod event;
pub mod labs;
pub mod transmit;
pub mod worker;

pub use rtlab_sync;
pub use rtlab_time;

#[cfg(test)]
#[macro_use]
extern crate std;
