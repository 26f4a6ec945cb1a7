//! Synchronization primitives for handing work from interrupt handlers to async tasks.
//!
//! * [`queue::EventQueue`]: bounded FIFO, filled from interrupts, drained by a task.
//! * [`event_group::EventGroup`]: 32 flags with any/all waits and a barrier.
//! * [`serializer::Serializer`]: FIFO mutex around a shared output resource.
//! * [`gate::CompletionGate`]: binary semaphore given by a completion interrupt.
//!
//! Everything is `const` constructible so it can live in a `static`.

#![no_std]
#![deny(missing_docs)]

pub mod event_group;
pub mod gate;
pub mod queue;
pub mod serializer;

pub use portable_atomic;

#[cfg(test)]
#[macro_use]
extern crate std;
