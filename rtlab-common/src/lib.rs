//! Building blocks shared by the rtlab synchronization primitives.
//!
//! Everything in here is `no_std`, allocation free and guarded by short
//! [`critical_section`]s, so it may be touched from interrupt handlers as well as from tasks.

#![no_std]
#![deny(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod dropper;
pub mod wait_list;
pub mod waker_registration;
