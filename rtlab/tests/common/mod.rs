//! Host side stand-ins for the board.
#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use parking_lot::Mutex;
use rtlab::console::EmergencySerial;
use rtlab::transmit::DmaChannel;

/// An active low button. Clones share the line.
#[derive(Clone, Default)]
pub struct Button(Arc<Mutex<bool>>);

impl Button {
    pub fn press(&self) {
        *self.0.lock() = true;
    }

    pub fn release(&self) {
        *self.0.lock() = false;
    }
}

impl ErrorType for Button {
    type Error = Infallible;
}

impl InputPin for Button {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!*self.0.lock())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(*self.0.lock())
    }
}

#[derive(Debug, Default)]
pub struct Led(bool);

impl ErrorType for Led {
    type Error = Infallible;
}

impl OutputPin for Led {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0 = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0 = true;
        Ok(())
    }
}

impl StatefulOutputPin for Led {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0)
    }
}

/// Records every transfer it is asked to start. Clones share the record.
#[derive(Clone, Default)]
pub struct Dma {
    sent: Arc<Mutex<Vec<String>>>,
    refuse: Arc<AtomicBool>,
}

impl Dma {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }
}

impl DmaChannel for Dma {
    type Error = ();

    fn start(&mut self, bytes: &[u8]) -> Result<(), ()> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(());
        }

        self.sent
            .lock()
            .push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }
}

/// Collects what was written to the emergency console.
#[derive(Default)]
pub struct Console(Mutex<Vec<u8>>);

impl Console {
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl EmergencySerial for Console {
    fn write_byte(&self, byte: u8) {
        self.0.lock().push(byte);
    }
}
