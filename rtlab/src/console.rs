//! Synchronous, busy-waiting console output.
//!
//! Used for start-up banners and fatal messages, never while a DMA transfer owns the port.

use core::fmt;

/// A serial port written one byte at a time, synchronously.
///
/// The operation must block until the byte has left the transmitter, so everything written
/// before a fatal stop is actually visible.
pub trait EmergencySerial {
    /// Send one byte, waiting for the transmitter.
    fn write_byte(&self, byte: u8);

    /// Send every byte of `msg` in order.
    fn write_str(&self, msg: &str) {
        for byte in msg.bytes() {
            self.write_byte(byte);
        }
    }
}

impl<S: EmergencySerial + ?Sized> EmergencySerial for &S {
    fn write_byte(&self, byte: u8) {
        (**self).write_byte(byte)
    }
}

/// Write a debug message.
pub fn debug_msg<S: EmergencySerial + ?Sized>(serial: &S, msg: &str) {
    serial.write_str(msg);
}

/// Write a formatted message.
pub fn debug_fmt<S: EmergencySerial + ?Sized>(serial: &S, args: fmt::Arguments<'_>) {
    // `Writer` never fails.
    let _ = fmt::write(&mut Writer(serial), args);
}

/// Report an unrecoverable error and hand it back for the caller to return.
pub fn fatal<S, E>(serial: &S, err: E) -> E
where
    S: EmergencySerial + ?Sized,
    E: fmt::Display,
{
    error!("fatal error");
    debug_fmt(serial, format_args!("{err}"));
    err
}

/// [`fmt::Write`] on top of an [`EmergencySerial`].
pub struct Writer<'a, S: ?Sized>(pub &'a S);

impl<S: EmergencySerial + ?Sized> fmt::Write for Writer<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}
