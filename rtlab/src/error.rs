//! Error types.
//!
//! `Display` renders the message printed on the emergency console, `\r\n` included.

use core::fmt;

use crate::event::SourceId;

/// A one-shot resource could not be claimed while wiring a lab up.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The event queue was already split, the lab was initialized twice.
    QueueAlreadySplit,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::QueueAlreadySplit => f.write_str("cannot create tenQueue \r\n"),
        }
    }
}

impl From<rtlab_sync::queue::AlreadySplit> for InitError {
    fn from(_: rtlab_sync::queue::AlreadySplit) -> Self {
        InitError::QueueAlreadySplit
    }
}

/// A debounce task could not deliver a confirmed press.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceError {
    /// The event channel stayed full for the whole send timeout.
    ChannelSaturated {
        /// Button whose press was lost.
        source: SourceId,
    },
}

impl fmt::Display for DebounceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebounceError::ChannelSaturated { source } => {
                write!(f, "cannot send btn{source} to queue \r\n")
            }
        }
    }
}

/// How a DMA transfer ended badly.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// The controller reported a bus error.
    Error,
    /// The transfer was aborted.
    Aborted,
}

/// Failure of [`Transmitter::transmit`](crate::transmit::Transmitter::transmit).
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitError {
    /// The formatted text does not fit the transmit buffer.
    Overflow,
    /// The DMA channel refused to start.
    Start,
    /// The transfer failed, after all retries.
    Transfer(TransferError),
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmitError::Overflow => f.write_str("message does not fit the tx buffer \r\n"),
            TransmitError::Start => f.write_str("cannot start dma transfer \r\n"),
            TransmitError::Transfer(TransferError::Error) => {
                f.write_str("dma transfer error \r\n")
            }
            TransmitError::Transfer(TransferError::Aborted) => {
                f.write_str("dma transfer aborted \r\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::String;

    fn render(err: impl fmt::Display) -> String<64> {
        let mut out = String::new();
        fmt::write(&mut out, format_args!("{err}")).unwrap();
        out
    }

    #[test]
    fn console_messages() {
        assert_eq!(
            render(DebounceError::ChannelSaturated {
                source: SourceId(2)
            }),
            "cannot send btn2 to queue \r\n"
        );
        assert_eq!(
            render(InitError::QueueAlreadySplit),
            "cannot create tenQueue \r\n"
        );
    }
}
