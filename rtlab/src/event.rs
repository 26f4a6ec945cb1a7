//! Validated input events.

use heapless::String;

use crate::config::MSG_LEN;

/// Identifies an input line. Buttons are numbered from 1.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u8);

impl SourceId {
    /// Zero based position, for indexing tables.
    pub const fn index(self) -> Option<usize> {
        match self.0 {
            0 => None,
            n => Some(n as usize - 1),
        }
    }
}

impl core::fmt::Display for SourceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extra data carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// Nothing.
    #[default]
    None,
    /// A fixed label, such as the colour of the LED a button drives.
    Label(&'static str),
    /// A fixed label plus the message of the button that sent it.
    Tagged {
        /// Label, as for [`Payload::Label`].
        label: &'static str,
        /// The button's message.
        msg: &'static str,
    },
    /// Free text.
    Text(String<MSG_LEN>),
}

impl Payload {
    /// The payload as text, empty for [`Payload::None`]. For [`Payload::Tagged`] this is the
    /// label.
    pub fn as_str(&self) -> &str {
        match self {
            Payload::None => "",
            Payload::Label(label) | Payload::Tagged { label, .. } => label,
            Payload::Text(text) => text.as_str(),
        }
    }

    /// The message of a [`Payload::Tagged`].
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Payload::Tagged { msg, .. } => Some(*msg),
            _ => None,
        }
    }
}

#[cfg(feature = "defmt-03")]
impl defmt::Format for Payload {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// A press that survived debouncing.
///
/// Created once by a debounce task, moved through the event channel and consumed by exactly one
/// worker.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    /// Where the press came from.
    pub source: SourceId,
    /// `true` if the line was still asserted when the quiet period ended.
    pub pressed: bool,
    /// Data attached by the producer.
    pub payload: Payload,
}

impl InputEvent {
    /// A confirmed press of `source`.
    pub const fn pressed(source: SourceId, payload: Payload) -> Self {
        Self {
            source,
            pressed: true,
            payload,
        }
    }
}
