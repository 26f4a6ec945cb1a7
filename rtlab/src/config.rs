//! Compile time configuration shared by the labs.

/// Quiet period a button has to hold before a press is accepted.
pub const DEBOUNCE_PERIOD_MS: u32 = 50;

/// How long a debounce task may wait for room in a full queue before giving up.
pub const SEND_TIMEOUT_MS: u32 = 20;

/// Capacity of the button event queue.
pub const QUEUE_LENGTH: usize = 6;

/// Size of the shared transmit buffer.
pub const TX_BUFFER_SIZE: usize = 150;

/// Maximum length of the free text attached to an event.
pub const MSG_LEN: usize = 50;

/// Which level of an input line means "pressed".
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveLevel {
    /// Pressed pulls the line low; the buttons of the lab boards.
    #[default]
    Low,
    /// Pressed drives the line high.
    High,
}

/// Settings of one debounce task.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Quiet period in milliseconds.
    pub period_ms: u32,
    /// Bound on the wait for room in the event channel, in milliseconds.
    pub send_timeout_ms: u32,
    /// Level of a pressed input.
    pub active: ActiveLevel,
}

impl DebounceConfig {
    /// The lab defaults: 50 ms window, 20 ms send timeout, active low.
    pub const fn new() -> Self {
        Self {
            period_ms: DEBOUNCE_PERIOD_MS,
            send_timeout_ms: SEND_TIMEOUT_MS,
            active: ActiveLevel::Low,
        }
    }

    /// Use a different quiet period.
    pub const fn period_ms(mut self, period_ms: u32) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Use a different send timeout.
    pub const fn send_timeout_ms(mut self, send_timeout_ms: u32) -> Self {
        self.send_timeout_ms = send_timeout_ms;
        self
    }

    /// Use a different active level.
    pub const fn active(mut self, active: ActiveLevel) -> Self {
        self.active = active;
        self
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What the completion notifier does when a transfer fails.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Only record the failure. The transmitting task stays blocked until a later completion.
    #[default]
    Hold,
    /// Record the failure and wake the transmitting task with it.
    Release,
}

/// Settings of a [`Transmitter`](crate::transmit::Transmitter).
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitConfig {
    /// Handling of error and abort events.
    pub policy: ErrorPolicy,
    /// How many times a failed transfer is issued again before giving up. Only used with
    /// [`ErrorPolicy::Release`].
    pub retries: u8,
}

impl TransmitConfig {
    /// Hold on error, no retries.
    pub const fn new() -> Self {
        Self {
            policy: ErrorPolicy::Hold,
            retries: 0,
        }
    }

    /// Use a different error policy.
    pub const fn policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Retry failed transfers up to `retries` times.
    pub const fn retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self::new()
    }
}
