//! Responses of a worker to a press.

use embedded_hal::digital::StatefulOutputPin;

use crate::event::SourceId;

/// What to do with the LEDs when a button is pressed.
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Toggle one LED.
    Toggle(u8),
    /// Drive one LED high.
    Set(u8),
    /// Drive one LED low.
    Clear(u8),
    /// Toggle every LED whose bit is set.
    ToggleMask(u32),
    /// Leave the LEDs alone.
    #[default]
    None,
}

/// A row of LEDs addressed by index.
pub trait LedBank {
    /// Number of LEDs.
    fn len(&self) -> usize;

    /// `true` if there are no LEDs.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invert LED `idx`. Out of range indexes are ignored.
    fn toggle(&mut self, idx: usize);

    /// Switch LED `idx` to `on`. Out of range indexes are ignored.
    fn set(&mut self, idx: usize, on: bool);

    /// Whether LED `idx` is on.
    fn is_on(&mut self, idx: usize) -> Option<bool>;
}

impl<P: StatefulOutputPin, const N: usize> LedBank for [P; N] {
    fn len(&self) -> usize {
        N
    }

    fn toggle(&mut self, idx: usize) {
        if let Some(pin) = self.get_mut(idx) {
            if pin.toggle().is_err() {
                warn!("led {} toggle failed", idx);
            }
        }
    }

    fn set(&mut self, idx: usize, on: bool) {
        if let Some(pin) = self.get_mut(idx) {
            let res = if on { pin.set_high() } else { pin.set_low() };
            if res.is_err() {
                warn!("led {} write failed", idx);
            }
        }
    }

    fn is_on(&mut self, idx: usize) -> Option<bool> {
        self.get_mut(idx)?.is_set_high().ok()
    }
}

impl Action {
    /// Apply the action to `leds`.
    pub fn apply<L: LedBank + ?Sized>(&self, leds: &mut L) {
        match *self {
            Action::Toggle(idx) => leds.toggle(idx as usize),
            Action::Set(idx) => leds.set(idx as usize, true),
            Action::Clear(idx) => leds.set(idx as usize, false),
            Action::ToggleMask(mask) => {
                for idx in 0..leds.len().min(32) {
                    if mask & (1 << idx) != 0 {
                        leds.toggle(idx);
                    }
                }
            }
            Action::None => {}
        }
    }
}

/// Maps button `n` to the `n`-th action. Constant time lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable<const N: usize> {
    actions: [Action; N],
}

impl<const N: usize> ActionTable<N> {
    /// Button `n` runs `actions[n - 1]`.
    pub const fn new(actions: [Action; N]) -> Self {
        Self { actions }
    }

    /// The action of `source`, [`Action::None`] for unknown sources.
    pub fn lookup(&self, source: SourceId) -> Action {
        source
            .index()
            .and_then(|idx| self.actions.get(idx))
            .copied()
            .unwrap_or_default()
    }

    /// Look up the action of `source` and apply it to `leds`.
    pub fn dispatch<L: LedBank + ?Sized>(&self, source: SourceId, leds: &mut L) -> Action {
        let action = self.lookup(source);
        action.apply(leds);
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorType, OutputPin};

    #[derive(Default)]
    struct Led(bool);

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

    #[test]
    fn dispatch_by_button_number() {
        let table = ActionTable::new([Action::Toggle(0), Action::Set(1), Action::ToggleMask(0b101)]);
        let mut leds: [Led; 3] = Default::default();

        assert_eq!(table.dispatch(SourceId(1), &mut leds), Action::Toggle(0));
        assert_eq!(leds.is_on(0), Some(true));

        table.dispatch(SourceId(2), &mut leds);
        table.dispatch(SourceId(3), &mut leds);
        assert_eq!(leds.is_on(0), Some(false));
        assert_eq!(leds.is_on(1), Some(true));
        assert_eq!(leds.is_on(2), Some(true));
    }

    #[test]
    fn unknown_sources_do_nothing() {
        let table = ActionTable::new([Action::Clear(0)]);
        let mut leds: [Led; 1] = [Led(true)];

        assert_eq!(table.dispatch(SourceId(0), &mut leds), Action::None);
        assert_eq!(table.dispatch(SourceId(7), &mut leds), Action::None);
        assert_eq!(leds.is_on(0), Some(true));
        assert_eq!(leds.is_on(3), None);
    }
}
