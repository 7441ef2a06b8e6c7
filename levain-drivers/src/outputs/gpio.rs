//! GPIO output bank
//!
//! Drives the four machine outputs from `embedded-hal` pins, directly or
//! via SSRs and relay boards. Each pin can be active-high or active-low.

use embedded_hal::digital::OutputPin;
use levain_core::outputs::OutputState;
use levain_core::traits::{Output, OutputBank};

/// Pin polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Output ON = pin HIGH
    #[default]
    ActiveHigh,
    /// Output ON = pin LOW (common on relay boards)
    ActiveLow,
}

impl Polarity {
    const fn level(self, on: bool) -> bool {
        match self {
            Polarity::ActiveHigh => on,
            Polarity::ActiveLow => !on,
        }
    }
}

struct Channel<P> {
    pin: P,
    polarity: Polarity,
}

impl<P: OutputPin> Channel<P> {
    fn drive(&mut self, on: bool) -> bool {
        let result = if self.polarity.level(on) {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.is_ok()
    }
}

/// Output bank over four GPIO pins
///
/// The logical state only changes when the pin write succeeds, so
/// [`is_on`](OutputBank::is_on) never reports an output the hardware
/// didn't accept.
pub struct GpioOutputs<H, M, L, B> {
    heater: Channel<H>,
    motor: Channel<M>,
    light: Channel<L>,
    buzzer: Channel<B>,
    state: OutputState,
    write_errors: u32,
}

impl<H, M, L, B> GpioOutputs<H, M, L, B>
where
    H: OutputPin,
    M: OutputPin,
    L: OutputPin,
    B: OutputPin,
{
    /// Create a bank with every pin active-high
    ///
    /// All outputs are driven off before returning.
    pub fn new(heater: H, motor: M, light: L, buzzer: B) -> Self {
        Self::with_polarity(heater, motor, light, buzzer, [Polarity::ActiveHigh; 4])
    }

    /// Create a bank with per-pin polarity
    ///
    /// `polarity` is indexed in [`Output::ALL`] order.
    pub fn with_polarity(heater: H, motor: M, light: L, buzzer: B, polarity: [Polarity; 4]) -> Self {
        let mut bank = Self {
            heater: Channel { pin: heater, polarity: polarity[0] },
            motor: Channel { pin: motor, polarity: polarity[1] },
            light: Channel { pin: light, polarity: polarity[2] },
            buzzer: Channel { pin: buzzer, polarity: polarity[3] },
            state: OutputState::OFF,
            write_errors: 0,
        };
        for output in Output::ALL {
            bank.drive(output, false);
        }
        bank
    }

    /// Logical state of all outputs
    pub fn state(&self) -> OutputState {
        self.state
    }

    /// Number of pin writes that failed since creation
    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    /// Release the pins
    pub fn release(self) -> (H, M, L, B) {
        (self.heater.pin, self.motor.pin, self.light.pin, self.buzzer.pin)
    }

    fn drive(&mut self, output: Output, on: bool) {
        let ok = match output {
            Output::Heater => self.heater.drive(on),
            Output::Motor => self.motor.drive(on),
            Output::Light => self.light.drive(on),
            Output::Buzzer => self.buzzer.drive(on),
        };

        if ok {
            self.state.set(output, on);
        } else {
            self.write_errors = self.write_errors.saturating_add(1);
            error!("{} pin write failed", output.as_str());
        }
    }
}

impl<H, M, L, B> OutputBank for GpioOutputs<H, M, L, B>
where
    H: OutputPin,
    M: OutputPin,
    L: OutputPin,
    B: OutputPin,
{
    fn set(&mut self, output: Output, on: bool) {
        self.drive(output, on);
    }

    fn is_on(&self, output: Output) -> bool {
        self.state.get(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    /// Mock GPIO pin whose level is observable after the bank takes it
    struct MockPin<'a> {
        high: &'a Cell<bool>,
    }

    impl ErrorType for MockPin<'_> {
        type Error = Infallible;
    }

    impl OutputPin for MockPin<'_> {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high.set(true);
            Ok(())
        }
    }

    /// Pin that rejects every write
    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn test_active_high_outputs() {
        let levels = [Cell::new(true), Cell::new(true), Cell::new(true), Cell::new(true)];
        let mut bank = GpioOutputs::new(
            MockPin { high: &levels[0] },
            MockPin { high: &levels[1] },
            MockPin { high: &levels[2] },
            MockPin { high: &levels[3] },
        );

        // Driven off on creation
        assert!(levels.iter().all(|l| !l.get()));
        assert_eq!(bank.state(), OutputState::OFF);

        bank.set(Output::Heater, true);
        bank.set(Output::Light, true);
        assert!(levels[0].get());
        assert!(!levels[1].get());
        assert!(levels[2].get());
        assert!(bank.is_on(Output::Heater));
        assert!(!bank.is_on(Output::Motor));

        bank.all_off();
        assert!(levels.iter().all(|l| !l.get()));
        assert!(!bank.state().any_on());
    }

    #[test]
    fn test_active_low_heater() {
        let levels = [Cell::new(false), Cell::new(false), Cell::new(false), Cell::new(false)];
        let mut bank = GpioOutputs::with_polarity(
            MockPin { high: &levels[0] },
            MockPin { high: &levels[1] },
            MockPin { high: &levels[2] },
            MockPin { high: &levels[3] },
            [
                Polarity::ActiveLow,
                Polarity::ActiveHigh,
                Polarity::ActiveHigh,
                Polarity::ActiveHigh,
            ],
        );

        // Initially off (pin is high for active-low)
        assert!(levels[0].get());
        assert!(!bank.is_on(Output::Heater));

        bank.set(Output::Heater, true);
        assert!(!levels[0].get());
        assert!(bank.is_on(Output::Heater));

        bank.set(Output::Heater, false);
        assert!(levels[0].get());
    }

    #[test]
    fn test_failed_write_keeps_state() {
        let levels = [Cell::new(false), Cell::new(false), Cell::new(false)];
        let mut bank = GpioOutputs::new(
            BrokenPin,
            MockPin { high: &levels[0] },
            MockPin { high: &levels[1] },
            MockPin { high: &levels[2] },
        );
        assert_eq!(bank.write_errors(), 1);

        bank.set(Output::Heater, true);
        assert!(!bank.is_on(Output::Heater));
        assert_eq!(bank.write_errors(), 2);

        bank.set(Output::Motor, true);
        assert!(bank.is_on(Output::Motor));
        assert_eq!(bank.write_errors(), 2);
    }

    #[test]
    fn test_release_returns_pins() {
        let levels = [Cell::new(false), Cell::new(false), Cell::new(false), Cell::new(false)];
        let mut bank = GpioOutputs::new(
            MockPin { high: &levels[0] },
            MockPin { high: &levels[1] },
            MockPin { high: &levels[2] },
            MockPin { high: &levels[3] },
        );
        bank.set(Output::Buzzer, true);

        let (_, _, _, mut buzzer) = bank.release();
        assert!(levels[3].get());
        let _ = buzzer.set_low();
        assert!(!levels[3].get());
    }
}
