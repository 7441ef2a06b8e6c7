//! Output bank trait
//!
//! The bread machine has four switched outputs. Implementations map them
//! onto GPIO pins, relays or SSRs.

/// Switched machine outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Output {
    Heater,
    Motor,
    Light,
    Buzzer,
}

impl Output {
    /// All outputs, in a fixed order
    pub const ALL: [Output; 4] = [Output::Heater, Output::Motor, Output::Light, Output::Buzzer];

    /// Status/wire name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Output::Heater => "heater",
            Output::Motor => "motor",
            Output::Light => "light",
            Output::Buzzer => "buzzer",
        }
    }
}

/// Trait for the bank of switched outputs
pub trait OutputBank {
    /// Turn an output on or off
    fn set(&mut self, output: Output, on: bool);

    /// Check if an output is currently on
    fn is_on(&self, output: Output) -> bool;

    /// Turn every output off
    fn all_off(&mut self) {
        for output in Output::ALL {
            self.set(output, false);
        }
    }
}
