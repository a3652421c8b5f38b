use rppal::gpio::{Gpio, OutputPin};

use irrigator_traits::Relay;

use crate::error::{HwError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pump relay on a single GPIO output.
pub struct GpioRelay {
    pin: OutputPin,
    active_high: bool,
}

impl GpioRelay {
    /// Claims the pin and drives it to the de-energized level.
    pub fn new(pin: u8, active_high: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("pin {pin}: {e}")))?
            .into_output();
        let mut relay = Self { pin, active_high };
        relay.drive(false);
        Ok(relay)
    }

    fn drive(&mut self, energized: bool) {
        if energized == self.active_high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

impl Relay for GpioRelay {
    fn on(&mut self) -> std::result::Result<(), BoxError> {
        self.drive(true);
        Ok(())
    }

    fn off(&mut self) -> std::result::Result<(), BoxError> {
        self.drive(false);
        Ok(())
    }
}

impl Drop for GpioRelay {
    fn drop(&mut self) {
        self.drive(false);
    }
}
