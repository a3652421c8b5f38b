//! Hardware adapters for the irrigator: serial line transport, GPIO pump
//! relay, and a simulated tray for running without a rig.

pub mod error;
pub mod line;
pub mod sim;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod relay;

pub use line::LineBuffer;
pub use sim::{SimulatedRelay, SimulatedTray, TrayModel};

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use relay::GpioRelay;

#[cfg(test)]
mod tests {
    use super::*;
    use irrigator_traits::{Relay, Transport};
    use std::time::Duration;

    fn fast_model() -> TrayModel {
        TrayModel {
            start_weight_g: 100.0,
            dry_rate_g_per_s: 10.0,
            pump_rate_g_per_s: 100.0,
            period: Duration::from_millis(10),
        }
    }

    #[test]
    fn simulated_tray_dries_when_pump_is_off() {
        let mut tray = SimulatedTray::new(fast_model());
        let t = Duration::from_millis(100);
        let w1: f64 = tray.read_line(t).unwrap().unwrap().parse().unwrap();
        let w2: f64 = tray.read_line(t).unwrap().unwrap().parse().unwrap();
        assert!(w2 < w1);
    }

    #[test]
    fn simulated_tray_gains_weight_while_pumping() {
        let mut tray = SimulatedTray::new(fast_model());
        let mut relay = tray.relay();
        relay.on().unwrap();
        let t = Duration::from_millis(100);
        let w1: f64 = tray.read_line(t).unwrap().unwrap().parse().unwrap();
        let w2: f64 = tray.read_line(t).unwrap().unwrap().parse().unwrap();
        assert!(w2 > w1);
        relay.off().unwrap();
        assert!(!relay.is_on());
    }
}
