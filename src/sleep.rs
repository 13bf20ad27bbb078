//! Deep-sleep entry: the terminal transition of every duty cycle.
//!
//! Every handled press - whether it arrived via the wake path or the run
//! loop - ends here; the device never idles awake. On real hardware the
//! final suspend call does not return: execution resumes at boot with a
//! [`WakeCause::ButtonPress`](crate::wake::WakeCause) cause.

use crate::config::SLEEP_SETTLE_MS;
use crate::session::{Radio, SessionManager};
use crate::time::Clock;
use crate::wake::WakeCause;
use log::info;

/// Proof that the controller has entered its terminal suspended state.
///
/// The ESP32 implementation of [`SleepControl::start_deep_sleep`] diverges
/// and never actually constructs one; mock implementations return it so
/// host tests can observe the transition.
#[derive(Debug, PartialEq, Eq)]
pub struct Suspended;

/// Capability surface of the deep-sleep/wake subsystem.
pub trait SleepControl {
    /// Why the controller is currently executing. Read once per boot.
    fn wake_cause(&mut self) -> WakeCause;

    /// Arm the EXT0 wake source: button pin, active (low) level.
    fn arm_button_wake(&mut self);

    /// Suspend the controller. Does not return on hardware.
    fn start_deep_sleep(&mut self) -> Suspended;
}

/// Arm the wake source, power the radio down and suspend.
///
/// The radio teardown happens after arming so a press racing the shutdown
/// still wakes the device, and the 100 ms settle lets the power rails
/// quiesce before suspend.
pub fn enter_deep_sleep(
    session: &mut SessionManager,
    radio: &mut impl Radio,
    sleeper: &mut impl SleepControl,
    clock: &mut impl Clock,
) -> Suspended {
    info!("Entering deep sleep...");
    info!("Press button to wake up");

    sleeper.arm_button_wake();

    // Disconnect WiFi to minimize sleep-current draw.
    radio.disconnect(true);
    radio.radio_off();
    session.mark_offline();

    clock.delay_ms(SLEEP_SETTLE_MS);
    sleeper.start_deep_sleep()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{RadioStatus, ADDR_MAX};
    use heapless::String;

    #[derive(Default)]
    struct RecordingRadio {
        calls: Vec<&'static str>,
    }

    impl Radio for RecordingRadio {
        fn begin(&mut self, _ssid: &str, _password: &str) {
            self.calls.push("begin");
        }

        fn status(&mut self) -> RadioStatus {
            RadioStatus::Connected
        }

        fn disconnect(&mut self, power_off: bool) {
            self.calls
                .push(if power_off { "disconnect(off)" } else { "disconnect" });
        }

        fn radio_off(&mut self) {
            self.calls.push("radio_off");
        }

        fn local_address(&mut self) -> String<ADDR_MAX> {
            String::new()
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        armed: bool,
        suspends: usize,
    }

    impl SleepControl for RecordingSleeper {
        fn wake_cause(&mut self) -> WakeCause {
            WakeCause::ColdBoot
        }

        fn arm_button_wake(&mut self) {
            // Arming must precede the suspend call.
            assert_eq!(self.suspends, 0);
            self.armed = true;
        }

        fn start_deep_sleep(&mut self) -> Suspended {
            assert!(self.armed, "suspended without an armed wake source");
            self.suspends += 1;
            Suspended
        }
    }

    struct SettleClock {
        delays: Vec<u32>,
    }

    impl Clock for SettleClock {
        fn now_ms(&self) -> u64 {
            0
        }

        fn delay_ms(&mut self, ms: u32) {
            self.delays.push(ms);
        }
    }

    #[test]
    fn sleep_entry_arms_wake_tears_down_radio_and_suspends_once() {
        let mut session = SessionManager::with_defaults("Default", "Default");
        let mut radio = RecordingRadio::default();
        let mut sleeper = RecordingSleeper::default();
        let mut clock = SettleClock { delays: Vec::new() };

        let token = enter_deep_sleep(&mut session, &mut radio, &mut sleeper, &mut clock);

        assert_eq!(token, Suspended);
        assert_eq!(sleeper.suspends, 1);
        assert_eq!(radio.calls, vec!["disconnect(off)", "radio_off"]);
        assert_eq!(clock.delays, vec![SLEEP_SETTLE_MS]);
        assert!(!session.is_online());
    }
}
