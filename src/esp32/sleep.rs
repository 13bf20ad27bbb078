//! Deep-sleep/wake subsystem on the ESP32 RTC controller.
//!
//! EXT0 wake on the button GPIO at low level; `sleep_deep` never returns,
//! execution resumes at the reset vector with `SleepSource::Ext0` as the
//! wakeup cause.

use crate::sleep::{SleepControl, Suspended};
use crate::wake::WakeCause;
use esp_hal::gpio::RtcPin;
use esp_hal::peripherals::GPIO15;
use esp_hal::rtc_cntl::sleep::{Ext0WakeupSource, WakeupLevel};
use esp_hal::rtc_cntl::{wakeup_cause, Rtc, SleepSource};

pub struct EspSleepControl<'d> {
    rtc: Rtc<'d>,
    /// Raw pin handle for the wake source. The input driver on the same
    /// GPIO is only read by the run loop, which has terminally ended by
    /// the time this handle is used.
    wake_pin: GPIO15<'d>,
    armed: bool,
}

impl<'d> EspSleepControl<'d> {
    pub fn new(rtc: Rtc<'d>, wake_pin: GPIO15<'d>) -> Self {
        Self {
            rtc,
            wake_pin,
            armed: false,
        }
    }
}

impl SleepControl for EspSleepControl<'_> {
    fn wake_cause(&mut self) -> WakeCause {
        match wakeup_cause() {
            SleepSource::Ext0 => WakeCause::ButtonPress,
            _ => WakeCause::ColdBoot,
        }
    }

    fn arm_button_wake(&mut self) {
        self.armed = true;
    }

    fn start_deep_sleep(&mut self) -> Suspended {
        let pin: &mut dyn RtcPin = &mut self.wake_pin;
        if self.armed {
            let ext0 = Ext0WakeupSource::new(pin, WakeupLevel::Low);
            self.rtc.sleep_deep(&[&ext0])
        } else {
            // No wake source armed: only a reset brings the device back.
            self.rtc.sleep_deep(&[])
        }
    }
}
