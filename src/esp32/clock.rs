//! Clock capability on `esp-hal`: uptime from the system timer, blocking
//! delays from the HAL delay driver.

use crate::time::Clock;
use esp_hal::delay::Delay;
use esp_hal::time::Instant;

pub struct EspClock {
    delay: Delay,
}

impl EspClock {
    pub fn new() -> Self {
        Self { delay: Delay::new() }
    }
}

impl Default for EspClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for EspClock {
    fn now_ms(&self) -> u64 {
        Instant::now().duration_since_epoch().as_millis()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_millis(ms);
    }
}
