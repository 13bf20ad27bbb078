//! Button input: registration and debounced edge detection.
//!
//! The detector samples the digital input line once per control-loop tick
//! (no interrupts). The wiring is active-low: a high level means "not
//! pressed". A press becomes actionable only on release - a press/release
//! pair shorter than [`DEBOUNCE_DELAY_MS`] is contact bounce and is
//! discarded.

use crate::config::DEBOUNCE_DELAY_MS;
use heapless::String;

/// Describes the physical press button wired to the board.
///
/// Registered exactly once before the run loop starts; registering again
/// overwrites the previous configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonConfig {
    /// Friendly component name, e.g. `"my-press-button"`.
    pub identifier: String<16>,
    /// Board pin number wired to the button.
    pub pin_number: u16,
}

impl ButtonConfig {
    /// Create a button description. Long identifiers are truncated.
    pub fn new(identifier: &str, pin_number: u16) -> Self {
        let mut id: String<16> = String::new();
        for c in identifier.chars().take(16) {
            let _ = id.push(c);
        }
        Self {
            identifier: id,
            pin_number,
        }
    }
}

/// Edge event produced by one detector sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Falling edge: the button went down. Not actionable yet.
    Pressed,
    /// Rising edge after at least the debounce threshold: a real press.
    ConfirmedPress {
        /// How long the button was held (ms).
        held_ms: u64,
    },
    /// Rising edge below the debounce threshold: electrical noise.
    Bounce {
        /// How long the glitch lasted (ms).
        held_ms: u64,
    },
}

/// Debounce/edge detector state.
///
/// Owns the last-sampled level and the press/release timestamps of the
/// current gesture. If the controller resets mid-press the press timestamp
/// is lost and that gesture simply never fires - accepted.
#[derive(Clone, Debug)]
pub struct ButtonMonitor {
    /// Last sampled electrical level; `true` = not pressed (active-low).
    current_level: bool,
    /// A press is in progress (fall seen, rise not yet).
    is_active: bool,
    press_timestamp_ms: u64,
    release_timestamp_ms: u64,
}

impl ButtonMonitor {
    /// Detector in the idle state (line high, no press tracked).
    pub const fn new() -> Self {
        Self {
            current_level: true,
            is_active: false,
            press_timestamp_ms: 0,
            release_timestamp_ms: 0,
        }
    }

    /// Feed one sampled level into the detector.
    ///
    /// Called once per tick; the caller provides the sample time so the
    /// detector itself stays free of any clock dependency.
    pub fn sample(&mut self, raw_level: bool, now_ms: u64) -> Option<ButtonEvent> {
        let previous = self.current_level;
        self.current_level = raw_level;

        if previous && !raw_level {
            // HIGH -> LOW: press begins.
            self.press_timestamp_ms = now_ms;
            self.is_active = true;
            Some(ButtonEvent::Pressed)
        } else if !previous && raw_level {
            // LOW -> HIGH: press ends; decide real press vs bounce.
            self.release_timestamp_ms = now_ms;
            self.is_active = false;

            let held_ms = now_ms.saturating_sub(self.press_timestamp_ms);
            if held_ms >= DEBOUNCE_DELAY_MS {
                Some(ButtonEvent::ConfirmedPress { held_ms })
            } else {
                Some(ButtonEvent::Bounce { held_ms })
            }
        } else {
            None
        }
    }

    /// A press is currently in progress.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Last sampled electrical level (`true` = not pressed).
    pub fn current_level(&self) -> bool {
        self.current_level
    }
}

impl Default for ButtonMonitor {
    fn default() -> Self {
        Self::new()
    }
}
