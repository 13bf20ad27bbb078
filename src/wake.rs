//! Wake-cause dispatch.
//!
//! Runs exactly once per controller boot, before the run loop. A wake caused
//! by the button pin is handled directly (the wake event itself is the
//! trigger, no debounce needed) and ends in another deep sleep; a cold boot
//! falls through to the normal run loop. The two paths are mutually
//! exclusive per activation, so a single physical press is never handled
//! twice.

/// Why the controller started executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeCause {
    /// Power-on or any non-EXT0 reset. No press to handle.
    ColdBoot,
    /// Deep-sleep wake triggered by the button pin (EXT0, active-low).
    ButtonPress,
}

impl WakeCause {
    /// True when boot itself was caused by a press on the doorbell button.
    pub fn is_button_press(self) -> bool {
        matches!(self, WakeCause::ButtonPress)
    }
}
