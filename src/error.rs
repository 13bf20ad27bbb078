//! Unified error type for timber.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! None of these are fatal: every cycle still ends in deep sleep, because an
//! unrecoverable hang would drain the battery.

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // WiFi
    /// No usable credentials: nothing persisted and the compiled-in defaults
    /// are still the placeholder. The device proceeds offline.
    ConfigurationMissing,

    /// The radio reported a terminal failure (auth failed, SSID not found)
    /// or the retry budget was exhausted.
    ConnectionFailed,

    // Webhook
    /// The outbound request could not be delivered, or the endpoint answered
    /// with a non-success status. The press is simply not notified.
    Transport,

    // Storage
    /// Flash read/write/erase failed.
    Storage,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::ConfigurationMissing => "missing WiFi credentials",
            Error::ConnectionFailed => "WiFi connection failed",
            Error::Transport => "webhook request not delivered",
            Error::Storage => "flash storage failure",
            Error::BufferOverflow => "buffer too small",
        };
        f.write_str(msg)
    }
}
