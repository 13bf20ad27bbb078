//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters and the webhook endpoint
//! live here so they can be tuned in one place. WiFi credentials and the
//! webhook URL are injected at build time through `build.rs`
//! (`TIMBER_WIFI_SSID`, `TIMBER_WIFI_PASS`, `TIMBER_WEBHOOK_URL`).

// WiFi

/// Compiled-in default SSID. `"Default"` is a placeholder sentinel: it is
/// never persisted and never used for a connection attempt.
pub const WIFI_SSID: &str = match option_env!("TIMBER_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "Default",
};

/// Compiled-in default password, same sentinel rules as [`WIFI_SSID`].
pub const WIFI_PASS: &str = match option_env!("TIMBER_WIFI_PASS") {
    Some(pass) => pass,
    None => "Default",
};

/// Sentinel marking a compiled-in credential as "not configured".
pub const CREDENTIAL_PLACEHOLDER: &str = "Default";

/// Maximum number of radio status polls during one connection attempt.
pub const WIFI_CONNECT_MAX_POLLS: u32 = 10;

/// Delay between radio status polls (ms). Together with
/// [`WIFI_CONNECT_MAX_POLLS`] this bounds a connect attempt to ~5 s so a
/// device with bad credentials cannot drain its battery hanging.
pub const WIFI_CONNECT_POLL_MS: u32 = 500;

// Webhook

/// Webhook endpoint notified on each confirmed press.
pub const WEBHOOK_URL: &str = match option_env!("TIMBER_WEBHOOK_URL") {
    Some(url) => url,
    None => "http://localhost:8123/api/webhook/doorbell",
};

/// Fixed JSON body sent with every notification.
pub const WEBHOOK_BODY: &str = "{}";

/// Value of the `X-Device` header identifying this firmware.
pub const WEBHOOK_DEVICE_HEADER: &str = "timber-doorbell";

/// HTTP request timeout (ms).
pub const HTTP_TIMEOUT_MS: u32 = 5_000;

/// Response bodies at or above this length are not surfaced in logs.
pub const HTTP_BODY_LOG_LIMIT: usize = 200;

// Button

/// GPIO wired to the press button (active-low, internal pull-up).
/// Must be an RTC-capable pin so it can serve as the EXT0 wake source.
pub const PRESS_BUTTON_PIN: u16 = 15;

/// Press/release pairs shorter than this are discarded as contact bounce (ms).
pub const DEBOUNCE_DELAY_MS: u64 = 50;

/// Run-loop tick interval (ms) - the cooperative scheduling point.
pub const LOOP_TICK_MS: u32 = 10;

// Sleep

/// Settle delay after a loop-detected press before sleeping (ms).
pub const PRESS_SLEEP_DELAY_MS: u32 = 3_000;

/// Settle delay after a wake-triggered press before sleeping again (ms).
/// Short, but enough to avoid re-triggering a wake on signal jitter.
pub const WAKE_SLEEP_DELAY_MS: u32 = 500;

/// Delay between radio power-off and deep-sleep entry (ms).
pub const SLEEP_SETTLE_MS: u32 = 100;

// Credential storage

/// Flash sector index where the credential record lives (4 KB sectors).
pub const STORAGE_FLASH_SECTOR: u32 = 256;

/// Flash sector size on the ESP32 (4 KB).
pub const FLASH_SECTOR_SIZE: u32 = 4096;
