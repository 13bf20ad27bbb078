//! Timber - a battery-powered smart doorbell for the ESP32.
//!
//! One button, one webhook. The device spends its life in deep sleep,
//! wakes when the doorbell button pulls the EXT0 pin low, joins WiFi,
//! POSTs a notification to a fixed webhook endpoint and goes back to
//! sleep.
//!
//! The whole control core - debounce, wake dispatch, session management,
//! notification, sleep sequencing - is written against capability traits
//! ([`session::Radio`], [`storage::CredentialStore`],
//! [`notify::WebhookClient`], [`sleep::SleepControl`], [`time::Clock`])
//! so it runs unchanged in host tests with mock collaborators:
//! `cargo test` needs no embedded hardware.
//!
//! The embedded binary (`src/main.rs`, behind the `embedded` feature)
//! wires those traits onto `esp-hal`, `esp-radio`, `esp-storage` and
//! `smoltcp`.

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "embedded")]
extern crate alloc;

pub mod button;
pub mod config;
pub mod doorbell;
pub mod error;
pub mod notify;
pub mod session;
pub mod sleep;
pub mod storage;
pub mod time;
pub mod wake;

#[cfg(feature = "embedded")]
pub mod esp32;

pub use button::{ButtonConfig, ButtonEvent, ButtonMonitor};
pub use doorbell::{DeviceIdentity, DoorBell};
pub use error::Error;
pub use session::SessionManager;
pub use sleep::Suspended;
pub use storage::Credentials;
pub use wake::WakeCause;
