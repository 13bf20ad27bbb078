//! ESP32 implementations of the capability traits.
//!
//! Everything in here is gated behind the `embedded` feature: the control
//! core never depends on it, and plain `cargo test` never compiles it.
//!
//! - [`clock`]: `esp-hal` delay + uptime.
//! - [`net`]: `esp-radio` WiFi controller plus a blocking `smoltcp` stack
//!   shared by the radio and webhook capabilities.
//! - [`sleep`]: RTC deep sleep with EXT0 wake on the button pin.
//! - [`storage`]: credential record in internal flash via `esp-storage`.

pub mod clock;
pub mod net;
pub mod sleep;
pub mod storage;

pub use clock::EspClock;
pub use net::{NetStack, RadioHandle, WebhookHandle};
pub use sleep::EspSleepControl;
pub use storage::flash_credential_store;
