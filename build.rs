//! Build script - forwards WiFi credentials and the webhook URL from the
//! environment (or a local `.env` file) into compile-time constants.
//!
//! Leave a variable unset and `src/config.rs` falls back to its placeholder.

use std::env;

const FORWARDED: &[&str] = &["TIMBER_WIFI_SSID", "TIMBER_WIFI_PASS", "TIMBER_WEBHOOK_URL"];

fn main() {
    // Optional; building without a .env is fine.
    let _ = dotenvy::dotenv();

    for key in FORWARDED {
        if let Ok(value) = env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={key}");
    }

    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-changed=build.rs");
}
