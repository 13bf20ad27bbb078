//! Press notification: one webhook POST per confirmed press.
//!
//! The dispatcher ensures connectivity first, then performs exactly one
//! POST to the configured endpoint. There is no retry within a press -
//! retry-across-presses is the visitor's job (pressing again).
//!
//! The original firmware treated any positive HTTP status as delivered,
//! which silently reported a 404 from a misconfigured webhook path as
//! success. Here only 2xx counts as delivered; other positive statuses are
//! logged with their code and reported as a transport error.

use crate::config::{
    HTTP_BODY_LOG_LIMIT, HTTP_TIMEOUT_MS, WEBHOOK_BODY, WEBHOOK_DEVICE_HEADER, WEBHOOK_URL,
};
use crate::error::Error;
use crate::session::{Radio, SessionManager};
use crate::storage::CredentialStore;
use crate::time::Clock;
use heapless::String;
use log::{info, warn};

/// Maximum response-body excerpt carried back for diagnostics.
pub const BODY_MAX: usize = 256;

/// Capability surface of the HTTP client.
pub trait WebhookClient {
    /// POST `body` to `url` with the given headers and timeout. Returns the
    /// HTTP status code, or a negative value for a transport-level failure
    /// (timeout, DNS, connection refused).
    fn post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        timeout_ms: u32,
    ) -> i32;

    /// Body of the last response. Only called after a 200.
    fn response_body(&mut self) -> String<BODY_MAX>;
}

/// Deliver one press notification to the fixed webhook endpoint.
///
/// Reports failure without touching the transport when the session cannot
/// be brought online.
pub fn send_press_notification(
    session: &mut SessionManager,
    radio: &mut impl Radio,
    store: &mut impl CredentialStore,
    http: &mut impl WebhookClient,
    clock: &mut impl Clock,
) -> Result<(), Error> {
    if let Err(e) = session.ensure_connected(radio, store, clock) {
        warn!("Cannot call webhook - WiFi is not connected");
        return Err(e);
    }

    info!("Sending press notification to {}", WEBHOOK_URL);

    let headers = [
        ("Content-Type", "application/json"),
        ("X-Device", WEBHOOK_DEVICE_HEADER),
    ];
    let code = http.post(WEBHOOK_URL, &headers, WEBHOOK_BODY, HTTP_TIMEOUT_MS);

    if code <= 0 {
        warn!("HTTP error: {}", code);
        return Err(Error::Transport);
    }

    info!("HTTP response code: {}", code);

    if code == 200 {
        let body = http.response_body();
        if !body.is_empty() && body.len() < HTTP_BODY_LOG_LIMIT {
            info!("  Response: {}", body);
        }
    }

    if (200..300).contains(&code) {
        Ok(())
    } else {
        warn!("Webhook answered {} - treating as not delivered", code);
        Err(Error::Transport)
    }
}
