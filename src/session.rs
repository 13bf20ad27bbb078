//! WiFi session management: credential resolution and the bounded
//! connect-or-defer policy.
//!
//! The session manager owns the connection state and drives the radio
//! through the [`Radio`] capability trait. A connection attempt is bounded
//! to [`WIFI_CONNECT_MAX_POLLS`] status polls spaced
//! [`WIFI_CONNECT_POLL_MS`] apart (~5 s worst case) so a battery-powered
//! wake-connect-notify-sleep cycle can never hang on bad credentials.

use crate::config::{
    CREDENTIAL_PLACEHOLDER, WIFI_CONNECT_MAX_POLLS, WIFI_CONNECT_POLL_MS, WIFI_PASS, WIFI_SSID,
};
use crate::error::Error;
use crate::storage::{CredentialStore, Credentials};
use crate::time::Clock;
use heapless::String;
use log::{info, warn};

/// Maximum textual address length (room for a full IPv6 form).
pub const ADDR_MAX: usize = 46;

/// Connection status as last reported by the radio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioStatus {
    /// Associated and usable.
    Connected,
    /// Terminal failure: authentication rejected.
    ConnectFailed,
    /// Terminal failure: the configured SSID is not visible.
    NoSsidAvailable,
    /// Anything else (idle, scanning, associating).
    Idle,
}

impl RadioStatus {
    /// A state the bounded poll loop should give up on immediately.
    pub fn is_terminal_failure(self) -> bool {
        matches!(self, RadioStatus::ConnectFailed | RadioStatus::NoSsidAvailable)
    }
}

/// Capability surface of the wireless radio driver.
pub trait Radio {
    /// Begin associating with the given network. Non-blocking; progress is
    /// observed through [`Radio::status`].
    fn begin(&mut self, ssid: &str, password: &str);

    /// Current association status.
    fn status(&mut self) -> RadioStatus;

    /// Drop the current association. With `power_off` the radio also
    /// releases its RF resources (used on the way into deep sleep).
    fn disconnect(&mut self, power_off: bool);

    /// Power the radio down completely.
    fn radio_off(&mut self);

    /// Locally assigned address, valid while connected.
    fn local_address(&mut self) -> String<ADDR_MAX>;
}

/// Mutable connection state, owned exclusively by the session manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionState {
    pub is_online: bool,
    pub local_address: String<ADDR_MAX>,
}

impl ConnectionState {
    /// State before the first connection attempt.
    pub fn new() -> Self {
        let mut addr = String::new();
        let _ = addr.push_str("Unknown");
        Self {
            is_online: false,
            local_address: addr,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the connection lifecycle: load credentials, fall back to compiled-in
/// defaults, connect with a bounded retry budget, reconnect lazily.
pub struct SessionManager {
    state: ConnectionState,
    default_ssid: &'static str,
    default_pass: &'static str,
}

impl SessionManager {
    /// Session manager using the compiled-in credential defaults.
    pub fn new() -> Self {
        Self::with_defaults(WIFI_SSID, WIFI_PASS)
    }

    /// Session manager with explicit defaults (tests inject these).
    pub fn with_defaults(default_ssid: &'static str, default_pass: &'static str) -> Self {
        Self {
            state: ConnectionState::new(),
            default_ssid,
            default_pass,
        }
    }

    pub fn is_online(&self) -> bool {
        self.state.is_online
    }

    /// Last captured local address, `"Unknown"` before the first connect.
    pub fn local_address(&self) -> &str {
        &self.state.local_address
    }

    /// Reset to the disconnected state (taken on the way into deep sleep).
    pub fn mark_offline(&mut self) {
        self.state.is_online = false;
    }

    /// Idempotent connectivity check, called before any outbound request.
    ///
    /// While the radio reports connected this is a pure status check: no
    /// credential I/O, no connection attempt. Otherwise the stale session is
    /// dropped and the full connect sequence runs.
    pub fn ensure_connected(
        &mut self,
        radio: &mut impl Radio,
        store: &mut impl CredentialStore,
        clock: &mut impl Clock,
    ) -> Result<(), Error> {
        if radio.status() == RadioStatus::Connected {
            self.state.is_online = true;
            return Ok(());
        }

        warn!("WiFi disconnected, reconnecting...");
        self.state.is_online = false;
        radio.disconnect(false);
        self.connect(radio, store, clock)
    }

    /// Full connection sequence: resolve credentials, associate, poll.
    pub fn connect(
        &mut self,
        radio: &mut impl Radio,
        store: &mut impl CredentialStore,
        clock: &mut impl Clock,
    ) -> Result<(), Error> {
        let credentials = match store.load() {
            Some(stored) => stored,
            None => match self.adopt_compiled_defaults(store) {
                Some(defaults) => defaults,
                None => {
                    warn!("WiFi is unable to connect: missing credentials");
                    return Err(Error::ConfigurationMissing);
                }
            },
        };

        info!("Connecting to WiFi '{}'", credentials.ssid);
        radio.begin(&credentials.ssid, &credentials.password);

        for _ in 0..WIFI_CONNECT_MAX_POLLS {
            match radio.status() {
                RadioStatus::Connected => {
                    self.state.is_online = true;
                    self.state.local_address = radio.local_address();
                    info!(
                        "Connection to WiFi established, address {}",
                        self.state.local_address
                    );
                    return Ok(());
                }
                status if status.is_terminal_failure() => {
                    warn!("WiFi reported terminal failure: {:?}", status);
                    return Err(Error::ConnectionFailed);
                }
                _ => {}
            }
            clock.delay_ms(WIFI_CONNECT_POLL_MS);
        }

        warn!("Could not establish WiFi connection (retry budget exhausted)");
        Err(Error::ConnectionFailed)
    }

    /// If the compiled-in defaults are real credentials (not the
    /// `"Default"` placeholder), persist and use them.
    fn adopt_compiled_defaults(
        &self,
        store: &mut impl CredentialStore,
    ) -> Option<Credentials> {
        if self.default_ssid == CREDENTIAL_PLACEHOLDER
            || self.default_pass == CREDENTIAL_PLACEHOLDER
        {
            return None;
        }

        let defaults = Credentials::new(self.default_ssid, self.default_pass);
        match store.save(&defaults) {
            Ok(()) => info!("WiFi credentials saved"),
            // Still usable for this cycle even if persisting failed.
            Err(e) => warn!("Could not persist WiFi credentials: {}", e),
        }
        Some(defaults)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedRadio {
        statuses: Vec<RadioStatus>,
        cursor: usize,
        begin_calls: Vec<(std::string::String, std::string::String)>,
        disconnects: Vec<bool>,
    }

    impl ScriptedRadio {
        fn new(statuses: &[RadioStatus]) -> Self {
            Self {
                statuses: statuses.to_vec(),
                cursor: 0,
                begin_calls: Vec::new(),
                disconnects: Vec::new(),
            }
        }

        fn polls(&self) -> usize {
            self.cursor
        }
    }

    impl Radio for ScriptedRadio {
        fn begin(&mut self, ssid: &str, password: &str) {
            self.begin_calls.push((ssid.into(), password.into()));
        }

        fn status(&mut self) -> RadioStatus {
            let status = self
                .statuses
                .get(self.cursor)
                .copied()
                .unwrap_or(RadioStatus::Idle);
            self.cursor += 1;
            status
        }

        fn disconnect(&mut self, power_off: bool) {
            self.disconnects.push(power_off);
        }

        fn radio_off(&mut self) {}

        fn local_address(&mut self) -> String<ADDR_MAX> {
            let mut addr = String::new();
            let _ = addr.push_str("192.168.1.42");
            addr
        }
    }

    struct FakeStore {
        stored: Option<Credentials>,
        loads: usize,
        saves: usize,
    }

    impl FakeStore {
        fn empty() -> Self {
            Self {
                stored: None,
                loads: 0,
                saves: 0,
            }
        }

        fn with(creds: Credentials) -> Self {
            Self {
                stored: Some(creds),
                loads: 0,
                saves: 0,
            }
        }
    }

    impl CredentialStore for FakeStore {
        fn load(&mut self) -> Option<Credentials> {
            self.loads += 1;
            self.stored.clone()
        }

        fn save(&mut self, credentials: &Credentials) -> Result<(), Error> {
            self.saves += 1;
            self.stored = Some(credentials.clone());
            Ok(())
        }
    }

    struct FakeClock {
        now: u64,
        delays: Vec<u32>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                now: 0,
                delays: Vec::new(),
            }
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.now
        }

        fn delay_ms(&mut self, ms: u32) {
            self.now += u64::from(ms);
            self.delays.push(ms);
        }
    }

    #[test]
    fn placeholder_defaults_report_configuration_missing() {
        // Scenario A: nothing persisted, defaults still "Default".
        let mut session = SessionManager::with_defaults("Default", "Default");
        let mut radio = ScriptedRadio::new(&[]);
        let mut store = FakeStore::empty();
        let mut clock = FakeClock::new();

        let result = session.connect(&mut radio, &mut store, &mut clock);

        assert_eq!(result, Err(Error::ConfigurationMissing));
        assert!(!session.is_online());
        assert_eq!(store.saves, 0);
        // No network attempt was made at all.
        assert!(radio.begin_calls.is_empty());
        assert_eq!(radio.polls(), 0);
    }

    #[test]
    fn real_defaults_are_persisted_and_used() {
        // Scenario B: defaults adopted, radio connects on the third poll.
        let mut session = SessionManager::with_defaults("HomeNet", "secret123");
        let mut radio = ScriptedRadio::new(&[
            RadioStatus::Idle,
            RadioStatus::Idle,
            RadioStatus::Connected,
        ]);
        let mut store = FakeStore::empty();
        let mut clock = FakeClock::new();

        session
            .connect(&mut radio, &mut store, &mut clock)
            .unwrap();

        assert_eq!(store.saves, 1);
        assert_eq!(
            store.stored,
            Some(Credentials::new("HomeNet", "secret123"))
        );
        assert_eq!(
            radio.begin_calls,
            vec![("HomeNet".to_string(), "secret123".to_string())]
        );
        assert!(session.is_online());
        assert_eq!(session.local_address(), "192.168.1.42");
        assert_eq!(radio.polls(), 3);
    }

    #[test]
    fn stored_credentials_take_precedence_over_defaults() {
        let mut session = SessionManager::with_defaults("HomeNet", "secret123");
        let mut radio = ScriptedRadio::new(&[RadioStatus::Connected]);
        let mut store = FakeStore::with(Credentials::new("StoredNet", "storedpw"));
        let mut clock = FakeClock::new();

        session
            .connect(&mut radio, &mut store, &mut clock)
            .unwrap();

        assert_eq!(store.saves, 0);
        assert_eq!(
            radio.begin_calls,
            vec![("StoredNet".to_string(), "storedpw".to_string())]
        );
    }

    #[test]
    fn retry_budget_is_bounded_to_ten_polls() {
        let mut session = SessionManager::with_defaults("HomeNet", "secret123");
        let mut radio = ScriptedRadio::new(&[]); // never connects
        let mut store = FakeStore::empty();
        let mut clock = FakeClock::new();

        let result = session.connect(&mut radio, &mut store, &mut clock);

        assert_eq!(result, Err(Error::ConnectionFailed));
        assert!(!session.is_online());
        assert_eq!(radio.polls(), WIFI_CONNECT_MAX_POLLS as usize);
        // 10 polls x 500 ms = 5 s worst-case wall time.
        assert_eq!(clock.now, u64::from(WIFI_CONNECT_MAX_POLLS * WIFI_CONNECT_POLL_MS));
    }

    #[test]
    fn terminal_failure_stops_polling_early() {
        let mut session = SessionManager::with_defaults("HomeNet", "secret123");
        let mut radio =
            ScriptedRadio::new(&[RadioStatus::Idle, RadioStatus::NoSsidAvailable]);
        let mut store = FakeStore::empty();
        let mut clock = FakeClock::new();

        let result = session.connect(&mut radio, &mut store, &mut clock);

        assert_eq!(result, Err(Error::ConnectionFailed));
        assert_eq!(radio.polls(), 2);
    }

    #[test]
    fn ensure_connected_is_idempotent_while_online() {
        let mut session = SessionManager::with_defaults("HomeNet", "secret123");
        let mut radio = ScriptedRadio::new(&[
            RadioStatus::Connected,
            RadioStatus::Connected,
        ]);
        let mut store = FakeStore::empty();
        let mut clock = FakeClock::new();

        session
            .ensure_connected(&mut radio, &mut store, &mut clock)
            .unwrap();
        session
            .ensure_connected(&mut radio, &mut store, &mut clock)
            .unwrap();

        // Two status checks, nothing else: no credential I/O, no begin.
        assert_eq!(radio.polls(), 2);
        assert_eq!(store.loads, 0);
        assert!(radio.begin_calls.is_empty());
        assert!(radio.disconnects.is_empty());
    }

    #[test]
    fn ensure_connected_reconnects_a_stale_session() {
        let mut session = SessionManager::with_defaults("HomeNet", "secret123");
        // First status: stale (Idle) -> disconnect + full connect sequence.
        let mut radio =
            ScriptedRadio::new(&[RadioStatus::Idle, RadioStatus::Connected]);
        let mut store = FakeStore::with(Credentials::new("StoredNet", "storedpw"));
        let mut clock = FakeClock::new();

        session
            .ensure_connected(&mut radio, &mut store, &mut clock)
            .unwrap();

        assert_eq!(radio.disconnects, vec![false]);
        assert_eq!(store.loads, 1);
        assert!(session.is_online());
    }
}
