//! The doorbell controller context.
//!
//! One explicit struct owns the whole device: identity, button state,
//! connection state and the capability collaborators (input pin, radio,
//! credential store, HTTP client, sleep subsystem, clock). There is exactly
//! one of these by hardware nature - no singleton machinery, the harness
//! just constructs it and calls [`DoorBell::run`].
//!
//! Control flow per activation: `setup` -> `on_wake` (handles a
//! wake-by-press directly and sleeps) -> otherwise the run loop, where the
//! debounce detector polls the line every 10 ms and a confirmed press ends
//! the activation in deep sleep. The wake path and the loop path are
//! mutually exclusive, so one physical press is handled exactly once.

use crate::button::{ButtonConfig, ButtonEvent, ButtonMonitor};
use crate::config::{LOOP_TICK_MS, PRESS_SLEEP_DELAY_MS, WAKE_SLEEP_DELAY_MS};
use crate::notify::{self, WebhookClient};
use crate::session::{Radio, SessionManager};
use crate::sleep::{self, SleepControl, Suspended};
use crate::storage::CredentialStore;
use crate::time::Clock;
use embedded_hal::digital::InputPin;
use log::{debug, info, warn};

/// Immutable device identity, set once at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Friendly name, e.g. `"Timber"`.
    pub name: &'static str,
    /// Semantic version, e.g. `"1.0.0"`.
    pub version: &'static str,
}

/// The smart doorbell controller.
pub struct DoorBell<P, R, S, H, W, C> {
    identity: DeviceIdentity,
    button_config: Option<ButtonConfig>,
    monitor: ButtonMonitor,
    session: SessionManager,

    pin: P,
    radio: R,
    store: S,
    http: H,
    sleeper: W,
    clock: C,
}

impl<P, R, S, H, W, C> DoorBell<P, R, S, H, W, C>
where
    P: InputPin,
    R: Radio,
    S: CredentialStore,
    H: WebhookClient,
    W: SleepControl,
    C: Clock,
{
    /// Construct the controller and say hi.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: DeviceIdentity,
        pin: P,
        radio: R,
        store: S,
        http: H,
        sleeper: W,
        clock: C,
    ) -> Self {
        debug!("Hola! I am {} {} :]", identity.name, identity.version);
        Self {
            identity,
            button_config: None,
            monitor: ButtonMonitor::new(),
            session: SessionManager::new(),
            pin,
            radio,
            store,
            http,
            sleeper,
            clock,
        }
    }

    /// Register the press button. Calling again overwrites the previous
    /// registration; must happen before [`DoorBell::run`].
    pub fn set_button(&mut self, identifier: &str, pin_number: u16) {
        self.button_config = Some(ButtonConfig::new(identifier, pin_number));
    }

    pub fn button(&self) -> Option<&ButtonConfig> {
        self.button_config.as_ref()
    }

    pub fn name(&self) -> &'static str {
        self.identity.name
    }

    pub fn version(&self) -> &'static str {
        self.identity.version
    }

    pub fn is_online(&self) -> bool {
        self.session.is_online()
    }

    /// Local address while connected, `"Unknown"` before the first connect.
    pub fn local_address(&self) -> &str {
        self.session.local_address()
    }

    /// One-time initialization: initial connection setup.
    ///
    /// A failed connect here is recoverable - the session manager retries
    /// lazily before the next outbound call.
    pub fn setup(&mut self) {
        if self.button_config.is_none() {
            warn!("No button registered - presses can only arrive via wake");
        }

        if let Err(e) = self
            .session
            .connect(&mut self.radio, &mut self.store, &mut self.clock)
        {
            warn!("Initial WiFi setup incomplete: {}", e);
        }

        debug!("DoorBell setup completed");
    }

    /// Wake-cause dispatch, run exactly once per boot before the loop.
    ///
    /// Returns the terminal token when the boot itself was a button press;
    /// `None` on a cold boot, where control passes to the run loop.
    pub fn on_wake(&mut self) -> Option<Suspended> {
        if !self.sleeper.wake_cause().is_button_press() {
            return None;
        }

        info!("Woken by button press");
        self.handle_press();

        // Settle before re-arming so signal jitter from the press that
        // woke us cannot immediately trigger another wake.
        self.clock.delay_ms(WAKE_SLEEP_DELAY_MS);
        Some(self.sleep())
    }

    /// One run-loop tick: sample the line, act on a confirmed press,
    /// then yield for the tick interval.
    pub fn on_loop(&mut self) -> Option<Suspended> {
        let raw_level = self.pin.is_high().unwrap_or(true);
        let now_ms = self.clock.now_ms();

        match self.monitor.sample(raw_level, now_ms) {
            Some(ButtonEvent::Pressed) => {
                info!("Button pressed...");
            }
            Some(ButtonEvent::ConfirmedPress { held_ms }) => {
                info!("Button released after {} ms", held_ms);
                self.handle_press();

                // Wait a bit before sleeping.
                self.clock.delay_ms(PRESS_SLEEP_DELAY_MS);
                return Some(self.sleep());
            }
            Some(ButtonEvent::Bounce { held_ms }) => {
                debug!("Discarding {} ms bounce", held_ms);
            }
            None => {}
        }

        self.clock.delay_ms(LOOP_TICK_MS);
        None
    }

    /// Full activation: setup, wake dispatch, then the run loop until a
    /// confirmed press ends in deep sleep.
    pub fn run(mut self) -> Suspended {
        self.setup();

        if let Some(suspended) = self.on_wake() {
            return suspended;
        }

        loop {
            if let Some(suspended) = self.on_loop() {
                return suspended;
            }
        }
    }

    fn handle_press(&mut self) {
        match notify::send_press_notification(
            &mut self.session,
            &mut self.radio,
            &mut self.store,
            &mut self.http,
            &mut self.clock,
        ) {
            Ok(()) => info!("Press notification sent successfully!"),
            Err(e) => warn!("Failed to send press notification: {}", e),
        }
    }

    fn sleep(&mut self) -> Suspended {
        sleep::enter_deep_sleep(
            &mut self.session,
            &mut self.radio,
            &mut self.sleeper,
            &mut self.clock,
        )
    }
}
