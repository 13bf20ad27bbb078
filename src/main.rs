//! Embedded entry point: wire the doorbell controller onto ESP32 hardware.
//!
//! Boot sequence: logger, heap, HAL, RTOS scheduler, radio, then hand the
//! whole device to [`DoorBell::run`]. The activation always ends in deep
//! sleep, so `main` never actually returns.

#![no_std]
#![no_main]

use core::cell::RefCell;

use esp_backtrace as _;
use esp_bootloader_esp_idf::esp_app_desc;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::main;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::timer::timg::TimerGroup;
use esp_println::logger::init_logger;
use log::info;
use smoltcp::iface::SocketStorage;
use smoltcp::socket::dns::DnsQuery;

use timber::config::PRESS_BUTTON_PIN;
use timber::esp32::net::SOCKET_COUNT;
use timber::esp32::{
    flash_credential_store, EspClock, EspSleepControl, NetStack, RadioHandle, WebhookHandle,
};
use timber::{DeviceIdentity, DoorBell};

esp_app_desc!();

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[main]
fn main() -> ! {
    init_logger(log::LevelFilter::Info);
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    info!("Timber {} booting", VERSION);

    let rtc = Rtc::new(peripherals.LPWR);

    // The scheduler must run before the radio comes up.
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);
    let radio_ctrl = esp_radio::init().unwrap();

    let (controller, interfaces) =
        esp_radio::wifi::new(&radio_ctrl, peripherals.WIFI, Default::default()).unwrap();

    // Network buffers live in main's frame, which never unwinds.
    let mut socket_storage: [SocketStorage; SOCKET_COUNT] = Default::default();
    let mut dns_queries: [Option<DnsQuery>; 1] = [None];
    let mut tcp_rx = [0u8; 1024];
    let mut tcp_tx = [0u8; 512];
    let stack = RefCell::new(NetStack::new(
        controller,
        interfaces.sta,
        &mut socket_storage,
        &mut dns_queries,
        &mut tcp_rx,
        &mut tcp_tx,
    ));

    // The button line is pulled up and shorted to ground by the press.
    let input_config = InputConfig::default().with_pull(Pull::Up);
    let button_pin = Input::new(peripherals.GPIO15, input_config);
    // SAFETY: GPIO15 serves twice - as the polled input while awake and as
    // the EXT0 wake source, which is only touched after the run loop has
    // terminally stopped sampling the input driver.
    let wake_pin = unsafe { esp_hal::peripherals::GPIO15::steal() };
    let sleeper = EspSleepControl::new(rtc, wake_pin);

    let mut doorbell = DoorBell::new(
        DeviceIdentity {
            name: "Timber",
            version: VERSION,
        },
        button_pin,
        RadioHandle::new(&stack),
        flash_credential_store(),
        WebhookHandle::new(&stack),
        sleeper,
        EspClock::new(),
    );
    doorbell.set_button("press-button", PRESS_BUTTON_PIN);

    let _suspended = doorbell.run();
    // Deep sleep resets the chip; execution resumes at the reset vector.
    unreachable!()
}
