//! WiFi and HTTP on `esp-radio` plus a blocking `smoltcp` stack.
//!
//! One [`NetStack`] owns the radio controller, the network interface and
//! the sockets (DHCP, DNS, one TCP client). The radio and webhook
//! capabilities are thin handles over a shared `RefCell`: the firmware is
//! single-threaded, so borrows never overlap.

use core::cell::RefCell;
use core::fmt::Write as _;

use alloc::string::ToString;
use esp_hal::delay::Delay;
use esp_hal::time::Instant;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice};
use heapless::{String, Vec};
use log::{debug, warn};
use smoltcp::iface::{Config, Interface, SocketHandle, SocketSet, SocketStorage};
use smoltcp::socket::dhcpv4::{Event as DhcpEvent, Socket as DhcpSocket};
use smoltcp::socket::dns::{DnsQuery, GetQueryResultError, Socket as DnsSocket};
use smoltcp::socket::tcp::{Socket as TcpSocket, SocketBuffer};
use smoltcp::time::Instant as SmoltcpInstant;
use smoltcp::wire::{DnsQueryType, HardwareAddress, IpAddress, IpCidr, Ipv4Address};

use crate::notify::{WebhookClient, BODY_MAX};
use crate::session::{Radio, RadioStatus, ADDR_MAX};

/// Sockets carried by the stack: DHCP + DNS + one TCP client.
pub const SOCKET_COUNT: usize = 3;

/// Serialized request upper bound (fixed URL, two headers, `{}` body).
const REQUEST_MAX: usize = 512;

/// Response capture upper bound; longer responses are truncated, which only
/// affects the diagnostic excerpt.
const RESPONSE_MAX: usize = 1024;

/// Per-call budget for pumping the interface inside a status check.
const STATUS_POLL_MS: u64 = 50;

/// Step between interface polls while blocked on the network.
const POLL_STEP_MS: u32 = 2;

const EPHEMERAL_PORT_BASE: u16 = 49152;

fn now_ms() -> u64 {
    Instant::now().duration_since_epoch().as_millis()
}

/// Blocking network stack over the WiFi station interface.
pub struct NetStack<'d> {
    controller: WifiController<'d>,
    device: WifiDevice<'d>,
    iface: Interface,
    sockets: SocketSet<'d>,
    dhcp_handle: SocketHandle,
    dns_handle: SocketHandle,
    tcp_handle: SocketHandle,
    delay: Delay,
    connect_failed: bool,
    ip_configured: bool,
    next_port: u16,
}

impl<'d> NetStack<'d> {
    /// Build the stack over an initialized station interface. All socket
    /// storage is borrowed from the caller so the stack itself stays
    /// allocation-free on the hot path.
    pub fn new(
        controller: WifiController<'d>,
        mut device: WifiDevice<'d>,
        socket_storage: &'d mut [SocketStorage<'d>],
        dns_queries: &'d mut [Option<DnsQuery>],
        tcp_rx: &'d mut [u8],
        tcp_tx: &'d mut [u8],
    ) -> Self {
        let mac = esp_radio::wifi::sta_mac();
        let hw_addr = HardwareAddress::Ethernet(smoltcp::wire::EthernetAddress(mac));
        let iface = Interface::new(Config::new(hw_addr), &mut device, SmoltcpInstant::ZERO);

        let mut sockets = SocketSet::new(&mut socket_storage[..]);
        let dhcp_handle = sockets.add(DhcpSocket::new());
        let dns_handle = sockets.add(DnsSocket::new(&[], &mut dns_queries[..]));
        let tcp_socket = TcpSocket::new(
            SocketBuffer::new(&mut tcp_rx[..]),
            SocketBuffer::new(&mut tcp_tx[..]),
        );
        let tcp_handle = sockets.add(tcp_socket);

        Self {
            controller,
            device,
            iface,
            sockets,
            dhcp_handle,
            dns_handle,
            tcp_handle,
            delay: Delay::new(),
            connect_failed: false,
            ip_configured: false,
            next_port: 0,
        }
    }

    /// One interface pass: poll smoltcp and service DHCP events.
    fn poll_once(&mut self) {
        let timestamp = SmoltcpInstant::from_millis(now_ms() as i64);
        self.iface
            .poll(timestamp, &mut self.device, &mut self.sockets);

        let dhcp_socket = self.sockets.get_mut::<DhcpSocket>(self.dhcp_handle);
        if let Some(event) = dhcp_socket.poll() {
            match event {
                DhcpEvent::Configured(dhcp_config) => {
                    let addr = dhcp_config.address;
                    self.iface.update_ip_addrs(|addrs| {
                        addrs.clear();
                        let _ = addrs.push(IpCidr::Ipv4(addr));
                    });
                    if let Some(router) = dhcp_config.router {
                        let _ = self.iface.routes_mut().add_default_ipv4_route(router);
                    }
                    let servers: Vec<IpAddress, 3> = dhcp_config
                        .dns_servers
                        .iter()
                        .map(|s| IpAddress::Ipv4(*s))
                        .collect();
                    self.sockets
                        .get_mut::<DnsSocket>(self.dns_handle)
                        .update_servers(&servers);
                    debug!("DHCP configured: {}", addr);
                    self.ip_configured = true;
                }
                DhcpEvent::Deconfigured => {
                    warn!("DHCP deconfigured");
                    self.iface.update_ip_addrs(|addrs| addrs.clear());
                    self.ip_configured = false;
                }
            }
        }
    }

    fn poll_for(&mut self, budget_ms: u64) {
        let deadline = now_ms() + budget_ms;
        while now_ms() < deadline {
            self.poll_once();
            self.delay.delay_millis(POLL_STEP_MS);
        }
    }

    fn begin(&mut self, ssid: &str, password: &str) {
        self.connect_failed = false;
        self.ip_configured = false;

        // (Re)configuring a started controller is rejected by the driver.
        let _ = self.controller.stop();

        let client = ClientConfig::default()
            .with_ssid(ssid.to_string())
            .with_password(password.to_string());
        if let Err(e) = self.controller.set_config(&ModeConfig::Client(client)) {
            warn!("WiFi set_config failed: {:?}", e);
            self.connect_failed = true;
            return;
        }
        if let Err(e) = self.controller.start() {
            warn!("WiFi start failed: {:?}", e);
            self.connect_failed = true;
            return;
        }
        if let Err(e) = self.controller.connect() {
            warn!("WiFi connect failed: {:?}", e);
            self.connect_failed = true;
        }
    }

    fn status(&mut self) -> RadioStatus {
        if self.connect_failed {
            return RadioStatus::ConnectFailed;
        }
        // DHCP needs several exchanges; give the interface a short pump on
        // every status check so progress is made between the caller's polls.
        self.poll_for(STATUS_POLL_MS);
        if self.controller.is_connected().unwrap_or(false) && self.ip_configured {
            RadioStatus::Connected
        } else {
            RadioStatus::Idle
        }
    }

    fn disconnect(&mut self, power_off: bool) {
        let _ = self.controller.disconnect();
        if power_off {
            let _ = self.controller.stop();
        }
        self.ip_configured = false;
        self.iface.update_ip_addrs(|addrs| addrs.clear());
    }

    fn local_address(&mut self) -> String<ADDR_MAX> {
        let mut out = String::new();
        match self.iface.ipv4_addr() {
            Some(addr) => {
                let _ = write!(out, "{}", addr);
            }
            None => {
                let _ = out.push_str("Unknown");
            }
        }
        out
    }

    /// Resolve `host`: an IPv4 literal directly, anything else through the
    /// DNS socket (servers learned from DHCP).
    fn resolve(&mut self, host: &str, deadline: u64) -> Result<IpAddress, ()> {
        if let Ok(ip) = host.parse::<Ipv4Address>() {
            return Ok(IpAddress::Ipv4(ip));
        }

        let cx = self.iface.context();
        let dns = self.sockets.get_mut::<DnsSocket>(self.dns_handle);
        let query = dns.start_query(cx, host, DnsQueryType::A).map_err(|e| {
            warn!("DNS query for '{}' failed to start: {:?}", host, e);
        })?;

        loop {
            self.poll_once();
            let dns = self.sockets.get_mut::<DnsSocket>(self.dns_handle);
            match dns.get_query_result(query) {
                Ok(addrs) => return addrs.first().copied().ok_or(()),
                Err(GetQueryResultError::Pending) => {}
                Err(e) => {
                    warn!("DNS lookup for '{}' failed: {:?}", host, e);
                    return Err(());
                }
            }
            if now_ms() >= deadline {
                self.sockets
                    .get_mut::<DnsSocket>(self.dns_handle)
                    .cancel_query(query);
                warn!("DNS lookup for '{}' timed out", host);
                return Err(());
            }
            self.delay.delay_millis(POLL_STEP_MS);
        }
    }

    /// One blocking HTTP POST. Returns the status code and a response
    /// excerpt, or `Err` for any transport-level failure.
    fn http_post(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        timeout_ms: u32,
    ) -> Result<(i32, String<BODY_MAX>), ()> {
        let deadline = now_ms() + u64::from(timeout_ms);

        let (host, port, path) = match parse_url(url) {
            Some(parts) => parts,
            None => {
                warn!("Unsupported webhook URL: {}", url);
                return Err(());
            }
        };
        let request = build_request(host, path, headers, body)?;
        let addr = self.resolve(host, deadline)?;

        self.next_port = self.next_port.wrapping_add(1);
        let local_port = EPHEMERAL_PORT_BASE + (self.next_port % 16384);

        let cx = self.iface.context();
        let socket = self.sockets.get_mut::<TcpSocket>(self.tcp_handle);
        socket.abort();
        socket.connect(cx, (addr, port), local_port).map_err(|e| {
            warn!("TCP connect to {}:{} failed: {:?}", addr, port, e);
        })?;

        // Handshake.
        loop {
            self.poll_once();
            let socket = self.sockets.get_mut::<TcpSocket>(self.tcp_handle);
            if socket.may_send() {
                break;
            }
            if !socket.is_open() || now_ms() >= deadline {
                warn!("TCP connect to {}:{} timed out", addr, port);
                socket.abort();
                return Err(());
            }
            self.delay.delay_millis(POLL_STEP_MS);
        }

        // Write the whole request; the buffer may drain across polls.
        let mut sent = 0;
        while sent < request.len() {
            let socket = self.sockets.get_mut::<TcpSocket>(self.tcp_handle);
            match socket.send_slice(request[sent..].as_bytes()) {
                Ok(n) => sent += n,
                Err(e) => {
                    warn!("TCP send failed: {:?}", e);
                    socket.abort();
                    return Err(());
                }
            }
            if now_ms() >= deadline {
                warn!("TCP send timed out");
                self.sockets.get_mut::<TcpSocket>(self.tcp_handle).abort();
                return Err(());
            }
            self.poll_once();
        }

        // Read until the peer closes (`Connection: close`) or the deadline.
        let mut response: Vec<u8, RESPONSE_MAX> = Vec::new();
        loop {
            self.poll_once();
            let socket = self.sockets.get_mut::<TcpSocket>(self.tcp_handle);
            while socket.can_recv() {
                let mut chunk = [0u8; 128];
                match socket.recv_slice(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        for &byte in &chunk[..n] {
                            // Past capacity the rest of the body is dropped.
                            let _ = response.push(byte);
                        }
                    }
                    Err(e) => {
                        warn!("TCP recv failed: {:?}", e);
                        break;
                    }
                }
            }
            if !socket.is_active() {
                break;
            }
            if now_ms() >= deadline {
                // Keep whatever arrived; a parsed status line still counts.
                socket.abort();
                break;
            }
            self.delay.delay_millis(POLL_STEP_MS);
        }

        let socket = self.sockets.get_mut::<TcpSocket>(self.tcp_handle);
        socket.close();
        socket.abort();

        parse_response(&response).ok_or(())
    }
}

/// Split `http://host[:port][/path]`. HTTPS is not supported.
fn parse_url(url: &str) -> Option<(&str, u16, &str)> {
    let rest = url.strip_prefix("http://")?;
    let (hostport, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match hostport.rsplit_once(':') {
        Some((h, p)) => (h, p.parse().ok()?),
        None => (hostport, 80),
    };
    if host.is_empty() {
        return None;
    }
    Some((host, port, path))
}

fn build_request(
    host: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> Result<String<REQUEST_MAX>, ()> {
    let mut request: String<REQUEST_MAX> = String::new();
    write!(
        request,
        "POST {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Length: {}\r\n",
        path,
        host,
        body.len()
    )
    .map_err(|_| ())?;
    for (name, value) in headers {
        write!(request, "{}: {}\r\n", name, value).map_err(|_| ())?;
    }
    write!(request, "\r\n{}", body).map_err(|_| ())?;
    Ok(request)
}

/// Pull the status code and a body excerpt out of a raw HTTP/1.x response.
fn parse_response(raw: &[u8]) -> Option<(i32, String<BODY_MAX>)> {
    let line_end = raw.windows(2).position(|w| w == b"\r\n")?;
    let line = core::str::from_utf8(&raw[..line_end]).ok()?;
    let mut parts = line.split(' ');
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    let code: i32 = parts.next()?.parse().ok()?;

    let mut excerpt: String<BODY_MAX> = String::new();
    if let Some(header_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
        let body = &raw[header_end + 4..];
        let text = match core::str::from_utf8(body) {
            Ok(text) => text,
            // Truncation can split a multi-byte character; keep the prefix.
            Err(e) => core::str::from_utf8(&body[..e.valid_up_to()]).unwrap_or(""),
        };
        for ch in text.chars() {
            if excerpt.push(ch).is_err() {
                break;
            }
        }
    }
    Some((code, excerpt))
}

/// Radio capability over the shared stack.
pub struct RadioHandle<'a, 'd> {
    stack: &'a RefCell<NetStack<'d>>,
}

impl<'a, 'd> RadioHandle<'a, 'd> {
    pub fn new(stack: &'a RefCell<NetStack<'d>>) -> Self {
        Self { stack }
    }
}

impl Radio for RadioHandle<'_, '_> {
    fn begin(&mut self, ssid: &str, password: &str) {
        self.stack.borrow_mut().begin(ssid, password);
    }

    fn status(&mut self) -> RadioStatus {
        self.stack.borrow_mut().status()
    }

    fn disconnect(&mut self, power_off: bool) {
        self.stack.borrow_mut().disconnect(power_off);
    }

    fn radio_off(&mut self) {
        self.stack.borrow_mut().disconnect(true);
    }

    fn local_address(&mut self) -> String<ADDR_MAX> {
        self.stack.borrow_mut().local_address()
    }
}

/// Webhook capability over the shared stack.
pub struct WebhookHandle<'a, 'd> {
    stack: &'a RefCell<NetStack<'d>>,
    last_body: String<BODY_MAX>,
}

impl<'a, 'd> WebhookHandle<'a, 'd> {
    pub fn new(stack: &'a RefCell<NetStack<'d>>) -> Self {
        Self {
            stack,
            last_body: String::new(),
        }
    }
}

impl WebhookClient for WebhookHandle<'_, '_> {
    fn post(&mut self, url: &str, headers: &[(&str, &str)], body: &str, timeout_ms: u32) -> i32 {
        match self
            .stack
            .borrow_mut()
            .http_post(url, headers, body, timeout_ms)
        {
            Ok((code, excerpt)) => {
                self.last_body = excerpt;
                code
            }
            Err(()) => {
                self.last_body = String::new();
                -1
            }
        }
    }

    fn response_body(&mut self) -> String<BODY_MAX> {
        self.last_body.clone()
    }
}
