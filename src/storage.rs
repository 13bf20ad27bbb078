//! Persistent storage for WiFi credentials.
//!
//! The credential record is hand-serialized into a fixed-layout byte buffer
//! and kept in a reserved internal-flash sector reached through the
//! `embedded-storage` `NorFlash` traits (on target: `esp-storage`).
//!
//! Record layout:
//!   `[2 magic][1 version][1 ssid_len][1 pass_len][ssid bytes][pass bytes]`
//!
//! Anything that fails validation - wrong magic, bad lengths, invalid UTF-8,
//! erased flash - reads back as "no credentials stored", never as an error
//! the control flow has to handle.

use crate::error::Error;
use embedded_storage::nor_flash::NorFlash;
use heapless::String;
use log::{debug, warn};

/// Maximum SSID length (bytes), per 802.11.
pub const SSID_MAX: usize = 32;

/// Maximum WPA passphrase length (bytes).
pub const PASS_MAX: usize = 64;

/// Record magic: "Tb".
const RECORD_MAGIC: [u8; 2] = [0x54, 0x62];

/// Bump when the record layout changes.
const RECORD_VERSION: u8 = 1;

const HEADER_LEN: usize = 5;

/// Serialized record buffer size, rounded up so the buffer length is a
/// multiple of any power-of-two flash write granularity up to 128.
pub const RECORD_BUF_LEN: usize = 128;

/// A WiFi network name and passphrase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: String<SSID_MAX>,
    pub password: String<PASS_MAX>,
}

impl Credentials {
    /// Build credentials from string slices. Oversized input is truncated.
    pub fn new(ssid: &str, password: &str) -> Self {
        let mut s: String<SSID_MAX> = String::new();
        for c in ssid.chars() {
            if s.push(c).is_err() {
                break;
            }
        }
        let mut p: String<PASS_MAX> = String::new();
        for c in password.chars() {
            if p.push(c).is_err() {
                break;
            }
        }
        Self { ssid: s, password: p }
    }

    /// Serialize into `buf`, returning the number of bytes written.
    /// Returns 0 if the buffer is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let ssid = self.ssid.as_bytes();
        let pass = self.password.as_bytes();
        let total = HEADER_LEN + ssid.len() + pass.len();
        if buf.len() < total {
            return 0;
        }

        buf[0..2].copy_from_slice(&RECORD_MAGIC);
        buf[2] = RECORD_VERSION;
        buf[3] = ssid.len() as u8;
        buf[4] = pass.len() as u8;
        buf[HEADER_LEN..HEADER_LEN + ssid.len()].copy_from_slice(ssid);
        buf[HEADER_LEN + ssid.len()..total].copy_from_slice(pass);
        total
    }

    /// Parse a record. `None` for anything that does not validate.
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }
        if data[0..2] != RECORD_MAGIC || data[2] != RECORD_VERSION {
            return None;
        }

        let ssid_len = data[3] as usize;
        let pass_len = data[4] as usize;
        if ssid_len > SSID_MAX || pass_len > PASS_MAX {
            return None;
        }
        if data.len() < HEADER_LEN + ssid_len + pass_len {
            return None;
        }

        let ssid = core::str::from_utf8(&data[HEADER_LEN..HEADER_LEN + ssid_len]).ok()?;
        let pass = core::str::from_utf8(
            &data[HEADER_LEN + ssid_len..HEADER_LEN + ssid_len + pass_len],
        )
        .ok()?;

        Some(Self::new(ssid, pass))
    }
}

/// Scoped access to the persisted credential record.
///
/// Implementations acquire their backend per call and release it before
/// returning - a load must not leave a read-write handle open.
pub trait CredentialStore {
    /// Read the stored credentials, if a valid record exists.
    fn load(&mut self) -> Option<Credentials>;

    /// Persist `credentials`, replacing any previous record.
    fn save(&mut self, credentials: &Credentials) -> Result<(), Error>;
}

/// Credential store over one erase sector of a NOR flash.
pub struct FlashCredentialStore<F> {
    flash: F,
    /// Byte offset of the reserved sector.
    offset: u32,
    /// Sector size (erase granularity).
    sector_size: u32,
}

impl<F: NorFlash> FlashCredentialStore<F> {
    pub fn new(flash: F, offset: u32, sector_size: u32) -> Self {
        Self {
            flash,
            offset,
            sector_size,
        }
    }
}

impl<F: NorFlash> CredentialStore for FlashCredentialStore<F> {
    fn load(&mut self) -> Option<Credentials> {
        let mut buf = [0u8; RECORD_BUF_LEN];
        if let Err(e) = self.flash.read(self.offset, &mut buf) {
            warn!("flash read failed: {:?}", e);
            return None;
        }
        let record = Credentials::deserialize(&buf);
        if record.is_none() {
            debug!("no credential record in flash");
        }
        record
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), Error> {
        let mut buf = [0u8; RECORD_BUF_LEN];
        if credentials.serialize(&mut buf) == 0 {
            return Err(Error::BufferOverflow);
        }

        self.flash
            .erase(self.offset, self.offset + self.sector_size)
            .map_err(|_| Error::Storage)?;
        self.flash
            .write(self.offset, &buf)
            .map_err(|_| Error::Storage)?;
        debug!("credential record written to flash");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_storage::nor_flash::{
        ErrorType, NorFlashError, NorFlashErrorKind, ReadNorFlash,
    };

    #[test]
    fn roundtrip_preserves_both_fields() {
        let creds = Credentials::new("HomeNet", "secret123");
        let mut buf = [0u8; RECORD_BUF_LEN];
        let written = creds.serialize(&mut buf);
        assert_eq!(written, HEADER_LEN + 7 + 9);
        assert_eq!(Credentials::deserialize(&buf), Some(creds));
    }

    #[test]
    fn empty_password_roundtrips() {
        let creds = Credentials::new("OpenNet", "");
        let mut buf = [0u8; RECORD_BUF_LEN];
        assert!(creds.serialize(&mut buf) > 0);
        assert_eq!(Credentials::deserialize(&buf), Some(creds));
    }

    #[test]
    fn erased_flash_reads_as_no_record() {
        // Fresh NOR flash is all 0xFF - magic cannot match.
        let buf = [0xFFu8; RECORD_BUF_LEN];
        assert_eq!(Credentials::deserialize(&buf), None);
    }

    #[test]
    fn wrong_magic_or_version_is_rejected() {
        let creds = Credentials::new("net", "pw");
        let mut buf = [0u8; RECORD_BUF_LEN];
        creds.serialize(&mut buf);

        let mut bad_magic = buf;
        bad_magic[0] ^= 0xFF;
        assert_eq!(Credentials::deserialize(&bad_magic), None);

        let mut bad_version = buf;
        bad_version[2] = RECORD_VERSION + 1;
        assert_eq!(Credentials::deserialize(&bad_version), None);
    }

    #[test]
    fn oversized_length_fields_are_rejected() {
        let creds = Credentials::new("net", "pw");
        let mut buf = [0u8; RECORD_BUF_LEN];
        creds.serialize(&mut buf);
        buf[3] = (SSID_MAX + 1) as u8;
        assert_eq!(Credentials::deserialize(&buf), None);
    }

    #[test]
    fn serialize_fails_gracefully_on_tiny_buffer() {
        let creds = Credentials::new("HomeNet", "secret123");
        let mut buf = [0u8; 4];
        assert_eq!(creds.serialize(&mut buf), 0);
    }

    #[test]
    fn long_inputs_are_truncated_to_capacity() {
        let long = "x".repeat(100);
        let creds = Credentials::new(&long, &long);
        assert_eq!(creds.ssid.len(), SSID_MAX);
        assert_eq!(creds.password.len(), PASS_MAX);
    }

    // RAM-backed NOR flash with 4-byte write granularity.
    struct MemFlash {
        data: Vec<u8>,
    }

    impl MemFlash {
        fn new() -> Self {
            Self {
                data: vec![0xFF; 8192],
            }
        }
    }

    #[derive(Debug)]
    struct MemFlashError;

    impl NorFlashError for MemFlashError {
        fn kind(&self) -> NorFlashErrorKind {
            NorFlashErrorKind::Other
        }
    }

    impl ErrorType for MemFlash {
        type Error = MemFlashError;
    }

    impl ReadNorFlash for MemFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.data.len()
        }
    }

    impl NorFlash for MemFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = 4096;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            self.data[from as usize..to as usize].fill(0xFF);
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            assert_eq!(bytes.len() % Self::WRITE_SIZE, 0);
            let start = offset as usize;
            self.data[start..start + bytes.len()].copy_from_slice(bytes);
            Ok(())
        }
    }

    #[test]
    fn flash_store_load_save_cycle() {
        let mut store = FlashCredentialStore::new(MemFlash::new(), 4096, 4096);
        assert_eq!(store.load(), None);

        let creds = Credentials::new("HomeNet", "secret123");
        store.save(&creds).unwrap();
        assert_eq!(store.load(), Some(creds.clone()));

        // Re-saving overwrites the previous record.
        let other = Credentials::new("OtherNet", "hunter2");
        store.save(&other).unwrap();
        assert_eq!(store.load(), Some(other));
    }
}
