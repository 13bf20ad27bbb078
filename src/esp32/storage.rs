//! Credential storage in ESP32 internal flash.
//!
//! `esp-storage`'s `FlashStorage` implements the `embedded-storage`
//! `NorFlash` traits, so the generic [`FlashCredentialStore`] from the core
//! plugs straight in. One 4 KB sector is reserved for the record.

use crate::config::{FLASH_SECTOR_SIZE, STORAGE_FLASH_SECTOR};
use crate::storage::FlashCredentialStore;
use esp_storage::FlashStorage;

/// Credential store over the reserved internal-flash sector.
pub fn flash_credential_store() -> FlashCredentialStore<FlashStorage> {
    FlashCredentialStore::new(
        FlashStorage::new(),
        STORAGE_FLASH_SECTOR * FLASH_SECTOR_SIZE,
        FLASH_SECTOR_SIZE,
    )
}
