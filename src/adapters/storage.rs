//! Persistent storage adapter for the allow-list record.
//!
//! Implements [`StoragePort`] on a dedicated raw data partition
//! (`keystore`). The record fits one flash sector, so a write is a
//! sector erase followed by a programming pass.
//!
//! The simulation backend keeps the sector in memory, initialised to the
//! erased-flash pattern so first-boot behavior matches real hardware.

use log::info;

use crate::app::ports::StoragePort;
use crate::error::StorageError;

/// Sector size of the SPI NOR flash backing the partition.
const SECTOR_SIZE: usize = 4096;

#[cfg(target_os = "espidf")]
const PARTITION_LABEL: &core::ffi::CStr = c"keystore";

#[cfg(target_os = "espidf")]
pub struct PartitionStorage {
    partition: *const esp_idf_svc::sys::esp_partition_t,
}

// The partition descriptor is a static table entry; the esp_partition API
// is thread-safe.
#[cfg(target_os = "espidf")]
unsafe impl Send for PartitionStorage {}

#[cfg(target_os = "espidf")]
impl PartitionStorage {
    /// Locate the `keystore` partition. Missing partition table entry is
    /// a fatal configuration error.
    pub fn new() -> Result<Self, StorageError> {
        use esp_idf_svc::sys::*;

        // SAFETY: esp_partition_find_first returns a pointer into the
        // static partition table, valid for the program lifetime.
        let partition = unsafe {
            esp_partition_find_first(
                esp_partition_type_t_ESP_PARTITION_TYPE_DATA,
                esp_partition_subtype_t_ESP_PARTITION_SUBTYPE_ANY,
                PARTITION_LABEL.as_ptr(),
            )
        };
        if partition.is_null() {
            return Err(StorageError::NotReady);
        }
        info!("storage: keystore partition mapped");
        Ok(Self { partition })
    }
}

#[cfg(target_os = "espidf")]
impl StoragePort for PartitionStorage {
    fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        use esp_idf_svc::sys::*;

        // SAFETY: partition pointer validated in new(); buffer bounds are
        // the slice's own.
        let ret = unsafe {
            esp_partition_read(
                self.partition,
                offset as usize,
                buf.as_mut_ptr().cast(),
                buf.len(),
            )
        };
        if ret != ESP_OK as i32 {
            return Err(StorageError::ReadFailed);
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        use esp_idf_svc::sys::*;

        let sector_base = (offset as usize / SECTOR_SIZE) * SECTOR_SIZE;
        // SAFETY: erase-then-program on a sector the record fully owns.
        unsafe {
            let ret = esp_partition_erase_range(self.partition, sector_base, SECTOR_SIZE);
            if ret != ESP_OK as i32 {
                return Err(StorageError::WriteFailed);
            }
            let ret = esp_partition_write(
                self.partition,
                offset as usize,
                data.as_ptr().cast(),
                data.len(),
            );
            if ret != ESP_OK as i32 {
                return Err(StorageError::WriteFailed);
            }
        }
        Ok(())
    }
}

/// In-memory sector for host builds and tests.
#[cfg(not(target_os = "espidf"))]
pub struct PartitionStorage {
    sector: [u8; SECTOR_SIZE],
}

#[cfg(not(target_os = "espidf"))]
impl PartitionStorage {
    pub fn new() -> Result<Self, StorageError> {
        info!("storage: simulation backend (blank sector)");
        Ok(Self {
            sector: [0xFF; SECTOR_SIZE],
        })
    }
}

#[cfg(not(target_os = "espidf"))]
impl StoragePort for PartitionStorage {
    fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        let off = offset as usize;
        let end = off.checked_add(buf.len()).ok_or(StorageError::ReadFailed)?;
        if end > SECTOR_SIZE {
            return Err(StorageError::ReadFailed);
        }
        buf.copy_from_slice(&self.sector[off..end]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        let off = offset as usize;
        let end = off.checked_add(data.len()).ok_or(StorageError::WriteFailed)?;
        if end > SECTOR_SIZE {
            return Err(StorageError::WriteFailed);
        }
        self.sector[off..end].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn blank_sector_reads_as_erased_flash() {
        let storage = PartitionStorage::new().unwrap();
        let mut buf = [0u8; 8];
        storage.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 8]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut storage = PartitionStorage::new().unwrap();
        storage.write(16, &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 4];
        storage.read(16, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let mut storage = PartitionStorage::new().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(
            storage.read(SECTOR_SIZE as u32, &mut buf),
            Err(StorageError::ReadFailed)
        );
        assert_eq!(
            storage.write(SECTOR_SIZE as u32 - 2, &[0; 4]),
            Err(StorageError::WriteFailed)
        );
    }
}
