//! Persistent tag allow-list.
//!
//! Up to six tag UIDs, each at most ten bytes, stored zero-padded in a
//! single storage page. The list is append-only between programming
//! sessions; entering programming mode clears it and re-teaches from
//! scratch.

use log::{debug, warn};

use crate::app::ports::StoragePort;
use crate::error::{AllowListError, StorageError};

pub const MAX_TAGS: usize = 6;
pub const MAX_TAG_LEN: usize = 10;

/// Serialized form: the padded UID slots followed by the entry count.
pub const RECORD_LEN: usize = MAX_TAGS * MAX_TAG_LEN + 1;
/// Absolute storage offset of the record.
pub const RECORD_OFFSET: u32 = 0;

const _: () = assert!(RECORD_LEN <= 64, "record must fit one storage page");

/// A tag UID as reported by the reader, up to [`MAX_TAG_LEN`] bytes.
pub type TagId = heapless::Vec<u8, MAX_TAG_LEN>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    entries: [[u8; MAX_TAG_LEN]; MAX_TAGS],
    count: usize,
}

impl AllowList {
    pub const fn new() -> Self {
        Self {
            entries: [[0; MAX_TAG_LEN]; MAX_TAGS],
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append a UID. Duplicates are allowed; the caller decides whether a
    /// membership check comes first.
    pub fn add(&mut self, uid: &[u8]) -> Result<(), AllowListError> {
        if uid.len() > MAX_TAG_LEN {
            return Err(AllowListError::TagTooLong);
        }
        if self.count >= MAX_TAGS {
            return Err(AllowListError::ListFull);
        }
        let slot = &mut self.entries[self.count];
        *slot = [0; MAX_TAG_LEN];
        slot[..uid.len()].copy_from_slice(uid);
        self.count += 1;
        Ok(())
    }

    /// Membership test. Compares the probe against the leading bytes of
    /// each stored slot, so a probe shorter than a stored UID matches if
    /// the prefix agrees.
    pub fn contains(&self, uid: &[u8]) -> bool {
        if uid.len() > MAX_TAG_LEN {
            return false;
        }
        self.entries[..self.count]
            .iter()
            .any(|slot| &slot[..uid.len()] == uid)
    }

    pub fn clear(&mut self) {
        self.entries = [[0; MAX_TAG_LEN]; MAX_TAGS];
        self.count = 0;
    }

    fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut rec = [0u8; RECORD_LEN];
        for (i, slot) in self.entries.iter().enumerate() {
            rec[i * MAX_TAG_LEN..(i + 1) * MAX_TAG_LEN].copy_from_slice(slot);
        }
        rec[RECORD_LEN - 1] = self.count as u8;
        rec
    }

    fn from_record(rec: &[u8; RECORD_LEN]) -> Self {
        let mut list = Self::new();
        for (i, slot) in list.entries.iter_mut().enumerate() {
            slot.copy_from_slice(&rec[i * MAX_TAG_LEN..(i + 1) * MAX_TAG_LEN]);
        }
        // Blank storage reads as garbage; clamp so indexing stays in range.
        list.count = (rec[RECORD_LEN - 1] as usize).min(MAX_TAGS);
        list
    }

    /// Load the record from storage. Failure here is fatal for startup:
    /// running with an unknown access list is worse than not running.
    pub fn load(storage: &dyn StoragePort) -> Result<Self, StorageError> {
        let mut rec = [0u8; RECORD_LEN];
        storage.read(RECORD_OFFSET, &mut rec)?;
        let list = Self::from_record(&rec);
        debug!("allow-list loaded, {} entries", list.count);
        Ok(list)
    }

    /// Persist the record. A failed write keeps the in-memory list usable
    /// until the next power cycle; the caller only gets a log line.
    pub fn save(&self, storage: &mut dyn StoragePort) {
        match storage.write(RECORD_OFFSET, &self.to_record()) {
            Ok(()) => {
                for slot in &self.entries[..self.count] {
                    debug!("allow-list entry {slot:02x?}");
                }
            }
            Err(e) => warn!("allow-list save failed: {e}, keeping in-memory list"),
        }
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PageStorage {
        page: [u8; 64],
        fail_writes: bool,
    }

    impl PageStorage {
        fn new() -> Self {
            Self {
                page: [0xFF; 64],
                fail_writes: false,
            }
        }
    }

    impl StoragePort for PageStorage {
        fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
            let off = offset as usize;
            buf.copy_from_slice(&self.page[off..off + buf.len()]);
            Ok(())
        }

        fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::WriteFailed);
            }
            let off = offset as usize;
            self.page[off..off + data.len()].copy_from_slice(data);
            Ok(())
        }
    }

    #[test]
    fn add_and_contains() {
        let mut list = AllowList::new();
        list.add(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert!(list.contains(&[0xDE, 0xAD, 0xBE, 0xEF]));
        assert!(!list.contains(&[0xDE, 0xAD, 0xBE, 0xEE]));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn shorter_probe_matches_on_prefix() {
        let mut list = AllowList::new();
        list.add(&[0x04, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]).unwrap();
        assert!(list.contains(&[0x04, 0x12, 0x34]));
        assert!(!list.contains(&[0x04, 0x12, 0x35]));
    }

    #[test]
    fn capacity_and_length_limits() {
        let mut list = AllowList::new();
        assert_eq!(list.add(&[0u8; 11]), Err(AllowListError::TagTooLong));
        for i in 0..MAX_TAGS as u8 {
            list.add(&[i, i, i, i]).unwrap();
        }
        assert_eq!(list.add(&[0xAA]), Err(AllowListError::ListFull));
        assert_eq!(list.len(), MAX_TAGS);
    }

    #[test]
    fn duplicates_accumulate() {
        let mut list = AllowList::new();
        list.add(&[1, 2, 3]).unwrap();
        list.add(&[1, 2, 3]).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut storage = PageStorage::new();
        let mut list = AllowList::new();
        list.add(&[0x11, 0x22]).unwrap();
        list.add(&[0x33, 0x44, 0x55, 0x66, 0x77]).unwrap();
        list.save(&mut storage);

        let loaded = AllowList::load(&storage).unwrap();
        assert_eq!(loaded, list);
        assert!(loaded.contains(&[0x33, 0x44, 0x55, 0x66, 0x77]));
    }

    #[test]
    fn load_clamps_garbage_count() {
        let storage = PageStorage::new(); // blank flash, count byte 0xFF
        let loaded = AllowList::load(&storage).unwrap();
        assert_eq!(loaded.len(), MAX_TAGS);
    }

    #[test]
    fn failed_save_keeps_in_memory_list() {
        let mut storage = PageStorage::new();
        storage.fail_writes = true;
        let mut list = AllowList::new();
        list.add(&[9, 9]).unwrap();
        list.save(&mut storage);
        assert!(list.contains(&[9, 9]));
    }
}
