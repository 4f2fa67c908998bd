use crate::types::{
    ID_BITMAP_SIZE, IDS_PER_PAGE, INVALID_PAGE_ID, PAGE_CLEAN, PAGE_HEADER_SIZE, PAGE_SIZE,
    PageId, RECORD_REGION_END, RecordId, SLOT_DELETED, SLOT_OCCUPIED, SLOT_SIZE,
    error::{Result, StorageError},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub offset: u16, // Offset from the beginning of the record region
    pub length: u16, // Length of the record bytes
    pub flags: u8,
    pub record_id: RecordId,
}

impl Slot {
    pub fn is_occupied(&self) -> bool {
        self.flags & SLOT_OCCUPIED != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.flags & SLOT_DELETED != 0
    }
}

/*
 * Page Layout on Disk (Slotted Page Structure)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                    PAGE HEADER (32 bytes)                       │
 * │  page_id(4) | slot_count(2) | free_space(2) |                   │
 * │  free_space_offset(2) | next_page_id(4) | flags(1) | lsn(4) |   │
 * │  id_range_start(4) | id_range_end(4) | reserved(5)              │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    SLOT ARRAY (append-only)                     │
 * │  [slot0: offset(2)|len(2)|flags(1)|record_id(4)] [slot1] ...    │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    RECORD REGION                                │
 * │  [...record 0...] [...record 1...] [...record 2...]            │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    FREE SPACE                                   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    ID BITMAP (128 bytes)                        │
 * │  one bit per record id in [id_range_start, id_range_end)        │
 * └─────────────────────────────────────────────────────────────────┘
 */

#[derive(Debug)]
pub struct Page {
    pub page_id: PageId,
    pub next_page_id: Option<PageId>,
    pub is_dirty: bool,
    pub lsn: u32,

    // Record-id block assigned to this page
    pub id_range_start: RecordId,
    pub id_range_end: RecordId,

    // Slotted page structure
    pub slots: Vec<Slot>,
    pub free_space: u16,

    // Record region bytes; slot offsets point into this buffer
    pub data: Vec<u8>,

    pub id_bitmap: [u8; ID_BITMAP_SIZE],
}

impl Page {
    pub fn new(page_id: PageId, id_range_start: RecordId) -> Self {
        Self {
            page_id,
            next_page_id: None,
            is_dirty: false,
            lsn: 0,
            id_range_start,
            id_range_end: id_range_start + IDS_PER_PAGE,
            slots: Vec::new(),
            free_space: (PAGE_SIZE - PAGE_HEADER_SIZE) as u16,
            data: Vec::new(),
            id_bitmap: [0u8; ID_BITMAP_SIZE],
        }
    }

    /// Largest record a single empty page can hold.
    pub fn max_record_len() -> usize {
        RECORD_REGION_END - PAGE_HEADER_SIZE - SLOT_SIZE
    }

    pub fn available_space(&self) -> usize {
        self.free_space as usize
    }

    fn occupied_bytes(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.is_occupied())
            .map(|slot| slot.length as usize)
            .sum()
    }

    /// Whether the page could hold `data_size` more record bytes, compacting if needed.
    pub fn can_fit(&self, data_size: usize) -> bool {
        let packed_end =
            PAGE_HEADER_SIZE + (self.slots.len() + 1) * SLOT_SIZE + self.occupied_bytes();
        self.free_space as usize >= SLOT_SIZE + data_size
            && packed_end + data_size <= RECORD_REGION_END
    }

    // Room at the current end of the record region, without compaction
    fn fits_in_place(&self, data_size: usize) -> bool {
        let region_end = PAGE_HEADER_SIZE + (self.slots.len() + 1) * SLOT_SIZE + self.data.len();
        self.free_space as usize >= SLOT_SIZE + data_size
            && region_end + data_size <= RECORD_REGION_END
    }

    /// Insert a record under the given id. Returns `None` when the page is out
    /// of room even after compaction; the caller moves on to another page.
    pub fn insert_record(&mut self, record_id: RecordId, data: &[u8]) -> Option<RecordId> {
        if !self.fits_in_place(data.len()) {
            if !self.can_fit(data.len()) {
                return None;
            }
            self.compact_page();
        }

        let offset = self.data.len() as u16;
        self.data.extend_from_slice(data);
        self.slots.push(Slot {
            offset,
            length: data.len() as u16,
            flags: SLOT_OCCUPIED,
            record_id,
        });

        self.free_space -= (SLOT_SIZE + data.len()) as u16;
        self.lsn += 1;
        self.is_dirty = true;

        Some(record_id)
    }

    pub fn get_record(&self, record_id: RecordId) -> Option<&[u8]> {
        self.slots
            .iter()
            .find(|slot| slot.is_occupied() && slot.record_id == record_id)
            .map(|slot| {
                let start = slot.offset as usize;
                let end = start + slot.length as usize;
                &self.data[start..end]
            })
    }

    /// Rewrite a record in place when it shrinks, or re-place it after
    /// compaction when it grows. Returns false when the record is not on this
    /// page or the grown copy does not fit; records never migrate between
    /// pages on update failure.
    pub fn update_record(&mut self, record_id: RecordId, data: &[u8]) -> bool {
        let Some(index) = self
            .slots
            .iter()
            .position(|slot| slot.is_occupied() && slot.record_id == record_id)
        else {
            return false;
        };

        let old_len = self.slots[index].length as usize;
        let new_len = data.len();

        if new_len <= old_len {
            let start = self.slots[index].offset as usize;
            self.data[start..start + new_len].copy_from_slice(data);
            self.slots[index].length = new_len as u16;
            self.free_space += (old_len - new_len) as u16;
            self.lsn += 1;
            self.is_dirty = true;
            return true;
        }

        let packed_end = PAGE_HEADER_SIZE
            + self.slots.len() * SLOT_SIZE
            + self.occupied_bytes()
            - old_len
            + new_len;
        if (self.free_space as usize) + old_len < new_len || packed_end > RECORD_REGION_END {
            return false;
        }

        // Drop the old copy, repack, then append the grown copy at the end.
        self.slots[index].flags = SLOT_DELETED;
        self.free_space += old_len as u16;
        self.compact_page();

        let offset = self.data.len() as u16;
        self.data.extend_from_slice(data);
        let slot = &mut self.slots[index];
        slot.offset = offset;
        slot.length = new_len as u16;
        slot.flags = SLOT_OCCUPIED;

        self.free_space -= new_len as u16;
        self.lsn += 1;
        self.is_dirty = true;

        true
    }

    /// Tombstone a record. The slot entry stays behind so the id is never
    /// issued again; the bytes become reusable after compaction.
    pub fn delete_record(&mut self, record_id: RecordId) -> bool {
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_occupied() && slot.record_id == record_id)
        else {
            return false;
        };

        slot.flags = SLOT_DELETED;
        self.free_space += slot.length;
        self.lsn += 1;
        self.is_dirty = true;

        true
    }

    /// Repack occupied records contiguously in slot order. Tombstoned slot
    /// entries keep their stale offsets; they are never read.
    pub fn compact_page(&mut self) {
        let mut packed = Vec::with_capacity(self.occupied_bytes());
        for slot in &mut self.slots {
            if slot.flags & SLOT_OCCUPIED == 0 {
                continue;
            }
            let start = slot.offset as usize;
            let end = start + slot.length as usize;
            slot.offset = packed.len() as u16;
            packed.extend_from_slice(&self.data[start..end]);
        }
        self.data = packed;
        self.is_dirty = true;
    }

    /// Next unissued id in this page's block. Derived from the slot array
    /// high-water mark so ids survive deletes and reloads without reuse.
    pub fn next_available_id(&self) -> Option<RecordId> {
        let issued = self
            .slots
            .iter()
            .map(|slot| slot.record_id - self.id_range_start + 1)
            .max()
            .unwrap_or(0);
        let candidate = self.id_range_start + issued;
        if candidate < self.id_range_end {
            Some(candidate)
        } else {
            None
        }
    }

    pub fn contains_id(&self, record_id: RecordId) -> bool {
        record_id >= self.id_range_start && record_id < self.id_range_end
    }

    pub fn mark_id_used(&mut self, record_id: RecordId) {
        if !self.contains_id(record_id) {
            return;
        }
        let index = (record_id - self.id_range_start) as usize;
        self.id_bitmap[index / 8] |= 1 << (index % 8);
    }

    pub fn clear_id(&mut self, record_id: RecordId) {
        if !self.contains_id(record_id) {
            return;
        }
        let index = (record_id - self.id_range_start) as usize;
        self.id_bitmap[index / 8] &= !(1 << (index % 8));
    }

    pub fn is_id_used(&self, record_id: RecordId) -> bool {
        if !self.contains_id(record_id) {
            return false;
        }
        let index = (record_id - self.id_range_start) as usize;
        self.id_bitmap[index / 8] & (1 << (index % 8)) != 0
    }

    /// Serialize the page to bytes following the documented layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let slot_bytes = self.slots.len() * SLOT_SIZE;
        let data_start = PAGE_HEADER_SIZE + slot_bytes;
        if data_start + self.data.len() > RECORD_REGION_END {
            return Err(StorageError::CorruptPage {
                page_id: self.page_id,
                reason: "Record region extends into the id bitmap".to_string(),
            });
        }

        let mut buffer = vec![0u8; PAGE_SIZE];
        let mut offset = 0;

        // Write PAGE HEADER (32 bytes total)
        // page_id (4 bytes)
        buffer[offset..offset + 4].copy_from_slice(&self.page_id.to_le_bytes());
        offset += 4;

        // slot_count (2 bytes)
        buffer[offset..offset + 2].copy_from_slice(&(self.slots.len() as u16).to_le_bytes());
        offset += 2;

        // free_space (2 bytes)
        buffer[offset..offset + 2].copy_from_slice(&self.free_space.to_le_bytes());
        offset += 2;

        // free_space_offset (2 bytes) - length of the record region
        buffer[offset..offset + 2].copy_from_slice(&(self.data.len() as u16).to_le_bytes());
        offset += 2;

        // next_page_id (4 bytes) - u32::MAX represents None
        let next_page_id = self.next_page_id.unwrap_or(INVALID_PAGE_ID);
        buffer[offset..offset + 4].copy_from_slice(&next_page_id.to_le_bytes());
        offset += 4;

        // flags (1 byte) - the dirty bit never reaches disk
        buffer[offset] = PAGE_CLEAN;
        offset += 1;

        // lsn (4 bytes)
        buffer[offset..offset + 4].copy_from_slice(&self.lsn.to_le_bytes());
        offset += 4;

        // id_range_start (4 bytes)
        buffer[offset..offset + 4].copy_from_slice(&self.id_range_start.to_le_bytes());
        offset += 4;

        // id_range_end (4 bytes)
        buffer[offset..offset + 4].copy_from_slice(&self.id_range_end.to_le_bytes());
        offset += 4;

        // reserved space (5 bytes) - pad to PAGE_HEADER_SIZE
        offset = PAGE_HEADER_SIZE;

        // Write SLOT ARRAY
        for slot in &self.slots {
            buffer[offset..offset + 2].copy_from_slice(&slot.offset.to_le_bytes());
            offset += 2;
            buffer[offset..offset + 2].copy_from_slice(&slot.length.to_le_bytes());
            offset += 2;
            buffer[offset] = slot.flags;
            offset += 1;
            buffer[offset..offset + 4].copy_from_slice(&slot.record_id.to_le_bytes());
            offset += 4;
        }

        // Write RECORD REGION
        buffer[data_start..data_start + self.data.len()].copy_from_slice(&self.data);

        // Write ID BITMAP
        buffer[RECORD_REGION_END..PAGE_SIZE].copy_from_slice(&self.id_bitmap);

        Ok(buffer)
    }

    /// Deserialize a page from bytes, validating every structural field.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(StorageError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }

        let mut offset = 0;

        // page_id (4 bytes)
        let page_id = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;

        // slot_count (2 bytes)
        let slot_count = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;

        // free_space (2 bytes)
        let free_space = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;

        // free_space_offset (2 bytes)
        let free_space_offset = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;

        // next_page_id (4 bytes)
        let next_page_id_raw = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        let next_page_id = if next_page_id_raw == INVALID_PAGE_ID {
            None
        } else {
            Some(next_page_id_raw)
        };
        offset += 4;

        // flags (1 byte) - a stale dirty bit on disk is not resurrected
        offset += 1;

        // lsn (4 bytes)
        let lsn = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;

        // id_range_start (4 bytes)
        let id_range_start = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;

        // id_range_end (4 bytes)
        let id_range_end = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;

        // Skip reserved space to reach end of header
        offset = PAGE_HEADER_SIZE;

        if id_range_start.checked_add(IDS_PER_PAGE) != Some(id_range_end) {
            return Err(StorageError::CorruptPage {
                page_id,
                reason: format!("Invalid id range [{}, {})", id_range_start, id_range_end),
            });
        }

        if slot_count as u32 > IDS_PER_PAGE {
            return Err(StorageError::CorruptPage {
                page_id,
                reason: format!("Slot count {} exceeds page id capacity", slot_count),
            });
        }

        let slot_bytes = slot_count as usize * SLOT_SIZE;
        let data_start = PAGE_HEADER_SIZE + slot_bytes;
        if data_start + free_space_offset as usize > RECORD_REGION_END {
            return Err(StorageError::CorruptPage {
                page_id,
                reason: format!(
                    "Record region of {} bytes extends into the id bitmap",
                    free_space_offset
                ),
            });
        }

        // Read SLOT ARRAY
        let mut slots = Vec::with_capacity(slot_count as usize);
        for _ in 0..slot_count {
            let slot_offset = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
            offset += 2;
            let length = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
            offset += 2;
            let flags = bytes[offset];
            offset += 1;
            let record_id = u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
            offset += 4;

            let slot = Slot {
                offset: slot_offset,
                length,
                flags,
                record_id,
            };

            // Tombstoned slots may carry stale offsets; only occupied slots
            // must point at live bytes. Record ids must sit in the page's id
            // block either way, since id allocation reads every slot.
            if slot.is_occupied()
                && slot.offset as usize + slot.length as usize > free_space_offset as usize
            {
                return Err(StorageError::CorruptPage {
                    page_id,
                    reason: format!(
                        "Slot at offset {} with length {} exceeds the record region",
                        slot.offset, slot.length
                    ),
                });
            }
            if record_id < id_range_start || record_id >= id_range_end {
                return Err(StorageError::CorruptPage {
                    page_id,
                    reason: format!("Record id {} outside the page id range", record_id),
                });
            }

            slots.push(slot);
        }

        // The space accounting identity must hold for every well-formed page
        let occupied: usize = slots
            .iter()
            .filter(|slot| slot.is_occupied())
            .map(|slot| slot.length as usize)
            .sum();
        let expected_free = PAGE_SIZE - PAGE_HEADER_SIZE - slot_bytes - occupied;
        if free_space as usize != expected_free {
            return Err(StorageError::CorruptPage {
                page_id,
                reason: format!(
                    "Free space accounting mismatch: header says {}, layout says {}",
                    free_space, expected_free
                ),
            });
        }

        // Read RECORD REGION
        let data = bytes[data_start..data_start + free_space_offset as usize].to_vec();

        // Read ID BITMAP
        let mut id_bitmap = [0u8; ID_BITMAP_SIZE];
        id_bitmap.copy_from_slice(&bytes[RECORD_REGION_END..PAGE_SIZE]);

        Ok(Page {
            page_id,
            next_page_id,
            is_dirty: false, // Freshly loaded page is not dirty
            lsn,
            id_range_start,
            id_range_end,
            slots,
            free_space,
            data,
            id_bitmap,
        })
    }
}
