//! Collection meta record
//!
//! Every live collection has exactly one meta record, stored under its meta
//! key. The record names the current version (`id`) whose data keys hold
//! the members, the collection type, and the cardinality, which every
//! mutating operation updates in the same transaction as the data keys.
//!
//! ## Format (big-endian, fixed width)
//!
//! ```text
//! magic[2] "TM" | format:u8 | type:u8 | id[16] | len:u64
//!   | created_at:u64 | updated_at:u64 | expire_at:u64
//! ```
//!
//! `expire_at == 0` means the collection never expires.

use byteorder::{BigEndian, ByteOrder};
use tessera_core::{Error, ObjectId, ObjectType, Result, Timestamp};

/// Leading bytes of every encoded meta record
pub const META_MAGIC: [u8; 2] = *b"TM";

/// Current meta record layout
pub const META_FORMAT_VERSION: u8 = 1;

/// Encoded size in bytes
pub const META_ENCODED_LEN: usize = 2 + 1 + 1 + ObjectId::LEN + 8 * 4;

const ID_OFFSET: usize = 4;
const LEN_OFFSET: usize = ID_OFFSET + ObjectId::LEN;
const CREATED_OFFSET: usize = LEN_OFFSET + 8;
const UPDATED_OFFSET: usize = CREATED_OFFSET + 8;
const EXPIRE_OFFSET: usize = UPDATED_OFFSET + 8;

/// Descriptor of one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    /// Version identifier; data keys live under this id
    pub id: ObjectId,
    /// Collection type
    pub object_type: ObjectType,
    /// Number of members (or fields)
    pub len: u64,
    /// When this version was created
    pub created_at: Timestamp,
    /// Last mutation
    pub updated_at: Timestamp,
    /// Expiration time; `Timestamp::EPOCH` for none
    pub expire_at: Timestamp,
}

impl Meta {
    /// Fresh, empty descriptor with a new version id
    pub fn new(object_type: ObjectType, now: Timestamp) -> Self {
        Self {
            id: ObjectId::new(),
            object_type,
            len: 0,
            created_at: now,
            updated_at: now,
            expire_at: Timestamp::EPOCH,
        }
    }

    /// True if an expiration is set
    pub fn has_expiry(&self) -> bool {
        !self.expire_at.is_epoch()
    }

    /// True if the collection expired at or before `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.has_expiry() && self.expire_at <= now
    }

    /// Encode to the fixed binary layout
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; META_ENCODED_LEN];
        buf[..2].copy_from_slice(&META_MAGIC);
        buf[2] = META_FORMAT_VERSION;
        buf[3] = self.object_type.as_byte();
        buf[ID_OFFSET..LEN_OFFSET].copy_from_slice(self.id.as_bytes());
        BigEndian::write_u64(&mut buf[LEN_OFFSET..CREATED_OFFSET], self.len);
        BigEndian::write_u64(
            &mut buf[CREATED_OFFSET..UPDATED_OFFSET],
            self.created_at.as_millis(),
        );
        BigEndian::write_u64(
            &mut buf[UPDATED_OFFSET..EXPIRE_OFFSET],
            self.updated_at.as_millis(),
        );
        BigEndian::write_u64(&mut buf[EXPIRE_OFFSET..], self.expire_at.as_millis());
        buf
    }

    /// Decode a stored record
    ///
    /// # Errors
    ///
    /// Returns `Error::Corruption` if the bytes are not a meta record of a
    /// known format and type.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_ENCODED_LEN {
            return Err(Error::corruption(format!(
                "meta record has length {}, expected {}",
                bytes.len(),
                META_ENCODED_LEN
            )));
        }
        if bytes[..2] != META_MAGIC {
            return Err(Error::corruption("meta record has bad magic"));
        }
        if bytes[2] != META_FORMAT_VERSION {
            return Err(Error::corruption(format!(
                "unsupported meta format version {}",
                bytes[2]
            )));
        }
        let object_type = ObjectType::from_byte(bytes[3])
            .ok_or_else(|| Error::corruption(format!("unknown object type tag {:#04x}", bytes[3])))?;
        let id = ObjectId::from_slice(&bytes[ID_OFFSET..LEN_OFFSET])
            .ok_or_else(|| Error::corruption("meta record has bad id"))?;

        Ok(Self {
            id,
            object_type,
            len: BigEndian::read_u64(&bytes[LEN_OFFSET..CREATED_OFFSET]),
            created_at: Timestamp::from_millis(BigEndian::read_u64(
                &bytes[CREATED_OFFSET..UPDATED_OFFSET],
            )),
            updated_at: Timestamp::from_millis(BigEndian::read_u64(
                &bytes[UPDATED_OFFSET..EXPIRE_OFFSET],
            )),
            expire_at: Timestamp::from_millis(BigEndian::read_u64(&bytes[EXPIRE_OFFSET..])),
        })
    }
}
