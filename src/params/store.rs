//! Versioned, checksummed parameter record.
//!
//! Byte layout, all fields little-endian:
//!
//! ```text
//! | value 0 (4) | value 1 (4) | ... | version (4) | crc32 (4) |
//! ```
//!
//! Values appear in the tree's depth-first declaration order. The CRC covers
//! everything before it, version included.

use std::collections::BTreeMap;
use std::fmt;

use crc::{CRC_32_ISO_HDLC, Crc};

use super::storage::Storage;
use super::{Leaf, LeafKind, Node, ParamId, Value, ops};

/// Current record schema. Records stamped with another version are ignored.
pub const SCHEMA_VERSION: u32 = 1;

const FIELD_LEN: usize = 4;

/// CRC-32 (ISO HDLC, the zip/ethernet polynomial).
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Valid,
    ChecksumMismatch { stored: u32, computed: u32 },
    VersionMismatch { stored: u32, expected: u32 },
}

impl RecordStatus {
    pub fn is_valid(self) -> bool {
        self == RecordStatus::Valid
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Valid => f.write_str("valid"),
            RecordStatus::ChecksumMismatch { stored, computed } => {
                write!(f, "checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")
            }
            RecordStatus::VersionMismatch { stored, expected } => {
                write!(f, "version mismatch (stored {stored}, expected {expected})")
            }
        }
    }
}

/// Committed value of every persisted leaf.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<ParamId, Value>,
}

impl Record {
    pub fn get(&self, id: ParamId) -> Option<Value> {
        self.values.get(&id).copied()
    }

    pub fn set(&mut self, id: ParamId, value: Value) {
        self.values.insert(id, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Field order of the record for one tree.
#[derive(Debug, Clone)]
pub struct Layout {
    leaves: Vec<Leaf>,
}

impl Layout {
    pub fn of(nodes: &[Node]) -> Self {
        Self {
            leaves: ops::persisted_leaves(nodes),
        }
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Total size in bytes, version and checksum included.
    pub fn record_len(&self) -> usize {
        self.data_len() + 2 * FIELD_LEN
    }

    fn data_len(&self) -> usize {
        self.leaves.len() * FIELD_LEN
    }

    /// Serialize `record` stamped with `version`. Fields missing from the
    /// record are written as their defaults.
    pub fn encode(&self, record: &Record, version: u32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.record_len());
        for leaf in &self.leaves {
            let value = record.get(leaf.name).unwrap_or_else(|| leaf.default_value());
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&version.to_le_bytes());
        let crc = checksum(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes
    }

    /// Check a raw image and decode it. The record is only meaningful when
    /// the status is [`RecordStatus::Valid`].
    ///
    /// # Panics
    /// Panics if `bytes` is shorter than [`Layout::record_len`].
    pub fn decode(&self, bytes: &[u8], version: u32) -> (RecordStatus, Record) {
        let crc_at = self.data_len() + FIELD_LEN;
        let stored_crc = field(bytes, crc_at);
        let computed = checksum(&bytes[..crc_at]);
        if stored_crc != computed {
            let status = RecordStatus::ChecksumMismatch {
                stored: stored_crc,
                computed,
            };
            return (status, Record::default());
        }

        let stored_version = field(bytes, self.data_len());
        if stored_version != version {
            let status = RecordStatus::VersionMismatch {
                stored: stored_version,
                expected: version,
            };
            return (status, Record::default());
        }

        let mut record = Record::default();
        for (i, leaf) in self.leaves.iter().enumerate() {
            let mut value = leaf.decode(field(bytes, i * FIELD_LEN).to_le_bytes());
            if let (LeafKind::Selection { options, .. }, Value::Index(index)) = (leaf.kind, value) {
                if index as usize >= options.len() {
                    log::warn!(
                        "Stored option {index} for '{}' is out of range, using default",
                        leaf.name
                    );
                    value = leaf.default_value();
                }
            }
            record.set(leaf.name, value);
        }
        (RecordStatus::Valid, record)
    }
}

fn field(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; FIELD_LEN];
    raw.copy_from_slice(&bytes[at..at + FIELD_LEN]);
    u32::from_le_bytes(raw)
}

/// Owns the committed record and moves it to and from storage.
pub struct Store<S: Storage> {
    storage: S,
    layout: Layout,
    version: u32,
    record: Record,
}

impl<S: Storage> Store<S> {
    pub fn new(storage: S, nodes: &[Node]) -> Self {
        Self {
            storage,
            layout: Layout::of(nodes),
            version: SCHEMA_VERSION,
            record: Record::default(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[allow(dead_code)]
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Read and check the stored image without touching the in-memory record.
    pub fn inspect(&mut self) -> anyhow::Result<RecordStatus> {
        Ok(self.read()?.0)
    }

    /// Load the stored record. Returns `false`, leaving the in-memory record
    /// as it was, when the checksum or version does not match.
    pub fn load(&mut self) -> anyhow::Result<bool> {
        let (status, record) = self.read()?;
        if !status.is_valid() {
            log::warn!("Stored configuration unusable: {status}");
            return Ok(false);
        }
        log::info!("Loaded {} parameters (version {})", record.len(), self.version);
        self.record = record;
        Ok(true)
    }

    /// Stamp the current version and checksum and write the whole record.
    pub fn save(&mut self) -> anyhow::Result<()> {
        let bytes = self.layout.encode(&self.record, self.version);
        self.storage.write(0, &bytes)?;
        log::info!("Saved {} parameters ({} bytes)", self.layout.leaves().len(), bytes.len());
        Ok(())
    }

    fn read(&mut self) -> anyhow::Result<(RecordStatus, Record)> {
        let mut bytes = vec![0u8; self.layout.record_len()];
        self.storage.read(0, &mut bytes)?;
        Ok(self.layout.decode(&bytes, self.version))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::params::Working;
    use crate::params::storage::{ERASED, MemStorage};
    use crate::params::tree::MAIN_MENU;

    const MODES: &[&str] = &["Off", "On"];
    const TREE: &[Node] = &[
        Node::unsigned("Rate", "rate", 400),
        Node::float("Gain", "gain", 0.25),
        Node::selection("Mode", "mode", MODES, 1),
        Node::unsigned("Debug", "debug", 0).volatile(),
    ];

    fn saved_store() -> Store<MemStorage> {
        let mut store = Store::new(MemStorage::default(), TREE);
        let record = store.record_mut();
        record.set(ParamId("rate"), Value::Unsigned(123_456));
        record.set(ParamId("gain"), Value::Float(-0.002));
        record.set(ParamId("mode"), Value::Index(0));
        store.save().unwrap();
        store
    }

    #[test]
    fn crc32_known_values() {
        assert_eq!(checksum(b""), 0x0000_0000);
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn layout_size_counts_persisted_leaves() {
        let layout = Layout::of(TREE);
        assert_eq!(layout.leaves().len(), 3);
        assert_eq!(layout.record_len(), 3 * 4 + 8);
    }

    #[test]
    fn encoded_layout() {
        let store = saved_store();
        let bytes = &store.storage().bytes()[..20];

        assert_eq!(&bytes[0..4], &123_456u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-0.002f32).to_le_bytes());
        assert_eq!(&bytes[8..12], &0u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &SCHEMA_VERSION.to_le_bytes());
        assert_eq!(&bytes[16..20], &checksum(&bytes[..16]).to_le_bytes());
        assert!(store.storage().bytes()[20..].iter().all(|&b| b == ERASED));
    }

    #[test]
    fn save_then_load_round_trip() {
        let store = saved_store();
        let expected = store.record().clone();

        let mut fresh = Store::new(store.into_storage(), TREE);
        assert!(fresh.load().unwrap());
        assert_eq!(fresh.record(), &expected);
    }

    #[test]
    fn blank_storage_is_invalid() {
        let mut store = Store::new(MemStorage::default(), TREE);
        assert!(!store.load().unwrap());
        assert!(matches!(
            store.inspect().unwrap(),
            RecordStatus::ChecksumMismatch { .. }
        ));
        assert!(store.record().is_empty());
    }

    #[test]
    fn other_version_is_invalid() {
        let store = saved_store();
        let mut newer = Store::new(store.into_storage(), TREE).with_version(SCHEMA_VERSION + 1);

        assert_eq!(
            newer.inspect().unwrap(),
            RecordStatus::VersionMismatch {
                stored: SCHEMA_VERSION,
                expected: SCHEMA_VERSION + 1
            }
        );
        assert!(!newer.load().unwrap());
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let len = Layout::of(TREE).record_len();
        for bit in 0..len * 8 {
            let mut storage = saved_store().into_storage();
            storage.flip_bit(bit);
            let mut store = Store::new(storage, TREE);
            assert!(!store.load().unwrap(), "flip of bit {bit} went unnoticed");
        }
    }

    #[test]
    fn failed_load_keeps_in_memory_record() {
        let mut storage = saved_store().into_storage();
        storage.flip_bit(3);

        let mut store = Store::new(storage, TREE);
        store.record_mut().set(ParamId("rate"), Value::Unsigned(1));
        assert!(!store.load().unwrap());
        assert_eq!(store.record().get(ParamId("rate")), Some(Value::Unsigned(1)));
    }

    #[test]
    fn out_of_range_selection_falls_back_to_default() {
        let mut store = Store::new(MemStorage::default(), TREE);
        store.record_mut().set(ParamId("mode"), Value::Index(7));
        store.save().unwrap();

        let mut fresh = Store::new(store.into_storage(), TREE);
        assert!(fresh.load().unwrap());
        assert_eq!(fresh.record().get(ParamId("mode")), Some(Value::Index(1)));
    }

    #[test]
    fn missing_fields_are_saved_as_defaults() {
        let mut store = Store::new(MemStorage::default(), TREE);
        store.save().unwrap();

        let mut fresh = Store::new(store.into_storage(), TREE);
        assert!(fresh.load().unwrap());
        assert_eq!(fresh.record().get(ParamId("rate")), Some(Value::Unsigned(400)));
        assert_eq!(fresh.record().get(ParamId("gain")), Some(Value::Float(0.25)));
    }

    #[test]
    fn first_run_heals_with_defaults() {
        let mut store = Store::new(MemStorage::default(), MAIN_MENU.nodes);
        let mut working = Working::new();
        assert!(!store.load().unwrap());

        ops::reset_to_defaults(MAIN_MENU.nodes, store.record_mut(), &mut working);
        store.save().unwrap();

        let mut fresh = Store::new(store.into_storage(), MAIN_MENU.nodes);
        assert!(fresh.load().unwrap());
        for leaf in ops::persisted_leaves(MAIN_MENU.nodes) {
            assert_eq!(fresh.record().get(leaf.name), Some(leaf.default_value()));
        }
    }

    proptest! {
        #[test]
        fn any_valid_record_round_trips(
            rate in any::<u32>(),
            gain in any::<f32>().prop_filter("NaN never compares equal", |g| !g.is_nan()),
            mode in 0..MODES.len() as u32,
        ) {
            let mut store = Store::new(MemStorage::default(), TREE);
            let record = store.record_mut();
            record.set(ParamId("rate"), Value::Unsigned(rate));
            record.set(ParamId("gain"), Value::Float(gain));
            record.set(ParamId("mode"), Value::Index(mode));
            store.save().unwrap();
            let expected = store.record().clone();

            let mut fresh = Store::new(store.into_storage(), TREE);
            prop_assert!(fresh.load().unwrap());
            prop_assert_eq!(fresh.record(), &expected);
        }

        #[test]
        fn corrupted_images_never_panic(bits in prop::collection::vec(0usize..160, 1..8)) {
            let mut storage = saved_store().into_storage();
            for &bit in &bits {
                storage.flip_bit(bit);
            }
            let mut store = Store::new(storage, TREE);
            if store.load().unwrap() {
                prop_assert_eq!(store.record().len(), 3);
            }
        }
    }
}
