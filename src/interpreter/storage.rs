//! Account storage over slab-backed persistence.
//!
//! The [`SlabStorage`] trait is the opaque backend contract: slabs are byte
//! vectors addressed by id, plus a key directory per `(address, domain)`.
//! [`AccountStorage`] layers the tagged codec, an inline-size budget, a
//! read cache that keeps loaded values live for the duration of a session,
//! and the capability controller tables.

use indexmap::IndexMap;

use crate::common::{Address, Path, PathDomain};
use crate::interpreter::encoding::{
    self, CapabilityControllerRecord, CodecError,
};
use crate::interpreter::errors::{InternalError, RuntimeError};
use crate::interpreter::value::Value;
use crate::types::StaticType;

/// Cells at or below this encoded size stay inline in the directory;
/// larger values go to their own slab.
pub const INLINE_SIZE_BUDGET: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlabId(pub u64);

/// Storage domains: the user-visible path domains plus internal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageDomain {
    Storage,
    Public,
    Private,
    /// Capability controllers, keyed by controller id.
    CapabilityController,
    /// Per-account counters (capability id allocation).
    AccountKeys,
    Inbox,
}

impl StorageDomain {
    pub fn identifier(self) -> &'static str {
        match self {
            StorageDomain::Storage => "storage",
            StorageDomain::Public => "public",
            StorageDomain::Private => "private",
            StorageDomain::CapabilityController => "cap_con",
            StorageDomain::AccountKeys => "acct_keys",
            StorageDomain::Inbox => "inbox",
        }
    }

    pub const ALL: [StorageDomain; 6] = [
        StorageDomain::Storage,
        StorageDomain::Public,
        StorageDomain::Private,
        StorageDomain::CapabilityController,
        StorageDomain::AccountKeys,
        StorageDomain::Inbox,
    ];
}

impl From<PathDomain> for StorageDomain {
    fn from(domain: PathDomain) -> Self {
        match domain {
            PathDomain::Storage => StorageDomain::Storage,
            PathDomain::Public => StorageDomain::Public,
            PathDomain::Private => StorageDomain::Private,
        }
    }
}

/// Identity of a storage map: one account's view of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub address: Address,
    pub domain: StorageDomain,
}

impl StorageKey {
    pub fn new(address: Address, domain: StorageDomain) -> Self {
        Self { address, domain }
    }
}

/// A storage cell: the encoded value inline, or a pointer to its slab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCell {
    Inline(Vec<u8>),
    Slab(SlabId),
}

/// The persistence backend. Slabs are opaque; the engine never interprets
/// their bytes beyond the codec layer above.
pub trait SlabStorage {
    fn allocate(&mut self, data: Vec<u8>) -> SlabId;
    fn read(&self, id: SlabId) -> Option<Vec<u8>>;
    fn write(&mut self, id: SlabId, data: Vec<u8>);
    fn free(&mut self, id: SlabId);

    fn cell(&self, key: StorageKey, identifier: &str) -> Option<StorageCell>;
    fn set_cell(&mut self, key: StorageKey, identifier: &str, cell: StorageCell);
    fn remove_cell(&mut self, key: StorageKey, identifier: &str) -> Option<StorageCell>;
    /// Keys under `(address, domain)`, in deterministic (insertion) order.
    fn keys(&self, key: StorageKey) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct InMemorySlabStorage {
    slabs: IndexMap<SlabId, Vec<u8>>,
    maps: IndexMap<StorageKey, IndexMap<String, StorageCell>>,
    next_slab: u64,
}

impl InMemorySlabStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }
}

impl SlabStorage for InMemorySlabStorage {
    fn allocate(&mut self, data: Vec<u8>) -> SlabId {
        self.next_slab += 1;
        let id = SlabId(self.next_slab);
        self.slabs.insert(id, data);
        id
    }

    fn read(&self, id: SlabId) -> Option<Vec<u8>> {
        self.slabs.get(&id).cloned()
    }

    fn write(&mut self, id: SlabId, data: Vec<u8>) {
        self.slabs.insert(id, data);
    }

    fn free(&mut self, id: SlabId) {
        self.slabs.shift_remove(&id);
    }

    fn cell(&self, key: StorageKey, identifier: &str) -> Option<StorageCell> {
        self.maps.get(&key)?.get(identifier).cloned()
    }

    fn set_cell(&mut self, key: StorageKey, identifier: &str, cell: StorageCell) {
        self.maps
            .entry(key)
            .or_default()
            .insert(identifier.to_string(), cell);
    }

    fn remove_cell(&mut self, key: StorageKey, identifier: &str) -> Option<StorageCell> {
        self.maps.get_mut(&key)?.shift_remove(identifier)
    }

    fn keys(&self, key: StorageKey) -> Vec<String> {
        self.maps
            .get(&key)
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Account storage: typed reads and writes over the backend, mediated by
/// the codec and an identity-preserving cache. Values read during a
/// session stay live so references observe mutation; `commit` re-encodes
/// them.
pub struct AccountStorage {
    backend: Box<dyn SlabStorage>,
    cache: IndexMap<(StorageKey, String), Value>,
}

impl AccountStorage {
    pub fn new(backend: Box<dyn SlabStorage>) -> Self {
        Self {
            backend,
            cache: IndexMap::new(),
        }
    }

    pub fn backend(&self) -> &dyn SlabStorage {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn SlabStorage {
        self.backend.as_mut()
    }

    pub fn into_backend(self) -> Box<dyn SlabStorage> {
        self.backend
    }

    pub fn contains(&self, key: StorageKey, identifier: &str) -> bool {
        self.cache.contains_key(&(key, identifier.to_string()))
            || self.backend.cell(key, identifier).is_some()
    }

    pub fn keys(&self, key: StorageKey) -> Vec<String> {
        self.backend.keys(key)
    }

    /// Reads a value, returning the session-live instance when it was read
    /// or written before.
    pub fn read(&mut self, key: StorageKey, identifier: &str) -> Result<Option<Value>, RuntimeError> {
        let cache_key = (key, identifier.to_string());
        if let Some(value) = self.cache.get(&cache_key) {
            return Ok(Some(value.clone()));
        }
        let Some(cell) = self.backend.cell(key, identifier) else {
            return Ok(None);
        };
        let bytes = self.cell_bytes(&cell)?;
        let value = encoding::decode_value(&bytes).map_err(storage_corruption)?;
        value.set_owner(Some(key.address));
        self.cache.insert(cache_key, value.clone());
        Ok(Some(value))
    }

    /// Writes a value into a cell, replacing (and freeing) any previous
    /// slab. The value becomes session-live.
    pub fn write(
        &mut self,
        key: StorageKey,
        identifier: &str,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let bytes = encoding::encode_value(&value).map_err(storage_corruption)?;
        self.replace_cell(key, identifier, bytes);
        value.set_owner(Some(key.address));
        self.cache.insert((key, identifier.to_string()), value);
        Ok(())
    }

    /// Removes and returns a value, freeing its slab and clearing its
    /// ownership.
    pub fn remove(&mut self, key: StorageKey, identifier: &str) -> Result<Option<Value>, RuntimeError> {
        let cached = self.cache.shift_remove(&(key, identifier.to_string()));
        let cell = self.backend.remove_cell(key, identifier);
        if let Some(StorageCell::Slab(slab)) = &cell {
            self.backend.free(*slab);
        }
        let value = match cached {
            Some(value) => Some(value),
            None => match cell {
                Some(cell) => {
                    let bytes = self.cell_bytes(&cell)?;
                    Some(encoding::decode_value(&bytes).map_err(storage_corruption)?)
                }
                None => None,
            },
        };
        if let Some(value) = &value {
            value.deep_remove();
        }
        Ok(value)
    }

    /// Re-encodes every session-live value back into its cell. Called at
    /// the end of a script or transaction so mutations through references
    /// persist.
    pub fn commit(&mut self) -> Result<(), RuntimeError> {
        let entries: Vec<((StorageKey, String), Value)> = self
            .cache
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for ((key, identifier), value) in entries {
            let bytes = encoding::encode_value(&value).map_err(storage_corruption)?;
            self.replace_cell(key, &identifier, bytes);
        }
        Ok(())
    }

    fn replace_cell(&mut self, key: StorageKey, identifier: &str, bytes: Vec<u8>) {
        if let Some(StorageCell::Slab(slab)) = self.backend.cell(key, identifier) {
            self.backend.free(slab);
        }
        let cell = if bytes.len() <= INLINE_SIZE_BUDGET {
            StorageCell::Inline(bytes)
        } else {
            StorageCell::Slab(self.backend.allocate(bytes))
        };
        self.backend.set_cell(key, identifier, cell);
    }

    fn cell_bytes(&self, cell: &StorageCell) -> Result<Vec<u8>, RuntimeError> {
        match cell {
            StorageCell::Inline(bytes) => Ok(bytes.clone()),
            StorageCell::Slab(slab) => self.backend.read(*slab).ok_or_else(|| {
                RuntimeError::Internal(InternalError::new(format!(
                    "storage inconsistency: missing slab {}",
                    slab.0,
                )))
            }),
        }
    }

    // --- Capability controllers ---

    /// Issues a new capability controller for a target path, returning its
    /// id. Ids start at 1; 0 is reserved as invalid.
    pub fn issue_controller(
        &mut self,
        address: Address,
        target: Path,
        borrow_type: StaticType,
    ) -> Result<u64, RuntimeError> {
        let counter_key = StorageKey::new(address, StorageDomain::AccountKeys);
        let next = match self.backend.cell(counter_key, "cap_id") {
            Some(cell) => {
                let bytes = self.cell_bytes(&cell)?;
                u64::from_be_bytes(bytes.try_into().map_err(|_| {
                    RuntimeError::Internal(InternalError::new(
                        "storage inconsistency: malformed capability id counter",
                    ))
                })?) + 1
            }
            None => 1,
        };
        self.backend
            .set_cell(counter_key, "cap_id", StorageCell::Inline(next.to_be_bytes().to_vec()));

        let record = CapabilityControllerRecord {
            id: next,
            target,
            borrow_type,
            revoked: false,
        };
        let key = StorageKey::new(address, StorageDomain::CapabilityController);
        let bytes = encoding::encode_controller(&record);
        self.replace_cell(key, &next.to_string(), bytes);
        Ok(next)
    }

    pub fn controller(
        &self,
        address: Address,
        id: u64,
    ) -> Result<Option<CapabilityControllerRecord>, RuntimeError> {
        let key = StorageKey::new(address, StorageDomain::CapabilityController);
        let Some(cell) = self.backend.cell(key, &id.to_string()) else {
            return Ok(None);
        };
        let bytes = self.cell_bytes(&cell)?;
        Ok(Some(
            encoding::decode_controller(&bytes).map_err(storage_corruption)?,
        ))
    }

    /// Marks a controller revoked. Returns whether it existed.
    pub fn revoke_controller(&mut self, address: Address, id: u64) -> Result<bool, RuntimeError> {
        let Some(mut record) = self.controller(address, id)? else {
            return Ok(false);
        };
        record.revoked = true;
        let key = StorageKey::new(address, StorageDomain::CapabilityController);
        let bytes = encoding::encode_controller(&record);
        self.replace_cell(key, &id.to_string(), bytes);
        Ok(true)
    }
}

fn storage_corruption(error: CodecError) -> RuntimeError {
    RuntimeError::Internal(InternalError::new(format!(
        "storage inconsistency: {error}",
    )))
}
