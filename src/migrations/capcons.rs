//! Migration of deprecated path capabilities to id capabilities.
//!
//! Uses the path → capability controller mappings produced by the link
//! migration that runs before it. A path capability whose path has no
//! mapping entry is left unchanged and reported as missing; one whose
//! controller borrow type is not a reference aborts, since that can only
//! mean corrupted state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::common::{Address, AddressPath, PathDomain};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::storage::StorageKey;
use crate::interpreter::value::{IdCapabilityValue, PathCapabilityValue, Value};
use crate::migrations::{ValueMigration, ValueMigrationPosition};
use crate::types::{PrimitiveType, StaticType};

/// `path → (capability id, borrow type)`.
#[derive(Debug, Default, Clone)]
pub struct PathCapabilityMapping {
    entries: HashMap<AddressPath, (u64, StaticType)>,
}

impl PathCapabilityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, address_path: AddressPath, id: u64, borrow_type: StaticType) {
        self.entries.insert(address_path, (id, borrow_type));
    }

    pub fn get(&self, address_path: &AddressPath) -> Option<&(u64, StaticType)> {
        self.entries.get(address_path)
    }
}

/// `(path, borrow type id) → capability id`, for typed storage-path
/// capabilities.
#[derive(Debug, Default, Clone)]
pub struct PathTypeCapabilityMapping {
    entries: HashMap<(AddressPath, String), u64>,
}

impl PathTypeCapabilityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, address_path: AddressPath, borrow_type_id: String, id: u64) {
        self.entries.insert((address_path, borrow_type_id), id);
    }

    pub fn get(&self, address_path: &AddressPath, borrow_type_id: &str) -> Option<u64> {
        self.entries
            .get(&(address_path.clone(), borrow_type_id.to_string()))
            .copied()
    }
}

/// Observer of capability migration outcomes. Advisory only.
pub trait CapabilityMigrationReporter {
    fn migrated_path_capability(
        &mut self,
        account_address: Address,
        address_path: &AddressPath,
        borrow_type: &StaticType,
        capability_id: u64,
    );

    fn missing_capability_id(&mut self, account_address: Address, address_path: &AddressPath);

    fn missing_borrow_type(&mut self, account_address: Address, address_path: &AddressPath);
}

pub struct CapabilityValueMigration<R: CapabilityMigrationReporter> {
    pub private_public_capability_mapping: PathCapabilityMapping,
    pub storage_capability_mapping: PathTypeCapabilityMapping,
    pub storage_capability_without_type_mapping: PathCapabilityMapping,
    pub reporter: Rc<RefCell<R>>,
}

impl<R: CapabilityMigrationReporter> CapabilityValueMigration<R> {
    fn migrate_path_capability(
        &self,
        storage_key: StorageKey,
        old_capability: &PathCapabilityValue,
    ) -> Result<Option<Value>, RuntimeError> {
        let address_path = AddressPath::new(old_capability.address, old_capability.path.clone());
        let mut borrow_type = old_capability.borrow_type.clone();

        let capability_id = match address_path.path.domain {
            PathDomain::Private | PathDomain::Public => {
                match self.private_public_capability_mapping.get(&address_path) {
                    Some((id, controller_borrow_type)) => {
                        // An untyped capability adopts the controller's
                        // borrow type.
                        if borrow_type.is_none() {
                            borrow_type = Some(controller_borrow_type.clone());
                        }
                        *id
                    }
                    None => {
                        self.reporter
                            .borrow_mut()
                            .missing_capability_id(storage_key.address, &address_path);
                        return Ok(None);
                    }
                }
            }
            PathDomain::Storage => match &borrow_type {
                Some(borrow_type) => {
                    match self
                        .storage_capability_mapping
                        .get(&address_path, &borrow_type.id())
                    {
                        Some(id) => id,
                        None => {
                            self.reporter
                                .borrow_mut()
                                .missing_capability_id(storage_key.address, &address_path);
                            return Ok(None);
                        }
                    }
                }
                None => {
                    match self
                        .storage_capability_without_type_mapping
                        .get(&address_path)
                    {
                        Some((id, controller_borrow_type)) => {
                            borrow_type = Some(controller_borrow_type.clone());
                            *id
                        }
                        None => {
                            self.reporter
                                .borrow_mut()
                                .missing_capability_id(storage_key.address, &address_path);
                            return Ok(None);
                        }
                    }
                }
            },
        };

        let Some(borrow_type) = borrow_type else {
            return Err(RuntimeError::internal(
                "capability mapping produced no borrow type",
            ));
        };
        if !borrow_type.is_reference() {
            // Corrupt state: controllers only ever hold reference types.
            return Err(RuntimeError::internal(format!(
                "unexpected non-reference borrow type: {}",
                borrow_type.id(),
            )));
        }

        self.reporter.borrow_mut().migrated_path_capability(
            storage_key.address,
            &address_path,
            &borrow_type,
            capability_id,
        );

        Ok(Some(Value::IdCapability(IdCapabilityValue {
            address: old_capability.address,
            id: capability_id,
            borrow_type,
        })))
    }
}

impl<R: CapabilityMigrationReporter> ValueMigration for CapabilityValueMigration<R> {
    fn name(&self) -> &'static str {
        "CapabilityValueMigration"
    }

    fn migrate(
        &self,
        storage_key: StorageKey,
        _map_key: &str,
        value: &Value,
        _position: ValueMigrationPosition,
    ) -> Result<Option<Value>, RuntimeError> {
        match value {
            Value::PathCapability(old_capability) => {
                self.migrate_path_capability(storage_key, old_capability)
            }
            _ => Ok(None),
        }
    }

    fn can_skip(&self, value_type: &StaticType) -> bool {
        can_skip_capability_value_migration(value_type)
    }
}

/// A type can be skipped iff neither it nor anything nested in it can hold
/// a capability.
pub fn can_skip_capability_value_migration(value_type: &StaticType) -> bool {
    match value_type {
        StaticType::Dictionary { key, value } => {
            can_skip_capability_value_migration(key) && can_skip_capability_value_migration(value)
        }
        StaticType::VariableSizedArray(element)
        | StaticType::ConstantSizedArray { element, .. } => {
            can_skip_capability_value_migration(element)
        }
        StaticType::Optional(inner) => can_skip_capability_value_migration(inner),
        StaticType::Capability { .. } => false,
        StaticType::Primitive(kind) => match kind {
            PrimitiveType::Bool
            | PrimitiveType::Void
            | PrimitiveType::Address
            | PrimitiveType::String
            | PrimitiveType::Character
            | PrimitiveType::Path => true,
            kind => kind.is_number(),
        },
        _ => false,
    }
}

#[cfg(test)]
#[path = "../tests/migrations/t_capcons.rs"]
mod capcons_tests;
