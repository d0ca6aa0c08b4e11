//! The stored-value migration engine.
//!
//! A one-shot rewrite of every persisted value of every target account
//! under a set of pluggable value migrations. Traversal streams one
//! top-level storage key at a time, descends into containers, applies
//! migrations at every node in registration order (first replacement wins
//! per node), prunes subtrees whose static element type every migration
//! can skip, and rewrites cells only when something changed.

pub mod capcons;

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::common::Address;
use crate::interpreter::encoding;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::storage::{
    SlabStorage, StorageCell, StorageDomain, StorageKey, INLINE_SIZE_BUDGET,
};
use crate::interpreter::value::Value;
use crate::types::StaticType;

/// Whether a value sits at the top of a storage cell or nested inside a
/// container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMigrationPosition {
    TopLevel,
    Nested,
}

/// A single value transformation applied across all stored values.
pub trait ValueMigration {
    fn name(&self) -> &'static str;

    /// Storage domains this migration applies to; `None` means all.
    fn domains(&self) -> Option<HashSet<StorageDomain>> {
        None
    }

    /// Returns a replacement value, or `None` to leave the value as is.
    fn migrate(
        &self,
        storage_key: StorageKey,
        map_key: &str,
        value: &Value,
        position: ValueMigrationPosition,
    ) -> Result<Option<Value>, RuntimeError>;

    /// Fast negative pruning: `true` when no value of the given static
    /// type (including everything nested in it) can be affected.
    fn can_skip(&self, value_type: &StaticType) -> bool;
}

/// Advisory progress callbacks. Implementations must not mutate storage.
pub trait MigrationReporter {
    fn migrated(&mut self, _storage_key: StorageKey, _map_key: &str, _migration: &'static str) {}

    fn migration_error(
        &mut self,
        _storage_key: StorageKey,
        _map_key: &str,
        _migration: &'static str,
        _error: &RuntimeError,
    ) {
    }
}

/// A no-op reporter.
pub struct NullReporter;

impl MigrationReporter for NullReporter {}

pub struct StorageMigration<'a> {
    storage: &'a mut dyn SlabStorage,
    migrations: Vec<Box<dyn ValueMigration + 'a>>,
}

impl<'a> StorageMigration<'a> {
    pub fn new(storage: &'a mut dyn SlabStorage) -> Self {
        Self {
            storage,
            migrations: Vec::new(),
        }
    }

    /// Registers a migration. Registration order is application order.
    pub fn add(&mut self, migration: impl ValueMigration + 'a) -> &mut Self {
        self.migrations.push(Box::new(migration));
        self
    }

    pub fn migrate_accounts(
        &mut self,
        addresses: impl IntoIterator<Item = Address>,
        reporter: &mut dyn MigrationReporter,
    ) -> Result<(), RuntimeError> {
        for address in addresses {
            self.migrate_account(address, reporter)?;
        }
        Ok(())
    }

    /// Migrates every stored value of one account, one storage key at a
    /// time.
    pub fn migrate_account(
        &mut self,
        address: Address,
        reporter: &mut dyn MigrationReporter,
    ) -> Result<(), RuntimeError> {
        info!(address = %address, "migrating account");
        for domain in StorageDomain::ALL {
            let storage_key = StorageKey::new(address, domain);
            let applicable: Vec<usize> = self
                .migrations
                .iter()
                .enumerate()
                .filter(|(_, migration)| {
                    migration
                        .domains()
                        .map(|domains| domains.contains(&domain))
                        .unwrap_or(true)
                })
                .map(|(index, _)| index)
                .collect();
            if applicable.is_empty() {
                continue;
            }

            for map_key in self.storage.keys(storage_key) {
                if let Err(error) = self.migrate_cell(storage_key, &map_key, &applicable, reporter)
                {
                    if error.is_internal() {
                        return Err(error);
                    }
                    warn!(key = %map_key, %error, "skipping value after migration failure");
                    let name = self
                        .migrations
                        .first()
                        .map(|migration| migration.name())
                        .unwrap_or("unknown");
                    reporter.migration_error(storage_key, &map_key, name, &error);
                }
            }
        }
        Ok(())
    }

    fn migrate_cell(
        &mut self,
        storage_key: StorageKey,
        map_key: &str,
        applicable: &[usize],
        reporter: &mut dyn MigrationReporter,
    ) -> Result<(), RuntimeError> {
        let Some(cell) = self.storage.cell(storage_key, map_key) else {
            return Ok(());
        };
        let bytes = match &cell {
            StorageCell::Inline(bytes) => bytes.clone(),
            StorageCell::Slab(slab) => self.storage.read(*slab).ok_or_else(|| {
                RuntimeError::internal(format!("storage inconsistency: missing slab {}", slab.0))
            })?,
        };
        let value = encoding::decode_value(&bytes)
            .map_err(|error| RuntimeError::internal(format!("storage inconsistency: {error}")))?;

        let (value, changed) = self.migrate_value(
            storage_key,
            map_key,
            value,
            ValueMigrationPosition::TopLevel,
            applicable,
            reporter,
        )?;
        if !changed {
            return Ok(());
        }

        debug!(key = %map_key, "rewriting storage cell");
        let bytes = encoding::encode_value(&value)
            .map_err(|error| RuntimeError::internal(format!("unencodable migrated value: {error}")))?;
        // The replaced value's old slab is no longer referenced.
        if let StorageCell::Slab(slab) = cell {
            self.storage.free(slab);
        }
        let cell = if bytes.len() <= INLINE_SIZE_BUDGET {
            StorageCell::Inline(bytes)
        } else {
            StorageCell::Slab(self.storage.allocate(bytes))
        };
        self.storage.set_cell(storage_key, map_key, cell);
        Ok(())
    }

    /// Applies migrations at this node, then descends into the (possibly
    /// replaced) node's children.
    fn migrate_value(
        &mut self,
        storage_key: StorageKey,
        map_key: &str,
        value: Value,
        position: ValueMigrationPosition,
        applicable: &[usize],
        reporter: &mut dyn MigrationReporter,
    ) -> Result<(Value, bool), RuntimeError> {
        let mut current = value;
        let mut changed = false;

        for &index in applicable {
            let migration = &self.migrations[index];
            if let Some(replacement) =
                migration.migrate(storage_key, map_key, &current, position)?
            {
                reporter.migrated(storage_key, map_key, migration.name());
                current = replacement;
                changed = true;
                // First replacement wins for this node.
                break;
            }
        }

        // Optionals are owned boxes: rebuild them around the migrated
        // inner value. Shared containers mutate in place below.
        if let Value::Optional(Some(inner)) = current {
            let skip = inner
                .static_type()
                .map(|ty| self.type_skippable(&ty, applicable))
                .unwrap_or(false);
            if skip {
                return Ok((Value::Optional(Some(inner)), changed));
            }
            let (migrated, inner_changed) = self.migrate_value(
                storage_key,
                map_key,
                *inner,
                ValueMigrationPosition::Nested,
                applicable,
                reporter,
            )?;
            return Ok((Value::some(migrated), changed || inner_changed));
        }

        changed |= self.migrate_children(storage_key, map_key, &current, applicable, reporter)?;
        Ok((current, changed))
    }

    fn migrate_children(
        &mut self,
        storage_key: StorageKey,
        map_key: &str,
        value: &Value,
        applicable: &[usize],
        reporter: &mut dyn MigrationReporter,
    ) -> Result<bool, RuntimeError> {
        let mut changed = false;
        match value {
            Value::Array(array) => {
                let element_type = match &array.borrow().ty {
                    StaticType::VariableSizedArray(element) => Some((**element).clone()),
                    StaticType::ConstantSizedArray { element, .. } => Some((**element).clone()),
                    _ => None,
                };
                if let Some(element_type) = element_type
                    && self.type_skippable(&element_type, applicable)
                {
                    return Ok(false);
                }
                let len = array.borrow().values.len();
                for index in 0..len {
                    let element = array.borrow().values[index].clone();
                    let (migrated, element_changed) = self.migrate_value(
                        storage_key,
                        map_key,
                        element,
                        ValueMigrationPosition::Nested,
                        applicable,
                        reporter,
                    )?;
                    if element_changed {
                        array.borrow_mut().values[index] = migrated;
                        changed = true;
                    }
                }
            }
            Value::Dictionary(dictionary) => {
                let value_type = match &dictionary.borrow().ty {
                    StaticType::Dictionary { value, .. } => Some((**value).clone()),
                    _ => None,
                };
                if let Some(value_type) = value_type
                    && self.type_skippable(&value_type, applicable)
                {
                    return Ok(false);
                }
                let keys: Vec<_> = dictionary.borrow().entries.keys().cloned().collect();
                for key in keys {
                    let entry = dictionary.borrow().entries[&key].clone();
                    let (migrated, entry_changed) = self.migrate_value(
                        storage_key,
                        map_key,
                        entry,
                        ValueMigrationPosition::Nested,
                        applicable,
                        reporter,
                    )?;
                    if entry_changed {
                        dictionary.borrow_mut().entries.insert(key, migrated);
                        changed = true;
                    }
                }
            }
            Value::Composite(composite) => {
                let fields: Vec<String> =
                    composite.borrow().fields.keys().cloned().collect();
                for field in fields {
                    let field_value = composite.borrow().fields[&field].clone();
                    let (migrated, field_changed) = self.migrate_value(
                        storage_key,
                        map_key,
                        field_value,
                        ValueMigrationPosition::Nested,
                        applicable,
                        reporter,
                    )?;
                    if field_changed {
                        composite.borrow_mut().fields.insert(field, migrated);
                        changed = true;
                    }
                }
            }
            _ => {}
        }
        Ok(changed)
    }

    fn type_skippable(&self, ty: &StaticType, applicable: &[usize]) -> bool {
        applicable
            .iter()
            .all(|&index| self.migrations[index].can_skip(ty))
    }
}

#[cfg(test)]
#[path = "../tests/migrations/t_engine.rs"]
mod engine_tests;
