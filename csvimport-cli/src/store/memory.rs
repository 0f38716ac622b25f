//! In-memory store with optional JSON snapshot persistence

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{Attribute, Filter, Record, RecordId, Store, StoreError};
use crate::schema::{FieldDescriptor, FieldKind, Schema, SchemaRegistry};

/// A many-to-many link between two saved records
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct Link {
    model: String,
    field: String,
    owner: RecordId,
    related: RecordId,
}

/// On-disk layout of a store
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: u64,
    tables: BTreeMap<String, Vec<Record>>,
    links: Vec<Link>,
}

/// Store holding all records in memory
///
/// Enforces required and unique fields on save, using the schema it was
/// created with.
#[derive(Debug)]
pub struct MemoryStore {
    schema: Schema,
    tables: BTreeMap<String, BTreeMap<RecordId, Record>>,
    links: BTreeSet<Link>,
    next_id: u64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(schema: Schema) -> Self {
        MemoryStore {
            schema,
            tables: BTreeMap::new(),
            links: BTreeSet::new(),
            next_id: 0,
        }
    }

    /// Load a store from a JSON snapshot, or start empty if the file is absent
    pub fn load(path: &Path, schema: Schema) -> Result<Self> {
        let mut store = MemoryStore::new(schema);
        if !path.exists() {
            log::info!("No store snapshot at {}, starting empty", path.display());
            return Ok(store);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read store snapshot: {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse store snapshot: {}", path.display()))?;

        store.next_id = snapshot.next_id;
        for (model, records) in snapshot.tables {
            let table = store.tables.entry(model).or_default();
            for record in records {
                if let Some(id) = record.id() {
                    table.insert(id, record);
                }
            }
        }
        store.links = snapshot.links.into_iter().collect();

        log::info!(
            "Loaded store snapshot from {}: {} records",
            path.display(),
            store.tables.values().map(|t| t.len()).sum::<usize>()
        );
        Ok(store)
    }

    /// Write the store to a JSON snapshot
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = Snapshot {
            next_id: self.next_id,
            tables: self
                .tables
                .iter()
                .map(|(model, table)| (model.clone(), table.values().cloned().collect()))
                .collect(),
            links: self.links.iter().cloned().collect(),
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let content =
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize store")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write store snapshot: {}", path.display()))?;
        Ok(())
    }

    /// Number of saved records of a model
    pub fn count(&self, model: &str) -> usize {
        self.tables.get(model).map(|t| t.len()).unwrap_or(0)
    }

    /// Saved records of a model, in id order
    pub fn records(&self, model: &str) -> Vec<&Record> {
        self.tables
            .get(model)
            .map(|t| t.values().collect())
            .unwrap_or_default()
    }

    /// Look up a saved record
    pub fn get(&self, model: &str, id: RecordId) -> Option<&Record> {
        self.tables.get(model)?.get(&id)
    }

    /// Ids linked from `owner` through a many-to-many field
    pub fn related_ids(&self, model: &str, field: &str, owner: RecordId) -> Vec<RecordId> {
        self.links
            .iter()
            .filter(|l| l.model == model && l.field == field && l.owner == owner)
            .map(|l| l.related)
            .collect()
    }

    fn check_required(&self, record: &Record, fields: &[FieldDescriptor]) -> Result<(), StoreError> {
        for field in fields {
            if !field.is_required() || matches!(field.kind, FieldKind::ManyToMany { .. }) {
                continue;
            }
            match record.get(&field.name) {
                Some(attr) if !attr.is_null() => {}
                _ => {
                    return Err(StoreError::MissingRequired {
                        model: record.model().to_string(),
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_unique(&self, record: &Record, fields: &[FieldDescriptor]) -> Result<(), StoreError> {
        let Some(table) = self.tables.get(record.model()) else {
            return Ok(());
        };

        for field in fields.iter().filter(|f| f.unique) {
            let Some(value) = record.get(&field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = table
                .values()
                .any(|other| other.id() != record.id() && other.get(&field.name) == Some(value));
            if taken {
                return Err(StoreError::UniqueViolation {
                    model: record.model().to_string(),
                    field: field.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn create(&mut self, model: &str) -> Result<Record, StoreError> {
        if self.schema.model(model).is_none() {
            return Err(StoreError::UnknownModel {
                model: model.to_string(),
            });
        }
        Ok(Record::new(model))
    }

    fn query(&self, model: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        if self.schema.model(model).is_none() {
            return Err(StoreError::UnknownModel {
                model: model.to_string(),
            });
        }

        let matches = self
            .tables
            .get(model)
            .map(|table| {
                table
                    .values()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }

    fn set_attribute(
        &self,
        record: &mut Record,
        field: &FieldDescriptor,
        value: Attribute,
    ) -> Result<(), StoreError> {
        let declared = self.schema.field(record.model(), &field.name).map_err(|_| {
            StoreError::UnknownField {
                model: record.model().to_string(),
                field: field.name.clone(),
            }
        })?;

        let fits = match (&declared.kind, &value) {
            (FieldKind::Scalar(_), Attribute::Value(_)) => true,
            (FieldKind::ForeignKey { related }, Attribute::Ref(id)) => {
                if self.get(related, *id).is_none() {
                    return Err(StoreError::DanglingReference {
                        model: related.clone(),
                        id: *id,
                    });
                }
                true
            }
            _ => false,
        };

        if !fits {
            return Err(StoreError::AttributeMismatch {
                model: record.model().to_string(),
                field: field.name.clone(),
            });
        }

        record.put(field.name.clone(), value);
        Ok(())
    }

    fn save(&mut self, record: &mut Record) -> Result<RecordId, StoreError> {
        let fields = self
            .schema
            .model(record.model())
            .map(|m| m.fields.clone())
            .ok_or_else(|| StoreError::UnknownModel {
                model: record.model().to_string(),
            })?;

        self.check_required(record, &fields)?;
        self.check_unique(record, &fields)?;

        let id = match record.id() {
            Some(id) => id,
            None => {
                self.next_id += 1;
                let id = RecordId(self.next_id);
                record.assign_id(id);
                id
            }
        };

        log::debug!("Saved {}", record);
        self.tables
            .entry(record.model().to_string())
            .or_default()
            .insert(id, record.clone());
        Ok(id)
    }

    fn add_relation(
        &mut self,
        owner: &Record,
        field: &FieldDescriptor,
        related: &Record,
    ) -> Result<(), StoreError> {
        if !matches!(field.kind, FieldKind::ManyToMany { .. }) {
            return Err(StoreError::AttributeMismatch {
                model: owner.model().to_string(),
                field: field.name.clone(),
            });
        }

        let owner_id = owner.id().ok_or_else(|| StoreError::NotSaved {
            model: owner.model().to_string(),
        })?;
        let related_id = related.id().ok_or_else(|| StoreError::NotSaved {
            model: related.model().to_string(),
        })?;

        self.links.insert(Link {
            model: owner.model().to_string(),
            field: field.name.clone(),
            owner: owner_id,
            related: related_id,
        });
        Ok(())
    }
}
