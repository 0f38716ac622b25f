//! Record storage used by the importer
//!
//! The importer only talks to storage through the [`Store`] trait: create a
//! blank record, look records up by an exact-match filter, assign attributes,
//! save, and link many-to-many relations.

mod memory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::import::Value;
use crate::schema::FieldDescriptor;

pub use memory::MemoryStore;

/// Identity of a saved record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value stored on a record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Attribute {
    /// Scalar value
    Value(Value),
    /// Reference to another record (foreign key)
    Ref(RecordId),
}

impl Attribute {
    /// Null scalars count as "no value" for required checks
    pub fn is_null(&self) -> bool {
        matches!(self, Attribute::Value(Value::Null))
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Value(v) => write!(f, "{}", v),
            Attribute::Ref(id) => write!(f, "{}", id),
        }
    }
}

/// A record of some model, saved or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    model: String,
    id: Option<RecordId>,
    attributes: BTreeMap<String, Attribute>,
}

impl Record {
    /// Create a blank, unsaved record
    pub fn new(model: impl Into<String>) -> Self {
        Record {
            model: model.into(),
            id: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Qualified model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Identity, once saved
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Get an attribute by field name
    pub fn get(&self, field: &str) -> Option<&Attribute> {
        self.attributes.get(field)
    }

    /// Raw attribute write for store implementations; callers go through
    /// [`Store::set_attribute`]
    pub fn put(&mut self, field: impl Into<String>, value: Attribute) {
        self.attributes.insert(field.into(), value);
    }

    /// Raw identity assignment for store implementations
    pub fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} {}", self.model, id),
            None => write!(f, "{} (unsaved)", self.model),
        }
    }
}

/// Filter comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Field equals the value
    Exact,
}

/// One `field <comparator> value` constraint
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub comparator: Comparator,
    pub value: Attribute,
}

/// Conjunction of clauses used to find existing records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FilterClause>,
}

impl Filter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact-match clause
    pub fn exact(&mut self, field: impl Into<String>, value: Attribute) {
        self.clauses.push(FilterClause {
            field: field.into(),
            comparator: Comparator::Exact,
            value,
        });
    }

    /// Check if there are no clauses
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Check if a record satisfies every clause
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| match clause.comparator {
            Comparator::Exact => record.get(&clause.field) == Some(&clause.value),
        })
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|c| format!("{}__exact={}", c.field, c.value))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Error from a store operation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Model is not known to the store
    UnknownModel { model: String },
    /// Field does not exist on the model
    UnknownField { model: String, field: String },
    /// Required field has no value at save time
    MissingRequired { model: String, field: String },
    /// Another record already holds this value for a unique field
    UniqueViolation {
        model: String,
        field: String,
        value: String,
    },
    /// Value kind does not fit the field kind
    AttributeMismatch { model: String, field: String },
    /// Foreign key points at a record that does not exist
    DanglingReference { model: String, id: RecordId },
    /// Operation needs a saved record
    NotSaved { model: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownModel { model } => write!(f, "unknown model {}", model),
            StoreError::UnknownField { model, field } => {
                write!(f, "{} has no field '{}'", model, field)
            }
            StoreError::MissingRequired { model, field } => {
                write!(f, "{}.{} may not be null", model, field)
            }
            StoreError::UniqueViolation {
                model,
                field,
                value,
            } => write!(f, "{} with {} '{}' already exists", model, field, value),
            StoreError::AttributeMismatch { model, field } => {
                write!(f, "value does not fit field {}.{}", model, field)
            }
            StoreError::DanglingReference { model, id } => {
                write!(f, "{} {} does not exist", model, id)
            }
            StoreError::NotSaved { model } => {
                write!(f, "{} must be saved before it can be linked", model)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Storage collaborator
pub trait Store {
    /// Instantiate a blank record of a model
    fn create(&mut self, model: &str) -> Result<Record, StoreError>;

    /// Find saved records matching every clause of the filter
    fn query(&self, model: &str, filter: &Filter) -> Result<Vec<Record>, StoreError>;

    /// Assign a field value, checked against the field's kind
    fn set_attribute(
        &self,
        record: &mut Record,
        field: &FieldDescriptor,
        value: Attribute,
    ) -> Result<(), StoreError>;

    /// Persist a record, assigning an identity on first save
    fn save(&mut self, record: &mut Record) -> Result<RecordId, StoreError>;

    /// Link two saved records through a many-to-many field of the owner
    fn add_relation(
        &mut self,
        owner: &Record,
        field: &FieldDescriptor,
        related: &Record,
    ) -> Result<(), StoreError>;
}
