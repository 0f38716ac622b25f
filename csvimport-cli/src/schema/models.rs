//! Model and field descriptors

use serde::{Deserialize, Serialize};

/// Scalar field types understood by the value cleaner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    /// Whole number
    Integer,
    /// Whole number that may not go below zero
    PositiveInteger,
    /// Floating point (decimal, float)
    Float,
    /// Calendar date
    Date,
    /// Anything else, stored as trimmed text
    Text,
}

/// Field kinds a model can declare
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Plain value column
    Scalar(ScalarKind),
    /// Single reference to a record of another model
    ForeignKey { related: String },
    /// Indexed group of references to records of another model
    ManyToMany {
        related: String,
        /// Explicit join model carrying its own attributes
        through: Option<String>,
        /// Join model fields pointing at (owner, related), when not inferred
        through_fields: Option<(String, String)>,
    },
}

/// A single field on a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
}

impl FieldDescriptor {
    /// Create a nullable, non-unique field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind,
            nullable: true,
            unique: false,
        }
    }

    /// Mark the field as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the field as required (not nullable)
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Non-nullable fields must carry a value before a record can be saved
    pub fn is_required(&self) -> bool {
        !self.nullable
    }

    /// Check if this is a foreign key pointing at `model`
    pub fn points_at(&self, model: &str) -> bool {
        matches!(&self.kind, FieldKind::ForeignKey { related } if related == model)
    }
}

/// A model registered in the schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Qualified name (e.g., "shop.Item")
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    /// Create an empty model
    pub fn new(name: impl Into<String>) -> Self {
        ModelDescriptor {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field (builder style)
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Short model name without the app label (e.g., "Item")
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}
